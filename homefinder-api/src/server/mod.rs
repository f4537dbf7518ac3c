use axum::{
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::extract::QueryRejection;
use homefinder_common::model::{
    Id,
    auth::{TokenError, TokenKeys},
    post::{CreatePostError, PostMarker},
    user::UserMarker,
};
use homefinder_db::{DbError, PostStore};
use extract::Json;
use serde::Serialize;
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, error};

mod auth;
mod extract;
mod routes;
#[cfg(test)]
mod testing;

pub type ServerRouter = axum::Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn PostStore>,
    pub token_keys: Arc<TokenKeys>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

/// What a handler was doing when the store failed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum StoreAction {
    GetPosts,
    GetPost,
    CreatePost,
    DeletePost,
    SavePost,
}

impl Display for StoreAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            StoreAction::GetPosts => "Failed to get posts",
            StoreAction::GetPost => "Failed to get post",
            StoreAction::CreatePost => "Failed to create post",
            StoreAction::DeletePost => "Failed to delete post",
            StoreAction::SavePost => "Failed to save post",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Not Authenticated!")]
    MissingToken,
    #[error("Token is not valid!")]
    InvalidToken(#[source] TokenError),
    #[error(transparent)]
    InvalidPost(#[from] CreatePostError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("User {user} does not own post {post}")]
    NotPostOwner {
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    },
    #[error("{action}: {source}")]
    Store {
        action: StoreAction,
        #[source]
        source: DbError,
    },
}

impl ServerError {
    /// Wraps a store failure, for use with [`Result::map_err`].
    pub fn store(action: StoreAction) -> impl FnOnce(DbError) -> Self {
        move |source| ServerError::Store { action, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MissingToken => StatusCode::UNAUTHORIZED,
            ServerError::InvalidToken(_) | ServerError::NotPostOwner { .. } => {
                StatusCode::FORBIDDEN
            }
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidPost(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_) | ServerError::Store { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message shown to the client. Server side failures only name the
    /// failed action, and rejected input is not echoed back.
    pub fn message(&self) -> String {
        match self {
            ServerError::PostByIdNotFound(_) => "Post not found".to_owned(),
            ServerError::UserByIdNotFound(_) => "User not found.".to_owned(),
            ServerError::NotPostOwner { .. } => "Not Authorized!".to_owned(),
            ServerError::PathRejection(_) => "Invalid path.".to_owned(),
            ServerError::QueryRejection(_) => "Invalid query string.".to_owned(),
            ServerError::JsonRejection(_) => "Invalid request body.".to_owned(),
            ServerError::JsonResponse(_) => "Failed to serialize response".to_owned(),
            ServerError::Store { action, .. } => action.to_string(),
            ServerError::UnknownRoute(_)
            | ServerError::MissingToken
            | ServerError::InvalidToken(_)
            | ServerError::InvalidPost(_) => self.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message: self.message(),
        };
        (status, Json(error_response)).into_response()
    }
}
