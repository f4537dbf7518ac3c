use crate::server::{Result, ServerError, ServerRouter, StoreAction, extract::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use homefinder_common::model::{Id, post::Post, user::UserMarker};
use homefinder_db::PostStore;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct UserPostsPath {
    id: Id<UserMarker>,
}

async fn get_user_posts(
    UserPostsPath { id }: UserPostsPath,
    State(store): State<Arc<dyn PostStore>>,
) -> Result<Json<Vec<Post>>> {
    let posts = store
        .fetch_user_posts(id)
        .await
        .map_err(ServerError::store(StoreAction::GetPosts))?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(posts))
}
