use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use headers::{Authorization, HeaderMapExt, authorization::Bearer};
use homefinder_common::model::{
    Id,
    auth::{TOKEN_COOKIE, TokenKeys},
    user::UserMarker,
};
use std::{convert::Infallible, sync::Arc};
use tracing::debug;

/// The token a request carries, from the token cookie or else a bearer
/// authorization header.
fn request_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        return Some(cookie.value().to_owned());
    }

    parts
        .headers
        .typed_get::<Authorization<Bearer>>()
        .map(|authorization| authorization.token().to_owned())
}

/// A request whose token verified. Rejects the request otherwise.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = request_token(parts).ok_or(ServerError::MissingToken)?;

        let claims = Arc::<TokenKeys>::from_ref(state)
            .verify(&token)
            .map_err(ServerError::InvalidToken)?;

        Ok(Self { id: claims.id })
    }
}

/// Whoever is looking at a page, if they proved it. Never rejects; a missing
/// or unverifiable token just means an anonymous viewer.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Viewer {
    id: Option<Id<UserMarker>>,
}

impl Viewer {
    #[must_use]
    pub fn user_id(self) -> Option<Id<UserMarker>> {
        self.id
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = request_token(parts) else {
            return Ok(Self { id: None });
        };

        match Arc::<TokenKeys>::from_ref(state).verify(&token) {
            Ok(claims) => Ok(Self {
                id: Some(claims.id),
            }),
            Err(err) => {
                debug!(error = %err, "Treating viewer as anonymous");
                Ok(Self { id: None })
            }
        }
    }
}
