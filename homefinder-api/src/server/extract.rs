//! Wrappers around axum's extractors that reject with [`ServerError`].

use crate::server::ServerError;
use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::Serialize;

#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(json) => (TypedHeader(ContentType::json()), json).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}

/// Query string extractor that collects repeated keys into sequences instead
/// of rejecting them.
#[derive(FromRequestParts, Debug, Clone, Copy, Default)]
#[from_request(via(axum_extra::extract::Query), rejection(ServerError))]
pub struct Query<T>(pub T);
