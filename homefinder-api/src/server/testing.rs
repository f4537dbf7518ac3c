use crate::server::{ServerState, routes};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use homefinder_common::{
    model::{
        Id,
        auth::TokenKeys,
        post::{CreatePost, Listing, Post},
        user::{User, UserMarker, Username},
    },
    util::PositiveDuration,
};
use homefinder_db::{PostStore, memory::MemoryStore};
use http_body_util::BodyExt;
use std::sync::Arc;
use time::Duration;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub token_keys: Arc<TokenKeys>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(|store| store as Arc<dyn PostStore>)
    }

    /// Serves through `wrap(store)` while fixtures still go straight to the
    /// memory store.
    pub fn with_store(
        wrap: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn PostStore>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let token_keys = Arc::new(TokenKeys::from_secret(b"test secret"));

        let state = ServerState {
            store: wrap(store.clone()),
            token_keys: token_keys.clone(),
        };

        Self {
            router: routes().with_state(state),
            store,
            token_keys,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.store
            .create_user(Username::new(username.to_owned()).unwrap(), None)
            .await
            .unwrap()
    }

    pub async fn post_for(&self, owner: &User, city: &str, price: i64) -> Post {
        let listing = Listing {
            title: format!("Flat in {city}"),
            price,
            images: vec!["a.jpg".to_owned()],
            address: "1 Main St".to_owned(),
            city: Some(city.to_owned()),
            bedroom: 2,
            ..Listing::default()
        };

        self.store
            .create_post(&CreatePost {
                author: owner.id,
                listing,
            })
            .await
            .unwrap()
    }

    pub fn token(&self, user_id: Id<UserMarker>) -> String {
        let lifetime = PositiveDuration::new(Duration::hours(1)).unwrap();
        self.token_keys.issue(user_id, lifetime).unwrap()
    }

    pub fn with_token(&self, request: Request<Body>, user_id: Id<UserMarker>) -> Request<Body> {
        Self::with_raw_token(request, &self.token(user_id))
    }

    pub fn with_raw_token(mut request: Request<Body>, token: &str) -> Request<Body> {
        let cookie = format!("token={token}").parse().unwrap();
        request.headers_mut().insert(header::COOKIE, cookie);
        request
    }

    pub fn with_bearer(&self, mut request: Request<Body>, user_id: Id<UserMarker>) -> Request<Body> {
        let authorization = format!("Bearer {}", self.token(user_id)).parse().unwrap();
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, authorization);
        request
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap();

        (status, body)
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
