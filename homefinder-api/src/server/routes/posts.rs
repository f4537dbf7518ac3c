use crate::server::{
    Result, ServerError, ServerRouter, StoreAction,
    auth::{AuthenticatedUser, Viewer},
    extract::{Json, Query},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use homefinder_common::{
    filter::{PostFilter, PostFilterQuery},
    model::{
        Id,
        post::{CreatePostRequest, Post, PostDetail, PostMarker},
    },
};
use homefinder_db::PostStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_delete(delete_post)
        .typed_post(toggle_saved_post)
}

#[derive(TypedPath)]
#[typed_path("/posts")]
struct PostsPath;

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/save", rejection(ServerError))]
struct SavePostPath {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedResponse {
    is_saved: bool,
}

async fn list_posts(
    _: PostsPath,
    State(store): State<Arc<dyn PostStore>>,
    Query(query): Query<PostFilterQuery>,
) -> Result<Json<Vec<Post>>> {
    let filter = PostFilter::from(query);

    let posts = store
        .list_posts(&filter)
        .await
        .map_err(ServerError::store(StoreAction::GetPosts))?;

    Ok(Json(posts))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
    viewer: Viewer,
) -> Result<Json<PostDetail>> {
    let (post, user) = store
        .fetch_post_with_author(id)
        .await
        .map_err(ServerError::store(StoreAction::GetPost))?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let is_saved = match viewer.user_id() {
        Some(user_id) => store
            .is_post_saved(user_id, id)
            .await
            .map_err(ServerError::store(StoreAction::GetPost))?,
        None => false,
    };

    Ok(Json(PostDetail {
        post,
        user,
        is_saved,
    }))
}

async fn create_post(
    _: PostsPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = request.validate(user.user_id())?;

    store
        .fetch_user(post.author)
        .await
        .map_err(ServerError::store(StoreAction::CreatePost))?
        .ok_or(ServerError::UserByIdNotFound(post.author))?;

    let post = store
        .create_post(&post)
        .await
        .map_err(ServerError::store(StoreAction::CreatePost))?;

    info!(post_id = %post.id, user_id = %post.user_id, "Created post");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    let post = store
        .fetch_post(id)
        .await
        .map_err(ServerError::store(StoreAction::DeletePost))?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if post.user_id != user.user_id() {
        return Err(ServerError::NotPostOwner {
            post: id,
            user: user.user_id(),
        });
    }

    let deleted = store
        .delete_post(id)
        .await
        .map_err(ServerError::store(StoreAction::DeletePost))?;
    if !deleted {
        return Err(ServerError::PostByIdNotFound(id));
    }

    info!(post_id = %id, "Deleted post");
    Ok(Json(MessageResponse {
        message: "Post deleted",
    }))
}

async fn toggle_saved_post(
    SavePostPath { id }: SavePostPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
) -> Result<Json<SavedResponse>> {
    store
        .fetch_user(user.user_id())
        .await
        .map_err(ServerError::store(StoreAction::SavePost))?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    store
        .fetch_post(id)
        .await
        .map_err(ServerError::store(StoreAction::SavePost))?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let is_saved = store
        .toggle_saved_post(user.user_id(), id)
        .await
        .map_err(ServerError::store(StoreAction::SavePost))?;

    Ok(Json(SavedResponse { is_saved }))
}

#[cfg(test)]
mod tests {
    use crate::server::testing::{TestApp, delete, get, post_json};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use homefinder_common::{
        filter::PostFilter,
        model::{
            Id,
            post::{CreatePost, Post, PostMarker},
            user::{User, UserMarker, UserSummary},
        },
    };
    use homefinder_db::{PostStore, Result, memory::MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    /// Another request always deletes the post just before this one does.
    struct DeletedConcurrently(Arc<MemoryStore>);

    #[async_trait]
    impl PostStore for DeletedConcurrently {
        async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
            self.0.list_posts(filter).await
        }

        async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
            self.0.fetch_post(post_id).await
        }

        async fn fetch_post_with_author(
            &self,
            post_id: Id<PostMarker>,
        ) -> Result<Option<(Post, UserSummary)>> {
            self.0.fetch_post_with_author(post_id).await
        }

        async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
            self.0.fetch_user(user_id).await
        }

        async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Option<Vec<Post>>> {
            self.0.fetch_user_posts(user_id).await
        }

        async fn create_post(&self, post: &CreatePost) -> Result<Post> {
            self.0.create_post(post).await
        }

        async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
            self.0.delete_post(post_id).await?;
            self.0.delete_post(post_id).await
        }

        async fn is_post_saved(
            &self,
            user_id: Id<UserMarker>,
            post_id: Id<PostMarker>,
        ) -> Result<bool> {
            self.0.is_post_saved(user_id, post_id).await
        }

        async fn toggle_saved_post(
            &self,
            user_id: Id<UserMarker>,
            post_id: Id<PostMarker>,
        ) -> Result<bool> {
            self.0.toggle_saved_post(user_id, post_id).await
        }
    }

    #[tokio::test]
    async fn list_with_filters() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        app.post_for(&owner, "London", 1000).await;
        app.post_for(&owner, "London", 2500).await;
        app.post_for(&owner, "Paris", 1500).await;

        let (status, body) = app.send(get("/posts?city=London&maxPrice=2000")).await;
        assert_eq!(status, StatusCode::OK);
        let posts = body.as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["price"], 1000);
        assert_eq!(posts[0]["city"], "London");

        let (status, body) = app.send(get("/posts")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn list_without_matches_is_empty() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        app.post_for(&owner, "London", 1000).await;

        let (status, body) = app.send(get("/posts?city=Atlantis&type=rent")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn non_numeric_filters_are_ignored() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        app.post_for(&owner, "London", 1000).await;
        app.post_for(&owner, "Paris", 1500).await;

        let (_, unfiltered) = app.send(get("/posts")).await;
        let (status, filtered) = app
            .send(get("/posts?bedroom=many&minPrice=cheap&maxPrice="))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(filtered, unfiltered);
    }

    #[tokio::test]
    async fn repeated_filter_keys_use_first_value() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        app.post_for(&owner, "London", 1000).await;
        app.post_for(&owner, "Paris", 1500).await;

        let (status, body) = app.send(get("/posts?bedroom=2&bedroom=3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = app.send(get("/posts?city=London&city=Paris")).await;
        assert_eq!(status, StatusCode::OK);
        let posts = body.as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["city"], "London");
    }

    #[tokio::test]
    async fn detail_embeds_author() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let post = app.post_for(&owner, "London", 1000).await;

        let (status, body) = app.send(get(&format!("/posts/{}", post.id))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], u64::from(post.id));
        assert_eq!(body["title"], "Flat in London");
        assert_eq!(body["user"]["username"], "owner");
        assert_eq!(body["user"]["avatar"], json!(null));
        assert_eq!(body["isSaved"], false);
    }

    #[tokio::test]
    async fn detail_of_unknown_post_is_not_found() {
        let app = TestApp::new();
        let viewer = app.user("viewer").await;

        let (status, body) = app.send(get("/posts/424242")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Post not found");

        let request = app.with_token(get("/posts/424242"), viewer.id);
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(TestApp::with_raw_token(get("/posts/424242"), "garbage"))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn detail_reports_saved_for_verified_viewer() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let viewer = app.user("viewer").await;
        let post = app.post_for(&owner, "London", 1000).await;
        let uri = format!("/posts/{}", post.id);

        let request = app.with_token(post_json(&format!("{uri}/save"), &json!({})), viewer.id);
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isSaved"], true);

        let (_, body) = app.send(app.with_token(get(&uri), viewer.id)).await;
        assert_eq!(body["isSaved"], true);

        let (_, body) = app.send(app.with_token(get(&uri), owner.id)).await;
        assert_eq!(body["isSaved"], false);

        let (_, body) = app.send(get(&uri)).await;
        assert_eq!(body["isSaved"], false);

        let (status, body) = app
            .send(TestApp::with_raw_token(get(&uri), "not-a-token"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isSaved"], false);
    }

    #[tokio::test]
    async fn detail_accepts_bearer_header() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let post = app.post_for(&owner, "London", 1000).await;
        app.store
            .toggle_saved_post(owner.id, post.id)
            .await
            .unwrap();

        let request = app.with_bearer(get(&format!("/posts/{}", post.id)), owner.id);
        let (_, body) = app.send(request).await;

        assert_eq!(body["isSaved"], true);
    }

    #[tokio::test]
    async fn create_minimal_post() {
        let app = TestApp::new();
        let owner = app.user("u1").await;

        let body = json!({
            "title": "Flat A",
            "price": 1000,
            "images": ["a.jpg"],
            "address": "1 Main St",
            "bedroom": 2,
        });
        let (status, created) = app
            .send(app.with_token(post_json("/posts", &body), owner.id))
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Flat A");
        assert_eq!(created["bedroom"], 2);
        assert_eq!(created["bathroom"], json!(null));
        assert_eq!(created["userId"], u64::from(owner.id));

        let (status, _) = app
            .send(get(&format!("/posts/{}", created["id"])))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn create_coerces_numeric_strings() {
        let app = TestApp::new();
        let owner = app.user("owner").await;

        let body = json!({
            "title": "House B",
            "price": "250000",
            "images": [],
            "address": "2 High St",
            "bedroom": "4",
            "bathroom": "2",
            "type": "buy",
            "property": "house",
        });
        let (status, created) = app
            .send(app.with_token(post_json("/posts", &body), owner.id))
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["price"], 250_000);
        assert_eq!(created["bedroom"], 4);
        assert_eq!(created["bathroom"], 2);
        assert_eq!(created["type"], "buy");
        assert_eq!(created["property"], "house");
    }

    #[tokio::test]
    async fn create_accepts_any_property_category() {
        let app = TestApp::new();
        let owner = app.user("owner").await;

        let body = json!({
            "title": "Villa C",
            "price": 900_000,
            "images": ["c.jpg"],
            "address": "3 Shore Rd",
            "bedroom": 5,
            "property": "villa",
        });
        let (status, created) = app
            .send(app.with_token(post_json("/posts", &body), owner.id))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["property"], "villa");

        let (status, found) = app.send(get("/posts?property=villa")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found, json!([created]));
    }

    #[tokio::test]
    async fn create_rejects_fractional_price() {
        let app = TestApp::new();
        let owner = app.user("owner").await;

        for price in [json!(1000.75), json!(0.5)] {
            let body = json!({
                "title": "Flat A",
                "price": price,
                "images": ["a.jpg"],
                "address": "1 Main St",
                "bedroom": 2,
            });
            let (status, response) = app
                .send(app.with_token(post_json("/posts", &body), owner.id))
                .await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "price {price}");
            assert_eq!(response["message"], "Price must be an integer.");
        }

        let (_, posts) = app.send(get("/posts")).await;
        assert_eq!(posts, json!([]));
    }

    #[tokio::test]
    async fn malformed_input_is_not_echoed() {
        let app = TestApp::new();
        let owner = app.user("owner").await;

        let (status, body) = app.send(get("/posts/abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Invalid path.");

        let request = Request::post("/posts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap();
        let (status, body) = app.send(app.with_token(request, owner.id)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid request body.");
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let valid = json!({
            "title": "Flat A",
            "price": 1000,
            "images": ["a.jpg"],
            "address": "1 Main St",
            "bedroom": 2,
        });

        for field in ["title", "price", "images", "address"] {
            let mut body = valid.clone();
            body.as_object_mut().unwrap().remove(field);

            let (status, response) = app
                .send(app.with_token(post_json("/posts", &body), owner.id))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "without {field}");
            assert_eq!(response["message"], "Required fields are missing.");
        }

        let mut body = valid.clone();
        body["bedroom"] = json!(null);
        let (status, response) = app
            .send(app.with_token(post_json("/posts", &body), owner.id))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Bedroom count is required.");

        let (_, posts) = app.send(get("/posts")).await;
        assert_eq!(posts, json!([]));
    }

    #[tokio::test]
    async fn create_requires_token() {
        let app = TestApp::new();
        let body = json!({ "title": "Flat A" });

        let (status, _) = app.send(post_json("/posts", &body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = TestApp::with_raw_token(post_json("/posts", &body), "garbage");
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn create_for_unknown_user_is_not_found() {
        let app = TestApp::new();
        let body = json!({
            "title": "Flat A",
            "price": 1000,
            "images": ["a.jpg"],
            "address": "1 Main St",
            "bedroom": 2,
        });

        let request = app.with_token(post_json("/posts", &body), 999_u64.into());
        let (status, response) = app.send(request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response["message"], "User not found.");
        let (_, posts) = app.send(get("/posts")).await;
        assert_eq!(posts, json!([]));
    }

    #[tokio::test]
    async fn delete_by_non_owner_is_forbidden() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let intruder = app.user("intruder").await;
        let post = app.post_for(&owner, "London", 1000).await;
        let uri = format!("/posts/{}", post.id);

        let (status, body) = app.send(app.with_token(delete(&uri), intruder.id)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Not Authorized!");

        let (status, _) = app.send(get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_by_owner() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let post = app.post_for(&owner, "London", 1000).await;
        let uri = format!("/posts/{}", post.id);

        let (status, body) = app.send(app.with_token(delete(&uri), owner.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Post deleted");

        let (status, _) = app.send(get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.send(app.with_token(delete(&uri), owner.id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_lost_to_concurrent_delete_is_not_found() {
        let app = TestApp::with_store(|store| {
            Arc::new(DeletedConcurrently(store)) as Arc<dyn PostStore>
        });
        let owner = app.user("owner").await;
        let post = app.post_for(&owner, "London", 1000).await;

        let request = app.with_token(delete(&format!("/posts/{}", post.id)), owner.id);
        let (status, body) = app.send(request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Post not found");
    }

    #[tokio::test]
    async fn save_for_unknown_user_is_not_found() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let post = app.post_for(&owner, "London", 1000).await;

        let uri = format!("/posts/{}/save", post.id);
        let request = app.with_token(post_json(&uri, &json!({})), 4242_u64.into());
        let (status, body) = app.send(request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found.");
    }

    #[tokio::test]
    async fn save_toggles() {
        let app = TestApp::new();
        let owner = app.user("owner").await;
        let post = app.post_for(&owner, "London", 1000).await;
        let uri = format!("/posts/{}/save", post.id);

        let (_, body) = app
            .send(app.with_token(post_json(&uri, &json!({})), owner.id))
            .await;
        assert_eq!(body["isSaved"], true);

        let (_, body) = app
            .send(app.with_token(post_json(&uri, &json!({})), owner.id))
            .await;
        assert_eq!(body["isSaved"], false);

        let request = app.with_token(post_json("/posts/31337/save", &json!({})), owner.id);
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = TestApp::new();

        let (status, body) = app.send(get("/listings")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }
}
