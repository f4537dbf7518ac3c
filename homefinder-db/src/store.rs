use async_trait::async_trait;
use homefinder_common::{
    filter::PostFilter,
    model::{
        Id, ModelValidationError,
        post::{CreatePost, Post, PostMarker},
        user::{User, UserMarker, UserSummary},
    },
    snowflake::SnowflakeTimeError,
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate an id: {0}")]
    IdGeneration(#[from] SnowflakeTimeError),
    #[error("User with id {0} does not exist")]
    UnknownUser(Id<UserMarker>),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence of users, posts and saved posts.
///
/// Deleting a post also deletes every saved post referencing it.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Posts matching `filter`, newest first.
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// The post together with the username and avatar of its owner.
    async fn fetch_post_with_author(
        &self,
        post_id: Id<PostMarker>,
    ) -> Result<Option<(Post, UserSummary)>>;

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;

    /// `None` if the user does not exist.
    async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Option<Vec<Post>>>;

    async fn create_post(&self, post: &CreatePost) -> Result<Post>;

    /// Returns whether a post was deleted.
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool>;

    async fn is_post_saved(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool>;

    /// Saves the post for the user, or unsaves it if it already was. Returns
    /// whether the post is saved afterwards.
    async fn toggle_saved_post(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool>;
}
