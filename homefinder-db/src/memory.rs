//! A [`PostStore`] kept entirely in process memory.
//!
//! Useful for tests and local experiments; nothing survives a restart.

use crate::store::{DbError, PostStore, Result};
use async_trait::async_trait;
use homefinder_common::{
    filter::PostFilter,
    model::{
        HomefinderSnowflakeGenerator, Id,
        post::{CreatePost, Post, PostMarker},
        user::{User, UserMarker, UserSummary, Username},
    },
};
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<Id<UserMarker>, User>,
    posts: BTreeMap<Id<PostMarker>, Post>,
    saved_posts: BTreeSet<(Id<UserMarker>, Id<PostMarker>)>,
    snowflake_generator: HomefinderSnowflakeGenerator,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_user(&self, username: Username, avatar: Option<String>) -> Result<User> {
        let mut state = self.state.write().await;

        let user = User {
            id: state.snowflake_generator.generate()?.into(),
            username,
            avatar,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        let posts = state
            .posts
            .values()
            .rev()
            .filter(|post| filter.matches(post))
            .cloned()
            .collect();
        Ok(posts)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn fetch_post_with_author(
        &self,
        post_id: Id<PostMarker>,
    ) -> Result<Option<(Post, UserSummary)>> {
        let state = self.state.read().await;

        let Some(post) = state.posts.get(&post_id) else {
            return Ok(None);
        };
        let author = state
            .users
            .get(&post.user_id)
            .ok_or(DbError::UnknownUser(post.user_id))?;

        Ok(Some((post.clone(), author.clone().into())))
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Option<Vec<Post>>> {
        let state = self.state.read().await;

        if !state.users.contains_key(&user_id) {
            return Ok(None);
        }

        let posts = state
            .posts
            .values()
            .rev()
            .filter(|post| post.user_id == user_id)
            .cloned()
            .collect();
        Ok(Some(posts))
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&post.author) {
            return Err(DbError::UnknownUser(post.author));
        }

        let post = Post {
            id: state.snowflake_generator.generate()?.into(),
            listing: post.listing.clone(),
            user_id: post.author,
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.insert(post.id, post.clone());

        Ok(post)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut state = self.state.write().await;

        let deleted = state.posts.remove(&post_id).is_some();
        state
            .saved_posts
            .retain(|(_, saved_post_id)| *saved_post_id != post_id);

        Ok(deleted)
    }

    async fn is_post_saved(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .saved_posts
            .contains(&(user_id, post_id)))
    }

    async fn toggle_saved_post(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(DbError::UnknownUser(user_id));
        }

        let key = (user_id, post_id);
        if state.saved_posts.remove(&key) {
            Ok(false)
        } else {
            state.saved_posts.insert(key);
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{memory::MemoryStore, store::PostStore};
    use homefinder_common::{
        filter::{PostFilter, PostFilterQuery},
        model::{
            Id,
            post::{CreatePost, Listing},
            user::{User, Username},
        },
    };

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(Username::new(name.to_owned()).unwrap(), None)
            .await
            .unwrap()
    }

    fn listing(city: &str, price: i64) -> Listing {
        Listing {
            title: format!("Flat in {city}"),
            price,
            images: vec!["a.jpg".to_owned()],
            address: "1 Main St".to_owned(),
            city: Some(city.to_owned()),
            bedroom: 2,
            ..Listing::default()
        }
    }

    #[tokio::test]
    async fn create_and_filter() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;

        for (city, price) in [("London", 1000), ("London", 2000), ("Paris", 1500)] {
            store
                .create_post(&CreatePost {
                    author: owner.id,
                    listing: listing(city, price),
                })
                .await
                .unwrap();
        }

        let all = store.list_posts(&PostFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|pair| pair[0].id > pair[1].id));

        let filter = PostFilter::from(PostFilterQuery {
            city: vec!["London".to_owned()],
            max_price: vec!["1500".to_owned()],
            ..PostFilterQuery::default()
        });
        let london = store.list_posts(&filter).await.unwrap();
        assert_eq!(london.len(), 1);
        assert_eq!(london[0].listing.price, 1000);

        let owned = store.fetch_user_posts(owner.id).await.unwrap().unwrap();
        assert_eq!(owned.len(), 3);
        assert_eq!(store.fetch_user_posts(Id::from(1_u64)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_author_is_rejected() {
        let store = MemoryStore::new();
        let result = store
            .create_post(&CreatePost {
                author: Id::from(1_u64),
                listing: listing("London", 1000),
            })
            .await;

        assert!(result.is_err());
        assert!(store.list_posts(&PostFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saved_posts_toggle_and_cascade() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let reader = user(&store, "reader").await;
        let post = store
            .create_post(&CreatePost {
                author: owner.id,
                listing: listing("London", 1000),
            })
            .await
            .unwrap();

        assert!(!store.is_post_saved(reader.id, post.id).await.unwrap());
        assert!(store.toggle_saved_post(reader.id, post.id).await.unwrap());
        assert!(store.is_post_saved(reader.id, post.id).await.unwrap());
        assert!(!store.toggle_saved_post(reader.id, post.id).await.unwrap());
        assert!(!store.is_post_saved(reader.id, post.id).await.unwrap());

        store.toggle_saved_post(reader.id, post.id).await.unwrap();
        assert!(store.delete_post(post.id).await.unwrap());
        assert!(!store.is_post_saved(reader.id, post.id).await.unwrap());
        assert!(!store.delete_post(post.id).await.unwrap());
    }
}
