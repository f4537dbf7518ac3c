use crate::{
    record::{PostRecord, PostWithAuthorRecord, UserRecord, post_columns},
    store::{PostStore, Result},
};
use async_trait::async_trait;
use homefinder_common::{
    filter::PostFilter,
    model::{
        HomefinderSnowflakeGenerator, Id,
        post::{CreatePost, Post, PostMarker},
        user::{User, UserMarker, UserSummary},
    },
    snowflake::{ProcessId, WorkerId},
};
use sqlx::{PgPool, Postgres, QueryBuilder, query, query_as, query_scalar};
use std::sync::{Mutex, PoisonError};
use tracing::instrument;

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<HomefinderSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(HomefinderSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    fn generate_post_id(&self) -> Result<Id<PostMarker>> {
        let snowflake = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok(snowflake.into())
    }
}

impl std::fmt::Debug for DbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbClient")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

fn snowflake_param<Marker>(id: Id<Marker>) -> i64 {
    id.snowflake().get().cast_signed()
}

#[async_trait]
impl PostStore for DbClient {
    #[instrument(level = "debug", skip(self))]
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::<Postgres>::new(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts.posts WHERE TRUE"
        ));

        if let Some(city) = &filter.city {
            builder.push(" AND posts.city = ").push_bind(city.clone());
        }
        if let Some(listing_type) = &filter.listing_type {
            builder
                .push(" AND posts.listing_type = ")
                .push_bind(listing_type.clone());
        }
        if let Some(property) = &filter.property {
            builder
                .push(" AND posts.property = ")
                .push_bind(property.clone());
        }
        if let Some(bedroom) = filter.bedroom {
            builder.push(" AND posts.bedroom = ").push_bind(bedroom);
        }
        if let Some(min_price) = filter.min_price {
            builder.push(" AND posts.price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            builder.push(" AND posts.price <= ").push_bind(max_price);
        }
        builder.push(" ORDER BY posts.post_snowflake DESC");

        let records = builder
            .build_query_as::<PostRecord>()
            .fetch_all(&self.pool)
            .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts.posts WHERE posts.post_snowflake = $1"
        ))
        .bind(snowflake_param(post_id))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_post_with_author(
        &self,
        post_id: Id<PostMarker>,
    ) -> Result<Option<(Post, UserSummary)>> {
        let record = query_as::<_, PostWithAuthorRecord>(concat!(
            "SELECT ",
            post_columns!(),
            ", users.username, users.avatar
            FROM
                posts.posts
                JOIN users.users ON users.user_snowflake = posts.user_snowflake
            WHERE
                posts.post_snowflake = $1"
        ))
        .bind(snowflake_param(post_id))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(<(Post, UserSummary)>::try_from).transpose()?;
        Ok(post)
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.username,
                users.avatar
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(snowflake_param(user_id))
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Option<Vec<Post>>> {
        if self.fetch_user(user_id).await?.is_none() {
            return Ok(None);
        }

        let records = query_as::<_, PostRecord>(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts.posts
            WHERE posts.user_snowflake = $1
            ORDER BY posts.post_snowflake DESC"
        ))
        .bind(snowflake_param(user_id))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(Some(posts))
    }

    #[instrument(level = "debug", skip(self))]
    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let post_id = self.generate_post_id()?;
        let listing = &post.listing;

        let record = query_as::<_, PostRecord>(concat!(
            "INSERT INTO posts.posts (
                post_snowflake, title, price, images, address, city, bedroom, bathroom,
                latitude, longitude, listing_type, property, description, floor, parking,
                size, school, bus, contact, user_snowflake
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            RETURNING ",
            post_columns!()
        ))
        .bind(snowflake_param(post_id))
        .bind(&listing.title)
        .bind(listing.price)
        .bind(&listing.images)
        .bind(&listing.address)
        .bind(&listing.city)
        .bind(listing.bedroom)
        .bind(listing.bathroom)
        .bind(&listing.latitude)
        .bind(&listing.longitude)
        .bind(listing.listing_type.map(|listing_type| listing_type.as_str()))
        .bind(&listing.property)
        .bind(&listing.desc)
        .bind(listing.floor)
        .bind(&listing.parking)
        .bind(listing.size)
        .bind(listing.school)
        .bind(listing.bus)
        .bind(&listing.contact)
        .bind(snowflake_param(post.author))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE posts.post_snowflake = $1")
            .bind(snowflake_param(post_id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(level = "debug", skip(self))]
    async fn is_post_saved(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let saved = query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1
                FROM posts.saved_posts
                WHERE saved_posts.user_snowflake = $1 AND saved_posts.post_snowflake = $2
            )
            ",
        )
        .bind(snowflake_param(user_id))
        .bind(snowflake_param(post_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    #[instrument(level = "debug", skip(self))]
    async fn toggle_saved_post(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<bool> {
        let mut transaction = self.pool.begin().await?;

        let removed = query(
            "
            DELETE FROM posts.saved_posts
            WHERE saved_posts.user_snowflake = $1 AND saved_posts.post_snowflake = $2
            ",
        )
        .bind(snowflake_param(user_id))
        .bind(snowflake_param(post_id))
        .execute(&mut *transaction)
        .await?
        .rows_affected()
            > 0;

        if !removed {
            query("INSERT INTO posts.saved_posts (user_snowflake, post_snowflake) VALUES ($1, $2)")
                .bind(snowflake_param(user_id))
                .bind(snowflake_param(post_id))
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;
        Ok(!removed)
    }
}
