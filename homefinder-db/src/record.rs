use homefinder_common::model::{
    ModelValidationError,
    post::{Listing, Post},
    user::{User, UserSummary, Username},
};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Columns of `posts.posts`, in the order [`PostRecord`] reads them.
macro_rules! post_columns {
    () => {
        "posts.post_snowflake, posts.title, posts.price, posts.images, posts.address, \
        posts.city, posts.bedroom, posts.bathroom, posts.latitude, posts.longitude, \
        posts.listing_type, posts.property, posts.description, posts.floor, posts.parking, \
        posts.size, posts.school, posts.bus, posts.contact, posts.user_snowflake, \
        posts.created_at"
    };
}
pub(crate) use post_columns;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub price: i64,
    pub images: Vec<String>,
    pub address: String,
    pub city: Option<String>,
    pub bedroom: i32,
    pub bathroom: Option<i32>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub listing_type: Option<String>,
    pub property: Option<String>,
    pub description: Option<String>,
    pub floor: Option<i32>,
    pub parking: Option<String>,
    pub size: Option<i32>,
    pub school: Option<i32>,
    pub bus: Option<i32>,
    pub contact: Option<String>,
    pub user_snowflake: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostWithAuthorRecord {
    #[sqlx(flatten)]
    pub post: PostRecord,
    pub username: String,
    pub avatar: Option<String>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            username: Username::new(value.username)?,
            avatar: value.avatar,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            listing: Listing {
                title: value.title,
                price: value.price,
                images: value.images,
                address: value.address,
                city: value.city,
                bedroom: value.bedroom,
                bathroom: value.bathroom,
                latitude: value.latitude,
                longitude: value.longitude,
                listing_type: value
                    .listing_type
                    .as_deref()
                    .map(str::parse)
                    .transpose()?,
                property: value.property,
                desc: value.description,
                floor: value.floor,
                parking: value.parking,
                size: value.size,
                school: value.school,
                bus: value.bus,
                contact: value.contact,
            },
            user_id: value.user_snowflake.cast_unsigned().into(),
            created_at: value.created_at,
        })
    }
}

impl TryFrom<PostWithAuthorRecord> for (Post, UserSummary) {
    type Error = ModelValidationError;

    fn try_from(value: PostWithAuthorRecord) -> Result<Self, Self::Error> {
        let author = UserSummary {
            username: Username::new(value.username)?,
            avatar: value.avatar,
        };

        Ok((value.post.try_into()?, author))
    }
}
