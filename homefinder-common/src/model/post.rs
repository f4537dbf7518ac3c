use crate::{
    model::{
        Id,
        user::{UserMarker, UserSummary},
    },
    util::LooseInteger,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Buy,
    Rent,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown listing type: {0}")]
pub struct UnknownListingTypeError(String);

impl ListingType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ListingType::Buy => "buy",
            ListingType::Rent => "rent",
        }
    }
}

impl FromStr for ListingType {
    type Err = UnknownListingTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(ListingType::Buy),
            "rent" => Ok(ListingType::Rent),
            other => Err(UnknownListingTypeError(other.to_owned())),
        }
    }
}

/// The descriptive part of a post, everything the owner supplies on creation.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub title: String,
    pub price: i64,
    pub images: Vec<String>,
    pub address: String,
    pub city: Option<String>,
    pub bedroom: i32,
    pub bathroom: Option<i32>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: Option<ListingType>,
    pub property: Option<String>,
    pub desc: Option<String>,
    pub floor: Option<i32>,
    pub parking: Option<String>,
    pub size: Option<i32>,
    pub school: Option<i32>,
    pub bus: Option<i32>,
    pub contact: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    #[serde(flatten)]
    pub listing: Listing,
    pub user_id: Id<UserMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A post as shown on its detail page.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub user: UserSummary,
    pub is_saved: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub listing: Listing,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum CreatePostError {
    #[error("Required fields are missing.")]
    MissingRequiredFields,
    #[error("Price must be an integer.")]
    InvalidPrice,
    #[error("Bedroom count is required.")]
    MissingBedroom,
    #[error("Bedroom count must be an integer.")]
    InvalidBedroom,
}

/// Body of a post creation request.
///
/// Every field may be missing at this layer; [`CreatePostRequest::validate`]
/// decides what is required.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub price: Option<LooseInteger>,
    pub images: Option<Vec<String>>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub bedroom: Option<LooseInteger>,
    pub bathroom: Option<LooseInteger>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: Option<ListingType>,
    pub property: Option<String>,
    pub desc: Option<String>,
    pub floor: Option<LooseInteger>,
    pub parking: Option<String>,
    pub size: Option<LooseInteger>,
    pub school: Option<LooseInteger>,
    pub bus: Option<LooseInteger>,
    pub contact: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn optional_i32(value: Option<&LooseInteger>) -> Option<i32> {
    value.and_then(LooseInteger::to_i32)
}

impl CreatePostRequest {
    /// Empty strings and a blank or zero price count as missing. A price that
    /// is present but not a whole number is rejected rather than rounded. A
    /// `bathroom` of zero or one that is not integer-like is stored as absent.
    pub fn validate(self, author: Id<UserMarker>) -> Result<CreatePost, CreatePostError> {
        let (Some(title), Some(price), Some(images), Some(address)) = (
            non_empty(self.title),
            self.price.filter(|price| !price.is_blank()),
            self.images,
            non_empty(self.address),
        ) else {
            return Err(CreatePostError::MissingRequiredFields);
        };

        let price = match price.to_exact_integer() {
            Some(0) => return Err(CreatePostError::MissingRequiredFields),
            Some(price) => price,
            None => return Err(CreatePostError::InvalidPrice),
        };

        let bedroom = self
            .bedroom
            .ok_or(CreatePostError::MissingBedroom)?
            .to_i32()
            .ok_or(CreatePostError::InvalidBedroom)?;

        let bathroom = optional_i32(self.bathroom.as_ref()).filter(|bathroom| *bathroom != 0);

        Ok(CreatePost {
            author,
            listing: Listing {
                title,
                price,
                images,
                address,
                city: self.city,
                bedroom,
                bathroom,
                latitude: self.latitude,
                longitude: self.longitude,
                listing_type: self.listing_type,
                property: self.property,
                desc: self.desc,
                floor: optional_i32(self.floor.as_ref()),
                parking: self.parking,
                size: optional_i32(self.size.as_ref()),
                school: optional_i32(self.school.as_ref()),
                bus: optional_i32(self.bus.as_ref()),
                contact: self.contact,
            },
        })
    }
}
