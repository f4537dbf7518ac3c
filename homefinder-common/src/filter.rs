//! Search filters for the post listing.
//!
//! Query values are parsed permissively: a filter that is empty, zero or not
//! integer-like where an integer is expected is dropped instead of rejected.

use crate::{model::post::Post, util::parse_leading_int};
use serde::Deserialize;

/// Raw query string of a post search.
///
/// A key may repeat; only its first value is used.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostFilterQuery {
    pub city: Vec<String>,
    #[serde(rename = "type")]
    pub listing_type: Vec<String>,
    pub property: Vec<String>,
    pub bedroom: Vec<String>,
    pub min_price: Vec<String>,
    pub max_price: Vec<String>,
}

/// `listing_type` and `property` stay strings so that an unknown value
/// matches no post instead of failing the search.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostFilter {
    pub city: Option<String>,
    pub listing_type: Option<String>,
    pub property: Option<String>,
    pub bedroom: Option<i64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

fn first(values: Vec<String>) -> Option<String> {
    values.into_iter().next()
}

fn text_filter(values: Vec<String>) -> Option<String> {
    first(values).filter(|value| !value.is_empty())
}

fn integer_filter(values: Vec<String>) -> Option<i64> {
    first(values)
        .as_deref()
        .and_then(parse_leading_int)
        .filter(|value| *value != 0)
}

impl From<PostFilterQuery> for PostFilter {
    fn from(value: PostFilterQuery) -> Self {
        Self {
            city: text_filter(value.city),
            listing_type: text_filter(value.listing_type),
            property: text_filter(value.property),
            bedroom: integer_filter(value.bedroom),
            min_price: integer_filter(value.min_price),
            max_price: integer_filter(value.max_price),
        }
    }
}

impl PostFilter {
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        let listing = &post.listing;

        let text_matches = |filter: Option<&str>, value: Option<&str>| {
            filter.is_none_or(|filter| value == Some(filter))
        };

        text_matches(self.city.as_deref(), listing.city.as_deref())
            && text_matches(
                self.listing_type.as_deref(),
                listing.listing_type.map(|listing_type| listing_type.as_str()),
            )
            && text_matches(self.property.as_deref(), listing.property.as_deref())
            && self
                .bedroom
                .is_none_or(|bedroom| i64::from(listing.bedroom) == bedroom)
            && self.min_price.is_none_or(|min| listing.price >= min)
            && self.max_price.is_none_or(|max| listing.price <= max)
    }
}
