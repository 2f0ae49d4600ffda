//! Catalog book type.

use serde::{Deserialize, Serialize};

use super::id::BookId;
use super::price::Price;

/// A book as listed in the catalog.
///
/// Carts, wishlists and orders store a full copy of the book rather than a
/// reference, so later catalog edits never rewrite what a customer saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: Price,
    /// List price before any markdown, if the book is on sale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    /// Average review score, 0.0 - 5.0.
    #[serde(default)]
    pub rating: f32,
    /// Number of reviews behind `rating`.
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub bestseller: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Book {
    /// Create a book with the required fields; the rest take defaults.
    #[must_use]
    pub fn new(
        id: BookId,
        title: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
        price: Price,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            category: category.into(),
            price,
            original_price: None,
            rating: 0.0,
            reviews: 0,
            bestseller: false,
            image_url: None,
            description: None,
        }
    }

    /// Whether the book is marked down from its list price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.original_price
            .is_some_and(|original| original.amount > self.price.amount)
    }
}
