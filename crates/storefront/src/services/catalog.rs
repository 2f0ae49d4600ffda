//! Book catalog: loading, filtering and sorting.
//!
//! The catalog is read once (from a JSON array of books) and is read-only
//! afterwards. Queries borrow from it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use bookstore_core::{Book, BookId};

/// Pseudo-category that matches every book.
pub const ALL_CATEGORIES: &str = "All";

/// Errors that can occur while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not a valid JSON array of books.
    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two books share an ID.
    #[error("duplicate book id {0} in catalog")]
    DuplicateId(BookId),
}

/// Result ordering for catalog queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Catalog order.
    #[default]
    Featured,
    PriceLowToHigh,
    PriceHighToLow,
    /// Highest rated first.
    Rating,
    /// Alphabetical by title.
    Title,
    /// Most reviewed first.
    Reviews,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "featured" => Ok(Self::Featured),
            "price-low" | "price_asc" => Ok(Self::PriceLowToHigh),
            "price-high" | "price_desc" => Ok(Self::PriceHighToLow),
            "rating" => Ok(Self::Rating),
            "title" => Ok(Self::Title),
            "reviews" => Ok(Self::Reviews),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Filters for [`Catalog::search`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Exact category name; `"All"` matches any.
    pub category: Option<String>,
    /// Case-insensitive substring of title or author.
    pub text: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
    pub min_rating: Option<f32>,
    pub sort: SortOrder,
}

impl CatalogQuery {
    fn matches(&self, book: &Book, needle: Option<&str>) -> bool {
        let category = self
            .category
            .as_deref()
            .is_none_or(|c| c == ALL_CATEGORIES || c == book.category);
        let text = needle.is_none_or(|needle| {
            book.title.to_lowercase().contains(needle) || book.author.to_lowercase().contains(needle)
        });
        let price = self.min_price.is_none_or(|min| book.price.amount >= min)
            && self.max_price.is_none_or(|max| book.price.amount <= max);
        let rating = self.min_rating.is_none_or(|min| book.rating >= min);

        category && text && price && rating
    }
}

/// A category and how many books it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// The full set of books on sale.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    /// Build a catalog from books in display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two books share an ID.
    pub fn new(books: Vec<Book>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        if let Some(dup) = books.iter().find(|book| !seen.insert(book.id)) {
            return Err(CatalogError::DuplicateId(dup.id));
        }
        Ok(Self { books })
    }

    /// Parse a JSON array of books.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Load a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), books = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// Books matching `query`, in the requested order.
    #[must_use]
    pub fn search(&self, query: &CatalogQuery) -> Vec<&Book> {
        let needle = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);

        let mut results: Vec<&Book> = self
            .books
            .iter()
            .filter(|book| query.matches(book, needle.as_deref()))
            .collect();
        sort_books(&mut results, query.sort);
        results
    }

    /// `"All"` followed by each category in first-seen order, with counts.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryCount> {
        let mut counts: Vec<CategoryCount> = Vec::new();
        for book in &self.books {
            match counts.iter_mut().find(|c| c.name == book.category) {
                Some(entry) => entry.count += 1,
                None => counts.push(CategoryCount {
                    name: book.category.clone(),
                    count: 1,
                }),
            }
        }

        let mut all = vec![CategoryCount {
            name: ALL_CATEGORIES.to_string(),
            count: self.books.len(),
        }];
        all.extend(counts);
        all
    }

    /// Books flagged as bestsellers.
    #[must_use]
    pub fn bestsellers(&self, sort: SortOrder) -> Vec<&Book> {
        let mut results: Vec<&Book> = self.books.iter().filter(|book| book.bestseller).collect();
        sort_books(&mut results, sort);
        results
    }

    /// Up to `limit` other books in the same category. Empty for unknown IDs.
    #[must_use]
    pub fn related(&self, id: BookId, limit: usize) -> Vec<&Book> {
        let Some(book) = self.get(id) else {
            return Vec::new();
        };
        self.books
            .iter()
            .filter(|other| other.id != id && other.category == book.category)
            .take(limit)
            .collect()
    }
}

fn sort_books(books: &mut [&Book], order: SortOrder) {
    match order {
        SortOrder::Featured => {}
        SortOrder::PriceLowToHigh => books.sort_by(|a, b| a.price.amount.cmp(&b.price.amount)),
        SortOrder::PriceHighToLow => books.sort_by(|a, b| b.price.amount.cmp(&a.price.amount)),
        SortOrder::Rating => books.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        SortOrder::Title => books.sort_by_key(|book| book.title.to_lowercase()),
        SortOrder::Reviews => books.sort_by(|a, b| b.reviews.cmp(&a.reviews)),
    }
}
