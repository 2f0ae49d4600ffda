//! Cart model and its quantity invariants.
//!
//! Every line holds between 1 and [`MAX_LINE_QUANTITY`] copies of one book.
//! All mutations either keep that invariant or leave the cart untouched and
//! return a [`QuantityError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bookstore_core::{Book, BookId, CurrencyCode, Price};

/// Maximum number of copies of a single book per cart line.
pub const MAX_LINE_QUANTITY: u32 = 10;

/// Rejected cart quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// Adding zero copies is meaningless.
    #[error("quantity must be at least 1")]
    Zero,
    /// The line would hold more than the per-book limit.
    #[error("you can add at most {max} copies of a book (requested {requested})")]
    ExceedsLimit {
        book_id: BookId,
        requested: u64,
        max: u32,
    },
}

/// One cart line: a book snapshot and how many copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub book: Book,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub const fn book_id(&self) -> BookId {
        self.book.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.book.price.times(self.quantity)
    }
}

/// Outcome of folding one cart into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartMerge {
    /// Lines that did not exist in the target cart.
    pub added: usize,
    /// Lines whose quantities were summed with an existing line.
    pub combined: usize,
    /// Books whose summed quantity was cut down to the limit.
    pub capped: Vec<BookId>,
}

impl CartMerge {
    /// Whether the merge changed nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.added == 0 && self.combined == 0
    }
}

/// A shopper's cart, ordered by when each book was first added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    #[must_use]
    pub fn get(&self, book_id: BookId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.book_id() == book_id)
    }

    #[must_use]
    pub fn contains(&self, book_id: BookId) -> bool {
        self.get(book_id).is_some()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` copies of `book`, merging into an existing line.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::Zero` for a zero quantity and
    /// `QuantityError::ExceedsLimit` if the line would exceed
    /// [`MAX_LINE_QUANTITY`]. The cart is unchanged on error.
    pub fn add(&mut self, book: &Book, quantity: u32) -> Result<u32, QuantityError> {
        if quantity == 0 {
            return Err(QuantityError::Zero);
        }

        let current = self.get(book.id).map_or(0, |item| item.quantity);
        let requested = u64::from(current) + u64::from(quantity);
        if requested > u64::from(MAX_LINE_QUANTITY) {
            return Err(QuantityError::ExceedsLimit {
                book_id: book.id,
                requested,
                max: MAX_LINE_QUANTITY,
            });
        }

        // Bounded by MAX_LINE_QUANTITY above.
        #[allow(clippy::cast_possible_truncation)]
        let requested = requested as u32;

        if let Some(item) = self.items.iter_mut().find(|item| item.book_id() == book.id) {
            item.quantity = requested;
        } else {
            self.items.push(CartItem {
                book: book.clone(),
                quantity: requested,
            });
        }
        Ok(requested)
    }

    /// Set the quantity of an existing line.
    ///
    /// A quantity of zero or less removes the line. Unknown books are ignored.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::ExceedsLimit` if `quantity` is above
    /// [`MAX_LINE_QUANTITY`]; the cart is unchanged.
    pub fn set_quantity(&mut self, book_id: BookId, quantity: i64) -> Result<(), QuantityError> {
        if quantity <= 0 {
            self.remove(book_id);
            return Ok(());
        }

        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or(QuantityError::ExceedsLimit {
                book_id,
                requested: quantity.unsigned_abs(),
                max: MAX_LINE_QUANTITY,
            })?;

        if let Some(item) = self.items.iter_mut().find(|item| item.book_id() == book_id) {
            item.quantity = quantity;
        }
        Ok(())
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove(&mut self, book_id: BookId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.book_id() != book_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        let currency = self
            .items
            .first()
            .map_or_else(CurrencyCode::default, |item| item.book.price.currency_code);
        Price::sum(self.items.iter().map(CartItem::line_total), currency)
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Fold `other` into this cart.
    ///
    /// Lines for the same book are summed and capped at
    /// [`MAX_LINE_QUANTITY`]; new books are appended in `other`'s order.
    pub fn merge(&mut self, other: Self) -> CartMerge {
        let mut outcome = CartMerge::default();

        for incoming in other.items {
            if incoming.quantity == 0 {
                continue;
            }

            if let Some(item) = self
                .items
                .iter_mut()
                .find(|item| item.book_id() == incoming.book_id())
            {
                let summed = item.quantity.saturating_add(incoming.quantity);
                if summed > MAX_LINE_QUANTITY {
                    outcome.capped.push(item.book_id());
                }
                item.quantity = summed.min(MAX_LINE_QUANTITY);
                outcome.combined += 1;
            } else {
                if incoming.quantity > MAX_LINE_QUANTITY {
                    outcome.capped.push(incoming.book_id());
                }
                self.items.push(CartItem {
                    quantity: incoming.quantity.min(MAX_LINE_QUANTITY),
                    book: incoming.book,
                });
                outcome.added += 1;
            }
        }

        outcome
    }
}
