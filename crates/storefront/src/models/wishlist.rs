//! Wishlist model: a set of books, kept in insertion order.

use serde::{Deserialize, Serialize};

use bookstore_core::{Book, BookId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist {
    books: Vec<Book>,
}

impl Wishlist {
    #[must_use]
    pub const fn new() -> Self {
        Self { books: Vec::new() }
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
    pub fn contains(&self, book_id: BookId) -> bool {
        self.books.iter().any(|book| book.id == book_id)
    }

    /// Add a book. Returns `false` if it was already present.
    pub fn add(&mut self, book: &Book) -> bool {
        if self.contains(book.id) {
            return false;
        }
        self.books.push(book.clone());
        true
    }

    /// Remove a book. Returns `false` if it was not present.
    pub fn remove(&mut self, book_id: BookId) -> bool {
        let before = self.books.len();
        self.books.retain(|book| book.id != book_id);
        self.books.len() != before
    }

    /// Add the book if absent, remove it if present. Returns whether it is
    /// now in the wishlist.
    pub fn toggle(&mut self, book: &Book) -> bool {
        if self.remove(book.id) {
            false
        } else {
            self.books.push(book.clone());
            true
        }
    }

    /// Union `other` into this wishlist. Returns how many books were new.
    pub fn merge(&mut self, other: Self) -> usize {
        other
            .books
            .iter()
            .filter(|book| self.add(book))
            .count()
    }
}
