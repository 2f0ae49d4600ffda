//! Cart and wishlist service.
//!
//! Operates on the buckets of whoever is currently shopping: the signed-in
//! user, or the guest. Every mutation loads the bucket, applies the change
//! and writes the whole bucket back before returning.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use bookstore_core::{Book, BookId, Price, UserId};

use super::auth::SessionHandle;
use crate::db::{BucketRepository, KeyValueStore, RepositoryError};
use crate::models::{Cart, CartMerge, Owner, QuantityError, Wishlist};

/// Errors that can occur during cart and wishlist operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The line would exceed the per-book limit.
    #[error("you can add at most {max} copies of this book")]
    QuantityLimit {
        book_id: BookId,
        requested: u64,
        max: u32,
    },

    /// Quantity must be positive.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The book is not in the wishlist.
    #[error("book {0} is not in the wishlist")]
    NotInWishlist(BookId),

    /// Repository/storage error.
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<QuantityError> for CartError {
    fn from(err: QuantityError) -> Self {
        match err {
            QuantityError::Zero => Self::InvalidQuantity,
            QuantityError::ExceedsLimit {
                book_id,
                requested,
                max,
            } => Self::QuantityLimit {
                book_id,
                requested,
                max,
            },
        }
    }
}

/// What moved from the guest buckets into a user's at sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub cart: CartMerge,
    /// Wishlist books that were not already in the user's wishlist.
    pub wishlist_added: usize,
}

impl MergeSummary {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cart.is_empty() && self.wishlist_added == 0
    }
}

/// Cart and wishlist operations for the current shopper.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn KeyValueStore>,
    session: SessionHandle,
}

impl CartService {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, session: SessionHandle) -> Self {
        Self { store, session }
    }

    fn buckets(&self) -> BucketRepository<'_> {
        BucketRepository::new(self.store.as_ref())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The current shopper's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage cannot be read.
    pub fn cart(&self) -> Result<Cart, CartError> {
        Ok(self.buckets().load(self.session.owner())?)
    }

    /// Add `quantity` copies of `book`. Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for zero and
    /// `CartError::QuantityLimit` if the line would exceed the limit; the
    /// cart is not changed in either case.
    #[instrument(skip(self, book), fields(book_id = %book.id))]
    pub fn add_to_cart(&self, book: &Book, quantity: u32) -> Result<u32, CartError> {
        let owner = self.session.owner();
        let mut cart: Cart = self.buckets().load(owner)?;

        let new_quantity = cart.add(book, quantity).inspect_err(|e| {
            warn!(error = %e, "Rejected add to cart");
        })?;

        self.buckets().save(owner, &cart)?;
        Ok(new_quantity)
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityLimit` if `quantity` exceeds the limit.
    #[instrument(skip(self))]
    pub fn update_quantity(&self, book_id: BookId, quantity: i64) -> Result<(), CartError> {
        let owner = self.session.owner();
        let mut cart: Cart = self.buckets().load(owner)?;
        let before = cart.clone();

        cart.set_quantity(book_id, quantity).inspect_err(|e| {
            warn!(error = %e, "Rejected quantity update");
        })?;

        if cart != before {
            self.buckets().save(owner, &cart)?;
        }
        Ok(())
    }

    /// Remove a line. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    pub fn remove_from_cart(&self, book_id: BookId) -> Result<bool, CartError> {
        let owner = self.session.owner();
        let mut cart: Cart = self.buckets().load(owner)?;
        let removed = cart.remove(book_id);
        if removed {
            self.buckets().save(owner, &cart)?;
        }
        Ok(removed)
    }

    /// Empty the current shopper's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    pub fn clear_cart(&self) -> Result<(), CartError> {
        self.buckets().clear::<Cart>(self.session.owner())?;
        Ok(())
    }

    /// Sum of price times quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage cannot be read.
    pub fn cart_total(&self) -> Result<Price, CartError> {
        Ok(self.cart()?.total())
    }

    /// Number of copies in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage cannot be read.
    pub fn cart_count(&self) -> Result<u32, CartError> {
        Ok(self.cart()?.count())
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// The current shopper's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage cannot be read.
    pub fn wishlist(&self) -> Result<Wishlist, CartError> {
        Ok(self.buckets().load(self.session.owner())?)
    }

    /// Add a book. Returns `false` if it was already wishlisted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    pub fn add_to_wishlist(&self, book: &Book) -> Result<bool, CartError> {
        self.update_wishlist(|wishlist| wishlist.add(book))
    }

    /// Remove a book. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    pub fn remove_from_wishlist(&self, book_id: BookId) -> Result<bool, CartError> {
        self.update_wishlist(|wishlist| wishlist.remove(book_id))
    }

    /// Whether the book is wishlisted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage cannot be read.
    pub fn is_in_wishlist(&self, book_id: BookId) -> Result<bool, CartError> {
        Ok(self.wishlist()?.contains(book_id))
    }

    /// Add if absent, remove if present. Returns whether it is now wishlisted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    pub fn toggle_wishlist(&self, book: &Book) -> Result<bool, CartError> {
        let owner = self.session.owner();
        let mut wishlist: Wishlist = self.buckets().load(owner)?;
        let present = wishlist.toggle(book);
        self.buckets().save(owner, &wishlist)?;
        Ok(present)
    }

    /// Move a wishlisted book into the cart with quantity 1.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInWishlist` if the book is not wishlisted and
    /// `CartError::QuantityLimit` if the cart line is already full. Neither
    /// bucket changes on error.
    #[instrument(skip(self))]
    pub fn move_to_cart(&self, book_id: BookId) -> Result<(), CartError> {
        let owner = self.session.owner();
        let mut wishlist: Wishlist = self.buckets().load(owner)?;
        let book = wishlist
            .books()
            .iter()
            .find(|book| book.id == book_id)
            .cloned()
            .ok_or(CartError::NotInWishlist(book_id))?;

        let mut cart: Cart = self.buckets().load(owner)?;
        cart.add(&book, 1)?;
        wishlist.remove(book_id);

        self.buckets().save(owner, &cart)?;
        self.buckets().save(owner, &wishlist)?;
        Ok(())
    }

    fn update_wishlist<F>(&self, change: F) -> Result<bool, CartError>
    where
        F: FnOnce(&mut Wishlist) -> bool,
    {
        let owner = self.session.owner();
        let mut wishlist: Wishlist = self.buckets().load(owner)?;
        let changed = change(&mut wishlist);
        if changed {
            self.buckets().save(owner, &wishlist)?;
        }
        Ok(changed)
    }

    // =========================================================================
    // Guest merge
    // =========================================================================

    /// Fold the guest cart and wishlist into `user_id`'s and empty the guest
    /// buckets.
    ///
    /// The user's buckets are written before the guest's are cleared, so a
    /// failure part-way leaves the guest state in place.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on storage failure.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn merge_guest_into(&self, user_id: UserId) -> Result<MergeSummary, CartError> {
        let buckets = self.buckets();
        let user = Owner::User(user_id);

        let guest_cart: Cart = buckets.load(Owner::Guest)?;
        let guest_wishlist: Wishlist = buckets.load(Owner::Guest)?;
        if guest_cart.is_empty() && guest_wishlist.is_empty() {
            return Ok(MergeSummary::default());
        }

        let mut cart: Cart = buckets.load(user)?;
        let mut wishlist: Wishlist = buckets.load(user)?;

        let summary = MergeSummary {
            cart: cart.merge(guest_cart),
            wishlist_added: wishlist.merge(guest_wishlist),
        };

        buckets.save(user, &cart)?;
        buckets.save(user, &wishlist)?;
        buckets.clear::<Cart>(Owner::Guest)?;
        buckets.clear::<Wishlist>(Owner::Guest)?;

        if !summary.cart.capped.is_empty() {
            warn!(capped = ?summary.cart.capped, "Merged cart lines capped at limit");
        }
        info!(
            added = summary.cart.added,
            combined = summary.cart.combined,
            wishlist_added = summary.wishlist_added,
            "Merged guest state"
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::MemoryStore;
    use crate::models::User;
    use bookstore_core::{CurrencyCode, Email};
    use chrono::{Duration, Utc};

    fn book(id: i32, price: i64) -> Book {
        Book::new(
            BookId::new(id),
            format!("Book {id}"),
            "Author",
            "Fiction",
            Price::whole(price, CurrencyCode::INR),
        )
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            name: "Tara".to_string(),
            email: Email::parse("tara@example.com").unwrap(),
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn service() -> (CartService, SessionHandle, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let session = SessionHandle::new(
            store.clone(),
            Arc::new(ManualClock::default()),
            Duration::hours(24),
        );
        (CartService::new(store.clone(), session.clone()), session, store)
    }

    #[test]
    fn test_cart_totals() {
        let (cart, _, _) = service();
        cart.add_to_cart(&book(1, 200), 2).unwrap();
        cart.add_to_cart(&book(2, 300), 1).unwrap();

        assert_eq!(cart.cart_total().unwrap(), Price::whole(700, CurrencyCode::INR));
        assert_eq!(cart.cart_count().unwrap(), 3);
    }

    #[test]
    fn test_add_over_limit_is_rejected_without_change() {
        let (cart, _, _) = service();
        cart.add_to_cart(&book(5, 100), 8).unwrap();

        let err = cart.add_to_cart(&book(5, 100), 5).unwrap_err();
        assert!(matches!(
            err,
            CartError::QuantityLimit { requested: 13, max: 10, .. }
        ));
        assert_eq!(cart.cart().unwrap().get(BookId::new(5)).unwrap().quantity, 8);
    }

    #[test]
    fn test_add_zero_is_invalid() {
        let (cart, _, _) = service();
        assert!(matches!(
            cart.add_to_cart(&book(1, 100), 0),
            Err(CartError::InvalidQuantity)
        ));
    }

    #[test]
    fn test_update_quantity_paths() {
        let (cart, _, _) = service();
        cart.add_to_cart(&book(1, 100), 1).unwrap();

        cart.update_quantity(BookId::new(1), 4).unwrap();
        assert_eq!(cart.cart_count().unwrap(), 4);

        assert!(cart.update_quantity(BookId::new(1), 11).is_err());
        assert_eq!(cart.cart_count().unwrap(), 4);

        cart.update_quantity(BookId::new(42), 3).unwrap();
        assert_eq!(cart.cart().unwrap().len(), 1);

        cart.update_quantity(BookId::new(1), 0).unwrap();
        assert!(cart.cart().unwrap().is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let (cart, _, _) = service();
        cart.add_to_cart(&book(1, 100), 1).unwrap();
        cart.add_to_cart(&book(2, 100), 1).unwrap();

        assert!(!cart.remove_from_cart(BookId::new(3)).unwrap());
        assert!(cart.remove_from_cart(BookId::new(1)).unwrap());
        cart.clear_cart().unwrap();
        assert!(cart.cart().unwrap().is_empty());
    }

    #[test]
    fn test_wishlist_set_semantics() {
        let (cart, _, _) = service();
        assert!(cart.add_to_wishlist(&book(1, 100)).unwrap());
        assert!(!cart.add_to_wishlist(&book(1, 100)).unwrap());
        assert!(cart.is_in_wishlist(BookId::new(1)).unwrap());
        assert_eq!(cart.wishlist().unwrap().len(), 1);

        assert!(!cart.toggle_wishlist(&book(1, 100)).unwrap());
        assert!(cart.toggle_wishlist(&book(1, 100)).unwrap());
        assert!(cart.remove_from_wishlist(BookId::new(1)).unwrap());
        assert!(!cart.is_in_wishlist(BookId::new(1)).unwrap());
    }

    #[test]
    fn test_move_to_cart() {
        let (cart, _, _) = service();
        cart.add_to_wishlist(&book(7, 250)).unwrap();

        cart.move_to_cart(BookId::new(7)).unwrap();

        assert!(!cart.is_in_wishlist(BookId::new(7)).unwrap());
        assert_eq!(cart.cart().unwrap().get(BookId::new(7)).unwrap().quantity, 1);
        assert!(matches!(
            cart.move_to_cart(BookId::new(7)),
            Err(CartError::NotInWishlist(_))
        ));
    }

    #[test]
    fn test_move_to_full_line_keeps_wishlist() {
        let (cart, _, _) = service();
        cart.add_to_cart(&book(7, 250), 10).unwrap();
        cart.add_to_wishlist(&book(7, 250)).unwrap();

        assert!(cart.move_to_cart(BookId::new(7)).is_err());
        assert!(cart.is_in_wishlist(BookId::new(7)).unwrap());
    }

    #[test]
    fn test_buckets_follow_session_owner() {
        let (cart, session, _) = service();
        cart.add_to_cart(&book(1, 100), 2).unwrap();

        session.begin(user()).unwrap();
        assert!(cart.cart().unwrap().is_empty());

        session.end().unwrap();
        assert_eq!(cart.cart_count().unwrap(), 2);
    }

    #[test]
    fn test_merge_guest_into_user() {
        let (cart, session, _) = service();
        let tara = user();

        session.begin(tara.clone()).unwrap();
        cart.add_to_cart(&book(1, 100), 7).unwrap();
        cart.add_to_wishlist(&book(9, 100)).unwrap();
        session.end().unwrap();

        cart.add_to_cart(&book(1, 100), 6).unwrap();
        cart.add_to_cart(&book(2, 100), 1).unwrap();
        cart.add_to_wishlist(&book(9, 100)).unwrap();
        cart.add_to_wishlist(&book(8, 100)).unwrap();

        let summary = cart.merge_guest_into(tara.id).unwrap();
        assert_eq!(summary.cart.added, 1);
        assert_eq!(summary.cart.combined, 1);
        assert_eq!(summary.cart.capped, vec![BookId::new(1)]);
        assert_eq!(summary.wishlist_added, 1);

        // Guest buckets are emptied.
        assert!(cart.cart().unwrap().is_empty());
        assert!(cart.wishlist().unwrap().is_empty());

        session.begin(tara.clone()).unwrap();
        let merged = cart.cart().unwrap();
        assert_eq!(merged.get(BookId::new(1)).unwrap().quantity, 10);
        assert_eq!(merged.get(BookId::new(2)).unwrap().quantity, 1);
        assert_eq!(cart.wishlist().unwrap().len(), 2);

        // A second merge finds nothing to move.
        assert!(cart.merge_guest_into(tara.id).unwrap().is_empty());
    }

    #[test]
    fn test_merge_failure_keeps_guest_state() {
        let (cart, _, store) = service();
        cart.add_to_cart(&book(1, 100), 2).unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            cart.merge_guest_into(UserId::generate()),
            Err(CartError::Repository(_))
        ));
        store.set_fail_writes(false);

        assert_eq!(cart.cart_count().unwrap(), 2);
    }
}
