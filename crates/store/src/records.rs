//! Row types persisted by the store.

use chrono::{DateTime, Utc};
use common::{
    BookId, CartId, CartItemId, CategoryId, Money, OrderId, OrderStatus, UserId, WishlistEntryId,
};
use serde::{Deserialize, Serialize};

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: Money,
    /// Units on hand. Never negative.
    pub stock: i64,
    pub category_id: CategoryId,
    /// User who listed the book.
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub category_id: CategoryId,
    pub owner_id: UserId,
}

/// Full replacement of a book's editable fields.
#[derive(Debug, Clone)]
pub struct BookUpdate {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub category_id: CategoryId,
}

/// Rows removed alongside a book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookRemoval {
    pub cart_items_removed: u64,
    pub wishlist_entries_removed: u64,
}

/// A user's cart. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A single (book, quantity) row of a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub book_id: BookId,
    pub quantity: u32,
}

/// Largest quantity a single cart line may hold.
pub const MAX_CART_QUANTITY: u32 = u32::MAX;

/// A cart item joined with the current state of its book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    /// Current catalog price, not a snapshot.
    pub unit_price: Money,
    pub stock: i64,
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity. `None` if the product overflows.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Mutation applied to an existing cart item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartItemAction {
    /// Add one unit.
    Increase,
    /// Remove one unit, never going below one.
    Decrease,
    /// Delete the line.
    Remove,
}

/// A placed order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Sum of the frozen line totals at creation. Never recomputed.
    pub total_amount: Money,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub payment_method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// An order line with its unit price frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub book_id: BookId,
    /// Book title at checkout time.
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// A cart line as it was read when the checkout was planned.
///
/// The store re-reads the cart and book rows inside its transaction and
/// rejects the order with a concurrency conflict if any of these values moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub item_id: CartItemId,
    pub book_id: BookId,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl PlannedLine {
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Everything needed to turn a cart into an order in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub cart_id: CartId,
    pub shipping_address: String,
    pub payment_method: String,
    pub notes: Option<String>,
    pub lines: Vec<PlannedLine>,
    pub total_amount: Money,
}

/// Outcome of adding a book to a wishlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistInsert {
    Added(WishlistEntryId),
    AlreadyPresent,
}

/// A wishlist entry joined with its book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistLine {
    pub entry_id: WishlistEntryId,
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub price: Money,
    pub added_at: DateTime<Utc>,
}
