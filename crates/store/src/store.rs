use async_trait::async_trait;
use common::{BookId, CartId, CartItemId, CategoryId, OrderId, OrderStatus, UserId};

use crate::{
    Book, BookQuery, BookRemoval, BookUpdate, Cart, CartItem, CartItemAction, CartLine, Category,
    NewBook, NewCategory, NewOrder, Order, Result, StoreError, WishlistInsert, WishlistLine,
};

/// Books and categories.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_category(&self, category: NewCategory) -> Result<Category>;

    async fn find_category(&self, category_id: CategoryId) -> Result<Option<Category>>;

    /// Returns all categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Inserts a book. Fails with `NotFound` if the category does not exist.
    async fn insert_book(&self, book: NewBook) -> Result<Book>;

    /// Replaces a book's editable fields.
    async fn update_book(&self, book_id: BookId, update: BookUpdate) -> Result<Book>;

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>>;

    /// Returns books matching the query, oldest first.
    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>>;

    /// Takes `quantity` units out of stock.
    ///
    /// Fails with `InsufficientStock` instead of going negative. Returns the
    /// remaining stock.
    async fn decrement_stock(&self, book_id: BookId, quantity: u32) -> Result<i64>;

    /// Deletes a book together with the cart items and wishlist entries that
    /// reference it, in one transaction. Order items keep their snapshot.
    async fn delete_book(&self, book_id: BookId) -> Result<BookRemoval>;
}

/// Carts and cart items.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Returns the user's cart, creating it on first use.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart>;

    async fn find_cart_item(&self, item_id: CartItemId) -> Result<Option<CartItem>>;

    /// Returns the cart's items joined with their books, ordered by item id.
    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>>;

    /// Adds `quantity` units of a book to the cart in a single upsert.
    ///
    /// An existing line is incremented; otherwise a new line is created.
    /// Fails with `NotFound` if the book does not exist.
    async fn add_cart_quantity(
        &self,
        cart_id: CartId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<CartItem>;

    /// Applies an action to a cart item. Returns `None` once the line is removed.
    async fn apply_cart_action(
        &self,
        item_id: CartItemId,
        action: CartItemAction,
    ) -> Result<Option<CartItem>>;

    async fn count_cart_items(&self, cart_id: CartId) -> Result<usize>;
}

/// Orders and order items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Turns a planned checkout into an order atomically.
    ///
    /// Inside one transaction: verifies the cart and prices still match the
    /// plan, inserts the order and its items, decrements stock for each line
    /// and empties the cart. Either every effect is visible or none is.
    async fn place_order(&self, order: NewOrder) -> Result<Order>;

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Returns the user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Returns every order, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Moves an order from `from` to `to`.
    ///
    /// Fails with `StatusMismatch` if the stored status is not `from`. With
    /// `restock`, each line's quantity goes back to its book (books deleted
    /// since checkout are skipped) in the same transaction.
    async fn transition_order_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        restock: bool,
    ) -> Result<Order>;
}

/// Per-user wishlists.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// Adds a book to the user's wishlist if it is not already there.
    async fn add_wishlist_entry(&self, user_id: UserId, book_id: BookId) -> Result<WishlistInsert>;

    /// Returns the user's wishlist joined with books, oldest first.
    async fn wishlist_lines(&self, user_id: UserId) -> Result<Vec<WishlistLine>>;
}

/// Every storage capability the bookstore needs.
pub trait Store: CatalogStore + CartStore + OrderStore + WishlistStore {}

impl<T: CatalogStore + CartStore + OrderStore + WishlistStore + ?Sized> Store for T {}

/// Validates a planned order before it touches storage.
pub fn validate_new_order(order: &NewOrder) -> std::result::Result<(), StoreError> {
    if order.lines.is_empty() {
        return Err(StoreError::InvalidRecord(
            "Cannot place an order without lines".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for line in &order.lines {
        if line.quantity == 0 {
            return Err(StoreError::InvalidRecord(format!(
                "Line for book {} has zero quantity",
                line.book_id
            )));
        }
        if !seen.insert(line.book_id) {
            return Err(StoreError::InvalidRecord(format!(
                "Book {} appears on more than one line",
                line.book_id
            )));
        }
    }

    let total = order
        .lines
        .iter()
        .map(|l| l.line_total())
        .collect::<Option<Vec<_>>>()
        .and_then(common::Money::checked_sum)
        .ok_or_else(|| StoreError::InvalidRecord("Order total overflows".to_string()))?;
    if total != order.total_amount {
        return Err(StoreError::InvalidRecord(format!(
            "Order total {} does not match line totals {}",
            order.total_amount, total
        )));
    }

    Ok(())
}
