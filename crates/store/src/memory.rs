use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    BookId, CartId, CartItemId, CategoryId, OrderId, OrderStatus, UserId, WishlistEntryId,
};
use tokio::sync::RwLock;

use crate::{
    Book, BookQuery, BookRemoval, BookUpdate, Cart, CartItem, CartItemAction, CartLine, Category,
    MAX_CART_QUANTITY, NewBook, NewCategory, NewOrder, Order, OrderItem, Result, StoreError,
    WishlistInsert, WishlistLine,
    store::{CartStore, CatalogStore, OrderStore, WishlistStore, validate_new_order},
};

/// Points inside `place_order` where a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// The order row is written, no item or stock change yet.
    AfterOrderInsert,
    /// Items are written and stock decremented, the cart is still full.
    BeforeCartClear,
}

#[derive(Debug, Clone)]
struct WishlistRow {
    id: WishlistEntryId,
    user_id: UserId,
    book_id: BookId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    category: i64,
    book: i64,
    cart: i64,
    cart_item: i64,
    order: i64,
    wishlist: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct Tables {
    seq: Sequences,
    categories: BTreeMap<CategoryId, Category>,
    books: BTreeMap<BookId, Book>,
    carts: BTreeMap<CartId, Cart>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    wishlist: BTreeMap<WishlistEntryId, WishlistRow>,
}

impl Tables {
    fn require_category(&self, category_id: CategoryId) -> Result<()> {
        if self.categories.contains_key(&category_id) {
            Ok(())
        } else {
            Err(StoreError::not_found("category", category_id))
        }
    }

    fn decrement_stock(&mut self, book_id: BookId, quantity: u32) -> Result<i64> {
        let book = self
            .books
            .get_mut(&book_id)
            .ok_or_else(|| StoreError::not_found("book", book_id))?;

        if book.stock < i64::from(quantity) {
            return Err(StoreError::InsufficientStock {
                book_id,
                requested: quantity,
                available: book.stock,
            });
        }

        book.stock -= i64::from(quantity);
        Ok(book.stock)
    }

    /// Checks that the cart and book prices still match what the order was planned from.
    fn verify_plan(&self, order: &NewOrder) -> Result<()> {
        let current = self
            .cart_items
            .values()
            .filter(|item| item.cart_id == order.cart_id)
            .count();
        if current != order.lines.len() {
            return Err(StoreError::conflict(
                "cart",
                order.cart_id,
                "cart lines changed since checkout was planned",
            ));
        }

        for line in &order.lines {
            let unchanged = self.cart_items.get(&line.item_id).is_some_and(|item| {
                item.cart_id == order.cart_id
                    && item.book_id == line.book_id
                    && item.quantity == line.quantity
            });
            if !unchanged {
                return Err(StoreError::conflict(
                    "cart item",
                    line.item_id,
                    "cart item changed since checkout was planned",
                ));
            }

            let book = self.books.get(&line.book_id).ok_or_else(|| {
                StoreError::conflict("book", line.book_id, "book removed during checkout")
            })?;
            if book.price != line.unit_price {
                return Err(StoreError::conflict(
                    "book",
                    line.book_id,
                    format!("price moved from {} to {}", line.unit_price, book.price),
                ));
            }
        }

        Ok(())
    }
}

fn newest_first<'a>(orders: impl Iterator<Item = &'a Order>) -> Vec<Order> {
    let mut orders: Vec<Order> = orders.cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

/// In-memory store implementation for testing and single-process use.
///
/// All tables sit behind one lock. Multi-step mutations run against a copy of
/// the tables that replaces the live copy only when every step succeeded.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `place_order` call fail at the given point.
    pub fn fail_next_order_at(&self, point: FailPoint) {
        *self.fail_point.lock().unwrap_or_else(|e| e.into_inner()) = Some(point);
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of order items across all orders.
    pub async fn order_item_count(&self) -> usize {
        self.tables
            .read()
            .await
            .orders
            .values()
            .map(|o| o.items.len())
            .sum()
    }

    fn trip(&self, point: FailPoint) -> Result<()> {
        let mut armed = self.fail_point.lock().unwrap_or_else(|e| e.into_inner());
        if *armed == Some(point) {
            *armed = None;
            return Err(StoreError::Unavailable(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_category(&self, category: NewCategory) -> Result<Category> {
        let mut tables = self.tables.write().await;
        let id = CategoryId::new(next(&mut tables.seq.category));
        let category = Category {
            id,
            name: category.name,
            description: category.description,
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn find_category(&self, category_id: CategoryId) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&category_id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<_> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn insert_book(&self, book: NewBook) -> Result<Book> {
        if book.stock < 0 {
            return Err(StoreError::InvalidRecord("stock must not be negative".to_string()));
        }

        let mut tables = self.tables.write().await;
        tables.require_category(book.category_id)?;

        let id = BookId::new(next(&mut tables.seq.book));
        let book = Book {
            id,
            title: book.title,
            author: book.author,
            description: book.description,
            price: book.price,
            stock: book.stock,
            category_id: book.category_id,
            owner_id: book.owner_id,
            created_at: Utc::now(),
        };
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, book_id: BookId, update: BookUpdate) -> Result<Book> {
        if update.stock < 0 {
            return Err(StoreError::InvalidRecord("stock must not be negative".to_string()));
        }

        let mut tables = self.tables.write().await;
        tables.require_category(update.category_id)?;

        let book = tables
            .books
            .get_mut(&book_id)
            .ok_or_else(|| StoreError::not_found("book", book_id))?;
        book.title = update.title;
        book.author = update.author;
        book.description = update.description;
        book.price = update.price;
        book.stock = update.stock;
        book.category_id = update.category_id;
        Ok(book.clone())
    }

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.tables.read().await.books.get(&book_id).cloned())
    }

    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>> {
        let tables = self.tables.read().await;
        let books = tables
            .books
            .values()
            .filter(|b| query.category_id.is_none_or(|c| b.category_id == c))
            .filter(|b| query.owner_id.is_none_or(|o| b.owner_id == o))
            .filter(|b| query.matches_text(&b.title, &b.author))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(books)
    }

    async fn decrement_stock(&self, book_id: BookId, quantity: u32) -> Result<i64> {
        self.tables.write().await.decrement_stock(book_id, quantity)
    }

    async fn delete_book(&self, book_id: BookId) -> Result<BookRemoval> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&book_id) {
            return Err(StoreError::not_found("book", book_id));
        }

        let before = tables.cart_items.len();
        tables.cart_items.retain(|_, item| item.book_id != book_id);
        let cart_items_removed = (before - tables.cart_items.len()) as u64;

        let before = tables.wishlist.len();
        tables.wishlist.retain(|_, row| row.book_id != book_id);
        let wishlist_entries_removed = (before - tables.wishlist.len()) as u64;

        tables.books.remove(&book_id);

        Ok(BookRemoval {
            cart_items_removed,
            wishlist_entries_removed,
        })
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables.carts.values().find(|c| c.user_id == user_id).cloned())
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut tables = self.tables.write().await;
        if let Some(cart) = tables.carts.values().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }

        let id = CartId::new(next(&mut tables.seq.cart));
        let cart = Cart {
            id,
            user_id,
            created_at: Utc::now(),
        };
        tables.carts.insert(id, cart.clone());
        Ok(cart)
    }

    async fn find_cart_item(&self, item_id: CartItemId) -> Result<Option<CartItem>> {
        Ok(self.tables.read().await.cart_items.get(&item_id).cloned())
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let tables = self.tables.read().await;
        let lines = tables
            .cart_items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .filter_map(|item| {
                tables.books.get(&item.book_id).map(|book| CartLine {
                    item_id: item.id,
                    book_id: book.id,
                    title: book.title.clone(),
                    author: book.author.clone(),
                    unit_price: book.price,
                    stock: book.stock,
                    quantity: item.quantity,
                })
            })
            .collect();
        Ok(lines)
    }

    async fn add_cart_quantity(
        &self,
        cart_id: CartId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<CartItem> {
        if quantity == 0 {
            return Err(StoreError::InvalidRecord(
                "cart quantity must be at least 1".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&book_id) {
            return Err(StoreError::not_found("book", book_id));
        }
        if !tables.carts.contains_key(&cart_id) {
            return Err(StoreError::not_found("cart", cart_id));
        }

        if let Some(item) = tables
            .cart_items
            .values_mut()
            .find(|item| item.cart_id == cart_id && item.book_id == book_id)
        {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or(StoreError::QuantityOverflow {
                    book_id,
                    max: MAX_CART_QUANTITY,
                })?;
            return Ok(item.clone());
        }

        let id = CartItemId::new(next(&mut tables.seq.cart_item));
        let item = CartItem {
            id,
            cart_id,
            book_id,
            quantity,
        };
        tables.cart_items.insert(id, item.clone());
        Ok(item)
    }

    async fn apply_cart_action(
        &self,
        item_id: CartItemId,
        action: CartItemAction,
    ) -> Result<Option<CartItem>> {
        let mut tables = self.tables.write().await;

        match action {
            CartItemAction::Remove => match tables.cart_items.remove(&item_id) {
                Some(_) => Ok(None),
                None => Err(StoreError::not_found("cart item", item_id)),
            },
            CartItemAction::Increase | CartItemAction::Decrease => {
                let item = tables
                    .cart_items
                    .get_mut(&item_id)
                    .ok_or_else(|| StoreError::not_found("cart item", item_id))?;
                if action == CartItemAction::Increase {
                    item.quantity = item.quantity.checked_add(1).ok_or(
                        StoreError::QuantityOverflow {
                            book_id: item.book_id,
                            max: MAX_CART_QUANTITY,
                        },
                    )?;
                } else {
                    item.quantity = item.quantity.saturating_sub(1).max(1);
                }
                Ok(Some(item.clone()))
            }
        }
    }

    async fn count_cart_items(&self, cart_id: CartId) -> Result<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .count())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order> {
        validate_new_order(&order)?;

        let mut tables = self.tables.write().await;
        let mut work = tables.clone();

        work.verify_plan(&order)?;

        // Step 1: order row
        let id = OrderId::new(next(&mut work.seq.order));
        let mut placed = Order {
            id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            notes: order.notes,
            created_at: Utc::now(),
            items: Vec::with_capacity(order.lines.len()),
        };
        work.orders.insert(id, placed.clone());
        self.trip(FailPoint::AfterOrderInsert)?;

        // Step 2: frozen items and stock
        for line in &order.lines {
            work.decrement_stock(line.book_id, line.quantity)?;
            placed.items.push(OrderItem {
                book_id: line.book_id,
                title: line.title.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }
        work.orders.insert(id, placed.clone());
        self.trip(FailPoint::BeforeCartClear)?;

        // Step 3: empty the cart, keep the cart itself
        work.cart_items.retain(|_, item| item.cart_id != order.cart_id);

        *tables = work;
        Ok(placed)
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&order_id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.orders.values().filter(|o| o.user_id == user_id),
        ))
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.orders.values()))
    }

    async fn transition_order_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        restock: bool,
    ) -> Result<Order> {
        let mut tables = self.tables.write().await;

        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        if order.status != from {
            return Err(StoreError::StatusMismatch {
                order_id: order_id.as_i64(),
                expected: from,
                actual: order.status,
            });
        }
        order.status = to;
        let order = order.clone();

        if restock {
            for item in &order.items {
                if let Some(book) = tables.books.get_mut(&item.book_id) {
                    book.stock = book.stock.saturating_add(i64::from(item.quantity));
                }
            }
        }

        Ok(order)
    }
}

#[async_trait]
impl WishlistStore for InMemoryStore {
    async fn add_wishlist_entry(&self, user_id: UserId, book_id: BookId) -> Result<WishlistInsert> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&book_id) {
            return Err(StoreError::not_found("book", book_id));
        }
        if tables
            .wishlist
            .values()
            .any(|row| row.user_id == user_id && row.book_id == book_id)
        {
            return Ok(WishlistInsert::AlreadyPresent);
        }

        let id = WishlistEntryId::new(next(&mut tables.seq.wishlist));
        tables.wishlist.insert(
            id,
            WishlistRow {
                id,
                user_id,
                book_id,
                created_at: Utc::now(),
            },
        );
        Ok(WishlistInsert::Added(id))
    }

    async fn wishlist_lines(&self, user_id: UserId) -> Result<Vec<WishlistLine>> {
        let tables = self.tables.read().await;
        let lines = tables
            .wishlist
            .values()
            .filter(|row| row.user_id == user_id)
            .filter_map(|row| {
                tables.books.get(&row.book_id).map(|book| WishlistLine {
                    entry_id: row.id,
                    book_id: book.id,
                    title: book.title.clone(),
                    author: book.author.clone(),
                    price: book.price,
                    added_at: row.created_at,
                })
            })
            .collect();
        Ok(lines)
    }
}
