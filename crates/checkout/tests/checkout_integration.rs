//! Integration tests for checkout against the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use checkout::{CheckoutCoordinator, CheckoutRequest};
use common::{
    BookId, CartId, CartItemId, CategoryId, Money, OrderId, OrderStatus, UserId,
};
use domain::{BookInput, CartService, Caller, CatalogService, DomainError, OrderError};
use store::{
    Book, BookQuery, BookRemoval, BookUpdate, Cart, CartItem, CartItemAction, CartLine,
    CartStore, CatalogStore, Category, FailPoint, InMemoryStore, NewBook, NewCategory, NewOrder,
    Order, OrderStore, StoreError, WishlistInsert, WishlistLine, WishlistStore,
};

const ALICE: Caller = Caller::Customer(UserId::new(1));
const ADMIN: Caller = Caller::Admin(UserId::new(100));

struct TestHarness {
    store: InMemoryStore,
    coordinator: CheckoutCoordinator<InMemoryStore>,
    catalog: CatalogService<InMemoryStore>,
    carts: CartService<InMemoryStore>,
    category: CategoryId,
}

impl TestHarness {
    async fn new() -> Self {
        let store = InMemoryStore::new();
        let catalog = CatalogService::new(store.clone());
        let category = catalog
            .create_category(ADMIN, "Fiction", None)
            .await
            .unwrap()
            .id;

        Self {
            coordinator: CheckoutCoordinator::new(store.clone()),
            carts: CartService::new(store.clone()),
            catalog,
            store,
            category,
        }
    }

    fn input(&self, title: &str, cents: i64, stock: i64) -> BookInput {
        BookInput {
            title: title.to_string(),
            author: "Author".to_string(),
            description: None,
            price: Money::from_cents(cents),
            stock,
            category_id: self.category,
        }
    }

    async fn book(&self, title: &str, cents: i64, stock: i64) -> BookId {
        self.catalog
            .create_book(ADMIN, self.input(title, cents, stock))
            .await
            .unwrap()
            .id
    }

    async fn stock(&self, book: BookId) -> i64 {
        self.catalog.get_book(book).await.unwrap().stock
    }
}

fn request() -> CheckoutRequest {
    CheckoutRequest::new("1 Main St", "card")
}

#[tokio::test]
async fn checkout_freezes_prices_and_empties_cart() {
    let h = TestHarness::new().await;
    let a = h.book("A", 1000, 5).await;
    let b = h.book("B", 500, 5).await;
    h.carts.add_item(ALICE, a, 2).await.unwrap();
    h.carts.add_item(ALICE, b, 1).await.unwrap();

    let order = h
        .coordinator
        .checkout(ALICE, request().with_notes("leave at door"))
        .await
        .unwrap();

    assert_eq!(order.total_amount, Money::from_cents(2500));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.notes.as_deref(), Some("leave at door"));
    assert_eq!(order.items.len(), 2);

    let prices: Vec<(BookId, Money)> = order
        .items
        .iter()
        .map(|i| (i.book_id, i.unit_price))
        .collect();
    assert!(prices.contains(&(a, Money::from_cents(1000))));
    assert!(prices.contains(&(b, Money::from_cents(500))));

    let frozen_total =
        Money::checked_sum(order.items.iter().map(|i| i.line_total().unwrap())).unwrap();
    assert_eq!(frozen_total, order.total_amount);

    assert_eq!(h.stock(a).await, 3);
    assert_eq!(h.stock(b).await, 4);
    assert_eq!(h.carts.item_count(ALICE).await.unwrap(), 0);
    assert!(h.store.find_cart(UserId::new(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn price_changes_do_not_touch_placed_orders() {
    let h = TestHarness::new().await;
    let a = h.book("A", 1000, 5).await;
    h.carts.add_item(ALICE, a, 2).await.unwrap();
    let order = h.coordinator.checkout(ALICE, request()).await.unwrap();

    h.catalog
        .update_book(ADMIN, a, h.input("A", 9900, 3))
        .await
        .unwrap();

    let stored = h.store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items[0].unit_price, Money::from_cents(1000));
    assert_eq!(stored.total_amount, Money::from_cents(2000));
}

#[tokio::test]
async fn empty_cart_places_no_order() {
    let h = TestHarness::new().await;

    let err = h.coordinator.checkout(ALICE, request()).await.unwrap_err();
    assert!(matches!(err, DomainError::EmptyCart));

    let a = h.book("A", 1000, 5).await;
    let item = h.carts.add_item(ALICE, a, 1).await.unwrap();
    h.carts
        .update_item(ALICE, item.id, CartItemAction::Remove)
        .await
        .unwrap();

    let err = h.coordinator.checkout(ALICE, request()).await.unwrap_err();
    assert!(matches!(err, DomainError::EmptyCart));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn anonymous_checkout_is_rejected() {
    let h = TestHarness::new().await;
    let err = h
        .coordinator
        .checkout(Caller::Anonymous, request())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotAuthenticated));
}

#[tokio::test]
async fn blank_shipping_address_is_invalid() {
    let h = TestHarness::new().await;
    let a = h.book("A", 1000, 5).await;
    h.carts.add_item(ALICE, a, 1).await.unwrap();

    let err = h
        .coordinator
        .checkout(ALICE, CheckoutRequest::new("   ", "card"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Order(OrderError::InvalidInput(_))));
    assert_eq!(h.carts.item_count(ALICE).await.unwrap(), 1);
}

#[tokio::test]
async fn insufficient_stock_changes_nothing() {
    let h = TestHarness::new().await;
    let plenty = h.book("Plenty", 1000, 10).await;
    let scarce = h.book("Scarce", 500, 1).await;
    h.carts.add_item(ALICE, plenty, 2).await.unwrap();
    h.carts.add_item(ALICE, scarce, 3).await.unwrap();

    let err = h.coordinator.checkout(ALICE, request()).await.unwrap_err();

    assert!(matches!(
        err,
        DomainError::Order(OrderError::InsufficientStock {
            requested: 3,
            available: 1,
            ..
        })
    ));
    assert_eq!(h.stock(plenty).await, 10);
    assert_eq!(h.stock(scarce).await, 1);
    assert_eq!(h.carts.item_count(ALICE).await.unwrap(), 2);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn failure_mid_checkout_leaves_no_trace() {
    for point in [FailPoint::AfterOrderInsert, FailPoint::BeforeCartClear] {
        let h = TestHarness::new().await;
        let a = h.book("A", 1000, 5).await;
        let b = h.book("B", 500, 5).await;
        h.carts.add_item(ALICE, a, 2).await.unwrap();
        h.carts.add_item(ALICE, b, 1).await.unwrap();
        let before = h.carts.get_totals(ALICE).await.unwrap();

        h.store.fail_next_order_at(point);
        let err = h.coordinator.checkout(ALICE, request()).await.unwrap_err();

        assert!(err.is_retryable(), "{point:?}");
        assert_eq!(h.store.order_count().await, 0, "{point:?}");
        assert_eq!(h.store.order_item_count().await, 0, "{point:?}");
        assert_eq!(h.stock(a).await, 5, "{point:?}");
        assert_eq!(h.stock(b).await, 5, "{point:?}");
        assert_eq!(h.carts.get_totals(ALICE).await.unwrap(), before, "{point:?}");

        // The injected failure is one-shot, so a retry goes through.
        let order = h.coordinator.checkout(ALICE, request()).await.unwrap();
        assert_eq!(order.total_amount, Money::from_cents(2500));
    }
}

#[tokio::test]
async fn adding_unknown_book_then_checkout_is_empty() {
    let h = TestHarness::new().await;

    let err = h
        .carts
        .add_item(ALICE, BookId::new(404), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    let err = h.coordinator.checkout(ALICE, request()).await.unwrap_err();
    assert!(matches!(err, DomainError::EmptyCart));
}

/// Store that reports a concurrency conflict on the first `conflicts`
/// `place_order` calls, then delegates.
#[derive(Clone)]
struct ConflictingStore {
    inner: InMemoryStore,
    conflicts: Arc<AtomicU32>,
}

impl ConflictingStore {
    fn new(inner: InMemoryStore, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts: Arc::new(AtomicU32::new(conflicts)),
        }
    }
}

#[async_trait]
impl CatalogStore for ConflictingStore {
    async fn insert_category(&self, category: NewCategory) -> store::Result<Category> {
        self.inner.insert_category(category).await
    }
    async fn find_category(&self, id: CategoryId) -> store::Result<Option<Category>> {
        self.inner.find_category(id).await
    }
    async fn list_categories(&self) -> store::Result<Vec<Category>> {
        self.inner.list_categories().await
    }
    async fn insert_book(&self, book: NewBook) -> store::Result<Book> {
        self.inner.insert_book(book).await
    }
    async fn update_book(&self, id: BookId, update: BookUpdate) -> store::Result<Book> {
        self.inner.update_book(id, update).await
    }
    async fn find_book(&self, id: BookId) -> store::Result<Option<Book>> {
        self.inner.find_book(id).await
    }
    async fn list_books(&self, query: BookQuery) -> store::Result<Vec<Book>> {
        self.inner.list_books(query).await
    }
    async fn decrement_stock(&self, id: BookId, quantity: u32) -> store::Result<i64> {
        self.inner.decrement_stock(id, quantity).await
    }
    async fn delete_book(&self, id: BookId) -> store::Result<BookRemoval> {
        self.inner.delete_book(id).await
    }
}

#[async_trait]
impl CartStore for ConflictingStore {
    async fn find_cart(&self, user_id: UserId) -> store::Result<Option<Cart>> {
        self.inner.find_cart(user_id).await
    }
    async fn get_or_create_cart(&self, user_id: UserId) -> store::Result<Cart> {
        self.inner.get_or_create_cart(user_id).await
    }
    async fn find_cart_item(&self, id: CartItemId) -> store::Result<Option<CartItem>> {
        self.inner.find_cart_item(id).await
    }
    async fn cart_lines(&self, cart_id: CartId) -> store::Result<Vec<CartLine>> {
        self.inner.cart_lines(cart_id).await
    }
    async fn add_cart_quantity(
        &self,
        cart_id: CartId,
        book_id: BookId,
        quantity: u32,
    ) -> store::Result<CartItem> {
        self.inner.add_cart_quantity(cart_id, book_id, quantity).await
    }
    async fn apply_cart_action(
        &self,
        id: CartItemId,
        action: CartItemAction,
    ) -> store::Result<Option<CartItem>> {
        self.inner.apply_cart_action(id, action).await
    }
    async fn count_cart_items(&self, cart_id: CartId) -> store::Result<usize> {
        self.inner.count_cart_items(cart_id).await
    }
}

#[async_trait]
impl OrderStore for ConflictingStore {
    async fn place_order(&self, order: NewOrder) -> store::Result<Order> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::ConcurrencyConflict {
                entity: "cart",
                id: order.cart_id.as_i64(),
                reason: "simulated".to_string(),
            });
        }
        self.inner.place_order(order).await
    }
    async fn find_order(&self, id: OrderId) -> store::Result<Option<Order>> {
        self.inner.find_order(id).await
    }
    async fn list_orders_for_user(&self, user_id: UserId) -> store::Result<Vec<Order>> {
        self.inner.list_orders_for_user(user_id).await
    }
    async fn list_orders(&self) -> store::Result<Vec<Order>> {
        self.inner.list_orders().await
    }
    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        restock: bool,
    ) -> store::Result<Order> {
        self.inner.transition_order_status(id, from, to, restock).await
    }
}

#[async_trait]
impl WishlistStore for ConflictingStore {
    async fn add_wishlist_entry(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> store::Result<WishlistInsert> {
        self.inner.add_wishlist_entry(user_id, book_id).await
    }
    async fn wishlist_lines(&self, user_id: UserId) -> store::Result<Vec<WishlistLine>> {
        self.inner.wishlist_lines(user_id).await
    }
}

async fn conflicting_setup(conflicts: u32, max_retries: u32) -> (ConflictingStore, CheckoutCoordinator<ConflictingStore>) {
    let h = TestHarness::new().await;
    let a = h.book("A", 1000, 5).await;
    h.carts.add_item(ALICE, a, 1).await.unwrap();

    let store = ConflictingStore::new(h.store.clone(), conflicts);
    let coordinator = CheckoutCoordinator::new(store.clone()).with_max_retries(max_retries);
    (store, coordinator)
}

#[tokio::test]
async fn conflicts_are_retried() {
    let (store, coordinator) = conflicting_setup(2, 3).await;

    let order = coordinator.checkout(ALICE, request()).await.unwrap();

    assert_eq!(order.total_amount, Money::from_cents(1000));
    assert_eq!(store.inner.order_count().await, 1);
}

#[tokio::test]
async fn exhausted_retries_surface_transient_storage() {
    let (store, coordinator) = conflicting_setup(5, 2).await;

    let err = coordinator.checkout(ALICE, request()).await.unwrap_err();

    assert!(matches!(err, DomainError::TransientStorage(_)));
    assert!(err.is_retryable());
    assert_eq!(store.inner.order_count().await, 0);
    assert_eq!(store.conflicts.load(Ordering::SeqCst), 2);
}
