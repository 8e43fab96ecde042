//! Integration tests for the domain services against the in-memory store.

use common::{BookId, CartId, CategoryId, Money, OrderStatus, UserId};
use domain::{
    BookInput, CartError, CartService, Caller, CatalogError, CatalogService, DomainError,
    OrderError, OrderService, WishlistService,
};
use store::{
    CartItemAction, CartStore, InMemoryStore, NewOrder, Order, OrderStore, PlannedLine,
    WishlistInsert,
};

const ALICE: Caller = Caller::Customer(UserId::new(1));
const BOB: Caller = Caller::Customer(UserId::new(2));
const ADMIN: Caller = Caller::Admin(UserId::new(100));

struct Fixture {
    store: InMemoryStore,
    catalog: CatalogService<InMemoryStore>,
    carts: CartService<InMemoryStore>,
    orders: OrderService<InMemoryStore>,
    wishlist: WishlistService<InMemoryStore>,
    category: CategoryId,
}

async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let catalog = CatalogService::new(store.clone());
    let category = catalog
        .create_category(ADMIN, "Fiction", None)
        .await
        .unwrap()
        .id;

    Fixture {
        catalog,
        carts: CartService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        wishlist: WishlistService::new(store.clone()),
        store,
        category,
    }
}

impl Fixture {
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

    async fn cart_id(&self, user: UserId) -> CartId {
        self.store.find_cart(user).await.unwrap().unwrap().id
    }

    /// Turns the user's cart into an order straight through the store.
    async fn place(&self, user: UserId) -> Order {
        let cart = self.store.get_or_create_cart(user).await.unwrap();
        let lines: Vec<PlannedLine> = self
            .store
            .cart_lines(cart.id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| PlannedLine {
                item_id: l.item_id,
                book_id: l.book_id,
                title: l.title,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect();
        let total_amount =
            Money::checked_sum(lines.iter().map(|l| l.line_total().unwrap())).unwrap();

        self.store
            .place_order(NewOrder {
                user_id: user,
                cart_id: cart.id,
                shipping_address: "1 Main St".to_string(),
                payment_method: "card".to_string(),
                notes: None,
                lines,
                total_amount,
            })
            .await
            .unwrap()
    }
}

mod cart {
    use super::*;

    #[tokio::test]
    async fn repeated_adds_accumulate_on_one_line() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;

        let first = f.carts.add_item(ALICE, book, 2).await.unwrap();
        let second = f.carts.add_item(ALICE, book, 3).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 5);
        assert_eq!(f.carts.item_count(ALICE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn adding_unknown_book_creates_nothing() {
        let f = fixture().await;

        let err = f
            .carts
            .add_item(ALICE, BookId::new(404), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { entity: "book", .. }));
        assert!(f.carts.get_totals(ALICE).await.unwrap().is_empty());
        assert!(f.store.find_cart(UserId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;

        let err = f.carts.add_item(ALICE, book, 0).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Cart(CartError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[tokio::test]
    async fn quantity_past_the_ceiling_is_rejected() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;

        f.carts.add_item(ALICE, book, 3_000_000_000).await.unwrap();
        let err = f
            .carts
            .add_item(ALICE, book, 3_000_000_000)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Cart(CartError::QuantityOverflow { .. })
        ));

        let view = f.carts.get_totals(ALICE).await.unwrap();
        assert_eq!(view.lines[0].quantity, 3_000_000_000);
    }

    #[tokio::test]
    async fn totals_out_of_money_range_are_errors() {
        let f = fixture().await;
        let book = f.book("Gold Edition", 5_000_000_000_000_000, 5000).await;

        f.carts.add_item(ALICE, book, 2000).await.unwrap();
        let err = f.carts.get_totals(ALICE).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Cart(CartError::AmountOverflow { book_id }) if book_id == book
        ));

        let cart_id = f.cart_id(UserId::new(1)).await;
        let item = f.store.cart_lines(cart_id).await.unwrap()[0].item_id;
        let update = f
            .carts
            .update_item(ALICE, item, CartItemAction::Remove)
            .await
            .unwrap();
        assert_eq!(update.quantity, 0);
        assert!(update.cart.is_empty());
    }

    #[tokio::test]
    async fn anonymous_callers_cannot_add_but_count_zero() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;

        let err = f
            .carts
            .add_item(Caller::Anonymous, book, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAuthenticated));
        assert_eq!(f.carts.item_count(Caller::Anonymous).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn decrease_floors_at_one_and_remove_deletes() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;
        let item = f.carts.add_item(ALICE, book, 1).await.unwrap();

        let update = f
            .carts
            .update_item(ALICE, item.id, CartItemAction::Decrease)
            .await
            .unwrap();
        assert_eq!(update.quantity, 1);

        let update = f
            .carts
            .update_item(ALICE, item.id, CartItemAction::Increase)
            .await
            .unwrap();
        assert_eq!(update.quantity, 2);
        assert_eq!(update.line_total, Money::from_cents(2000));
        assert_eq!(update.cart.total, Money::from_cents(2000));

        let update = f
            .carts
            .update_item(ALICE, item.id, CartItemAction::Remove)
            .await
            .unwrap();
        assert_eq!(update.quantity, 0);
        assert_eq!(update.line_total, Money::zero());
        assert!(update.cart.is_empty());
    }

    #[tokio::test]
    async fn updating_another_users_item_is_denied() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;
        let item = f.carts.add_item(ALICE, book, 1).await.unwrap();

        let err = f
            .carts
            .update_item(BOB, item.id, CartItemAction::Remove)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied));
        assert_eq!(f.carts.item_count(ALICE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn totals_use_current_prices() {
        let f = fixture().await;
        let a = f.book("A", 1000, 5).await;
        let b = f.book("B", 500, 5).await;
        f.carts.add_item(ALICE, a, 2).await.unwrap();
        f.carts.add_item(ALICE, b, 1).await.unwrap();

        assert_eq!(
            f.carts.get_totals(ALICE).await.unwrap().total,
            Money::from_cents(2500)
        );

        f.catalog
            .update_book(ADMIN, b, f.input("B", 700, 5))
            .await
            .unwrap();
        assert_eq!(
            f.carts.get_totals(ALICE).await.unwrap().total,
            Money::from_cents(2700)
        );
    }
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn only_owner_or_admin_may_edit() {
        let f = fixture().await;
        let book = f
            .catalog
            .create_book(ALICE, f.input("Mine", 1000, 1))
            .await
            .unwrap();
        assert_eq!(book.owner_id, UserId::new(1));

        let err = f
            .catalog
            .update_book(BOB, book.id, f.input("Stolen", 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied));

        let updated = f
            .catalog
            .update_book(ADMIN, book.id, f.input("Edited", 1200, 2))
            .await
            .unwrap();
        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.owner_id, UserId::new(1));
    }

    #[tokio::test]
    async fn my_books_lists_only_the_callers_listings() {
        let f = fixture().await;
        let mine = f
            .catalog
            .create_book(ALICE, f.input("Mine", 1000, 1))
            .await
            .unwrap();
        f.catalog
            .create_book(BOB, f.input("Theirs", 1000, 1))
            .await
            .unwrap();

        let books = f.catalog.list_my_books(ALICE).await.unwrap();
        assert!(books.iter().any(|b| b.id == mine.id));
        assert!(books.iter().all(|b| b.owner_id == UserId::new(1)));

        let err = f.catalog.list_my_books(Caller::Anonymous).await.unwrap_err();
        assert!(matches!(err, DomainError::NotAuthenticated));
    }

    #[tokio::test]
    async fn invalid_books_are_rejected() {
        let f = fixture().await;

        let err = f
            .catalog
            .create_book(ALICE, f.input("Free", 0, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Catalog(CatalogError::InvalidPrice { cents: 0 })
        ));

        let err = f
            .catalog
            .create_book(Caller::Anonymous, f.input("Anon", 100, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAuthenticated));
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let f = fixture().await;
        let input = BookInput {
            category_id: CategoryId::new(999),
            ..f.input("Lost", 100, 1)
        };

        let err = f.catalog.create_book(ALICE, input).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotFound {
                entity: "category",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn categories_are_admin_only() {
        let f = fixture().await;

        let err = f
            .catalog
            .create_category(ALICE, "Poetry", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied));

        let names: Vec<String> = f
            .catalog
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Fiction"]);
    }

    #[tokio::test]
    async fn delete_clears_carts_and_wishlists_but_keeps_orders() {
        let f = fixture().await;
        let book = f.book("Gone", 1500, 5).await;

        f.carts.add_item(ALICE, book, 1).await.unwrap();
        let order = f.place(UserId::new(1)).await;
        f.carts.add_item(BOB, book, 2).await.unwrap();
        f.wishlist.add(BOB, book).await.unwrap();

        let err = f.catalog.delete_book(BOB, book).await.unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied));

        let removal = f.catalog.delete_book(ADMIN, book).await.unwrap();
        assert_eq!(removal.cart_items_removed, 1);
        assert_eq!(removal.wishlist_entries_removed, 1);
        assert_eq!(f.carts.item_count(BOB).await.unwrap(), 0);
        assert!(f.wishlist.list(BOB).await.unwrap().is_empty());

        let kept = f.orders.get_order(ALICE, order.id).await.unwrap();
        assert_eq!(kept.items[0].title, "Gone");
        assert_eq!(kept.items[0].unit_price, Money::from_cents(1500));
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn orders_are_visible_to_owner_and_admin_only() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;
        f.carts.add_item(ALICE, book, 1).await.unwrap();
        let order = f.place(UserId::new(1)).await;

        assert_eq!(f.orders.get_order(ALICE, order.id).await.unwrap(), order);
        assert_eq!(f.orders.get_order(ADMIN, order.id).await.unwrap(), order);
        assert!(matches!(
            f.orders.get_order(BOB, order.id).await.unwrap_err(),
            DomainError::AccessDenied
        ));
        assert!(f.orders.list_orders(BOB).await.unwrap().is_empty());
        assert_eq!(f.orders.list_orders(ALICE).await.unwrap().len(), 1);

        assert!(matches!(
            f.orders.list_all_orders(ALICE).await.unwrap_err(),
            DomainError::AccessDenied
        ));
        assert_eq!(f.orders.list_all_orders(ADMIN).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_follows_the_guard() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;
        f.carts.add_item(ALICE, book, 1).await.unwrap();
        let order = f.place(UserId::new(1)).await;

        let err = f
            .orders
            .update_status(ADMIN, order.id, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Order(OrderError::InvalidStatusTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped,
            })
        ));

        let paid = f
            .orders
            .update_status(ADMIN, order.id, OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);

        let err = f
            .orders
            .update_status(ADMIN, order.id, OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Order(OrderError::InvalidStatusTransition { .. })
        ));

        let shipped = f
            .orders
            .update_status(ADMIN, order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(shipped.status.is_terminal());
    }

    #[tokio::test]
    async fn customers_cannot_change_status() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;
        f.carts.add_item(ALICE, book, 1).await.unwrap();
        let order = f.place(UserId::new(1)).await;

        let err = f
            .orders
            .update_status(ALICE, order.id, OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied));
    }

    #[tokio::test]
    async fn cancelling_restores_stock() {
        let f = fixture().await;
        let book = f.book("Dune", 1000, 5).await;
        f.carts.add_item(ALICE, book, 3).await.unwrap();
        let order = f.place(UserId::new(1)).await;
        assert_eq!(f.catalog.get_book(book).await.unwrap().stock, 2);

        let cancelled = f
            .orders
            .update_status(ADMIN, order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.total_amount, order.total_amount);
        assert_eq!(f.catalog.get_book(book).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let f = fixture().await;
        let err = f
            .orders
            .update_status(ADMIN, common::OrderId::new(9), OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "order", .. }));
    }
}

mod wishlist {
    use super::*;

    #[tokio::test]
    async fn adding_twice_is_idempotent() {
        let f = fixture().await;
        let book = f.book("Emma", 900, 1).await;

        assert!(matches!(
            f.wishlist.add(ALICE, book).await.unwrap(),
            WishlistInsert::Added(_)
        ));
        assert_eq!(
            f.wishlist.add(ALICE, book).await.unwrap(),
            WishlistInsert::AlreadyPresent
        );

        let lines = f.wishlist.list(ALICE).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].title, "Emma");
        assert_eq!(lines[0].price, Money::from_cents(900));
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let f = fixture().await;
        let err = f.wishlist.add(ALICE, BookId::new(404)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "book", .. }));
    }
}
