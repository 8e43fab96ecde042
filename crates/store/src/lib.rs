pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod store;

pub use common::{BookId, CartId, CartItemId, CategoryId, Money, OrderId, OrderStatus, UserId};
pub use error::{Result, StoreError};
pub use memory::{FailPoint, InMemoryStore};
pub use postgres::PostgresStore;
pub use query::BookQuery;
pub use records::{
    Book, BookRemoval, BookUpdate, Cart, CartItem, CartItemAction, CartLine, Category,
    MAX_CART_QUANTITY, NewBook, NewCategory, NewOrder, Order, OrderItem, PlannedLine,
    WishlistInsert, WishlistLine,
};
pub use store::{CartStore, CatalogStore, OrderStore, Store, WishlistStore};
