use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    BookId, CartId, CartItemId, CategoryId, Money, OrderId, OrderStatus, UserId, WishlistEntryId,
};
use sqlx::{PgConnection, PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    Book, BookQuery, BookRemoval, BookUpdate, Cart, CartItem, CartItemAction, CartLine, Category,
    MAX_CART_QUANTITY, NewBook, NewCategory, NewOrder, Order, OrderItem, Result, StoreError,
    WishlistInsert, WishlistLine,
    query::like_pattern,
    store::{CartStore, CatalogStore, OrderStore, WishlistStore, validate_new_order},
};

const BOOK_COLUMNS: &str =
    "id, title, author, description, price_cents, stock, category_id, owner_id, created_at";

const ORDER_COLUMNS: &str =
    "id, user_id, total_cents, status, shipping_address, payment_method, notes, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url` and wraps it.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    async fn attach_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>> {
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let rows = sqlx::query(
            r#"
            SELECT order_id, book_id, title, quantity, price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: i64 = row.try_get("order_id")?;
            by_order
                .entry(order_id)
                .or_default()
                .push(row_to_order_item(&row)?);
        }

        for order in &mut orders {
            order.items = by_order.remove(&order.id.as_i64()).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn fetch_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id.as_i64())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        let orders = rows
            .iter()
            .map(row_to_order)
            .collect::<Result<Vec<_>>>()?;
        self.attach_items(orders).await
    }
}

fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
}

fn quantity(row: &PgRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("{column} {value} out of range")))
}

fn row_to_category(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    })
}

fn row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        id: BookId::new(row.try_get("id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: row.try_get("stock")?,
        category_id: CategoryId::new(row.try_get("category_id")?),
        owner_id: UserId::new(row.try_get("owner_id")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_cart(row: &PgRow) -> Result<Cart> {
    Ok(Cart {
        id: CartId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::new(row.try_get("id")?),
        cart_id: CartId::new(row.try_get("cart_id")?),
        book_id: BookId::new(row.try_get("book_id")?),
        quantity: quantity(row, "quantity")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        total_amount: Money::from_cents(row.try_get("total_cents")?),
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?,
        shipping_address: row.try_get("shipping_address")?,
        payment_method: row.try_get("payment_method")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        items: Vec::new(),
    })
}

fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        book_id: BookId::new(row.try_get("book_id")?),
        title: row.try_get("title")?,
        quantity: quantity(row, "quantity")?,
        unit_price: Money::from_cents(row.try_get("price_cents")?),
    })
}

/// Guarded decrement shared by the standalone operation and checkout.
async fn decrement_stock_in(conn: &mut PgConnection, book_id: BookId, quantity: u32) -> Result<i64> {
    let remaining: Option<i64> = sqlx::query_scalar(
        "UPDATE books SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING stock",
    )
    .bind(book_id.as_i64())
    .bind(i64::from(quantity))
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(remaining) = remaining {
        return Ok(remaining);
    }

    let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM books WHERE id = $1")
        .bind(book_id.as_i64())
        .fetch_optional(&mut *conn)
        .await?;

    match available {
        Some(available) => Err(StoreError::InsufficientStock {
            book_id,
            requested: quantity,
            available,
        }),
        None => Err(StoreError::not_found("book", book_id)),
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_category(&self, category: NewCategory) -> Result<Category> {
        let row = sqlx::query(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id, name, description",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        row_to_category(&row)
    }

    async fn find_category(&self, category_id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name, description FROM categories WHERE id = $1")
            .bind(category_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_category).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, description FROM categories ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_category).collect()
    }

    async fn insert_book(&self, book: NewBook) -> Result<Book> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO books (title, author, description, price_cents, stock, category_id, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(book.price.cents())
        .bind(book.stock)
        .bind(book.category_id.as_i64())
        .bind(book.owner_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "fk_books_category") {
                return StoreError::not_found("category", book.category_id);
            }
            StoreError::Database(e)
        })?;

        row_to_book(&row)
    }

    async fn update_book(&self, book_id: BookId, update: BookUpdate) -> Result<Book> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE books
            SET title = $2, author = $3, description = $4, price_cents = $5, stock = $6, category_id = $7
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(book_id.as_i64())
        .bind(&update.title)
        .bind(&update.author)
        .bind(&update.description)
        .bind(update.price.cents())
        .bind(update.stock)
        .bind(update.category_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "fk_books_category") {
                return StoreError::not_found("category", update.category_id);
            }
            StoreError::Database(e)
        })?;

        match row {
            Some(row) => row_to_book(&row),
            None => Err(StoreError::not_found("book", book_id)),
        }
    }

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(book_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_book).transpose()
    }

    async fn list_books(&self, query: BookQuery) -> Result<Vec<Book>> {
        let mut sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.category_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category_id = ${param_count}"));
        }
        if query.owner_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND owner_id = ${param_count}"));
        }
        if query.search.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND (title ILIKE ${param_count} OR author ILIKE ${param_count})"
            ));
        }

        sql.push_str(" ORDER BY id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(category_id) = query.category_id {
            sqlx_query = sqlx_query.bind(category_id.as_i64());
        }
        if let Some(owner_id) = query.owner_id {
            sqlx_query = sqlx_query.bind(owner_id.as_i64());
        }
        if let Some(ref term) = query.search {
            sqlx_query = sqlx_query.bind(like_pattern(term));
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_book).collect()
    }

    async fn decrement_stock(&self, book_id: BookId, quantity: u32) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        decrement_stock_in(&mut conn, book_id, quantity).await
    }

    async fn delete_book(&self, book_id: BookId) -> Result<BookRemoval> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("book", book_id));
        }

        let cart_items_removed = sqlx::query("DELETE FROM cart_items WHERE book_id = $1")
            .bind(book_id.as_i64())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let wishlist_entries_removed = sqlx::query("DELETE FROM wishlist_entries WHERE book_id = $1")
            .bind(book_id.as_i64())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(BookRemoval {
            cart_items_removed,
            wishlist_entries_removed,
        })
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_cart).transpose()
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart> {
        let row = sqlx::query(
            r#"
            INSERT INTO carts (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, created_at
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_one(&self.pool)
        .await?;

        row_to_cart(&row)
    }

    async fn find_cart_item(&self, item_id: CartItemId) -> Result<Option<CartItem>> {
        let row = sqlx::query("SELECT id, cart_id, book_id, quantity FROM cart_items WHERE id = $1")
            .bind(item_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.id AS item_id, ci.book_id, b.title, b.author, b.price_cents, b.stock, ci.quantity
            FROM cart_items ci
            JOIN books b ON b.id = ci.book_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id ASC
            "#,
        )
        .bind(cart_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CartLine {
                    item_id: CartItemId::new(row.try_get("item_id")?),
                    book_id: BookId::new(row.try_get("book_id")?),
                    title: row.try_get("title")?,
                    author: row.try_get("author")?,
                    unit_price: Money::from_cents(row.try_get("price_cents")?),
                    stock: row.try_get("stock")?,
                    quantity: quantity(row, "quantity")?,
                })
            })
            .collect()
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

        // No row comes back when the guard on the update branch fails.
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, book_id, quantity) VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, book_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity + EXCLUDED.quantity <= $4
            RETURNING id, cart_id, book_id, quantity
            "#,
        )
        .bind(cart_id.as_i64())
        .bind(book_id.as_i64())
        .bind(i64::from(quantity))
        .bind(i64::from(MAX_CART_QUANTITY))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "fk_cart_items_book") {
                return StoreError::not_found("book", book_id);
            }
            if violates(&e, "fk_cart_items_cart") {
                return StoreError::not_found("cart", cart_id);
            }
            StoreError::Database(e)
        })?;

        match row {
            Some(row) => row_to_cart_item(&row),
            None => Err(StoreError::QuantityOverflow {
                book_id,
                max: MAX_CART_QUANTITY,
            }),
        }
    }

    async fn apply_cart_action(
        &self,
        item_id: CartItemId,
        action: CartItemAction,
    ) -> Result<Option<CartItem>> {
        let query = match action {
            CartItemAction::Remove => {
                let removed = sqlx::query("DELETE FROM cart_items WHERE id = $1")
                    .bind(item_id.as_i64())
                    .execute(&self.pool)
                    .await?
                    .rows_affected();
                return if removed == 0 {
                    Err(StoreError::not_found("cart item", item_id))
                } else {
                    Ok(None)
                };
            }
            CartItemAction::Increase => sqlx::query(
                "UPDATE cart_items SET quantity = quantity + 1 WHERE id = $1 AND quantity < $2 RETURNING id, cart_id, book_id, quantity",
            )
            .bind(item_id.as_i64())
            .bind(i64::from(MAX_CART_QUANTITY)),
            CartItemAction::Decrease => sqlx::query(
                "UPDATE cart_items SET quantity = GREATEST(quantity - 1, 1) WHERE id = $1 RETURNING id, cart_id, book_id, quantity",
            )
            .bind(item_id.as_i64()),
        };

        let row = query.fetch_optional(&self.pool).await?;

        if let Some(row) = row {
            return Ok(Some(row_to_cart_item(&row)?));
        }

        // Either the item is gone or it already sits at the ceiling.
        let book_id: Option<i64> = sqlx::query_scalar("SELECT book_id FROM cart_items WHERE id = $1")
            .bind(item_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match book_id {
            Some(book_id) => Err(StoreError::QuantityOverflow {
                book_id: BookId::new(book_id),
                max: MAX_CART_QUANTITY,
            }),
            None => Err(StoreError::not_found("cart item", item_id)),
        }
    }

    async fn count_cart_items(&self, cart_id: CartId) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order> {
        validate_new_order(&order)?;

        let mut tx = self.pool.begin().await?;

        // Lock the cart lines and their books, in book order so that
        // concurrent checkouts touching the same books queue up.
        let rows = sqlx::query(
            r#"
            SELECT ci.id, ci.book_id, ci.quantity, b.price_cents
            FROM cart_items ci
            JOIN books b ON b.id = ci.book_id
            WHERE ci.cart_id = $1
            ORDER BY ci.book_id
            FOR UPDATE
            "#,
        )
        .bind(order.cart_id.as_i64())
        .fetch_all(&mut *tx)
        .await?;

        if rows.len() != order.lines.len() {
            return Err(StoreError::conflict(
                "cart",
                order.cart_id,
                "cart lines changed since checkout was planned",
            ));
        }

        let mut current: HashMap<i64, (i64, i64, i64)> = HashMap::with_capacity(rows.len());
        for row in &rows {
            current.insert(
                row.try_get("id")?,
                (
                    row.try_get("book_id")?,
                    row.try_get("quantity")?,
                    row.try_get("price_cents")?,
                ),
            );
        }

        for line in &order.lines {
            let expected = (
                line.book_id.as_i64(),
                i64::from(line.quantity),
                line.unit_price.cents(),
            );
            if current.get(&line.item_id.as_i64()) != Some(&expected) {
                return Err(StoreError::conflict(
                    "cart item",
                    line.item_id,
                    "cart item or price changed since checkout was planned",
                ));
            }
        }

        let row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, total_cents, status, shipping_address, payment_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at
            "#,
        )
        .bind(order.user_id.as_i64())
        .bind(order.total_amount.cents())
        .bind(OrderStatus::Pending.as_str())
        .bind(&order.shipping_address)
        .bind(&order.payment_method)
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await?;

        let order_id = OrderId::new(row.try_get("id")?);
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            decrement_stock_in(&mut tx, line.book_id, line.quantity).await?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, book_id, title, quantity, price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id.as_i64())
            .bind(line.book_id.as_i64())
            .bind(&line.title)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;

            items.push(OrderItem {
                book_id: line.book_id,
                title: line.title.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(order.cart_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(%order_id, lines = items.len(), "order committed");

        Ok(Order {
            id: order_id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            notes: order.notes,
            created_at,
            items,
        })
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let order = row_to_order(&row)?;
                Ok(self.attach_items(vec![order]).await?.pop())
            }
            None => Ok(None),
        }
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.fetch_orders(Some(user_id)).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.fetch_orders(None).await
    }

    async fn transition_order_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        restock: bool,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        let status = status.ok_or_else(|| StoreError::not_found("order", order_id))?;
        let actual = status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        if actual != from {
            return Err(StoreError::StatusMismatch {
                order_id: order_id.as_i64(),
                expected: from,
                actual,
            });
        }

        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id.as_i64())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?;

        if restock {
            sqlx::query(
                r#"
                UPDATE books b
                SET stock = b.stock + oi.quantity
                FROM order_items oi
                WHERE oi.order_id = $1 AND b.id = oi.book_id
                "#,
            )
            .bind(order_id.as_i64())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_order(order_id)
            .await?
            .ok_or_else(|| StoreError::not_found("order", order_id))
    }
}

#[async_trait]
impl WishlistStore for PostgresStore {
    async fn add_wishlist_entry(&self, user_id: UserId, book_id: BookId) -> Result<WishlistInsert> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO wishlist_entries (user_id, book_id) VALUES ($1, $2)
            ON CONFLICT (user_id, book_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id.as_i64())
        .bind(book_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "fk_wishlist_book") {
                return StoreError::not_found("book", book_id);
            }
            StoreError::Database(e)
        })?;

        Ok(match id {
            Some(id) => WishlistInsert::Added(WishlistEntryId::new(id)),
            None => WishlistInsert::AlreadyPresent,
        })
    }

    async fn wishlist_lines(&self, user_id: UserId) -> Result<Vec<WishlistLine>> {
        let rows = sqlx::query(
            r#"
            SELECT w.id AS entry_id, w.book_id, w.created_at, b.title, b.author, b.price_cents
            FROM wishlist_entries w
            JOIN books b ON b.id = w.book_id
            WHERE w.user_id = $1
            ORDER BY w.id ASC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(WishlistLine {
                    entry_id: WishlistEntryId::new(row.try_get("entry_id")?),
                    book_id: BookId::new(row.try_get("book_id")?),
                    title: row.try_get("title")?,
                    author: row.try_get("author")?,
                    price: Money::from_cents(row.try_get("price_cents")?),
                    added_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
