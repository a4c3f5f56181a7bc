use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_types::domain::address::Address;
use shop_types::domain::item::{Item, ItemKind};
use shop_types::domain::member::Member;
use shop_types::domain::order::{Delivery, DeliveryStatus, Order, OrderItem, OrderStatus};
use shop_types::ports::item_repository::ItemRepository;
use shop_types::ports::member_repository::MemberRepository;
use shop_types::ports::order_repository::{
    OrderLine, OrderLineView, OrderRecord, OrderRepository, OrderSearch, OrderSummary, OrderView,
    Page,
};
use shop_types::ports::RepoError;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

const MAX_SEARCH_ROWS: i64 = 1000;

pub struct SqliteRepo {
    pool: SqlitePool,
    batch_fetch_size: usize,
}

fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::DbError(e.to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(db_err)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(db_err)?
        .with_timezone(&Utc))
}

fn parse_count(n: i64) -> Result<u32, RepoError> {
    u32::try_from(n).map_err(db_err)
}

fn order_status(s: &str) -> Result<OrderStatus, RepoError> {
    match s {
        "Ordered" => Ok(OrderStatus::Ordered),
        "Cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(RepoError::DbError(format!("unknown order status: {other}"))),
    }
}

fn delivery_status(s: &str) -> Result<DeliveryStatus, RepoError> {
    match s {
        "Ready" => Ok(DeliveryStatus::Ready),
        "Completed" => Ok(DeliveryStatus::Completed),
        other => Err(RepoError::DbError(format!(
            "unknown delivery status: {other}"
        ))),
    }
}

/// Trimmed, non-empty member-name filter, mirroring the status filter's
/// optionality.
fn name_filter(search: &OrderSearch) -> Option<&str> {
    search
        .member_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Appends the WHERE clause assembled from whichever filters are present.
fn push_filters(sql: &mut String, search: &OrderSearch) {
    let mut conds: Vec<&str> = Vec::new();
    if search.status.is_some() {
        conds.push("o.status = ?");
    }
    if name_filter(search).is_some() {
        conds.push("m.name LIKE ?");
    }
    if !conds.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conds.join(" AND "));
    }
}

#[derive(FromRow)]
struct DbMember {
    id: String,
    name: String,
    city: String,
    street: String,
    zipcode: String,
}

impl DbMember {
    fn into_member(self) -> Result<Member, RepoError> {
        Ok(Member {
            id: parse_uuid(&self.id)?,
            name: self.name,
            address: Address {
                city: self.city,
                street: self.street,
                zipcode: self.zipcode,
            },
        })
    }
}

#[derive(FromRow)]
struct DbItem {
    id: String,
    name: String,
    price_cents: i64,
    stock_quantity: i64,
    kind: String,
    author: Option<String>,
    isbn: Option<String>,
    artist: Option<String>,
    label: Option<String>,
    director: Option<String>,
    actor: Option<String>,
}

impl DbItem {
    fn into_item(self) -> Result<Item, RepoError> {
        let kind = match self.kind.as_str() {
            "Book" => ItemKind::Book {
                author: self.author.unwrap_or_default(),
                isbn: self.isbn.unwrap_or_default(),
            },
            "Album" => ItemKind::Album {
                artist: self.artist.unwrap_or_default(),
                label: self.label.unwrap_or_default(),
            },
            "Movie" => ItemKind::Movie {
                director: self.director.unwrap_or_default(),
                actor: self.actor.unwrap_or_default(),
            },
            other => return Err(RepoError::DbError(format!("unknown item kind: {other}"))),
        };
        Ok(Item {
            id: parse_uuid(&self.id)?,
            name: self.name,
            price_cents: self.price_cents,
            stock_quantity: parse_count(self.stock_quantity)?,
            kind,
        })
    }
}

fn kind_columns(
    kind: &ItemKind,
) -> (
    &'static str,
    Option<&str>,
    Option<&str>,
    Option<&str>,
    Option<&str>,
    Option<&str>,
    Option<&str>,
) {
    match kind {
        ItemKind::Book { author, isbn } => ("Book", Some(author), Some(isbn), None, None, None, None),
        ItemKind::Album { artist, label } => {
            ("Album", None, None, Some(artist), Some(label), None, None)
        }
        ItemKind::Movie { director, actor } => {
            ("Movie", None, None, None, None, Some(director), Some(actor))
        }
    }
}

#[derive(FromRow)]
struct DbOrderRow {
    id: String,
    member_id: String,
    status: String,
    ordered_at: String,
}

impl DbOrderRow {
    fn into_record(self) -> Result<OrderRecord, RepoError> {
        Ok(OrderRecord {
            id: parse_uuid(&self.id)?,
            member_id: parse_uuid(&self.member_id)?,
            status: order_status(&self.status)?,
            ordered_at: parse_ts(&self.ordered_at)?,
        })
    }
}

#[derive(FromRow)]
struct DbDeliveryRow {
    city: String,
    street: String,
    zipcode: String,
    status: String,
}

#[derive(FromRow)]
struct DbOrderItemRow {
    item_id: String,
    order_price_cents: i64,
    count: i64,
}

#[derive(FromRow)]
struct DbSummaryRow {
    order_id: String,
    member_name: String,
    ordered_at: String,
    status: String,
    city: String,
    street: String,
    zipcode: String,
}

#[derive(FromRow)]
struct DbJoinedRow {
    order_id: String,
    member_name: String,
    ordered_at: String,
    status: String,
    city: String,
    street: String,
    zipcode: String,
    delivery_status: String,
    item_name: String,
    order_price_cents: i64,
    count: i64,
}

#[derive(FromRow)]
struct DbPageRow {
    order_id: String,
    member_name: String,
    ordered_at: String,
    status: String,
    city: String,
    street: String,
    zipcode: String,
    delivery_status: String,
}

#[derive(FromRow)]
struct DbLineRow {
    order_id: String,
    item_name: String,
    order_price_cents: i64,
    count: i64,
}

async fn fetch_member(
    tx: &mut Transaction<'_, Sqlite>,
    id: Uuid,
) -> Result<Option<Member>, RepoError> {
    let row: Option<DbMember> =
        sqlx::query_as("SELECT id, name, city, street, zipcode FROM members WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?;
    row.map(DbMember::into_member).transpose()
}

async fn fetch_item(tx: &mut Transaction<'_, Sqlite>, id: Uuid) -> Result<Option<Item>, RepoError> {
    let row: Option<DbItem> = sqlx::query_as(
        "SELECT id, name, price_cents, stock_quantity, kind, author, isbn, artist, label, director, actor
         FROM items WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?;
    row.map(DbItem::into_item).transpose()
}

async fn fetch_order(
    tx: &mut Transaction<'_, Sqlite>,
    id: Uuid,
) -> Result<Option<Order>, RepoError> {
    let row: Option<DbOrderRow> =
        sqlx::query_as("SELECT id, member_id, status, ordered_at FROM orders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?;
    let Some(row) = row else {
        return Ok(None);
    };

    let delivery: DbDeliveryRow =
        sqlx::query_as("SELECT city, street, zipcode, status FROM deliveries WHERE order_id = ?")
            .bind(&row.id)
            .fetch_one(&mut **tx)
            .await
            .map_err(db_err)?;

    let item_rows: Vec<DbOrderItemRow> = sqlx::query_as(
        "SELECT item_id, order_price_cents, count FROM order_items WHERE order_id = ? ORDER BY id",
    )
    .bind(&row.id)
    .fetch_all(&mut **tx)
    .await
    .map_err(db_err)?;

    let mut items = Vec::with_capacity(item_rows.len());
    for it in item_rows {
        items.push(OrderItem {
            item_id: parse_uuid(&it.item_id)?,
            order_price_cents: it.order_price_cents,
            count: parse_count(it.count)?,
        });
    }

    Ok(Some(Order {
        id: parse_uuid(&row.id)?,
        member_id: parse_uuid(&row.member_id)?,
        items,
        delivery: Delivery {
            address: Address {
                city: delivery.city,
                street: delivery.street,
                zipcode: delivery.zipcode,
            },
            status: delivery_status(&delivery.status)?,
        },
        status: order_status(&row.status)?,
        ordered_at: parse_ts(&row.ordered_at)?,
    }))
}

impl SqliteRepo {
    pub async fn new(database_url: &str, batch_fetch_size: usize) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        // Run migration from migration file, one statement at a time.
        let ddl = include_str!("../migrations/0001_create_shop.sql");
        for stmt in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&pool).await?;
        }

        Ok(Self {
            pool,
            batch_fetch_size: batch_fetch_size.max(1),
        })
    }
}

#[async_trait]
impl MemberRepository for SqliteRepo {
    async fn create_member(&self, member: Member) -> Result<Member, RepoError> {
        sqlx::query("INSERT INTO members (id, name, city, street, zipcode) VALUES (?, ?, ?, ?, ?)")
            .bind(member.id.to_string())
            .bind(&member.name)
            .bind(&member.address.city)
            .bind(&member.address.street)
            .bind(&member.address.zipcode)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepoError::DuplicateName(member.name.clone())
                }
                other => db_err(other),
            })?;
        Ok(member)
    }

    async fn get_member(&self, id: Uuid) -> Result<Option<Member>, RepoError> {
        let row: Option<DbMember> =
            sqlx::query_as("SELECT id, name, city, street, zipcode FROM members WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbMember::into_member).transpose()
    }

    async fn list_members(&self) -> Result<Vec<Member>, RepoError> {
        let rows: Vec<DbMember> =
            sqlx::query_as("SELECT id, name, city, street, zipcode FROM members ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.into_iter().map(DbMember::into_member).collect()
    }

    async fn find_member_by_name(&self, name: &str) -> Result<Option<Member>, RepoError> {
        let row: Option<DbMember> =
            sqlx::query_as("SELECT id, name, city, street, zipcode FROM members WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(DbMember::into_member).transpose()
    }

    async fn rename_member(&self, id: Uuid, name: String) -> Result<Option<Member>, RepoError> {
        let updated = sqlx::query("UPDATE members SET name = ? WHERE id = ?")
            .bind(&name)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepoError::DuplicateName(name.clone())
                }
                other => db_err(other),
            })?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_member(id).await
    }
}

#[async_trait]
impl ItemRepository for SqliteRepo {
    async fn create_item(&self, item: Item) -> Result<Item, RepoError> {
        let (kind, author, isbn, artist, label, director, actor) = kind_columns(&item.kind);
        sqlx::query(
            "INSERT INTO items (id, name, price_cents, stock_quantity, kind, author, isbn, artist, label, director, actor)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(item.price_cents)
        .bind(item.stock_quantity as i64)
        .bind(kind)
        .bind(author)
        .bind(isbn)
        .bind(artist)
        .bind(label)
        .bind(director)
        .bind(actor)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, RepoError> {
        let row: Option<DbItem> = sqlx::query_as(
            "SELECT id, name, price_cents, stock_quantity, kind, author, isbn, artist, label, director, actor
             FROM items WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(DbItem::into_item).transpose()
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
        let rows: Vec<DbItem> = sqlx::query_as(
            "SELECT id, name, price_cents, stock_quantity, kind, author, isbn, artist, label, director, actor
             FROM items ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(DbItem::into_item).collect()
    }

    async fn update_item(
        &self,
        id: Uuid,
        name: String,
        price_cents: i64,
        stock_quantity: u32,
    ) -> Result<Option<Item>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let Some(mut item) = fetch_item(&mut tx, id).await? else {
            return Ok(None);
        };
        item.name = name;
        item.price_cents = price_cents;
        item.stock_quantity = stock_quantity;
        sqlx::query("UPDATE items SET name = ?, price_cents = ?, stock_quantity = ? WHERE id = ?")
            .bind(&item.name)
            .bind(item.price_cents)
            .bind(item.stock_quantity as i64)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(Some(item))
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn place(&self, member_id: Uuid, lines: &[OrderLine]) -> Result<Order, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let member = fetch_member(&mut tx, member_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("member {member_id}")))?;

        // Guarded decrement per line; any failure rolls the whole
        // transaction back, leaving stock untouched.
        let mut order_items = Vec::with_capacity(lines.len());
        for line in lines {
            let mut item = fetch_item(&mut tx, line.item_id)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("item {}", line.item_id)))?;
            item.remove_stock(line.count)
                .map_err(|e| RepoError::InsufficientStock {
                    item_id: line.item_id,
                    requested: e.requested,
                    available: e.available,
                })?;
            sqlx::query("UPDATE items SET stock_quantity = ? WHERE id = ?")
                .bind(item.stock_quantity as i64)
                .bind(item.id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            order_items.push(OrderItem {
                item_id: item.id,
                order_price_cents: item.price_cents,
                count: line.count,
            });
        }

        let order = Order::new(member_id, order_items, member.address)
            .map_err(|e| RepoError::DbError(e.to_string()))?;

        sqlx::query("INSERT INTO orders (id, member_id, status, ordered_at) VALUES (?, ?, ?, ?)")
            .bind(order.id.to_string())
            .bind(order.member_id.to_string())
            .bind(format!("{:?}", order.status))
            .bind(order.ordered_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "INSERT INTO deliveries (order_id, city, street, zipcode, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(order.id.to_string())
        .bind(&order.delivery.address.city)
        .bind(&order.delivery.address.street)
        .bind(&order.delivery.address.zipcode)
        .bind(format!("{:?}", order.delivery.status))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for it in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, item_id, order_price_cents, count)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(order.id.to_string())
            .bind(it.item_id.to_string())
            .bind(it.order_price_cents)
            .bind(it.count as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }

    async fn cancel(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let Some(mut order) = fetch_order(&mut tx, id).await? else {
            return Ok(None);
        };
        if order.status == OrderStatus::Cancelled {
            return Ok(Some(order));
        }
        order.cancel().map_err(|_| RepoError::AlreadyDelivered(id))?;

        for it in &order.items {
            sqlx::query("UPDATE items SET stock_quantity = stock_quantity + ? WHERE id = ?")
                .bind(it.count as i64)
                .bind(it.item_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(format!("{:?}", order.status))
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(Some(order))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let order = fetch_order(&mut tx, id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }

    async fn view(&self, id: Uuid) -> Result<Option<OrderView>, RepoError> {
        let row: Option<DbOrderRow> =
            sqlx::query_as("SELECT id, member_id, status, ordered_at FROM orders WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        match row {
            Some(row) => Ok(Some(self.resolve(&row.into_record()?).await?)),
            None => Ok(None),
        }
    }

    async fn search(&self, search: &OrderSearch) -> Result<Vec<OrderRecord>, RepoError> {
        let mut sql = String::from(
            "SELECT o.id, o.member_id, o.status, o.ordered_at
             FROM orders o JOIN members m ON m.id = o.member_id",
        );
        push_filters(&mut sql, search);
        sql.push_str(" ORDER BY o.ordered_at, o.id LIMIT ?");

        let mut query = sqlx::query_as::<_, DbOrderRow>(&sql);
        if let Some(status) = &search.status {
            query = query.bind(format!("{status:?}"));
        }
        if let Some(name) = name_filter(search) {
            query = query.bind(format!("%{name}%"));
        }
        let rows = query
            .bind(MAX_SEARCH_ROWS)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(DbOrderRow::into_record).collect()
    }

    async fn resolve(&self, record: &OrderRecord) -> Result<OrderView, RepoError> {
        // One round trip per relation, on purpose: this is the strategy
        // that costs N+1 queries when applied to a whole result set.
        let member_name: String = sqlx::query_scalar("SELECT name FROM members WHERE id = ?")
            .bind(record.member_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| RepoError::NotFound(format!("member {}", record.member_id)))?;

        let delivery: DbDeliveryRow = sqlx::query_as(
            "SELECT city, street, zipcode, status FROM deliveries WHERE order_id = ?",
        )
        .bind(record.id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let line_rows: Vec<DbLineRow> = sqlx::query_as(
            "SELECT oi.order_id, i.name AS item_name, oi.order_price_cents, oi.count
             FROM order_items oi JOIN items i ON i.id = oi.item_id
             WHERE oi.order_id = ? ORDER BY oi.id",
        )
        .bind(record.id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut items = Vec::with_capacity(line_rows.len());
        let mut total_cents = 0i64;
        for r in line_rows {
            let count = parse_count(r.count)?;
            total_cents += r.order_price_cents * count as i64;
            items.push(OrderLineView {
                item_name: r.item_name,
                order_price_cents: r.order_price_cents,
                count,
            });
        }

        Ok(OrderView {
            order_id: record.id,
            member_name,
            ordered_at: record.ordered_at,
            status: record.status.clone(),
            delivery_address: Address {
                city: delivery.city,
                street: delivery.street,
                zipcode: delivery.zipcode,
            },
            delivery_status: delivery_status(&delivery.status)?,
            items,
            total_cents,
        })
    }

    async fn search_with_relations(
        &self,
        search: &OrderSearch,
    ) -> Result<Vec<OrderView>, RepoError> {
        let mut sql = String::from(
            "SELECT o.id AS order_id, m.name AS member_name, o.ordered_at, o.status,
                    d.city, d.street, d.zipcode, d.status AS delivery_status,
                    i.name AS item_name, oi.order_price_cents, oi.count
             FROM orders o
             JOIN members m ON m.id = o.member_id
             JOIN deliveries d ON d.order_id = o.id
             JOIN order_items oi ON oi.order_id = o.id
             JOIN items i ON i.id = oi.item_id",
        );
        push_filters(&mut sql, search);
        sql.push_str(" ORDER BY o.ordered_at, o.id, oi.id");

        let mut query = sqlx::query_as::<_, DbJoinedRow>(&sql);
        if let Some(status) = &search.status {
            query = query.bind(format!("{status:?}"));
        }
        if let Some(name) = name_filter(search) {
            query = query.bind(format!("%{name}%"));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;

        // The collection join repeats the order columns once per line; fold
        // the rows back into one view per order.
        let mut views: Vec<OrderView> = Vec::new();
        for r in rows {
            let order_id = parse_uuid(&r.order_id)?;
            let count = parse_count(r.count)?;
            let line = OrderLineView {
                item_name: r.item_name,
                order_price_cents: r.order_price_cents,
                count,
            };
            let contribution = line.order_price_cents * count as i64;
            let starts_new_order = views.last().map_or(true, |v| v.order_id != order_id);
            if starts_new_order {
                views.push(OrderView {
                    order_id,
                    member_name: r.member_name,
                    ordered_at: parse_ts(&r.ordered_at)?,
                    status: order_status(&r.status)?,
                    delivery_address: Address {
                        city: r.city,
                        street: r.street,
                        zipcode: r.zipcode,
                    },
                    delivery_status: delivery_status(&r.delivery_status)?,
                    items: Vec::new(),
                    total_cents: 0,
                });
            }
            if let Some(v) = views.last_mut() {
                v.items.push(line);
                v.total_cents += contribution;
            }
        }
        Ok(views)
    }

    async fn search_summaries(&self, search: &OrderSearch) -> Result<Vec<OrderSummary>, RepoError> {
        let mut sql = String::from(
            "SELECT o.id AS order_id, m.name AS member_name, o.ordered_at, o.status,
                    d.city, d.street, d.zipcode
             FROM orders o
             JOIN members m ON m.id = o.member_id
             JOIN deliveries d ON d.order_id = o.id",
        );
        push_filters(&mut sql, search);
        sql.push_str(" ORDER BY o.ordered_at, o.id");

        let mut query = sqlx::query_as::<_, DbSummaryRow>(&sql);
        if let Some(status) = &search.status {
            query = query.bind(format!("{status:?}"));
        }
        if let Some(name) = name_filter(search) {
            query = query.bind(format!("%{name}%"));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;

        rows.into_iter()
            .map(|r| {
                Ok(OrderSummary {
                    order_id: parse_uuid(&r.order_id)?,
                    member_name: r.member_name,
                    ordered_at: parse_ts(&r.ordered_at)?,
                    status: order_status(&r.status)?,
                    delivery_address: Address {
                        city: r.city,
                        street: r.street,
                        zipcode: r.zipcode,
                    },
                })
            })
            .collect()
    }

    async fn search_page(
        &self,
        search: &OrderSearch,
        page: &Page,
    ) -> Result<Vec<OrderView>, RepoError> {
        // Join only the single-valued relations so LIMIT counts orders;
        // the lines come afterwards in batched IN lookups.
        let mut sql = String::from(
            "SELECT o.id AS order_id, m.name AS member_name, o.ordered_at, o.status,
                    d.city, d.street, d.zipcode, d.status AS delivery_status
             FROM orders o
             JOIN members m ON m.id = o.member_id
             JOIN deliveries d ON d.order_id = o.id",
        );
        push_filters(&mut sql, search);
        sql.push_str(" ORDER BY o.ordered_at, o.id LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, DbPageRow>(&sql);
        if let Some(status) = &search.status {
            query = query.bind(format!("{status:?}"));
        }
        if let Some(name) = name_filter(search) {
            query = query.bind(format!("%{name}%"));
        }
        let rows = query
            .bind(page.limit.max(0))
            .bind(page.offset.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let ids: Vec<String> = rows.iter().map(|r| r.order_id.clone()).collect();
        let mut lines_by_order: HashMap<String, Vec<OrderLineView>> = HashMap::new();
        for chunk in ids.chunks(self.batch_fetch_size) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let line_sql = format!(
                "SELECT oi.order_id, i.name AS item_name, oi.order_price_cents, oi.count
                 FROM order_items oi JOIN items i ON i.id = oi.item_id
                 WHERE oi.order_id IN ({placeholders}) ORDER BY oi.order_id, oi.id"
            );
            let mut line_query = sqlx::query_as::<_, DbLineRow>(&line_sql);
            for id in chunk {
                line_query = line_query.bind(id);
            }
            for r in line_query.fetch_all(&self.pool).await.map_err(db_err)? {
                lines_by_order
                    .entry(r.order_id.clone())
                    .or_default()
                    .push(OrderLineView {
                        item_name: r.item_name,
                        order_price_cents: r.order_price_cents,
                        count: parse_count(r.count)?,
                    });
            }
        }

        let mut views = Vec::with_capacity(rows.len());
        for r in rows {
            let items = lines_by_order.remove(&r.order_id).unwrap_or_default();
            let total_cents = items
                .iter()
                .map(|l| l.order_price_cents * l.count as i64)
                .sum();
            views.push(OrderView {
                order_id: parse_uuid(&r.order_id)?,
                member_name: r.member_name,
                ordered_at: parse_ts(&r.ordered_at)?,
                status: order_status(&r.status)?,
                delivery_address: Address {
                    city: r.city,
                    street: r.street,
                    zipcode: r.zipcode,
                },
                delivery_status: delivery_status(&r.delivery_status)?,
                items,
                total_cents,
            });
        }
        Ok(views)
    }
}
