use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::address::Address;
use crate::domain::order::{DeliveryStatus, Order, OrderStatus};
use crate::ports::RepoError;

/// Requested line of a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: Uuid,
    pub count: u32,
}

/// Optional filters applied to every search variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearch {
    pub status: Option<OrderStatus>,
    pub member_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// Bare row from the orders table; relations left as ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}

/// Flat projection for list views; single-valued relations only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub member_name: String,
    pub ordered_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub delivery_address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLineView {
    pub item_name: String,
    pub order_price_cents: i64,
    pub count: u32,
}

/// A fully resolved order: every relation materialized, nothing left to
/// fetch on access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: Uuid,
    pub member_name: String,
    pub ordered_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub delivery_address: Address,
    pub delivery_status: DeliveryStatus,
    pub items: Vec<OrderLineView>,
    pub total_cents: i64,
}

#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Decrements stock for every line at the current unit price and
    /// inserts the order with a Ready delivery to the member's address,
    /// all inside one transaction. Stock is untouched on any failure.
    async fn place(&self, member_id: Uuid, lines: &[OrderLine]) -> Result<Order, RepoError>;

    /// Restores stock for every line and marks the order Cancelled, in one
    /// transaction. Cancelling twice is a no-op; a completed delivery
    /// refuses with `AlreadyDelivered`. `None` when the order is absent.
    async fn cancel(&self, id: Uuid) -> Result<Option<Order>, RepoError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError>;
    async fn view(&self, id: Uuid) -> Result<Option<OrderView>, RepoError>;

    /// Bare rows matching the filters, capped at 1000.
    async fn search(&self, search: &OrderSearch) -> Result<Vec<OrderRecord>, RepoError>;

    /// Resolves one record with a separate lookup per relation; calling
    /// this per search row is the deliberately naive strategy.
    async fn resolve(&self, record: &OrderRecord) -> Result<OrderView, RepoError>;

    /// One query joining every relation, rows folded back into distinct
    /// orders.
    async fn search_with_relations(&self, search: &OrderSearch)
        -> Result<Vec<OrderView>, RepoError>;

    /// Projects straight into flat summaries without materializing
    /// aggregates.
    async fn search_summaries(&self, search: &OrderSearch) -> Result<Vec<OrderSummary>, RepoError>;

    /// Pages over orders joining only the single-valued relations, then
    /// loads lines for the whole page in batched lookups so the limit
    /// counts orders, not join rows.
    async fn search_page(
        &self,
        search: &OrderSearch,
        page: &Page,
    ) -> Result<Vec<OrderView>, RepoError>;
}
