use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::address::Address;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Ordered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    Ready,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delivery {
    pub address: Address,
    pub status: DeliveryStatus,
}

/// One order line. The unit price is captured at order time so later item
/// price changes do not rewrite order history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub item_id: Uuid,
    pub order_price_cents: i64,
    pub count: u32,
}

/// Cancel refused because the delivery already completed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("delivery already completed")]
pub struct AlreadyDelivered;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub member_id: Uuid,
    pub items: Vec<OrderItem>,
    pub delivery: Delivery,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}

impl Order {
    pub fn new(member_id: Uuid, items: Vec<OrderItem>, ship_to: Address) -> anyhow::Result<Self> {
        if items.is_empty() {
            anyhow::bail!("order items empty");
        }
        for it in &items {
            if it.count == 0 {
                anyhow::bail!("order item count must be > 0");
            }
        }
        Ok(Self {
            id: Uuid::new_v4(),
            member_id,
            items,
            delivery: Delivery {
                address: ship_to,
                status: DeliveryStatus::Ready,
            },
            status: OrderStatus::Ordered,
            ordered_at: Utc::now(),
        })
    }

    pub fn total_cents(&self) -> i64 {
        self.items
            .iter()
            .map(|it| it.order_price_cents * it.count as i64)
            .sum()
    }

    /// Flips the status to Cancelled. Restoring line-item stock is the
    /// storage adapter's half of cancellation.
    pub fn cancel(&mut self) -> Result<(), AlreadyDelivered> {
        if self.delivery.status == DeliveryStatus::Completed {
            return Err(AlreadyDelivered);
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }
}
