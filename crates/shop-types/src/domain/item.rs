use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of item kinds. The per-kind fields ride next to the common
/// columns, discriminated by the `kind` tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ItemKind {
    Book { author: String, isbn: String },
    Album { artist: String, label: String },
    Movie { director: String, actor: String },
}

/// Quantity change refused because the stock would go negative.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("insufficient stock: requested {requested}, available {available}")]
pub struct InsufficientStock {
    pub requested: u32,
    pub available: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl Item {
    pub fn new(
        name: String,
        price_cents: i64,
        stock_quantity: u32,
        kind: ItemKind,
    ) -> anyhow::Result<Self> {
        if name.trim().is_empty() {
            anyhow::bail!("item name empty");
        }
        if price_cents < 0 {
            anyhow::bail!("item price must be >= 0");
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            price_cents,
            stock_quantity,
            kind,
        })
    }

    pub fn add_stock(&mut self, quantity: u32) {
        self.stock_quantity += quantity;
    }

    /// Guarded decrement: the quantity is untouched when the request
    /// exceeds what is available.
    pub fn remove_stock(&mut self, quantity: u32) -> Result<(), InsufficientStock> {
        if quantity > self.stock_quantity {
            return Err(InsufficientStock {
                requested: quantity,
                available: self.stock_quantity,
            });
        }
        self.stock_quantity -= quantity;
        Ok(())
    }
}
