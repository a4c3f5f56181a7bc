use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::item::Item;
use crate::ports::RepoError;

#[async_trait]
pub trait ItemRepository: Send + Sync + 'static {
    async fn create_item(&self, item: Item) -> Result<Item, RepoError>;
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, RepoError>;
    async fn list_items(&self) -> Result<Vec<Item>, RepoError>;
    /// Whole-row update of the mutable fields; the kind is fixed at
    /// creation.
    async fn update_item(
        &self,
        id: Uuid,
        name: String,
        price_cents: i64,
        stock_quantity: u32,
    ) -> Result<Option<Item>, RepoError>;
}
