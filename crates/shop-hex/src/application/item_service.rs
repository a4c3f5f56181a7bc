use crate::errors::AppError;
use shop_types::domain::item::{Item, ItemKind};
use shop_types::ports::item_repository::ItemRepository;
use std::sync::Arc;
use uuid::Uuid;

pub struct ItemService<R: ItemRepository> {
    repo: Arc<R>,
}

impl<R: ItemRepository> ItemService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn save_item(
        &self,
        name: String,
        price_cents: i64,
        stock_quantity: u32,
        kind: ItemKind,
    ) -> Result<Item, AppError> {
        let item = Item::new(name, price_cents, stock_quantity, kind)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(self.repo.create_item(item).await?)
    }

    pub async fn get_item(&self, id: Uuid) -> Result<Item, AppError> {
        match self.repo.get_item(id).await? {
            Some(item) => Ok(item),
            None => Err(AppError::NotFound(format!("item {id}"))),
        }
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, AppError> {
        Ok(self.repo.list_items().await?)
    }

    pub async fn update_item(
        &self,
        id: Uuid,
        name: String,
        price_cents: i64,
        stock_quantity: u32,
    ) -> Result<Item, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("item name empty".into()));
        }
        if price_cents < 0 {
            return Err(AppError::BadRequest("item price must be >= 0".into()));
        }
        match self
            .repo
            .update_item(id, name, price_cents, stock_quantity)
            .await?
        {
            Some(item) => Ok(item),
            None => Err(AppError::NotFound(format!("item {id}"))),
        }
    }
}
