use crate::errors::AppError;
use shop_types::domain::order::Order;
use shop_types::ports::order_repository::{
    OrderLine, OrderRepository, OrderSearch, OrderSummary, OrderView, Page,
};
use std::sync::Arc;
use uuid::Uuid;

pub struct OrderService<R: OrderRepository> {
    repo: Arc<R>,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn place_order(
        &self,
        member_id: Uuid,
        lines: Vec<OrderLine>,
    ) -> Result<Order, AppError> {
        if lines.is_empty() {
            return Err(AppError::BadRequest("order lines empty".into()));
        }
        if lines.iter().any(|l| l.count == 0) {
            return Err(AppError::BadRequest("order line count must be > 0".into()));
        }
        Ok(self.repo.place(member_id, &lines).await?)
    }

    pub async fn cancel_order(&self, id: Uuid) -> Result<Order, AppError> {
        match self.repo.cancel(id).await? {
            Some(order) => Ok(order),
            None => Err(AppError::NotFound(format!("order {id}"))),
        }
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderView, AppError> {
        match self.repo.view(id).await? {
            Some(view) => Ok(view),
            None => Err(AppError::NotFound(format!("order {id}"))),
        }
    }

    /// Row-at-a-time strategy: bare records first, then one resolution per
    /// order. Kept as the baseline the joined variants are measured
    /// against.
    pub async fn list_orders(&self, search: &OrderSearch) -> Result<Vec<OrderView>, AppError> {
        let records = self.repo.search(search).await?;
        let mut views = Vec::with_capacity(records.len());
        for record in &records {
            views.push(self.repo.resolve(record).await?);
        }
        Ok(views)
    }

    pub async fn list_orders_full(&self, search: &OrderSearch) -> Result<Vec<OrderView>, AppError> {
        Ok(self.repo.search_with_relations(search).await?)
    }

    pub async fn list_order_summaries(
        &self,
        search: &OrderSearch,
    ) -> Result<Vec<OrderSummary>, AppError> {
        Ok(self.repo.search_summaries(search).await?)
    }

    pub async fn list_orders_page(
        &self,
        search: &OrderSearch,
        page: &Page,
    ) -> Result<Vec<OrderView>, AppError> {
        Ok(self.repo.search_page(search, page).await?)
    }
}
