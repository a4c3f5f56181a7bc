use async_trait::async_trait;
use dashmap::DashMap;
use shop_types::domain::item::Item;
use shop_types::domain::member::Member;
use shop_types::domain::order::{Order, OrderItem, OrderStatus};
use shop_types::ports::item_repository::ItemRepository;
use shop_types::ports::member_repository::MemberRepository;
use shop_types::ports::order_repository::{
    OrderLine, OrderLineView, OrderRecord, OrderRepository, OrderSearch, OrderSummary, OrderView,
    Page,
};
use shop_types::ports::RepoError;
use std::sync::Arc;
use uuid::Uuid;

const MAX_SEARCH_ROWS: usize = 1000;

#[derive(Clone)]
pub struct InMemoryRepo {
    members: Arc<DashMap<Uuid, Member>>,
    items: Arc<DashMap<Uuid, Item>>,
    orders: Arc<DashMap<Uuid, Order>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            members: Arc::new(DashMap::new()),
            items: Arc::new(DashMap::new()),
            orders: Arc::new(DashMap::new()),
        }
    }

    fn member_name(&self, id: Uuid) -> Result<String, RepoError> {
        self.members
            .get(&id)
            .map(|m| m.name.clone())
            .ok_or_else(|| RepoError::NotFound(format!("member {id}")))
    }

    fn view_of(&self, order: &Order) -> Result<OrderView, RepoError> {
        let member_name = self.member_name(order.member_id)?;
        let mut items = Vec::with_capacity(order.items.len());
        for it in &order.items {
            let item_name = self
                .items
                .get(&it.item_id)
                .map(|i| i.name.clone())
                .ok_or_else(|| RepoError::NotFound(format!("item {}", it.item_id)))?;
            items.push(OrderLineView {
                item_name,
                order_price_cents: it.order_price_cents,
                count: it.count,
            });
        }
        Ok(OrderView {
            order_id: order.id,
            member_name,
            ordered_at: order.ordered_at,
            status: order.status.clone(),
            delivery_address: order.delivery.address.clone(),
            delivery_status: order.delivery.status.clone(),
            items,
            total_cents: order.total_cents(),
        })
    }

    /// Orders matching the filters, oldest first.
    fn matching_orders(&self, search: &OrderSearch) -> Result<Vec<Order>, RepoError> {
        let name_filter = search
            .member_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let mut matched = Vec::new();
        for entry in self.orders.iter() {
            let order = entry.value();
            if let Some(status) = &search.status {
                if &order.status != status {
                    continue;
                }
            }
            if let Some(needle) = name_filter {
                if !self.member_name(order.member_id)?.contains(needle) {
                    continue;
                }
            }
            matched.push(order.clone());
        }
        matched.sort_by(|a, b| (a.ordered_at, a.id).cmp(&(b.ordered_at, b.id)));
        Ok(matched)
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberRepository for InMemoryRepo {
    async fn create_member(&self, member: Member) -> Result<Member, RepoError> {
        if self.members.iter().any(|m| m.name == member.name) {
            return Err(RepoError::DuplicateName(member.name));
        }
        self.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn get_member(&self, id: Uuid) -> Result<Option<Member>, RepoError> {
        Ok(self.members.get(&id).map(|m| m.clone()))
    }

    async fn list_members(&self) -> Result<Vec<Member>, RepoError> {
        let mut members: Vec<Member> = self.members.iter().map(|kv| kv.value().clone()).collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn find_member_by_name(&self, name: &str) -> Result<Option<Member>, RepoError> {
        Ok(self
            .members
            .iter()
            .find(|kv| kv.value().name == name)
            .map(|kv| kv.value().clone()))
    }

    async fn rename_member(&self, id: Uuid, name: String) -> Result<Option<Member>, RepoError> {
        if self.members.iter().any(|m| m.name == name && m.id != id) {
            return Err(RepoError::DuplicateName(name));
        }
        match self.members.get_mut(&id) {
            Some(mut member) => {
                member
                    .rename(name)
                    .map_err(|e| RepoError::DbError(e.to_string()))?;
                Ok(Some(member.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ItemRepository for InMemoryRepo {
    async fn create_item(&self, item: Item) -> Result<Item, RepoError> {
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>, RepoError> {
        Ok(self.items.get(&id).map(|i| i.clone()))
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
        let mut items: Vec<Item> = self.items.iter().map(|kv| kv.value().clone()).collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_item(
        &self,
        id: Uuid,
        name: String,
        price_cents: i64,
        stock_quantity: u32,
    ) -> Result<Option<Item>, RepoError> {
        match self.items.get_mut(&id) {
            Some(mut item) => {
                item.name = name;
                item.price_cents = price_cents;
                item.stock_quantity = stock_quantity;
                Ok(Some(item.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn place(&self, member_id: Uuid, lines: &[OrderLine]) -> Result<Order, RepoError> {
        let ship_to = self
            .members
            .get(&member_id)
            .map(|m| m.address.clone())
            .ok_or_else(|| RepoError::NotFound(format!("member {member_id}")))?;

        let mut order_items = Vec::with_capacity(lines.len());
        let mut applied: Vec<(Uuid, u32)> = Vec::new();
        for line in lines {
            let decremented = match self.items.get_mut(&line.item_id) {
                Some(mut item) => match item.remove_stock(line.count) {
                    Ok(()) => {
                        order_items.push(OrderItem {
                            item_id: item.id,
                            order_price_cents: item.price_cents,
                            count: line.count,
                        });
                        Ok(())
                    }
                    Err(e) => Err(RepoError::InsufficientStock {
                        item_id: line.item_id,
                        requested: e.requested,
                        available: e.available,
                    }),
                },
                None => Err(RepoError::NotFound(format!("item {}", line.item_id))),
            };
            match decremented {
                Ok(()) => applied.push((line.item_id, line.count)),
                Err(err) => {
                    // undo the decrements of earlier lines
                    for (item_id, count) in applied {
                        if let Some(mut item) = self.items.get_mut(&item_id) {
                            item.add_stock(count);
                        }
                    }
                    return Err(err);
                }
            }
        }

        let order = Order::new(member_id, order_items, ship_to)
            .map_err(|e| RepoError::DbError(e.to_string()))?;
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn cancel(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let cancelled = match self.orders.get_mut(&id) {
            Some(mut order) => {
                if order.status == OrderStatus::Cancelled {
                    return Ok(Some(order.clone()));
                }
                order
                    .cancel()
                    .map_err(|_| RepoError::AlreadyDelivered(id))?;
                order.clone()
            }
            None => return Ok(None),
        };
        for it in &cancelled.items {
            if let Some(mut item) = self.items.get_mut(&it.item_id) {
                item.add_stock(it.count);
            }
        }
        Ok(Some(cancelled))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn view(&self, id: Uuid) -> Result<Option<OrderView>, RepoError> {
        match self.orders.get(&id).map(|o| o.clone()) {
            Some(order) => Ok(Some(self.view_of(&order)?)),
            None => Ok(None),
        }
    }

    async fn search(&self, search: &OrderSearch) -> Result<Vec<OrderRecord>, RepoError> {
        let mut records: Vec<OrderRecord> = self
            .matching_orders(search)?
            .into_iter()
            .map(|o| OrderRecord {
                id: o.id,
                member_id: o.member_id,
                status: o.status,
                ordered_at: o.ordered_at,
            })
            .collect();
        records.truncate(MAX_SEARCH_ROWS);
        Ok(records)
    }

    async fn resolve(&self, record: &OrderRecord) -> Result<OrderView, RepoError> {
        let order = self
            .orders
            .get(&record.id)
            .map(|o| o.clone())
            .ok_or_else(|| RepoError::NotFound(format!("order {}", record.id)))?;
        self.view_of(&order)
    }

    async fn search_with_relations(
        &self,
        search: &OrderSearch,
    ) -> Result<Vec<OrderView>, RepoError> {
        self.matching_orders(search)?
            .iter()
            .map(|o| self.view_of(o))
            .collect()
    }

    async fn search_summaries(&self, search: &OrderSearch) -> Result<Vec<OrderSummary>, RepoError> {
        let mut summaries = Vec::new();
        for order in self.matching_orders(search)? {
            summaries.push(OrderSummary {
                order_id: order.id,
                member_name: self.member_name(order.member_id)?,
                ordered_at: order.ordered_at,
                status: order.status,
                delivery_address: order.delivery.address,
            });
        }
        Ok(summaries)
    }

    async fn search_page(
        &self,
        search: &OrderSearch,
        page: &Page,
    ) -> Result<Vec<OrderView>, RepoError> {
        let offset = usize::try_from(page.offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit.max(0)).unwrap_or(0);
        self.matching_orders(search)?
            .iter()
            .skip(offset)
            .take(limit)
            .map(|o| self.view_of(o))
            .collect()
    }
}
