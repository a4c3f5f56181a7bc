pub mod item_repository;
pub mod member_repository;
pub mod order_repository;

use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("member name already registered: {0}")]
    DuplicateName(String),
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: Uuid,
        requested: u32,
        available: u32,
    },
    #[error("order {0} already delivered")]
    AlreadyDelivered(Uuid),
}

/// One storage backend serving all three repositories.
pub trait ShopRepository:
    member_repository::MemberRepository
    + item_repository::ItemRepository
    + order_repository::OrderRepository
{
}

impl<T> ShopRepository for T where
    T: member_repository::MemberRepository
        + item_repository::ItemRepository
        + order_repository::OrderRepository
{
}
