use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::item_service::ItemService;
use crate::application::member_service::MemberService;
use crate::application::order_service::OrderService;
use crate::errors::AppError;
use shop_types::domain::address::Address;
use shop_types::domain::item::{Item, ItemKind};
use shop_types::domain::member::Member;
use shop_types::domain::order::{Order, OrderStatus};
use shop_types::ports::order_repository::{OrderLine, OrderSearch, OrderSummary, OrderView, Page};
use shop_types::ports::ShopRepository;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

pub struct AppState<R: ShopRepository> {
    pub members: MemberService<R>,
    pub items: ItemService<R>,
    pub orders: OrderService<R>,
}

pub struct HttpServer<R: ShopRepository> {
    pub state: Arc<AppState<R>>,
    pub config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    pub city: String,
    pub street: String,
    pub zipcode: String,
}

#[derive(Serialize)]
struct CreateMemberResponse {
    id: String,
}

#[derive(Deserialize)]
pub struct UpdateMemberRequest {
    pub name: String,
}

#[derive(Serialize)]
struct UpdateMemberResponse {
    id: String,
    name: String,
}

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
    #[serde(flatten)]
    pub kind: ItemKind,
}

#[derive(Serialize)]
struct CreateItemResponse {
    id: String,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
}

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub member_id: Uuid,
    pub lines: Vec<OrderLine>,
}

#[derive(Serialize)]
struct PlaceOrderResponse {
    id: String,
    status: OrderStatus,
}

impl From<Order> for PlaceOrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id.to_string(),
            status: o.status,
        }
    }
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    count: usize,
    data: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

/// Filters shared by every order list variant.
#[derive(Deserialize, Default)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub member_name: Option<String>,
}

impl From<OrderListQuery> for OrderSearch {
    fn from(q: OrderListQuery) -> Self {
        Self {
            status: q.status,
            member_name: q.member_name,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct PageQuery {
    pub status: Option<OrderStatus>,
    pub member_name: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl<R> HttpServer<R>
where
    R: ShopRepository,
{
    pub async fn new(repo: R, config: HttpServerConfig) -> anyhow::Result<Self> {
        let repo = Arc::new(repo);
        let state = Arc::new(AppState {
            members: MemberService::new(repo.clone()),
            items: ItemService::new(repo.clone()),
            orders: OrderService::new(repo),
        });
        Ok(Self { state, config })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        let state = self.state.clone();
        let app = Router::new()
            .route("/health", get(health))
            .route("/members", post(create_member::<R>))
            .route("/members", get(list_members::<R>))
            .route("/members/{id}", get(get_member::<R>))
            .route("/members/{id}", put(update_member::<R>))
            .route("/items", post(create_item::<R>))
            .route("/items", get(list_items::<R>))
            .route("/items/{id}", get(get_item::<R>))
            .route("/items/{id}", put(update_item::<R>))
            .route("/orders", post(place_order::<R>))
            .route("/orders", get(list_orders::<R>))
            .route("/orders/full", get(list_orders_full::<R>))
            .route("/orders/summaries", get(list_order_summaries::<R>))
            .route("/orders/page", get(list_orders_page::<R>))
            .route("/orders/{id}", get(get_order::<R>))
            .route("/orders/{id}/cancel", post(cancel_order::<R>))
            .layer(trace_layer)
            .with_state(state);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|e| AppError::BadRequest(e.to_string()))
}

async fn health() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn create_member<R>(
    State(state): State<Arc<AppState<R>>>,
    Json(payload): Json<CreateMemberRequest>,
) -> Result<(axum::http::StatusCode, Json<CreateMemberResponse>), AppError>
where
    R: ShopRepository,
{
    let address = Address::new(payload.city, payload.street, payload.zipcode);
    let member = state.members.join(payload.name, address).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateMemberResponse {
            id: member.id.to_string(),
        }),
    ))
}

async fn list_members<R>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<ListResponse<Member>>, AppError>
where
    R: ShopRepository,
{
    let members = state.members.list_members().await?;
    Ok(Json(members.into()))
}

async fn get_member<R>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Member>, AppError>
where
    R: ShopRepository,
{
    let member = state.members.get_member(parse_id(&id)?).await?;
    Ok(Json(member))
}

async fn update_member<R>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMemberRequest>,
) -> Result<Json<UpdateMemberResponse>, AppError>
where
    R: ShopRepository,
{
    let member = state
        .members
        .rename_member(parse_id(&id)?, payload.name)
        .await?;
    Ok(Json(UpdateMemberResponse {
        id: member.id.to_string(),
        name: member.name,
    }))
}

async fn create_item<R>(
    State(state): State<Arc<AppState<R>>>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(axum::http::StatusCode, Json<CreateItemResponse>), AppError>
where
    R: ShopRepository,
{
    let item = state
        .items
        .save_item(
            payload.name,
            payload.price_cents,
            payload.stock_quantity,
            payload.kind,
        )
        .await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateItemResponse {
            id: item.id.to_string(),
        }),
    ))
}

async fn list_items<R>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<ListResponse<Item>>, AppError>
where
    R: ShopRepository,
{
    let items = state.items.list_items().await?;
    Ok(Json(items.into()))
}

async fn get_item<R>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Item>, AppError>
where
    R: ShopRepository,
{
    let item = state.items.get_item(parse_id(&id)?).await?;
    Ok(Json(item))
}

async fn update_item<R>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<Item>, AppError>
where
    R: ShopRepository,
{
    let item = state
        .items
        .update_item(
            parse_id(&id)?,
            payload.name,
            payload.price_cents,
            payload.stock_quantity,
        )
        .await?;
    Ok(Json(item))
}

async fn place_order<R>(
    State(state): State<Arc<AppState<R>>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<PlaceOrderResponse>), AppError>
where
    R: ShopRepository,
{
    let order = state
        .orders
        .place_order(payload.member_id, payload.lines)
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}

async fn cancel_order<R>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError>
where
    R: ShopRepository,
{
    let order = state.orders.cancel_order(parse_id(&id)?).await?;
    Ok(Json(order))
}

async fn get_order<R>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, AppError>
where
    R: ShopRepository,
{
    let view = state.orders.get_order(parse_id(&id)?).await?;
    Ok(Json(view))
}

async fn list_orders<R>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ListResponse<OrderView>>, AppError>
where
    R: ShopRepository,
{
    let views = state.orders.list_orders(&query.into()).await?;
    Ok(Json(views.into()))
}

async fn list_orders_full<R>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ListResponse<OrderView>>, AppError>
where
    R: ShopRepository,
{
    let views = state.orders.list_orders_full(&query.into()).await?;
    Ok(Json(views.into()))
}

async fn list_order_summaries<R>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ListResponse<OrderSummary>>, AppError>
where
    R: ShopRepository,
{
    let summaries = state.orders.list_order_summaries(&query.into()).await?;
    Ok(Json(summaries.into()))
}

async fn list_orders_page<R>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListResponse<OrderView>>, AppError>
where
    R: ShopRepository,
{
    let search = OrderSearch {
        status: query.status,
        member_name: query.member_name,
    };
    let default_page = Page::default();
    let page = Page {
        offset: query.offset.unwrap_or(default_page.offset),
        limit: query.limit.unwrap_or(default_page.limit),
    };
    let views = state.orders.list_orders_page(&search, &page).await?;
    Ok(Json(views.into()))
}
