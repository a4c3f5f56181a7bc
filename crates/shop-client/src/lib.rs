use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use shop_types::domain::item::{Item, ItemKind};
use shop_types::domain::member::Member;
use shop_types::domain::order::{Order, OrderStatus};
use shop_types::ports::order_repository::{OrderLine, OrderSearch, OrderSummary, OrderView};

#[derive(Clone)]
pub struct ShopClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct ShopClient {
    base: Url,
    client: reqwest::Client,
}

impl ShopClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<ShopClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(ShopClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn create_member(&self, req: CreateMemberRequest) -> anyhow::Result<CreatedResponse> {
        let res = self
            .client
            .post(self.url("members")?)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_member(&self, id: &str) -> anyhow::Result<Member> {
        let res = self
            .client
            .get(self.url(&format!("members/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_members(&self) -> anyhow::Result<ListResponse<Member>> {
        let res = self
            .client
            .get(self.url("members")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn update_member(
        &self,
        id: &str,
        name: &str,
    ) -> anyhow::Result<UpdateMemberResponse> {
        let res = self
            .client
            .put(self.url(&format!("members/{id}"))?)
            .json(&UpdateMemberRequest { name: name.into() })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn create_item(&self, req: CreateItemRequest) -> anyhow::Result<CreatedResponse> {
        let res = self
            .client
            .post(self.url("items")?)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_item(&self, id: &str) -> anyhow::Result<Item> {
        let res = self
            .client
            .get(self.url(&format!("items/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_items(&self) -> anyhow::Result<ListResponse<Item>> {
        let res = self
            .client
            .get(self.url("items")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn place_order(&self, req: PlaceOrderRequest) -> anyhow::Result<PlaceOrderResponse> {
        let res = self
            .client
            .post(self.url("orders")?)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn cancel_order(&self, id: &str) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url(&format!("orders/{id}/cancel"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_order(&self, id: &str) -> anyhow::Result<OrderView> {
        let res = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_orders(&self, search: &OrderSearch) -> anyhow::Result<ListResponse<OrderView>> {
        let res = self
            .client
            .get(self.url("orders")?)
            .query(search)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_orders_full(
        &self,
        search: &OrderSearch,
    ) -> anyhow::Result<ListResponse<OrderView>> {
        let res = self
            .client
            .get(self.url("orders/full")?)
            .query(search)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_order_summaries(
        &self,
        search: &OrderSearch,
    ) -> anyhow::Result<ListResponse<OrderSummary>> {
        let res = self
            .client
            .get(self.url("orders/summaries")?)
            .query(search)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn list_orders_page(
        &self,
        search: &OrderSearch,
        offset: i64,
        limit: i64,
    ) -> anyhow::Result<ListResponse<OrderView>> {
        let res = self
            .client
            .get(self.url("orders/page")?)
            .query(search)
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

impl ShopClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<ShopClient> {
        if let Some(client) = self.client {
            return Ok(ShopClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(ShopClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateMemberRequest {
    pub name: String,
    pub city: String,
    pub street: String,
    pub zipcode: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UpdateMemberRequest {
    name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateMemberResponse {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateItemRequest {
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
    #[serde(flatten)]
    pub kind: ItemKind,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlaceOrderRequest {
    pub member_id: String,
    pub lines: Vec<OrderLine>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlaceOrderResponse {
    pub id: String,
    pub status: OrderStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListResponse<T> {
    pub count: usize,
    pub data: Vec<T>,
}
