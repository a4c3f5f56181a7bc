use serde::Deserialize;
use serde_json::json;
use shop_hex::inbound::http::{HttpServer, HttpServerConfig};
use shop_repo::memory::InMemoryRepo;
use shop_types::domain::item::Item;
use shop_types::domain::order::{Order, OrderStatus};
use shop_types::ports::order_repository::{OrderSummary, OrderView};

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct PlacedOrder {
    id: String,
    status: OrderStatus,
}

#[derive(Deserialize)]
struct ListBody<T> {
    count: usize,
    data: Vec<T>,
}

async fn start_server() -> String {
    let port = find_free_port();
    let config = HttpServerConfig {
        port: port.to_string(),
    };
    let server = HttpServer::new(InMemoryRepo::new(), config).await.unwrap();
    let addr = format!("http://127.0.0.1:{}", port);
    tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    // Give the server a moment to start.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    addr
}

async fn create_member(client: &reqwest::Client, addr: &str, name: &str) -> String {
    let res = client
        .post(format!("{}/members", addr))
        .json(&json!({
            "name": name,
            "city": "Seoul",
            "street": "Gangga",
            "zipcode": "123-123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    res.json::<Created>().await.unwrap().id
}

async fn create_book(client: &reqwest::Client, addr: &str, name: &str, stock: u32) -> String {
    let res = client
        .post(format!("{}/items", addr))
        .json(&json!({
            "name": name,
            "price_cents": 10_000,
            "stock_quantity": stock,
            "kind": "Book",
            "author": "Jo Jung-rae",
            "isbn": "89-7337-107-0"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    res.json::<Created>().await.unwrap().id
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    let member_id = create_member(&client, &addr, "kim").await;
    let item_id = create_book(&client, &addr, "Taebaek Mountains", 10).await;

    let res = client
        .post(format!("{}/orders", addr))
        .json(&json!({
            "member_id": member_id,
            "lines": [{ "item_id": item_id, "count": 2 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let placed: PlacedOrder = res.json().await.unwrap();
    assert_eq!(placed.status, OrderStatus::Ordered);

    // stock went down
    let item: Item = client
        .get(format!("{}/items/{}", addr, item_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item.stock_quantity, 8);

    // fully resolved single view
    let view: OrderView = client
        .get(format!("{}/orders/{}", addr, placed.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view.member_name, "kim");
    assert_eq!(view.total_cents, 20_000);
    assert_eq!(view.items[0].item_name, "Taebaek Mountains");

    // every list variant sees the same order
    for path in ["/orders", "/orders/full", "/orders/page"] {
        let body: ListBody<OrderView> = client
            .get(format!("{}{}", addr, path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body.count, 1, "unexpected count for {path}");
        assert_eq!(body.data[0].order_id.to_string(), placed.id);
        assert_eq!(body.data[0].total_cents, 20_000);
    }
    let summaries: ListBody<OrderSummary> = client
        .get(format!("{}/orders/summaries", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summaries.count, 1);
    assert_eq!(summaries.data[0].member_name, "kim");

    // cancel restores the stock
    let res = client
        .post(format!("{}/orders/{}/cancel", addr, placed.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let cancelled: Order = res.json().await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let item: Item = client
        .get(format!("{}/items/{}", addr, item_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item.stock_quantity, 10);

    // status filter now excludes it
    let open: ListBody<OrderView> = client
        .get(format!("{}/orders?status=Ordered", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(open.count, 0);
}

#[tokio::test]
async fn page_limit_caps_order_count() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    let member_id = create_member(&client, &addr, "kim").await;
    let first = create_book(&client, &addr, "First", 100).await;
    let second = create_book(&client, &addr, "Second", 100).await;

    for _ in 0..3 {
        let res = client
            .post(format!("{}/orders", addr))
            .json(&json!({
                "member_id": member_id,
                "lines": [
                    { "item_id": first, "count": 1 },
                    { "item_id": second, "count": 2 }
                ]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    }

    let page: ListBody<OrderView> = client
        .get(format!("{}/orders/page?offset=0&limit=2", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page.count, 2);
    for view in &page.data {
        assert_eq!(view.items.len(), 2);
    }

    let rest: ListBody<OrderView> = client
        .get(format!("{}/orders/page?offset=2&limit=2", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rest.count, 1);
}

#[tokio::test]
async fn domain_refusals_map_to_conflict() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    let member_id = create_member(&client, &addr, "kim").await;
    let item_id = create_book(&client, &addr, "Taebaek Mountains", 1).await;

    // duplicate registration
    let res = client
        .post(format!("{}/members", addr))
        .json(&json!({
            "name": "kim",
            "city": "Busan",
            "street": "Haeundae",
            "zipcode": "456-456"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);

    // insufficient stock
    let res = client
        .post(format!("{}/orders", addr))
        .json(&json!({
            "member_id": member_id,
            "lines": [{ "item_id": item_id, "count": 5 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);

    // the failed order changed nothing
    let item: Item = client
        .get(format!("{}/items/{}", addr, item_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item.stock_quantity, 1);
}

#[tokio::test]
async fn bad_request_and_not_found_paths() {
    let addr = start_server().await;
    let client = reqwest::Client::new();

    let member_id = create_member(&client, &addr, "kim").await;

    // empty order lines
    let res = client
        .post(format!("{}/orders", addr))
        .json(&json!({ "member_id": member_id, "lines": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    // malformed id
    let res = client
        .get(format!("{}/orders/not-a-uuid", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    // absent rows
    let missing = uuid::Uuid::new_v4();
    for path in [
        format!("{}/orders/{}", addr, missing),
        format!("{}/members/{}", addr, missing),
        format!("{}/items/{}", addr, missing),
    ] {
        let res = client.get(path).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
