///  To run :
///  cargo r --example client_example
use shop_client::{CreateItemRequest, CreateMemberRequest, PlaceOrderRequest, ShopClient};
use shop_hex::inbound::http::{HttpServer, HttpServerConfig};
use shop_repo::build_repo;
use shop_types::domain::item::ItemKind;
use shop_types::domain::order::OrderStatus;
use shop_types::ports::order_repository::{OrderLine, OrderSearch};
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Start server on an ephemeral port.
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("shop.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = build_repo(Some(&db_url), 100).await?;
    let server = HttpServer::new(
        repo,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // Use client against the running server.
    let client = ShopClient::new(&addr)?;

    let member = client
        .create_member(CreateMemberRequest {
            name: "kim".into(),
            city: "Seoul".into(),
            street: "Gangga".into(),
            zipcode: "123-123".into(),
        })
        .await?;
    println!("Registered member id={}", member.id);

    let book = client
        .create_item(CreateItemRequest {
            name: "Taebaek Mountains".into(),
            price_cents: 10_000,
            stock_quantity: 10,
            kind: ItemKind::Book {
                author: "Jo Jung-rae".into(),
                isbn: "89-7337-107-0".into(),
            },
        })
        .await?;
    println!("Created item id={}", book.id);

    let placed = client
        .place_order(PlaceOrderRequest {
            member_id: member.id.clone(),
            lines: vec![OrderLine {
                item_id: book.id.parse()?,
                count: 2,
            }],
        })
        .await?;
    println!("Placed order id={} status={:?}", placed.id, placed.status);
    assert_eq!(placed.status, OrderStatus::Ordered);

    let view = client.get_order(&placed.id).await?;
    println!(
        "Resolved order: member={} total_cents={}",
        view.member_name, view.total_cents
    );
    assert_eq!(view.total_cents, 20_000);

    let item = client.get_item(&book.id).await?;
    println!("Stock after order: {}", item.stock_quantity);
    assert_eq!(item.stock_quantity, 8);

    let page = client.list_orders_page(&OrderSearch::default(), 0, 10).await?;
    println!("Page holds {} order(s)", page.count);

    let cancelled = client.cancel_order(&placed.id).await?;
    println!("Cancelled order status={:?}", cancelled.status);
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let item = client.get_item(&book.id).await?;
    println!("Stock after cancel: {}", item.stock_quantity);
    assert_eq!(item.stock_quantity, 10);

    handle.abort();
    Ok(())
}
