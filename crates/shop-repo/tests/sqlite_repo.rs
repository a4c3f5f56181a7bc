#![cfg(feature = "sqlite")]

use shop_repo::sqlite::SqliteRepo;
use shop_types::domain::address::Address;
use shop_types::domain::item::{Item, ItemKind};
use shop_types::domain::member::Member;
use shop_types::domain::order::OrderStatus;
use shop_types::ports::item_repository::ItemRepository;
use shop_types::ports::member_repository::MemberRepository;
use shop_types::ports::order_repository::{OrderLine, OrderRepository, OrderSearch, Page};
use shop_types::ports::RepoError;
use std::path::PathBuf;
use uuid::Uuid;

fn temp_db_url() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut path = PathBuf::from(dir.path());
    path.push(format!("shop-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());
    (dir, url)
}

async fn repo_with_batch(batch: usize) -> (tempfile::TempDir, SqliteRepo) {
    let (dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url, batch).await.unwrap();
    (dir, repo)
}

fn member(name: &str) -> Member {
    Member::new(name.into(), Address::new("Seoul", "Gangga", "123-123")).unwrap()
}

fn book(name: &str, price: i64, stock: u32) -> Item {
    Item::new(
        name.into(),
        price,
        stock,
        ItemKind::Book {
            author: "Jo Jung-rae".into(),
            isbn: "89-7337-107-0".into(),
        },
    )
    .unwrap()
}

fn movie(name: &str, price: i64, stock: u32) -> Item {
    Item::new(
        name.into(),
        price,
        stock,
        ItemKind::Movie {
            director: "Cameron".into(),
            actor: "DiCaprio".into(),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn members_round_trip_and_unique_name() {
    let (_dir, repo) = repo_with_batch(100).await;

    let kim = repo.create_member(member("kim")).await.unwrap();
    let fetched = repo.get_member(kim.id).await.unwrap().unwrap();
    assert_eq!(fetched, kim);

    let by_name = repo.find_member_by_name("kim").await.unwrap().unwrap();
    assert_eq!(by_name.id, kim.id);

    // the unique index rejects a second row even without the service-level
    // fast-path check
    let err = repo.create_member(member("kim")).await.unwrap_err();
    assert!(matches!(err, RepoError::DuplicateName(_)));

    let lee = repo.create_member(member("lee")).await.unwrap();
    let err = repo.rename_member(lee.id, "kim".into()).await.unwrap_err();
    assert!(matches!(err, RepoError::DuplicateName(_)));

    let renamed = repo
        .rename_member(lee.id, "park".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "park");

    let all = repo.list_members().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn items_round_trip_with_kind_columns() {
    let (_dir, repo) = repo_with_batch(100).await;

    let b = repo.create_item(book("Taebaek Mountains", 10_000, 10)).await.unwrap();
    let m = repo.create_item(movie("Titanic", 12_000, 5)).await.unwrap();

    let fetched = repo.get_item(b.id).await.unwrap().unwrap();
    assert_eq!(fetched, b);
    let fetched = repo.get_item(m.id).await.unwrap().unwrap();
    assert_eq!(fetched, m);

    let updated = repo
        .update_item(b.id, "Taebaek Mountains vol.2".into(), 11_000, 9)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.stock_quantity, 9);
    assert_eq!(updated.kind, b.kind);

    assert_eq!(repo.list_items().await.unwrap().len(), 2);
}

#[tokio::test]
async fn place_decrements_stock_and_captures_total() {
    let (_dir, repo) = repo_with_batch(100).await;
    let kim = repo.create_member(member("kim")).await.unwrap();
    let b = repo.create_item(book("Taebaek Mountains", 10_000, 10)).await.unwrap();

    let order = repo
        .place(
            kim.id,
            &[OrderLine {
                item_id: b.id,
                count: 2,
            }],
        )
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Ordered);
    assert_eq!(order.total_cents(), 20_000);
    assert_eq!(repo.get_item(b.id).await.unwrap().unwrap().stock_quantity, 8);

    let stored = repo.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.total_cents(), 20_000);
    assert_eq!(stored.member_id, kim.id);
    assert_eq!(stored.delivery.address, kim.address);

    let view = repo.view(order.id).await.unwrap().unwrap();
    assert_eq!(view.member_name, "kim");
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].item_name, "Taebaek Mountains");
    assert_eq!(view.total_cents, 20_000);
}

#[tokio::test]
async fn insufficient_stock_rolls_back_the_transaction() {
    let (_dir, repo) = repo_with_batch(100).await;
    let kim = repo.create_member(member("kim")).await.unwrap();
    let first = repo.create_item(book("First", 1_000, 10)).await.unwrap();
    let second = repo.create_item(book("Second", 1_000, 1)).await.unwrap();

    let err = repo
        .place(
            kim.id,
            &[
                OrderLine {
                    item_id: first.id,
                    count: 3,
                },
                OrderLine {
                    item_id: second.id,
                    count: 1000,
                },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::InsufficientStock {
            requested: 1000,
            available: 1,
            ..
        }
    ));

    // rollback must cover the first line's decrement and the order rows
    assert_eq!(
        repo.get_item(first.id).await.unwrap().unwrap().stock_quantity,
        10
    );
    assert!(repo.search(&OrderSearch::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_restores_stock_and_is_idempotent() {
    let (_dir, repo) = repo_with_batch(100).await;
    let kim = repo.create_member(member("kim")).await.unwrap();
    let b = repo.create_item(book("Taebaek Mountains", 10_000, 10)).await.unwrap();
    let order = repo
        .place(
            kim.id,
            &[OrderLine {
                item_id: b.id,
                count: 2,
            }],
        )
        .await
        .unwrap();

    let cancelled = repo.cancel(order.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(repo.get_item(b.id).await.unwrap().unwrap().stock_quantity, 10);

    let again = repo.cancel(order.id).await.unwrap().unwrap();
    assert_eq!(again.status, OrderStatus::Cancelled);
    assert_eq!(repo.get_item(b.id).await.unwrap().unwrap().stock_quantity, 10);
}

#[tokio::test]
async fn search_assembles_filters_dynamically() {
    let (_dir, repo) = repo_with_batch(100).await;
    let kim = repo.create_member(member("kim")).await.unwrap();
    let lee = repo.create_member(member("lee")).await.unwrap();
    let b = repo.create_item(book("Taebaek Mountains", 10_000, 100)).await.unwrap();

    let line = |count| {
        vec![OrderLine {
            item_id: b.id,
            count,
        }]
    };
    let kim_order = repo.place(kim.id, &line(1)).await.unwrap();
    repo.place(kim.id, &line(2)).await.unwrap();
    repo.place(lee.id, &line(3)).await.unwrap();
    repo.cancel(kim_order.id).await.unwrap();

    // no filters
    assert_eq!(repo.search(&OrderSearch::default()).await.unwrap().len(), 3);

    // name substring only
    let kims = repo
        .search(&OrderSearch {
            status: None,
            member_name: Some("ki".into()),
        })
        .await
        .unwrap();
    assert_eq!(kims.len(), 2);

    // status only
    let open = repo
        .search(&OrderSearch {
            status: Some(OrderStatus::Ordered),
            member_name: None,
        })
        .await
        .unwrap();
    assert_eq!(open.len(), 2);

    // both filters
    let open_kims = repo
        .search(&OrderSearch {
            status: Some(OrderStatus::Ordered),
            member_name: Some("kim".into()),
        })
        .await
        .unwrap();
    assert_eq!(open_kims.len(), 1);

    // blank name behaves like no name filter
    let blank = repo
        .search(&OrderSearch {
            status: None,
            member_name: Some("   ".into()),
        })
        .await
        .unwrap();
    assert_eq!(blank.len(), 3);
}

#[tokio::test]
async fn retrieval_strategies_agree() {
    let (_dir, repo) = repo_with_batch(100).await;
    let kim = repo.create_member(member("kim")).await.unwrap();
    let a = repo.create_item(book("A", 1_000, 100)).await.unwrap();
    let b = repo.create_item(movie("B", 2_000, 100)).await.unwrap();

    for _ in 0..2 {
        repo.place(
            kim.id,
            &[
                OrderLine {
                    item_id: a.id,
                    count: 1,
                },
                OrderLine {
                    item_id: b.id,
                    count: 2,
                },
            ],
        )
        .await
        .unwrap();
    }

    let search = OrderSearch::default();

    // strategy (a): bare records resolved one by one
    let records = repo.search(&search).await.unwrap();
    let mut resolved = Vec::new();
    for record in &records {
        resolved.push(repo.resolve(record).await.unwrap());
    }

    // strategy (b): one joined query
    let joined = repo.search_with_relations(&search).await.unwrap();

    assert_eq!(resolved.len(), 2);
    assert_eq!(joined.len(), 2);
    for (lhs, rhs) in resolved.iter().zip(joined.iter()) {
        assert_eq!(lhs.order_id, rhs.order_id);
        assert_eq!(lhs.member_name, rhs.member_name);
        assert_eq!(lhs.items, rhs.items);
        assert_eq!(lhs.total_cents, rhs.total_cents);
        assert_eq!(lhs.total_cents, 5_000);
    }

    // strategy (c): flat projection carries the single-valued fields
    let summaries = repo.search_summaries(&search).await.unwrap();
    assert_eq!(summaries.len(), 2);
    for (summary, view) in summaries.iter().zip(joined.iter()) {
        assert_eq!(summary.order_id, view.order_id);
        assert_eq!(summary.member_name, view.member_name);
        assert_eq!(summary.delivery_address, view.delivery_address);
    }
}

#[tokio::test]
async fn page_limits_orders_not_join_rows() {
    // batch size 1 forces one IN query per order, exercising chunking
    let (_dir, repo) = repo_with_batch(1).await;
    let kim = repo.create_member(member("kim")).await.unwrap();
    let a = repo.create_item(book("A", 1_000, 100)).await.unwrap();
    let b = repo.create_item(movie("B", 2_000, 100)).await.unwrap();

    for _ in 0..3 {
        repo.place(
            kim.id,
            &[
                OrderLine {
                    item_id: a.id,
                    count: 1,
                },
                OrderLine {
                    item_id: b.id,
                    count: 2,
                },
            ],
        )
        .await
        .unwrap();
    }

    let page = repo
        .search_page(&OrderSearch::default(), &Page { offset: 0, limit: 2 })
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    for view in &page {
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.total_cents, 5_000);
    }

    let rest = repo
        .search_page(&OrderSearch::default(), &Page { offset: 2, limit: 2 })
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);

    // a page never repeats an order from the previous one
    assert!(page.iter().all(|v| v.order_id != rest[0].order_id));
}

#[tokio::test]
async fn missing_rows_are_absent_not_errors() {
    let (_dir, repo) = repo_with_batch(100).await;
    let missing = Uuid::new_v4();

    assert!(repo.get(missing).await.unwrap().is_none());
    assert!(repo.view(missing).await.unwrap().is_none());
    assert!(repo.cancel(missing).await.unwrap().is_none());
    assert!(repo.get_member(missing).await.unwrap().is_none());
    assert!(repo.get_item(missing).await.unwrap().is_none());
    assert!(repo
        .update_item(missing, "x".into(), 1, 1)
        .await
        .unwrap()
        .is_none());

    let err = repo
        .place(
            missing,
            &[OrderLine {
                item_id: missing,
                count: 1,
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}
