#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Backend picked at compile time; sqlite wins when both features are on.
#[cfg(feature = "sqlite")]
pub type Repo = sqlite::SqliteRepo;
#[cfg(all(feature = "memory", not(feature = "sqlite")))]
pub type Repo = memory::InMemoryRepo;

#[cfg(feature = "sqlite")]
pub async fn build_repo(
    database_url: Option<&str>,
    batch_fetch_size: usize,
) -> anyhow::Result<Repo> {
    let url = database_url.unwrap_or("sqlite://shop.db");
    sqlite::SqliteRepo::new(url, batch_fetch_size).await
}

#[cfg(all(feature = "memory", not(feature = "sqlite")))]
pub async fn build_repo(
    _database_url: Option<&str>,
    _batch_fetch_size: usize,
) -> anyhow::Result<Repo> {
    Ok(memory::InMemoryRepo::new())
}
