use anyhow::Context;
use serde::Deserialize;
use std::env;

/// Collection lookups during paginated order retrieval are chunked into IN
/// queries of this many orders unless BATCH_FETCH_SIZE overrides it.
pub const DEFAULT_BATCH_FETCH_SIZE: usize = 100;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub batch_fetch_size: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        let database_url = env::var("DATABASE_URL").ok();
        let batch_fetch_size = match env::var("BATCH_FETCH_SIZE") {
            Ok(raw) => raw
                .parse()
                .context("BATCH_FETCH_SIZE must be a positive integer")?,
            Err(_) => DEFAULT_BATCH_FETCH_SIZE,
        };
        Ok(Self {
            server_port,
            database_url,
            batch_fetch_size,
        })
    }
}
