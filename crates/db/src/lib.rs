//! SQLite connection factory for bookshelf.
//!
//! A [`Database`] is either ephemeral (in-memory, lost when the last connection
//! closes) or durable (file-backed). The ephemeral pool is pinned to a single
//! connection that never idles out, so the data lives as long as the process.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

mod migrations;

pub use migrations::Migration;

const MEMORY_URL: &str = "sqlite::memory:";

/// Connection parameters resolved from settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Location of the durable store. `None` selects the in-memory store.
    pub url: Option<String>,
    /// Pool size for the durable store.
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

/// Which kind of store a [`Database`] is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Ephemeral,
    Durable,
}

/// Handle to the relational store shared by every module.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    kind: StoreKind,
}

impl Database {
    /// Open the store described by `config`.
    pub async fn connect(config: &DbConfig) -> anyhow::Result<Self> {
        match config.url.as_deref().filter(|url| !is_memory_url(url)) {
            None => Self::connect_ephemeral().await,
            Some(url) => Self::connect_durable(url, config).await,
        }
    }

    /// Open a fresh in-memory store.
    pub async fn connect_ephemeral() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(MEMORY_URL)
            .context("invalid in-memory sqlite options")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to open in-memory sqlite database")?;

        tracing::info!(target: "bookshelf-db", "using ephemeral in-memory store");

        Ok(Self {
            pool,
            kind: StoreKind::Ephemeral,
        })
    }

    async fn connect_durable(url: &str, config: &DbConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid sqlite location '{url}'"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open sqlite database at '{url}'"))?;

        tracing::info!(target: "bookshelf-db", %url, "using durable file-backed store");

        Ok(Self {
            pool,
            kind: StoreKind::Durable,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Close every pooled connection. For the ephemeral store this discards all data.
    pub async fn close(&self) {
        tracing::info!(target: "bookshelf-db", kind = ?self.kind, "closing database pool");
        self.pool.close().await;
    }
}

fn is_memory_url(url: &str) -> bool {
    let trimmed = url
        .trim()
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    trimmed == ":memory:" || trimmed.starts_with(":memory:?")
}
