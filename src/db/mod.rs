//! Database module for feedmerge.
//!
//! The durable store is reached through sqlx. The backend is chosen at build
//! time with the `sqlite` (default) or `postgres` feature.

mod repository;
mod schema;

pub use repository::ArticleRepository;
pub use schema::SCHEMA;

use std::time::Duration;

use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::{FeedmergeError, Result};

/// sqlx backend selected by feature.
#[cfg(feature = "sqlite")]
pub type DbBackend = sqlx::Sqlite;
/// sqlx backend selected by feature.
#[cfg(feature = "postgres")]
pub type DbBackend = sqlx::Postgres;

/// Connection pool for the selected backend.
pub type DbPool = sqlx::Pool<DbBackend>;

/// How long a caller waits for a pooled connection before giving up.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Database wrapper owning the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect to the database, creating the SQLite file if needed.
    #[cfg(feature = "sqlite")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Opening database at {}", config.url);

        let pool = Self::pool_options(config)
            .connect_with(Self::sqlite_options(config)?)
            .await
            .map_err(|e| FeedmergeError::DatabaseConnection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Create a pool that connects on first use.
    ///
    /// Lets the process start while the database is unreachable; every
    /// operation then fails individually until it comes back.
    #[cfg(feature = "sqlite")]
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::pool_options(config).connect_lazy_with(Self::sqlite_options(config)?);
        Ok(Self { pool })
    }

    #[cfg(feature = "sqlite")]
    fn sqlite_options(config: &DatabaseConfig) -> Result<sqlx::sqlite::SqliteConnectOptions> {
        use std::str::FromStr;

        let options = sqlx::sqlite::SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| FeedmergeError::DatabaseConnection(e.to_string()))?
            .create_if_missing(true);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(options)
    }

    #[cfg(feature = "sqlite")]
    fn pool_options(config: &DatabaseConfig) -> sqlx::sqlite::SqlitePoolOptions {
        sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
    }

    /// Connect to the database.
    #[cfg(feature = "postgres")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to PostgreSQL");

        let pool = Self::pool_options(config)
            .connect(&config.url)
            .await
            .map_err(|e| FeedmergeError::DatabaseConnection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Create a pool that connects on first use.
    ///
    /// Lets the process start while the database is unreachable; every
    /// operation then fails individually until it comes back.
    #[cfg(feature = "postgres")]
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::pool_options(config)
            .connect_lazy(&config.url)
            .map_err(|e| FeedmergeError::DatabaseConnection(e.to_string()))?;

        Ok(Self { pool })
    }

    #[cfg(feature = "postgres")]
    fn pool_options(config: &DatabaseConfig) -> sqlx::postgres::PgPoolOptions {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
    }

    /// Open an in-memory database with the schema applied, for tests.
    #[cfg(feature = "sqlite")]
    pub async fn open_in_memory() -> Result<Self> {
        use sqlx::sqlite::SqlitePoolOptions;

        debug!("Opening in-memory database");

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| FeedmergeError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create the article relation and its indexes if absent.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Durable store schema ready");
        Ok(())
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
