//! # addressbook-db
//!
//! PostgreSQL database layer for the addressbook service.
//!
//! This crate provides:
//! - Connection pool management
//! - Schema migrations (behind the `migrations` feature)
//! - Repository implementations for labels and contacts
//! - The SQL builder behind contact filtering, search, and ordering
//!
//! ## Example
//!
//! ```rust,ignore
//! use addressbook_db::{Database, LabelRepository, NewLabel, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/addressbook", PoolConfig::new()).await?;
//!
//!     let label = db.labels.create(NewLabel {
//!         name: "Family".to_string(),
//!         color: "#FF0000".to_string(),
//!     }).await?;
//!
//!     println!("Created label: {}", label.id);
//!     Ok(())
//! }
//! ```
pub mod contact_query;
pub mod contacts;
pub mod labels;
pub mod pool;

// Test fixtures for integration tests
// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use addressbook_core::*;

pub use contact_query::{order_by_clause, ContactQueryBuilder, QueryParam};
pub use contacts::PgContactRepository;
pub use labels::PgLabelRepository;
pub use pool::{create_pool, log_pool_metrics, PoolConfig};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub labels: PgLabelRepository,
    pub contacts: PgContactRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            labels: PgLabelRepository::new(pool.clone()),
            contacts: PgContactRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn connect(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
