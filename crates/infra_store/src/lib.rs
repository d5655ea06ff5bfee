//! Storage Infrastructure
//!
//! Durable implementations of the claim decision engine's ports.
//!
//! # Backends
//!
//! - **file**: a JSON-lines event log for the review queue, one JSON document
//!   per audit event, and a JSON-lines policy ledger. One process owns the
//!   data directory.
//! - **postgres**: the same ports over SQLx, safe for several engine
//!   processes sharing one database.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_store::{create_pool, run_migrations, DatabaseConfig, PgReviewRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims")).await?;
//! run_migrations(&pool).await?;
//! let store = PgReviewRepository::new(pool);
//! ```

pub mod error;
pub mod file;
pub mod pool;
pub mod postgres;

pub use error::StoreError;
pub use file::{JsonFileAuditSink, JsonlPolicyLedger, JsonlReviewStore, LedgerEntry};
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use postgres::{PgAuditSink, PgHealth, PgPolicyLedger, PgReviewRepository};
