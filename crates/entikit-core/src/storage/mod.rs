//! Storage layer - SQLite connection pools and context resolution
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `resolver`: Maps entity types to the database that owns them
//!
//! # Usage
//!
//! ```ignore
//! use entikit_core::storage::{ContextRegistry, Database};
//!
//! let db = Database::in_memory().await?;
//! let mut registry = ContextRegistry::with_default(db.clone());
//! registry.register::<Invoice>(billing_db);
//! let owner = registry.resolve_for::<Invoice>()?;
//! ```

pub mod database;
pub mod resolver;

pub use database::{Database, DatabaseConfig, default_database_path};
pub use resolver::{ContextRegistry, ContextResolver};
