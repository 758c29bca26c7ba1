//! entikit Core Library
//!
//! Extension points around SQLite persistence through `sqlx`:
//! - Criteria search: filter, sort and page a queryable entity collection
//! - Stamping: locale, tenant and audit columns set before each write
//! - Write translation: duplicate keys and row version conflicts
//! - Context resolution: which database owns an entity
//! - Run-on-exit guards

pub mod config;
pub mod criteria;
pub mod entity;
pub mod error;
pub mod scope;
pub mod search;
pub mod stamping;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::criteria::{Criteria, CriteriaResult, Filter, FilterOp, Page, SortDirection};
    pub use crate::entity::{ColumnDef, ColumnType, Entity, EntityDescriptor, Value};
    pub use crate::error::{Error, Result};
    pub use crate::search::{CriteriaSearcher, Queryable, QueryableSearcher};
    pub use crate::stamping::{Stampable, Stamper, WriteOp};
    pub use crate::storage::{ContextRegistry, ContextResolver, Database};
    pub use crate::store::EntityStore;
}
