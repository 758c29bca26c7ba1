//! Entity to database context resolution
//!
//! Callers use a resolver to find the database that owns an entity's
//! mapping before building a [`Queryable`](crate::search::Queryable) or an
//! [`EntityStore`](crate::store::EntityStore). The searcher itself never
//! resolves anything.

use std::collections::HashMap;

use crate::entity::{Entity, EntityDescriptor};
use crate::error::{Error, Result};

use super::database::Database;

/// Maps an entity type to the database context that owns it
pub trait ContextResolver: Send + Sync {
    fn resolve(&self, entity: &EntityDescriptor) -> Result<Database>;
}

/// Table-keyed registry of database contexts with an optional fallback
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    by_table: HashMap<&'static str, Database>,
    fallback: Option<Database>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry where every entity resolves to `database`
    pub fn with_default(database: Database) -> Self {
        Self {
            by_table: HashMap::new(),
            fallback: Some(database),
        }
    }

    /// Route entity `E` to `database`, replacing any previous mapping
    pub fn register<E: Entity>(&mut self, database: Database) -> &mut Self {
        self.by_table.insert(E::descriptor().table, database);
        self
    }

    pub fn set_default(&mut self, database: Database) -> &mut Self {
        self.fallback = Some(database);
        self
    }

    /// Typed convenience over [`ContextResolver::resolve`]
    pub fn resolve_for<E: Entity>(&self) -> Result<Database> {
        self.resolve(E::descriptor())
    }
}

impl ContextResolver for ContextRegistry {
    fn resolve(&self, entity: &EntityDescriptor) -> Result<Database> {
        self.by_table
            .get(entity.table)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| Error::ContextNotFound(entity.name.to_string()))
    }
}
