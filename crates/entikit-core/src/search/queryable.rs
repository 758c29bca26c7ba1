//! Lazily evaluated query over an entity table

use std::fmt;
use std::marker::PhantomData;

use sqlx::SqlitePool;

use crate::criteria::Filter;
use crate::entity::{Entity, EntityDescriptor};
use crate::storage::Database;

/// A not yet executed query over the rows of `E`.
///
/// Refining a queryable only records predicates; SQL runs when a
/// [`QueryableSearcher`](super::QueryableSearcher) evaluates it together
/// with a [`Criteria`](crate::criteria::Criteria).
pub struct Queryable<E: Entity> {
    pool: SqlitePool,
    base: Vec<Filter>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Queryable<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            base: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn from_database(database: &Database) -> Self {
        Self::new(database.pool().clone())
    }

    /// Narrow the query. Base predicates may use hidden columns.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.base.push(filter);
        self
    }

    /// Restrict to one tenant's rows; no-op for entities without a tenant column
    pub fn for_tenant(self, tenant: Option<i64>) -> Self {
        match (E::descriptor().tenant, tenant) {
            (Some(column), Some(tenant)) => self.filter(Filter::eq(column, tenant)),
            _ => self,
        }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        E::descriptor()
    }

    pub fn base_filters(&self) -> &[Filter] {
        &self.base
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl<E: Entity> Clone for Queryable<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            base: self.base.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Queryable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queryable")
            .field("entity", &E::descriptor().name)
            .field("base", &self.base)
            .finish()
    }
}
