//! Entity persistence
//!
//! [`EntityStore`] is the write path. Each write runs the stamping stage,
//! then issues a single statement. Versioned entities are written with an
//! optimistic `WHERE key = ? AND version = ?` guard; a guard that matches
//! nothing is reported as [`Error::ConcurrencyConflict`]. Unique violations
//! surface as [`Error::DuplicateKey`]. When the stamper reports a tenant,
//! key lookups and writes only reach that tenant's rows.

pub mod translate;

use std::marker::PhantomData;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::entity::{Entity, EntityDescriptor, Value, quote_ident};
use crate::error::{Error, Result, StaleRow};
use crate::search::Queryable;
use crate::stamping::{Stampable, Stamper, WriteOp};
use crate::storage::{ContextResolver, Database};

pub use translate::{concurrency_conflict, is_unique_violation, translate_write_error};

/// First version assigned to a newly inserted row
pub const INITIAL_VERSION: i64 = 1;

/// Stamping, versioned persistence for one entity type
pub struct EntityStore<E: Entity + Stampable> {
    pool: SqlitePool,
    stamper: Stamper,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity + Stampable> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            stamper: self.stamper.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity + Stampable> std::fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entity", &E::descriptor().name)
            .field("stamper", &self.stamper)
            .finish()
    }
}

impl<E: Entity + Stampable> EntityStore<E> {
    pub fn new(pool: SqlitePool, stamper: Stamper) -> Self {
        Self {
            pool,
            stamper,
            _entity: PhantomData,
        }
    }

    pub fn from_database(database: &Database, stamper: Stamper) -> Self {
        Self::new(database.pool().clone(), stamper)
    }

    /// Build a store on whichever database owns `E`
    pub fn resolve(resolver: &dyn ContextResolver, stamper: Stamper) -> Result<Self> {
        let database = resolver.resolve(E::descriptor())?;
        Ok(Self::from_database(&database, stamper))
    }

    fn descriptor() -> &'static EntityDescriptor {
        E::descriptor()
    }

    /// Queryable over this store's table, scoped to the stamper's tenant
    pub fn queryable(&self) -> Queryable<E> {
        Queryable::new(self.pool.clone()).for_tenant(self.stamper.current_tenant())
    }

    /// Queryable over every tenant's rows
    pub fn queryable_unscoped(&self) -> Queryable<E> {
        Queryable::new(self.pool.clone())
    }

    /// Tenant column and value that scope this store's reads and writes
    fn tenant_scope(&self) -> Option<(&'static str, i64)> {
        Self::descriptor().tenant.zip(self.stamper.current_tenant())
    }

    /// Load the row with `key`, if it belongs to the current tenant
    pub async fn find(&self, key: i64) -> Result<Option<E>> {
        self.fetch(key, self.tenant_scope()).await
    }

    /// Load the row with `key` whichever tenant owns it
    pub async fn find_unscoped(&self, key: i64) -> Result<Option<E>> {
        self.fetch(key, None).await
    }

    async fn fetch(&self, key: i64, tenant: Option<(&'static str, i64)>) -> Result<Option<E>> {
        let d = Self::descriptor();
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {}",
            d.select_list(),
            quote_ident(d.table)
        ));
        push_key_guard(&mut builder, d, key, None, tenant);
        let row = builder
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Stamp and insert `entity`, returning it with its key and version set
    pub async fn insert(&self, entity: E) -> Result<E> {
        let d = Self::descriptor();
        let mut entity = self.stamper.stamp(entity, WriteOp::Insert);

        let mut columns: Vec<(&'static str, Value)> = Vec::new();
        if let Some(key) = entity.key() {
            columns.push((d.key, Value::Integer(key)));
        }
        columns.extend(entity.values());
        if let Some(version) = d.version {
            columns.push((version, Value::Integer(INITIAL_VERSION)));
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} ", quote_ident(d.table)));
        if columns.is_empty() {
            builder.push("DEFAULT VALUES");
        } else {
            let names: Vec<String> = columns.iter().map(|(c, _)| quote_ident(c)).collect();
            builder.push(format!("({}) VALUES (", names.join(", ")));
            for (i, (_, value)) in columns.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                value.push_bind(&mut builder);
            }
            builder.push(")");
        }

        let done = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| translate_write_error(d.name, e))?;

        let key = entity.key().unwrap_or_else(|| done.last_insert_rowid());
        entity.set_key(key);
        if d.version.is_some() {
            entity.set_version(INITIAL_VERSION);
        }
        debug!(entity = d.name, key, "Inserted entity");
        Ok(entity)
    }

    /// Stamp and update `entity`, bumping its version when versioned
    pub async fn update(&self, entity: E) -> Result<E> {
        let d = Self::descriptor();
        let key = entity.key().ok_or_else(|| Error::MissingKey(d.name.to_string()))?;
        let mut entity = self.stamper.stamp(entity, WriteOp::Update);
        let expected = versioned(d, &entity)?;

        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", quote_ident(d.table)));
        let mut first = true;
        for (column, value) in entity.values() {
            if !first {
                builder.push(", ");
            }
            first = false;
            builder.push(format!("{} = ", quote_ident(column)));
            value.push_bind(&mut builder);
        }
        if let Some(version) = d.version {
            if !first {
                builder.push(", ");
            }
            first = false;
            let version = quote_ident(version);
            builder.push(format!("{} = {} + 1", version, version));
        }
        if first {
            // Nothing writable: the write degenerates to an existence check
            builder.push(format!("{0} = {0}", quote_ident(d.key)));
        }
        push_key_guard(&mut builder, d, key, expected, self.tenant_scope());

        let done = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| translate_write_error(d.name, e))?;

        if done.rows_affected() == 0 {
            return Err(missing_row(d, key, expected));
        }
        if let Some(version) = expected {
            entity.set_version(version + 1);
        }
        debug!(entity = d.name, key, "Updated entity");
        Ok(entity)
    }

    /// Delete `entity`, honouring its version when versioned
    pub async fn delete(&self, entity: &E) -> Result<()> {
        let d = Self::descriptor();
        let key = entity.key().ok_or_else(|| Error::MissingKey(d.name.to_string()))?;
        let expected = versioned(d, entity)?;

        let mut builder = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {}", quote_ident(d.table)));
        push_key_guard(&mut builder, d, key, expected, self.tenant_scope());

        let done = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| translate_write_error(d.name, e))?;

        if done.rows_affected() == 0 {
            return Err(missing_row(d, key, expected));
        }
        debug!(entity = d.name, key, "Deleted entity");
        Ok(())
    }
}

/// Expected row version, required exactly when the descriptor is versioned
fn versioned<E: Entity>(d: &EntityDescriptor, entity: &E) -> Result<Option<i64>> {
    match (d.version, entity.version()) {
        (Some(_), Some(version)) => Ok(Some(version)),
        (Some(column), None) => Err(Error::Other(format!(
            "{} is versioned by '{}' but the entity reports no version",
            d.name, column
        ))),
        (None, _) => Ok(None),
    }
}

fn push_key_guard(
    builder: &mut QueryBuilder<'_, Sqlite>,
    d: &EntityDescriptor,
    key: i64,
    expected: Option<i64>,
    tenant: Option<(&'static str, i64)>,
) {
    builder.push(format!(" WHERE {} = ", quote_ident(d.key)));
    builder.push_bind(key);
    if let (Some(column), Some(version)) = (d.version, expected) {
        builder.push(format!(" AND {} = ", quote_ident(column)));
        builder.push_bind(version);
    }
    if let Some((column, tenant)) = tenant {
        builder.push(format!(" AND {} = ", quote_ident(column)));
        builder.push_bind(tenant);
    }
}

fn missing_row(d: &'static EntityDescriptor, key: i64, expected: Option<i64>) -> Error {
    match expected {
        Some(expected) => concurrency_conflict(
            d.name,
            StaleRow {
                table: d.table,
                key,
                expected,
            },
        ),
        None => Error::EntityNotFound(format!("{} {}", d.name, key)),
    }
}
