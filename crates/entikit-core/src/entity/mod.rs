//! Entity metadata
//!
//! Every persisted type describes its table through a static
//! [`EntityDescriptor`]. The descriptor is the single source of truth for
//! which columns exist, which of them criteria may filter or sort on, and
//! which column carries the row version.

pub mod value;

use sqlx::FromRow;
use sqlx::sqlite::SqliteRow;

pub use value::Value;

/// Storage type of a column, used to coerce criteria values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Bool,
    Timestamp,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
        }
    }
}

/// A single mapped column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub filterable: bool,
    pub sortable: bool,
}

impl ColumnDef {
    /// A column that criteria may both filter and sort on
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            filterable: true,
            sortable: true,
        }
    }

    /// A column only reachable from base predicates, never from caller criteria
    pub const fn hidden(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            filterable: false,
            sortable: false,
        }
    }

    pub const fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }
}

/// Static table mapping for an entity type
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Entity name used in errors and logs
    pub name: &'static str,
    pub table: &'static str,
    /// Integer primary key column
    pub key: &'static str,
    /// Optimistic concurrency column, if the entity is versioned
    pub version: Option<&'static str>,
    /// Owning tenant column, if the entity is tenant scoped
    pub tenant: Option<&'static str>,
    /// Every selected column, key and version included
    pub columns: &'static [ColumnDef],
}

impl EntityDescriptor {
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Comma separated, quoted select list
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote_ident(c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Quote an identifier for SQLite. Identifiers only ever come from descriptors.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A persisted type with an integer key
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + 'static {
    fn descriptor() -> &'static EntityDescriptor;

    /// Primary key, `None` until inserted
    fn key(&self) -> Option<i64>;

    fn set_key(&mut self, key: i64);

    /// Current row version for versioned entities
    fn version(&self) -> Option<i64> {
        None
    }

    fn set_version(&mut self, _version: i64) {}

    /// Writable column values, excluding the key and version columns
    fn values(&self) -> Vec<(&'static str, Value)>;
}
