//! Criteria: caller supplied filter, sort and page intent
//!
//! A [`Criteria`] is plain data. It is validated against an entity's
//! descriptor only when a searcher turns it into a [`QueryPlan`], which is
//! where unknown fields, mistyped values and bad paging are rejected.
//!
//! ```ignore
//! let criteria = Criteria::new()
//!     .filter(Filter::ge("age", 18))
//!     .sort_asc("name")
//!     .page(2, 10);
//! ```

pub mod filter;
pub mod plan;
pub mod result;

use serde::{Deserialize, Serialize};

pub use filter::{Filter, FilterOp, FilterValue};
pub use plan::QueryPlan;
pub use result::CriteriaResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    pub fn new(index: u32, size: u32) -> Self {
        Self { index, size }
    }

    /// Rows skipped before this page
    pub fn offset(&self) -> u64 {
        u64::from(self.index) * u64::from(self.size)
    }
}

/// Filter, sort and page description for one search
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Criteria {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sorts: Vec<Sort>,
    /// Falls back to the configured default page when absent
    #[serde(default)]
    pub page: Option<Page>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sorts.push(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn sort_asc(self, field: impl Into<String>) -> Self {
        self.sort(field, SortDirection::Asc)
    }

    pub fn sort_desc(self, field: impl Into<String>) -> Self {
        self.sort(field, SortDirection::Desc)
    }

    pub fn page(mut self, index: u32, size: u32) -> Self {
        self.page = Some(Page::new(index, size));
        self
    }

    /// Parse criteria from JSON, rejecting unknown keys
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::InvalidCriteria(e.to_string()))
    }
}
