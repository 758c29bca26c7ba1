//! Criteria search over queryable entity collections
//!
//! # Example
//!
//! ```ignore
//! use entikit_core::criteria::{Criteria, Filter};
//! use entikit_core::search::{CriteriaSearcher, Queryable};
//!
//! let people = Queryable::<Person>::from_database(&db).for_tenant(tenant);
//! let criteria = Criteria::new()
//!     .filter(Filter::contains("name", "ann"))
//!     .sort_asc("name")
//!     .page(0, 25);
//! let page = CriteriaSearcher::new(config.search.clone())
//!     .search(&people, &criteria)
//!     .await?;
//! println!("{} of {}", page.len(), page.total_count);
//! ```

pub mod queryable;
pub mod searcher;

pub use queryable::Queryable;
pub use searcher::{CriteriaSearcher, QueryableSearcher};
