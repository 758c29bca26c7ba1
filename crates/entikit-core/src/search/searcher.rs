//! Criteria searcher
//!
//! Runs a [`Criteria`] against a [`Queryable`] as two round-trips, a count
//! and a page fetch, both pushed down to SQLite. Read failures are returned
//! unmodified; there is no translation on this path.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SearchConfig;
use crate::criteria::{Criteria, CriteriaResult, QueryPlan};
use crate::entity::Entity;
use crate::error::{Error, Result};

use super::queryable::Queryable;

/// Evaluates criteria against a queryable entity collection
#[async_trait]
pub trait QueryableSearcher: Send + Sync {
    /// Filter, count, sort, page and fetch.
    ///
    /// Cancelling `cancel` aborts whichever round-trip is in flight and
    /// returns [`Error::Cancelled`]; a partial result is never produced.
    async fn to_criteria_result<E: Entity>(
        &self,
        queryable: &Queryable<E>,
        criteria: &Criteria,
        cancel: &CancellationToken,
    ) -> Result<CriteriaResult<E>>;
}

/// SQLite implementation of [`QueryableSearcher`]
#[derive(Debug, Clone, Default)]
pub struct CriteriaSearcher {
    config: SearchConfig,
}

impl CriteriaSearcher {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search without a cancellation source
    pub async fn search<E: Entity>(
        &self,
        queryable: &Queryable<E>,
        criteria: &Criteria,
    ) -> Result<CriteriaResult<E>> {
        self.to_criteria_result(queryable, criteria, &CancellationToken::new())
            .await
    }

    async fn execute<E: Entity>(
        &self,
        queryable: &Queryable<E>,
        plan: &QueryPlan,
    ) -> Result<(u64, Vec<E>)> {
        let mut count_query = plan.count_query();
        let mut page_query = plan.page_query();

        let (total, items) = if self.config.concurrent_round_trips {
            let pool = queryable.pool();
            tokio::try_join!(
                count_query.build_query_scalar::<i64>().fetch_one(pool),
                page_query.build_query_as::<E>().fetch_all(pool),
            )?
        } else {
            // One connection, one command in flight at a time
            let mut conn = queryable.pool().acquire().await?;
            let total = count_query
                .build_query_scalar::<i64>()
                .fetch_one(&mut *conn)
                .await?;
            let items = page_query
                .build_query_as::<E>()
                .fetch_all(&mut *conn)
                .await?;
            (total, items)
        };

        let total = u64::try_from(total)
            .map_err(|_| Error::Other(format!("negative row count {}", total)))?;
        Ok((total, items))
    }
}

#[async_trait]
impl QueryableSearcher for CriteriaSearcher {
    async fn to_criteria_result<E: Entity>(
        &self,
        queryable: &Queryable<E>,
        criteria: &Criteria,
        cancel: &CancellationToken,
    ) -> Result<CriteriaResult<E>> {
        let plan = QueryPlan::build(
            queryable.descriptor(),
            queryable.base_filters(),
            criteria,
            &self.config,
        )?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        debug!(
            entity = queryable.descriptor().name,
            filters = plan.filter_count(),
            page_index = plan.page().index,
            page_size = plan.page().size,
            "Running criteria search"
        );

        let (total_count, items) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = self.execute(queryable, &plan) => outcome?,
        };

        debug!(
            entity = queryable.descriptor().name,
            total = total_count,
            returned = items.len(),
            "Criteria search complete"
        );

        Ok(CriteriaResult {
            items,
            total_count,
            page: plan.page(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{Filter, Page};
    use crate::testing::{Person, people_db, seed_people};

    async fn seeded(n: usize) -> (crate::storage::Database, Queryable<Person>) {
        let db = people_db().await;
        seed_people(&db, n).await;
        let queryable = Queryable::from_database(&db);
        (db, queryable)
    }

    #[tokio::test]
    async fn test_third_page_of_twenty_five() {
        let (_db, people) = seeded(25).await;
        let criteria = Criteria::new().sort_asc("name").page(2, 10);

        let result = CriteriaSearcher::default()
            .search(&people, &criteria)
            .await
            .unwrap();

        assert_eq!(result.total_count, 25);
        assert_eq!(result.len(), 5);
        let names: Vec<_> = result.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["person-21", "person-22", "person-23", "person-24", "person-25"]
        );
        assert!(!result.has_next());
    }

    #[tokio::test]
    async fn test_empty_criteria_applies_default_page() {
        let (_db, people) = seeded(30).await;
        let searcher = CriteriaSearcher::new(SearchConfig {
            default_page_size: 12,
            ..SearchConfig::default()
        });

        let result = searcher.search(&people, &Criteria::new()).await.unwrap();
        assert_eq!(result.page, Page::new(0, 12));
        assert_eq!(result.len(), 12);
        assert_eq!(result.total_count, 30);
    }

    #[tokio::test]
    async fn test_page_beyond_end_is_empty_with_total() {
        let (_db, people) = seeded(7).await;
        let result = CriteriaSearcher::default()
            .search(&people, &Criteria::new().page(5, 10))
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.total_count, 7);
    }

    #[tokio::test]
    async fn test_page_sizes_follow_min_rule() {
        let (_db, people) = seeded(23).await;
        let searcher = CriteriaSearcher::default();

        for size in [1u32, 4, 10, 23, 50] {
            for index in 0..5u32 {
                let result = searcher
                    .search(&people, &Criteria::new().page(index, size))
                    .await
                    .unwrap();
                let offset = u64::from(index) * u64::from(size);
                let expected = u64::from(size).min(23u64.saturating_sub(offset));
                assert_eq!(result.len() as u64, expected, "index {index} size {size}");
                assert_eq!(result.total_count, 23);
            }
        }
    }

    #[tokio::test]
    async fn test_total_count_ignores_paging_but_honours_filters() {
        let (_db, people) = seeded(20).await;
        // seed_people marks every even-numbered person active
        let criteria = Criteria::new()
            .filter(Filter::eq("active", true))
            .page(0, 3);

        let result = CriteriaSearcher::default()
            .search(&people, &criteria)
            .await
            .unwrap();
        assert_eq!(result.total_count, 10);
        assert_eq!(result.len(), 3);
        assert!(result.items.iter().all(|p| p.active));
    }

    #[tokio::test]
    async fn test_base_predicates_are_applied() {
        let (_db, people) = seeded(20).await;
        let adults = people.filter(Filter::ge("age", 30));

        let result = CriteriaSearcher::default()
            .search(&adults, &Criteria::new().page(0, 100))
            .await
            .unwrap();
        assert!(result.items.iter().all(|p| p.age >= 30));
        assert_eq!(result.total_count as usize, result.len());
    }

    #[tokio::test]
    async fn test_repeated_search_is_identical() {
        let (_db, people) = seeded(15).await;
        let criteria = Criteria::new().sort_desc("active").page(1, 4);
        let searcher = CriteriaSearcher::default();

        let first = searcher.search(&people, &criteria).await.unwrap();
        let second = searcher.search(&people, &criteria).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_round_trips_match_sequential() {
        let (_db, people) = seeded(18).await;
        let criteria = Criteria::new()
            .filter(Filter::starts_with("name", "person-1"))
            .sort_asc("name")
            .page(0, 5);

        let sequential = CriteriaSearcher::default()
            .search(&people, &criteria)
            .await
            .unwrap();
        let concurrent = CriteriaSearcher::new(SearchConfig {
            concurrent_round_trips: true,
            ..SearchConfig::default()
        })
        .search(&people, &criteria)
        .await
        .unwrap();

        assert_eq!(sequential, concurrent);
        // person-10 .. person-18
        assert_eq!(sequential.total_count, 9);
    }

    #[tokio::test]
    async fn test_cancelled_token_never_yields_a_result() {
        let (_db, people) = seeded(5).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = CriteriaSearcher::default()
            .to_criteria_result(&people, &Criteria::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_on_the_data_source() {
        let (db, people) = seeded(5).await;
        // In-memory pools hold a single connection; keep it busy
        let held = db.pool().acquire().await.unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = CriteriaSearcher::default()
            .to_criteria_result(&people, &Criteria::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        drop(held);
    }

    #[tokio::test]
    async fn test_cancel_while_concurrent_round_trips_wait() {
        let (db, people) = seeded(5).await;
        // Both joined round trips queue behind the single held connection
        let held = db.pool().acquire().await.unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let searcher = CriteriaSearcher::new(SearchConfig {
            concurrent_round_trips: true,
            ..SearchConfig::default()
        });
        let err = searcher
            .to_criteria_result(&people, &Criteria::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        drop(held);

        // The pool is usable again once the cancelled fetches are dropped
        let result = searcher.search(&people, &Criteria::new()).await.unwrap();
        assert_eq!(result.total_count, 5);
    }

    #[tokio::test]
    async fn test_malformed_criteria_fails_before_querying() {
        let db = crate::storage::Database::in_memory().await.unwrap();
        // No table exists: a query would fail with a database error instead
        let people = Queryable::<Person>::from_database(&db);

        let err = CriteriaSearcher::default()
            .search(&people, &Criteria::new().filter(Filter::eq("shoe_size", 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCriteria(_)));
    }

    #[tokio::test]
    async fn test_data_source_failure_is_surfaced_unmodified() {
        let db = crate::storage::Database::in_memory().await.unwrap();
        let people = Queryable::<Person>::from_database(&db);

        let err = CriteriaSearcher::default()
            .search(&people, &Criteria::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DatabaseError(_)));
    }
}
