//! Search result envelope

use serde::Serialize;

use super::Page;

/// One page of matched entities plus the total number of matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriteriaResult<E> {
    pub items: Vec<E>,
    /// Rows matching the filters, independent of paging
    pub total_count: u64,
    /// Page that was applied, after defaults
    pub page: Page,
}

impl<E> CriteriaResult<E> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pages needed to show every match; 0 for a zero page size
    pub fn page_count(&self) -> u64 {
        match self.page.size {
            0 => 0,
            size => self.total_count.div_ceil(u64::from(size)),
        }
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page.index) + 1 < self.page_count()
    }

    pub fn map<U>(self, f: impl FnMut(E) -> U) -> CriteriaResult<U> {
        CriteriaResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
        }
    }
}
