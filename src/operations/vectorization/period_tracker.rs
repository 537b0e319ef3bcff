//! Period tracker: which spans of a source are already vectorized.

use crate::domain::{self, TimeRange};
use crate::infrastructure::store::{Store, StoreError};

/// Store-backed view of the disjoint vectorized periods of each source.
#[derive(Clone)]
pub struct PeriodTracker {
    store: Store,
}

impl PeriodTracker {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Ordered disjoint sub-ranges of `requested` not yet covered for the
    /// source. A zero-length request yields nothing; a fully covered request
    /// yields an empty set.
    pub async fn missing_ranges(
        &self,
        source_id: &str,
        requested: &TimeRange,
    ) -> Result<Vec<TimeRange>, StoreError> {
        if requested.is_empty() {
            return Ok(Vec::new());
        }
        let covered = self.store.periods_for_source(source_id).await?;
        Ok(domain::missing_ranges(requested, &covered))
    }

    /// Record `range` as fully vectorized. The store merges it with any
    /// overlapping or adjacent period inside a single transaction, so the
    /// period set stays disjoint under concurrent writers.
    pub async fn record_completed(
        &self,
        source_id: &str,
        range: &TimeRange,
    ) -> Result<(), StoreError> {
        if range.is_empty() {
            return Ok(());
        }
        self.store.insert_merged_period(source_id, range).await?;
        Ok(())
    }

    pub async fn periods(&self, source_id: &str) -> Result<Vec<TimeRange>, StoreError> {
        self.store.periods_for_source(source_id).await
    }
}
