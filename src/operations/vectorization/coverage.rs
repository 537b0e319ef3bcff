//! Coverage check: is a requested span already vectorized?

use serde::{Deserialize, Serialize};
use strum::Display;

use super::period_tracker::PeriodTracker;
use crate::domain::{self, TimeRange};
use crate::infrastructure::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageStatus {
    FullyVectorized,
    PartiallyVectorized,
    NotVectorized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub status: CoverageStatus,
    pub missing_ranges: Vec<TimeRange>,
}

/// Classify how much of `requested` is covered by the source's recorded
/// periods, returning the uncovered remainder.
pub async fn check_coverage(
    tracker: &PeriodTracker,
    source_id: &str,
    requested: &TimeRange,
) -> Result<CoverageReport, StoreError> {
    let existing = tracker.periods(source_id).await?;

    if existing.is_empty() {
        return Ok(CoverageReport {
            status: CoverageStatus::NotVectorized,
            missing_ranges: vec![requested.clone()],
        });
    }

    let missing = domain::missing_ranges(requested, &existing);

    if missing.is_empty() {
        return Ok(CoverageReport {
            status: CoverageStatus::FullyVectorized,
            missing_ranges: Vec::new(),
        });
    }

    let status = if missing.len() == 1 && missing[0] == *requested {
        CoverageStatus::NotVectorized
    } else {
        CoverageStatus::PartiallyVectorized
    };

    Ok(CoverageReport {
        status,
        missing_ranges: missing,
    })
}
