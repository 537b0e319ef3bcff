//! Timestamps and time ranges
//!
//! Timestamps are stored as ISO-8601 strings and compared lexicographically,
//! which yields a total order consistent with chronological order for the
//! formats accepted here. Duration math parses the string form on demand.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// An ISO-8601 timestamp kept in its textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a naive datetime, accepting RFC 3339 or a plain
    /// `YYYY-MM-DDTHH:MM:SS[.fff]` form.
    pub fn parse(&self) -> Result<NaiveDateTime, ValidationError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.0) {
            return Ok(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(&self.0, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| ValidationError::MalformedTimestamp(self.0.clone()))
    }

    /// Shift forward by fractional seconds, formatted back to the plain
    /// ISO form.
    pub fn plus_seconds(&self, seconds: f64) -> Result<Timestamp, ValidationError> {
        let base = self.parse()?;
        let micros = (seconds * 1_000_000.0).round() as i64;
        let shifted = base + chrono::Duration::microseconds(micros);
        Ok(Timestamp(
            shifted.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        ))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A half-open interval `[start_at, end_at)` on a source's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

impl TimeRange {
    pub fn new(start_at: impl Into<Timestamp>, end_at: impl Into<Timestamp>) -> Self {
        Self {
            start_at: start_at.into(),
            end_at: end_at.into(),
        }
    }

    /// True when the interval covers nothing (`end_at <= start_at`).
    pub fn is_empty(&self) -> bool {
        self.end_at <= self.start_at
    }

    pub fn duration_secs(&self) -> Result<f64, ValidationError> {
        if self.is_empty() {
            return Ok(0.0);
        }
        let start = self.start_at.parse()?;
        let end = self.end_at.parse()?;
        let delta = end - start;
        Ok(delta.num_microseconds().unwrap_or(0) as f64 / 1_000_000.0)
    }

    /// Overlap or touch, the merge criterion for recorded periods.
    pub fn overlaps_or_touches(&self, other: &TimeRange) -> bool {
        self.start_at <= other.end_at && self.end_at >= other.start_at
    }

    /// Strict overlap (shared non-empty span).
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_at < other.end_at && self.end_at > other.start_at
    }
}

/// Subtract `covered` intervals from `requested`, returning the ordered
/// disjoint sub-ranges that remain uncovered. `covered` does not need to be
/// sorted or disjoint.
pub fn missing_ranges(requested: &TimeRange, covered: &[TimeRange]) -> Vec<TimeRange> {
    if requested.is_empty() {
        return Vec::new();
    }

    let mut spans: Vec<&TimeRange> = covered.iter().filter(|r| !r.is_empty()).collect();
    spans.sort_by(|a, b| a.start_at.cmp(&b.start_at));

    let mut missing = Vec::new();
    let mut cursor = requested.start_at.clone();

    for span in spans {
        if span.end_at <= cursor {
            continue;
        }
        if span.start_at >= requested.end_at {
            break;
        }
        if span.start_at > cursor {
            missing.push(TimeRange {
                start_at: cursor.clone(),
                end_at: span.start_at.clone(),
            });
        }
        if span.end_at > cursor {
            cursor = span.end_at.clone();
        }
        if cursor >= requested.end_at {
            break;
        }
    }

    if cursor < requested.end_at {
        missing.push(TimeRange {
            start_at: cursor,
            end_at: requested.end_at.clone(),
        });
    }

    missing
}

/// Union of `range` with every interval in `absorbed` (all assumed to
/// overlap or touch `range` transitively).
pub fn merge_span(range: &TimeRange, absorbed: &[TimeRange]) -> TimeRange {
    let mut start = range.start_at.clone();
    let mut end = range.end_at.clone();
    for other in absorbed {
        if other.start_at < start {
            start = other.start_at.clone();
        }
        if other.end_at > end {
            end = other.end_at.clone();
        }
    }
    TimeRange {
        start_at: start,
        end_at: end,
    }
}

/// Maps a fragment-relative position (seconds from the start of a processed
/// fragment) onto the absolute timeline, where the fragment is the
/// concatenation of the given ranges. Positions slightly past the total
/// duration (codec slack) clamp to the end of the last range.
#[derive(Debug)]
pub struct TimeMapper {
    ranges: Vec<TimeRange>,
    prefix_sums: Vec<f64>,
    total_secs: f64,
    warned_overflow: std::sync::atomic::AtomicBool,
}

impl TimeMapper {
    pub fn new(ranges: &[TimeRange]) -> Result<Self, ValidationError> {
        if ranges.is_empty() {
            return Err(ValidationError::EmptyRangeSet);
        }
        let mut prefix_sums = Vec::with_capacity(ranges.len());
        let mut total = 0.0;
        for range in ranges {
            total += range.duration_secs()?;
            prefix_sums.push(total);
        }
        Ok(Self {
            ranges: ranges.to_vec(),
            prefix_sums,
            total_secs: total,
            warned_overflow: std::sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn total_secs(&self) -> f64 {
        self.total_secs
    }

    pub fn map(&self, fragment_sec: f64) -> Result<Timestamp, ValidationError> {
        use std::sync::atomic::Ordering;

        let pos = fragment_sec.max(0.0);
        if pos >= self.total_secs {
            if !self.warned_overflow.swap(true, Ordering::Relaxed) {
                tracing::warn!(
                    fragment_sec,
                    total_secs = self.total_secs,
                    "frame position beyond total range duration, clamping to last range end"
                );
            }
            return Ok(self.ranges[self.ranges.len() - 1].end_at.clone());
        }

        let mut prev_sum = 0.0;
        for (idx, sum) in self.prefix_sums.iter().enumerate() {
            if pos < *sum {
                let offset = pos - prev_sum;
                return self.ranges[idx].start_at.plus_seconds(offset);
            }
            prev_sum = *sum;
        }

        Ok(self.ranges[self.ranges.len() - 1].end_at.clone())
    }
}
