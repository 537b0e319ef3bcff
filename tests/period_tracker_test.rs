//! Period tracker integration tests: disjointness under arbitrary insertion
//! orders and exact interval complements.

mod helpers;

use helpers::range;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sightline_core::domain::{missing_ranges, TimeRange};
use sightline_core::infrastructure::database::Database;
use sightline_core::infrastructure::store::Store;
use sightline_core::operations::vectorization::PeriodTracker;

async fn tracker() -> PeriodTracker {
    let database = Database::open_in_memory().await.expect("database");
    database.migrate().await.expect("migrations");
    PeriodTracker::new(Store::new(database.conn().clone()))
}

fn second(offset: u32) -> String {
    format!(
        "2025-01-01T{:02}:{:02}:{:02}",
        offset / 3600,
        (offset / 60) % 60,
        offset % 60
    )
}

fn assert_sorted_disjoint(periods: &[TimeRange]) {
    for window in periods.windows(2) {
        assert!(
            window[0].end_at < window[1].start_at,
            "periods overlap or touch without merging: {:?}",
            window
        );
    }
}

#[tokio::test]
async fn random_insertions_always_yield_sorted_disjoint_periods() {
    let tracker = tracker().await;
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..60 {
        let start = rng.gen_range(0u32..3000);
        let len = rng.gen_range(1u32..200);
        tracker
            .record_completed("cam-1", &range(&second(start), &second(start + len)))
            .await
            .expect("record");

        let periods = tracker.periods("cam-1").await.expect("periods");
        assert_sorted_disjoint(&periods);
    }
}

#[tokio::test]
async fn adjacent_periods_merge_into_one() {
    let tracker = tracker().await;

    tracker
        .record_completed("cam-1", &range(&second(0), &second(10)))
        .await
        .unwrap();
    tracker
        .record_completed("cam-1", &range(&second(10), &second(20)))
        .await
        .unwrap();

    let periods = tracker.periods("cam-1").await.unwrap();
    assert_eq!(periods, vec![range(&second(0), &second(20))]);
}

#[tokio::test]
async fn overlapping_periods_merge_into_their_union() {
    let tracker = tracker().await;

    tracker
        .record_completed("cam-1", &range(&second(0), &second(30)))
        .await
        .unwrap();
    tracker
        .record_completed("cam-1", &range(&second(50), &second(70)))
        .await
        .unwrap();
    tracker
        .record_completed("cam-1", &range(&second(20), &second(60)))
        .await
        .unwrap();

    let periods = tracker.periods("cam-1").await.unwrap();
    assert_eq!(periods, vec![range(&second(0), &second(70))]);
}

#[tokio::test]
async fn sources_do_not_share_periods() {
    let tracker = tracker().await;

    tracker
        .record_completed("cam-1", &range(&second(0), &second(10)))
        .await
        .unwrap();
    tracker
        .record_completed("cam-2", &range(&second(5), &second(15)))
        .await
        .unwrap();

    assert_eq!(tracker.periods("cam-1").await.unwrap().len(), 1);
    assert_eq!(
        tracker.periods("cam-2").await.unwrap(),
        vec![range(&second(5), &second(15))]
    );
}

#[tokio::test]
async fn zero_length_record_is_a_noop() {
    let tracker = tracker().await;

    tracker
        .record_completed("cam-1", &range(&second(10), &second(10)))
        .await
        .unwrap();

    assert!(tracker.periods("cam-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_ranges_complement_the_covered_set_exactly() {
    let tracker = tracker().await;
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
        let start = rng.gen_range(0u32..500);
        let len = rng.gen_range(1u32..60);
        tracker
            .record_completed("cam-1", &range(&second(start), &second(start + len)))
            .await
            .unwrap();
    }

    let requested = range(&second(0), &second(600));
    let covered = tracker.periods("cam-1").await.unwrap();
    let missing = tracker
        .missing_ranges("cam-1", &requested)
        .await
        .unwrap();

    // Missing pieces and covered intersections must tile the request with
    // no gaps and no overlaps.
    let mut pieces: Vec<TimeRange> = missing.clone();
    for span in &covered {
        let clipped = TimeRange {
            start_at: span.start_at.clone().max(requested.start_at.clone()),
            end_at: span.end_at.clone().min(requested.end_at.clone()),
        };
        if !clipped.is_empty() {
            pieces.push(clipped);
        }
    }
    pieces.sort_by(|a, b| a.start_at.cmp(&b.start_at));

    let mut cursor = requested.start_at.clone();
    for piece in &pieces {
        assert_eq!(piece.start_at, cursor, "gap or overlap at {:?}", piece);
        cursor = piece.end_at.clone();
    }
    assert_eq!(cursor, requested.end_at);

    // And the pure complement of the stored set agrees with the tracker.
    assert_eq!(missing, missing_ranges(&requested, &covered));
}

#[tokio::test]
async fn fully_covered_request_has_no_missing_ranges() {
    let tracker = tracker().await;

    tracker
        .record_completed("cam-1", &range(&second(0), &second(100)))
        .await
        .unwrap();

    let missing = tracker
        .missing_ranges("cam-1", &range(&second(20), &second(50)))
        .await
        .unwrap();
    assert!(missing.is_empty());
}
