//! Track coalescing for incremental search events.
//!
//! Candidates sharing a track id are one physical entity seen across
//! frames; pollers get a single live event per track carrying the best
//! score observed so far. Untracked objects each count as their own track.

use std::collections::HashMap;

use super::scoring::ScoredHit;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TrackKey {
    Track(i64),
    Object(String),
}

/// Running best score per track, deciding when an event row needs a write.
#[derive(Debug, Default)]
pub struct TrackAggregator {
    best: HashMap<TrackKey, f64>,
}

impl TrackAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one scored hit. Returns the new running maximum when this
    /// hit improved (or started) its track, `None` when the stored event is
    /// already at least as good. Frame-level hits carry no object identity
    /// and produce no events.
    pub fn observe(&mut self, hit: &ScoredHit) -> Option<f64> {
        let key = match (hit.track_id, &hit.object_id) {
            (Some(track), _) => TrackKey::Track(track),
            (None, Some(object)) => TrackKey::Object(object.clone()),
            (None, None) => return None,
        };

        match self.best.get(&key) {
            Some(best) if *best >= hit.final_score => None,
            _ => {
                self.best.insert(key, hit.final_score);
                Some(hit.final_score)
            }
        }
    }

    pub fn track_count(&self) -> usize {
        self.best.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(track_id: Option<i64>, object_id: Option<&str>, score: f64) -> ScoredHit {
        ScoredHit {
            frame_id: "frame".to_string(),
            object_id: object_id.map(str::to_string),
            at: "2025-01-01T00:00:00".to_string(),
            track_id,
            final_score: score,
            clip_score: score,
            color_score: 0.0,
            plate_score: 0.0,
        }
    }

    #[test]
    fn same_track_keeps_maximum() {
        let mut agg = TrackAggregator::new();
        assert_eq!(agg.observe(&hit(Some(7), Some("a"), 0.5)), Some(0.5));
        assert_eq!(agg.observe(&hit(Some(7), Some("b"), 0.4)), None);
        assert_eq!(agg.observe(&hit(Some(7), Some("c"), 0.8)), Some(0.8));
        assert_eq!(agg.track_count(), 1);
    }

    #[test]
    fn untracked_objects_are_separate_tracks() {
        let mut agg = TrackAggregator::new();
        assert!(agg.observe(&hit(None, Some("a"), 0.5)).is_some());
        assert!(agg.observe(&hit(None, Some("b"), 0.4)).is_some());
        assert_eq!(agg.track_count(), 2);
    }

    #[test]
    fn frame_hits_emit_nothing() {
        let mut agg = TrackAggregator::new();
        assert!(agg.observe(&hit(None, None, 0.9)).is_none());
        assert_eq!(agg.track_count(), 0);
    }
}
