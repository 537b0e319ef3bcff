//! Search job engine integration tests.

mod helpers;

use std::sync::Arc;

use helpers::{
    in_memory_core, range, seed_frame, seed_object, vector_with_similarity, ExtractorsBuilder,
    FailingTextEmbedder,
};
use pretty_assertions::assert_eq;

use sightline_core::domain::{HsvColor, ObjectType};
use sightline_core::infrastructure::jobs::types::JobStatus;
use sightline_core::infrastructure::store::ObjectAttributes;

fn plain_transport() -> ObjectAttributes {
    ObjectAttributes::Transport {
        color_hsv: String::new(),
        license_plate: None,
    }
}

fn transport_with(color: Option<HsvColor>, plate: Option<&str>) -> ObjectAttributes {
    ObjectAttributes::Transport {
        color_hsv: color.map(|c| c.encode()).unwrap_or_default(),
        license_plate: plate.map(str::to_string),
    }
}

#[tokio::test]
async fn clip_only_query_ranks_by_clip_score() {
    let core = in_memory_core(ExtractorsBuilder::new().build()).await;
    core.register_source("cam-1").await.unwrap();

    // Two transport objects without colour signatures or plates; the query's
    // colour filter has nothing to apply to, so final == clip.
    let (_, strong_id) = seed_object(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:05",
        5.0,
        vector_with_similarity(0.9),
        ObjectType::Transport,
        None,
        plain_transport(),
    )
    .await;
    let (_, weak_id) = seed_object(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:10",
        10.0,
        vector_with_similarity(0.8),
        ObjectType::Transport,
        None,
        plain_transport(),
    )
    .await;

    let window = range("2025-01-01T10:00:00", "2025-01-01T10:01:40");
    let record = core
        .submit_search("red cars", "red car", "cam-1", &window)
        .await
        .unwrap();
    let record = helpers::wait_terminal(&core, record.id).await;

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.progress, 1.0);

    let results = core.search_results(record.id).await.unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0].rank, 1);
    assert_eq!(results[0].object_id.as_deref(), Some(strong_id.as_str()));
    assert!((results[0].clip_score - 0.9).abs() < 1e-3);
    assert_eq!(results[0].final_score, results[0].clip_score);

    assert_eq!(results[1].rank, 2);
    assert_eq!(results[1].object_id.as_deref(), Some(weak_id.as_str()));
    assert_eq!(results[1].final_score, results[1].clip_score);
}

#[tokio::test]
async fn color_signal_outranks_a_stronger_clip_match() {
    let core = in_memory_core(ExtractorsBuilder::new().build()).await;
    core.register_source("cam-1").await.unwrap();

    let red = HsvColor {
        h: 0.0,
        s: 0.9,
        v: 0.6,
    };
    let blue = HsvColor {
        h: 220.0,
        s: 0.9,
        v: 0.6,
    };

    let (_, red_id) = seed_object(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:05",
        5.0,
        vector_with_similarity(0.8),
        ObjectType::Transport,
        None,
        transport_with(Some(red), None),
    )
    .await;
    seed_object(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:10",
        10.0,
        vector_with_similarity(0.9),
        ObjectType::Transport,
        None,
        transport_with(Some(blue), None),
    )
    .await;

    let window = range("2025-01-01T10:00:00", "2025-01-01T10:01:00");
    let record = core
        .submit_search("red cars", "red car", "cam-1", &window)
        .await
        .unwrap();
    let record = helpers::wait_terminal(&core, record.id).await;
    assert_eq!(record.status, JobStatus::Completed);

    let results = core.search_results(record.id).await.unwrap();
    assert_eq!(results.len(), 2);

    // Perfect colour match on the weaker clip candidate wins under the
    // default weights: (0.5*0.8 + 0.25*1.0) / 0.75 vs (0.5*0.9) / 0.75.
    assert_eq!(results[0].object_id.as_deref(), Some(red_id.as_str()));
    assert!(results[0].color_score > 0.99);
    assert_eq!(results[1].color_score, 0.0);
}

#[tokio::test]
async fn plate_match_outranks_a_slightly_stronger_clip_match() {
    let core = in_memory_core(ExtractorsBuilder::new().build()).await;
    core.register_source("cam-1").await.unwrap();

    // Stored plate uses Cyrillic lookalikes; the query is Latin. The
    // plate-less candidate is not penalized (its plate weight renormalizes
    // away), so the plate signal only tips close clip scores:
    // (0.5*0.85 + 0.25*1.0) / 0.75 = 0.9 beats a plain clip of 0.88.
    let (_, plate_id) = seed_object(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:05",
        5.0,
        vector_with_similarity(0.85),
        ObjectType::Transport,
        Some(1),
        transport_with(None, Some("А123ВС77")),
    )
    .await;
    seed_object(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:10",
        10.0,
        vector_with_similarity(0.88),
        ObjectType::Transport,
        Some(2),
        plain_transport(),
    )
    .await;

    let window = range("2025-01-01T10:00:00", "2025-01-01T10:01:00");
    let record = core
        .submit_search("plate hunt", "car A123BC77", "cam-1", &window)
        .await
        .unwrap();
    let record = helpers::wait_terminal(&core, record.id).await;
    assert_eq!(record.status, JobStatus::Completed);

    let results = core.search_results(record.id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].object_id.as_deref(), Some(plate_id.as_str()));
    assert_eq!(results[0].plate_score, 1.0);
    assert_eq!(results[1].plate_score, 0.0);

    // One live event per track.
    let events = core.search_events(record.id).await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn candidates_on_one_track_coalesce_into_a_single_event() {
    let core = in_memory_core(ExtractorsBuilder::new().build()).await;
    core.register_source("cam-1").await.unwrap();

    for (second, similarity) in [(1, 0.5f32), (2, 0.9), (3, 0.7)] {
        seed_object(
            core.store(),
            "cam-1",
            &format!("2025-01-01T10:00:0{second}"),
            second as f64,
            vector_with_similarity(similarity),
            ObjectType::Transport,
            Some(9),
            plain_transport(),
        )
        .await;
    }

    let window = range("2025-01-01T10:00:00", "2025-01-01T10:01:00");
    let record = core
        .submit_search("track", "car", "cam-1", &window)
        .await
        .unwrap();
    let record = helpers::wait_terminal(&core, record.id).await;
    assert_eq!(record.status, JobStatus::Completed);

    let events = core.search_events(record.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].track_id, Some(9));
    assert!((events[0].score - 0.9).abs() < 1e-3);
}

#[tokio::test]
async fn ranking_is_reproducible_across_runs() {
    let core = in_memory_core(ExtractorsBuilder::new().build()).await;
    core.register_source("cam-1").await.unwrap();

    for (second, similarity) in [(1, 0.8f32), (2, 0.8), (3, 0.6), (4, 0.9)] {
        seed_object(
            core.store(),
            "cam-1",
            &format!("2025-01-01T10:00:0{second}"),
            second as f64,
            vector_with_similarity(similarity),
            ObjectType::Transport,
            None,
            plain_transport(),
        )
        .await;
    }

    let window = range("2025-01-01T10:00:00", "2025-01-01T10:01:00");
    let mut orderings = Vec::new();
    for run in 0..2 {
        let record = core
            .submit_search(&format!("run {run}"), "car", "cam-1", &window)
            .await
            .unwrap();
        let record = helpers::wait_terminal(&core, record.id).await;
        assert_eq!(record.status, JobStatus::Completed);

        let results = core.search_results(record.id).await.unwrap();
        orderings.push(
            results
                .iter()
                .map(|r| (r.rank, r.object_id.clone(), r.final_score))
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(orderings[0], orderings[1]);

    // Equal clip scores fall back to the earlier frame.
    let first = &orderings[0];
    assert_eq!(first[0].2, first.iter().map(|r| r.2).fold(f64::MIN, f64::max));
}

#[tokio::test]
async fn query_without_type_searches_frames() {
    let core = in_memory_core(ExtractorsBuilder::new().build()).await;
    core.register_source("cam-1").await.unwrap();

    let strong = seed_frame(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:02",
        2.0,
        vector_with_similarity(0.95),
    )
    .await;
    seed_frame(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:04",
        4.0,
        vector_with_similarity(0.5),
    )
    .await;

    let window = range("2025-01-01T10:00:00", "2025-01-01T10:01:00");
    let record = core
        .submit_search("scene", "crowded intersection", "cam-1", &window)
        .await
        .unwrap();
    let record = helpers::wait_terminal(&core, record.id).await;
    assert_eq!(record.status, JobStatus::Completed);

    let results = core.search_results(record.id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].frame_id, strong);
    assert_eq!(results[0].object_id, None);

    // Frame hits carry no object identity, so no track events.
    let events = core.search_events(record.id).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn time_window_restricts_candidates() {
    let core = in_memory_core(ExtractorsBuilder::new().build()).await;
    core.register_source("cam-1").await.unwrap();

    seed_object(
        core.store(),
        "cam-1",
        "2025-01-01T09:59:59",
        0.0,
        vector_with_similarity(0.99),
        ObjectType::Transport,
        None,
        plain_transport(),
    )
    .await;
    let (_, inside_id) = seed_object(
        core.store(),
        "cam-1",
        "2025-01-01T10:00:30",
        30.0,
        vector_with_similarity(0.4),
        ObjectType::Transport,
        None,
        plain_transport(),
    )
    .await;

    let window = range("2025-01-01T10:00:00", "2025-01-01T10:01:00");
    let record = core
        .submit_search("windowed", "car", "cam-1", &window)
        .await
        .unwrap();
    let record = helpers::wait_terminal(&core, record.id).await;

    let results = core.search_results(record.id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].object_id.as_deref(), Some(inside_id.as_str()));
}

#[tokio::test]
async fn query_embedding_failure_is_fatal_with_no_partial_results() {
    let core = in_memory_core(
        ExtractorsBuilder::new()
            .embedder(Arc::new(FailingTextEmbedder))
            .build(),
    )
    .await;
    core.register_source("cam-1").await.unwrap();

    let window = range("2025-01-01T10:00:00", "2025-01-01T10:01:00");
    let record = core
        .submit_search("doomed", "red car", "cam-1", &window)
        .await
        .unwrap();
    let record = helpers::wait_terminal(&core, record.id).await;

    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.is_some());
    assert!(core.search_results(record.id).await.unwrap().is_empty());
    assert!(core.search_events(record.id).await.unwrap().is_empty());
}
