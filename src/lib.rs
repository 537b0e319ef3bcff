//! Sightline core
//!
//! Indexes video footage into per-frame and per-object embeddings and serves
//! ranked similarity search over a time range of a source feed. The two
//! moving parts are the vectorization job engine (incremental, idempotent
//! extraction over the not-yet-covered sub-ranges of a request) and the
//! search job engine (vector lookup fused with colour and plate signals),
//! both running as resumable, cancellable background jobs over a shared
//! SQLite store. The ML extractors and the frame decoder are consumed
//! through the traits in [`extract`]; the HTTP/CLI layer lives outside this
//! crate and talks to [`Sightline`].

pub mod config;
pub mod domain;
pub mod extract;
pub mod infrastructure;
pub mod operations;

pub use config::{init_tracing, AppConfig, FusionWeights};
pub use infrastructure::jobs::{
    JobError, JobId, JobKind, JobRecord, JobResult, JobStatus, JobSupervisor,
};

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::domain::TimeRange;
use crate::extract::Extractors;
use crate::infrastructure::database::entities::{
    search_job_events, search_job_results, sources, tasks,
};
use crate::infrastructure::database::Database;
use crate::infrastructure::store::{Store, StoreError};
use crate::operations::search::SearchEngine;
use crate::operations::vectorization::{
    check_coverage, CoverageReport, PeriodTracker, VectorizationEngine,
};

/// The assembled core: store, engines and supervisor.
pub struct Sightline {
    config: AppConfig,
    #[allow(dead_code)]
    database: Database,
    store: Store,
    tracker: PeriodTracker,
    pub jobs: Arc<JobSupervisor>,
}

impl Sightline {
    /// Open the database at the configured path, run migrations and wire up
    /// the engines.
    pub async fn new(config: AppConfig, extractors: Extractors) -> Result<Self, StoreError> {
        let database = Database::open(&config.database_path()).await?;
        Self::with_database(config, extractors, database).await
    }

    /// Fully in-memory instance, used by tests.
    pub async fn new_in_memory(
        config: AppConfig,
        extractors: Extractors,
    ) -> Result<Self, StoreError> {
        let database = Database::open_in_memory().await?;
        Self::with_database(config, extractors, database).await
    }

    async fn with_database(
        config: AppConfig,
        extractors: Extractors,
        database: Database,
    ) -> Result<Self, StoreError> {
        database.migrate().await?;

        let store = Store::new(database.conn().clone())
            .with_retry_budget(Duration::from_secs(config.database.retry_max_elapsed_secs));
        let tracker = PeriodTracker::new(store.clone());

        let vectorization = VectorizationEngine::new(store.clone(), extractors.clone());
        let search = SearchEngine::new(store.clone(), extractors, config.search.clone());
        let jobs = Arc::new(JobSupervisor::new(
            store.clone(),
            vectorization,
            search,
            config.jobs.worker_pool_size,
        ));

        info!("sightline core initialized");

        Ok(Self {
            config,
            database,
            store,
            tracker,
            jobs,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // --- source and task registry ---

    pub async fn register_source(&self, source_id: &str) -> Result<sources::Model, StoreError> {
        self.store.ensure_source(source_id).await
    }

    pub async fn list_sources(&self) -> Result<Vec<sources::Model>, StoreError> {
        self.store.list_sources().await
    }

    pub async fn create_task(
        &self,
        name: &str,
        source_id: &str,
        range: &TimeRange,
    ) -> Result<tasks::Model, StoreError> {
        self.store
            .create_task(name, source_id, range.start_at.as_str(), range.end_at.as_str())
            .await
    }

    pub async fn list_tasks(&self, source_id: &str) -> Result<Vec<tasks::Model>, StoreError> {
        self.store.list_tasks_for_source(source_id).await
    }

    // --- job lifecycle (status/progress/error fields verbatim from the
    //     persisted records) ---

    pub async fn submit_vectorization(
        &self,
        source_id: &str,
        ranges: &[TimeRange],
    ) -> JobResult<JobRecord> {
        self.jobs.submit_vectorization(source_id, ranges).await
    }

    pub async fn submit_search(
        &self,
        title: &str,
        text_query: &str,
        source_id: &str,
        range: &TimeRange,
    ) -> JobResult<JobRecord> {
        self.jobs
            .submit_search(title, text_query, source_id, range)
            .await
    }

    pub async fn job_status(&self, job_id: JobId) -> JobResult<JobRecord> {
        self.jobs.status(job_id).await
    }

    pub async fn cancel_job(&self, job_id: JobId) -> JobResult<JobRecord> {
        self.jobs.cancel(job_id).await
    }

    pub async fn search_results(
        &self,
        job_id: JobId,
    ) -> Result<Vec<search_job_results::Model>, StoreError> {
        self.store.search_results(&job_id.to_string()).await
    }

    pub async fn search_events(
        &self,
        job_id: JobId,
    ) -> Result<Vec<search_job_events::Model>, StoreError> {
        self.store.search_events(&job_id.to_string()).await
    }

    // --- coverage ---

    pub async fn vectorized_periods(&self, source_id: &str) -> Result<Vec<TimeRange>, StoreError> {
        self.tracker.periods(source_id).await
    }

    pub async fn check_coverage(
        &self,
        source_id: &str,
        range: &TimeRange,
    ) -> Result<CoverageReport, StoreError> {
        check_coverage(&self.tracker, source_id, range).await
    }

    // --- lifecycle ---

    /// Respawn workers for jobs left unfinished by a previous process.
    pub async fn resume_interrupted(&self) -> JobResult<usize> {
        self.jobs.resume_interrupted().await
    }

    pub async fn shutdown(&self) {
        self.jobs.shutdown().await;
    }
}
