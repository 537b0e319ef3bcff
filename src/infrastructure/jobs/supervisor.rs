//! Job supervisor: the process-wide registry of in-flight jobs.
//!
//! Created at process start, drained at shutdown. Enforces at most one
//! concurrent execution per job id, idempotent submission, cooperative
//! cancellation and the per-source advisory locks vectorization needs.
//! Job bodies run on a fixed-size worker pool; every path through a body
//! ends with a persisted terminal status.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::{JobError, JobResult};
use super::types::{JobId, JobKind, JobRecord, JobStatus};
use crate::domain::{TimeRange, ValidationError};
use crate::infrastructure::database::entities::{search_jobs, vectorization_jobs};
use crate::infrastructure::store::Store;
use crate::operations::search::SearchEngine;
use crate::operations::vectorization::VectorizationEngine;

pub struct JobSupervisor {
    store: Store,
    vectorization: Arc<VectorizationEngine>,
    search: Arc<SearchEngine>,
    pool: Arc<Semaphore>,
    running: Arc<RwLock<HashMap<JobId, RunningJob>>>,
    source_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

struct RunningJob {
    kind: JobKind,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl JobSupervisor {
    pub fn new(
        store: Store,
        vectorization: VectorizationEngine,
        search: SearchEngine,
        worker_pool_size: usize,
    ) -> Self {
        Self {
            store,
            vectorization: Arc::new(vectorization),
            search: Arc::new(search),
            pool: Arc::new(Semaphore::new(worker_pool_size.max(1))),
            running: Arc::new(RwLock::new(HashMap::new())),
            source_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Submit a vectorization job over `ranges` of `source_id`. Validation
    /// failures reject the submission without creating a job row.
    pub async fn submit_vectorization(
        &self,
        source_id: &str,
        ranges: &[TimeRange],
    ) -> JobResult<JobRecord> {
        if ranges.is_empty() {
            return Err(ValidationError::EmptyRangeSet.into());
        }
        for range in ranges {
            validate_range(range)?;
        }
        if self.store.find_source(source_id).await?.is_none() {
            return Err(ValidationError::UnknownSource(source_id.to_string()).into());
        }

        let job_id = JobId::new();
        let model = self
            .store
            .create_vectorization_job(&job_id.to_string(), source_id, ranges)
            .await?;

        info!(job_id = %job_id, source_id, "vectorization job submitted");
        self.spawn(job_id, JobKind::Vectorization, source_id.to_string())
            .await;
        Ok(vectorization_record(&model))
    }

    /// Submit a search job over `[range.start_at, range.end_at)` of
    /// `source_id`.
    pub async fn submit_search(
        &self,
        title: &str,
        text_query: &str,
        source_id: &str,
        range: &TimeRange,
    ) -> JobResult<JobRecord> {
        if text_query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        validate_range(range)?;
        if self.store.find_source(source_id).await?.is_none() {
            return Err(ValidationError::UnknownSource(source_id.to_string()).into());
        }

        let job_id = JobId::new();
        let model = self
            .store
            .create_search_job(&job_id.to_string(), title, text_query, source_id, range)
            .await?;

        info!(job_id = %job_id, source_id, "search job submitted");
        self.spawn(job_id, JobKind::Search, source_id.to_string())
            .await;
        Ok(search_record(&model))
    }

    /// Start (or restart) execution of an existing job. Idempotent: a job
    /// already running in this process, or already terminal, is left alone
    /// and its current record returned.
    pub async fn start(&self, job_id: JobId) -> JobResult<JobRecord> {
        let record = self.status(job_id).await?;

        if self.running.read().await.contains_key(&job_id) {
            return Ok(record);
        }
        if record.status.is_terminal() {
            return Ok(record);
        }

        let source_id = self.job_source(&record).await?;
        self.spawn(job_id, record.kind, source_id).await;
        self.status(job_id).await
    }

    /// Request cancellation. Accepted only while PENDING or RUNNING; the
    /// status flips immediately and a running worker stops at its next
    /// cooperative checkpoint, leaving partial state intact.
    pub async fn cancel(&self, job_id: JobId) -> JobResult<JobRecord> {
        let record = self.status(job_id).await?;
        if !record.status.is_cancellable() {
            return Err(ValidationError::NotCancellable(job_id.to_string()).into());
        }

        let id = job_id.to_string();
        let model_record = match record.kind {
            JobKind::Vectorization => vectorization_record(
                &self
                    .store
                    .transition_vectorization_status(&id, JobStatus::Cancelled, None)
                    .await?,
            ),
            JobKind::Search => search_record(
                &self
                    .store
                    .transition_search_status(&id, JobStatus::Cancelled, None)
                    .await?,
            ),
        };

        if let Some(running) = self.running.read().await.get(&job_id) {
            running.cancel.cancel();
        }

        info!(job_id = %job_id, "cancellation requested");
        Ok(model_record)
    }

    /// Current persisted record of a job, fields verbatim from the store.
    pub async fn status(&self, job_id: JobId) -> JobResult<JobRecord> {
        let id = job_id.to_string();
        if let Some(model) = self.store.vectorization_job(&id).await? {
            return Ok(vectorization_record(&model));
        }
        if let Some(model) = self.store.search_job(&id).await? {
            return Ok(search_record(&model));
        }
        Err(JobError::NotFound(id))
    }

    /// Respawn workers for jobs a previous process left PENDING or RUNNING.
    /// Vectorization resumes from coverage, search restarts scoring.
    pub async fn resume_interrupted(&self) -> JobResult<usize> {
        let mut resumed = 0;

        for model in self.store.list_vectorization_jobs().await? {
            if let Some(job_id) = JobId::parse(&model.id) {
                if !record_is_terminal(&model.status)
                    && !self.running.read().await.contains_key(&job_id)
                {
                    info!(job_id = %job_id, "resuming interrupted vectorization job");
                    self.spawn(job_id, JobKind::Vectorization, model.source_id.clone())
                        .await;
                    resumed += 1;
                }
            }
        }
        for model in self.store.list_search_jobs().await? {
            if let Some(job_id) = JobId::parse(&model.id) {
                if !record_is_terminal(&model.status)
                    && !self.running.read().await.contains_key(&job_id)
                {
                    info!(job_id = %job_id, "resuming interrupted search job");
                    self.spawn(job_id, JobKind::Search, model.source_id.clone())
                        .await;
                    resumed += 1;
                }
            }
        }

        Ok(resumed)
    }

    /// Cancel everything still running and wait for the workers to settle.
    pub async fn shutdown(&self) {
        info!("shutting down job supervisor");

        let handles: Vec<(JobId, JoinHandle<()>)> = {
            let mut running = self.running.write().await;
            running
                .drain()
                .map(|(id, job)| {
                    job.cancel.cancel();
                    (id, job.handle)
                })
                .collect()
        };

        let joined = futures::future::join_all(
            handles
                .into_iter()
                .map(|(job_id, handle)| async move { (job_id, handle.await) }),
        )
        .await;

        for (job_id, result) in joined {
            if let Err(err) = result {
                warn!(job_id = %job_id, error = %err, "worker did not shut down cleanly");
            }
        }
    }

    /// Advisory lock serializing vectorization work per source.
    pub(crate) async fn source_lock(&self, source_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.source_locks.lock().await;
        locks
            .entry(source_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn job_source(&self, record: &JobRecord) -> JobResult<String> {
        let id = record.id.to_string();
        match record.kind {
            JobKind::Vectorization => Ok(self
                .store
                .vectorization_job(&id)
                .await?
                .ok_or(JobError::NotFound(id))?
                .source_id),
            JobKind::Search => Ok(self
                .store
                .search_job(&id)
                .await?
                .ok_or(JobError::NotFound(id))?
                .source_id),
        }
    }

    /// Put a worker on the pool for this job. The registry entry is created
    /// before the task is spawned, so a second start of the same id is a
    /// no-op.
    async fn spawn(&self, job_id: JobId, kind: JobKind, source_id: String) {
        let mut running = self.running.write().await;
        if running.contains_key(&job_id) {
            return;
        }

        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let store = self.store.clone();
        let pool = self.pool.clone();
        let registry = self.running.clone();
        let vectorization = self.vectorization.clone();
        let search = self.search.clone();
        let source_lock = self.source_lock(&source_id).await;

        let handle = tokio::spawn(async move {
            let _permit = match pool.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let outcome = execute_job(
                &store,
                &vectorization,
                &search,
                job_id,
                kind,
                &worker_cancel,
                source_lock,
            )
            .await;

            if let Err(err) = outcome {
                error!(job_id = %job_id, error = %err, "failed to persist terminal job status");
            }

            registry.write().await.remove(&job_id);
        });

        running.insert(
            job_id,
            RunningJob {
                kind,
                cancel,
                handle,
            },
        );
    }

    /// Kinds of the jobs currently executing in this process.
    pub async fn running_jobs(&self) -> Vec<(JobId, JobKind)> {
        self.running
            .read()
            .await
            .iter()
            .map(|(id, job)| (*id, job.kind))
            .collect()
    }
}

/// Run one job body and persist its terminal status. Returns an error only
/// when the terminal status itself could not be written.
async fn execute_job(
    store: &Store,
    vectorization: &VectorizationEngine,
    search: &SearchEngine,
    job_id: JobId,
    kind: JobKind,
    cancel: &CancellationToken,
    source_lock: Arc<Mutex<()>>,
) -> JobResult<()> {
    let id = job_id.to_string();

    // Claim the job. If a cancellation (or another terminal transition)
    // already landed, the transition is a no-op and we stand down.
    let claimed_status = match kind {
        JobKind::Vectorization => {
            let model = store
                .transition_vectorization_status(&id, JobStatus::Running, None)
                .await?;
            model.status
        }
        JobKind::Search => {
            let model = store
                .transition_search_status(&id, JobStatus::Running, None)
                .await?;
            model.status
        }
    };
    if claimed_status != JobStatus::Running.to_string() {
        info!(job_id = %job_id, status = %claimed_status, "job already terminal, worker standing down");
        return Ok(());
    }

    let outcome = match kind {
        JobKind::Vectorization => vectorization.run(&job_id, cancel, source_lock).await,
        JobKind::Search => search.run(&job_id, cancel).await,
    };

    let (status, error) = match &outcome {
        Ok(()) => (JobStatus::Completed, None),
        Err(JobError::Cancelled) => (JobStatus::Cancelled, None),
        Err(err) => (JobStatus::Failed, Some(err.to_string())),
    };

    match kind {
        JobKind::Vectorization => {
            if status == JobStatus::Completed {
                store.advance_vectorization_progress(&id, 1.0).await?;
            }
            store
                .transition_vectorization_status(&id, status, error.as_deref())
                .await?;
        }
        JobKind::Search => {
            if status == JobStatus::Completed {
                store.advance_search_progress(&id, 1.0).await?;
            }
            store
                .transition_search_status(&id, status, error.as_deref())
                .await?;
        }
    }

    match &outcome {
        Ok(()) => info!(job_id = %job_id, %kind, "job completed"),
        Err(JobError::Cancelled) => info!(job_id = %job_id, %kind, "job cancelled"),
        Err(err) => warn!(job_id = %job_id, %kind, error = %err, "job failed"),
    }

    Ok(())
}

fn validate_range(range: &TimeRange) -> Result<(), ValidationError> {
    range.start_at.parse()?;
    range.end_at.parse()?;
    if range.end_at < range.start_at {
        return Err(ValidationError::InvertedRange(
            range.start_at.as_str().to_string(),
            range.end_at.as_str().to_string(),
        ));
    }
    Ok(())
}

fn record_is_terminal(status: &str) -> bool {
    status
        .parse::<JobStatus>()
        .map(|s| s.is_terminal())
        .unwrap_or(true)
}

pub(crate) fn vectorization_record(model: &vectorization_jobs::Model) -> JobRecord {
    JobRecord {
        id: JobId::parse(&model.id).unwrap_or_default(),
        kind: JobKind::Vectorization,
        status: model
            .status
            .parse()
            .unwrap_or(JobStatus::Failed),
        progress: model.progress,
        error: model.error.clone(),
    }
}

pub(crate) fn search_record(model: &search_jobs::Model) -> JobRecord {
    JobRecord {
        id: JobId::parse(&model.id).unwrap_or_default(),
        kind: JobKind::Search,
        status: model
            .status
            .parse()
            .unwrap_or(JobStatus::Failed),
        progress: model.progress,
        error: model.error.clone(),
    }
}
