//! Typed store over the database connection.
//!
//! Every method is one logical unit of work: a single statement or a single
//! transaction. No long-lived transaction ever spans a whole job. Mutating
//! units that may hit transient failures go through `retried`, a bounded
//! exponential backoff; once the budget is exhausted the error propagates to
//! the job body and becomes job-fatal.

use backoff::ExponentialBackoff;
use sea_orm::{DatabaseConnection, DbErr};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub mod embeddings;
pub mod frames;
pub mod jobs;
pub mod periods;
pub mod results;
pub mod sources;

pub use embeddings::{cosine_similarity, ScoredFrameCandidate, ScoredObjectCandidate};
pub use frames::{FrameBundle, ObjectAttributes, ObjectBundle};
pub use results::NewSearchResult;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbErr),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored row is corrupt: {0}")]
    Corrupt(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Connection-level failures are worth retrying; constraint violations
    /// and corrupt rows are not.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Db(DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
        )
    }
}

#[derive(Clone)]
pub struct Store {
    conn: DatabaseConnection,
    retry_max_elapsed: Duration,
}

impl Store {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            retry_max_elapsed: Duration::from_secs(10),
        }
    }

    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_max_elapsed = budget;
        self
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Run a store unit with bounded exponential backoff on transient
    /// failures.
    pub(crate) async fn retried<T, F, Fut>(
        &self,
        op_name: &'static str,
        mut unit: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.retry_max_elapsed),
            ..ExponentialBackoff::default()
        };

        backoff::future::retry(policy, || {
            let attempt = unit();
            async move {
                attempt.await.map_err(|err| {
                    if err.is_transient() {
                        warn!(op = op_name, error = %err, "transient store failure, retrying");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}
