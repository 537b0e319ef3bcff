//! Job system: identifiers, statuses, the error taxonomy and the
//! process-wide supervisor.

pub mod error;
pub mod supervisor;
pub mod types;

pub use error::{JobError, JobResult};
pub use supervisor::JobSupervisor;
pub use types::{JobId, JobKind, JobRecord, JobStatus};
