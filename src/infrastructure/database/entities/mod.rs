//! SeaORM entities, one module per table.

pub mod embeddings;
pub mod frames;
pub mod objects;
pub mod person_attrs;
pub mod search_job_events;
pub mod search_job_results;
pub mod search_jobs;
pub mod sources;
pub mod tasks;
pub mod transport_attrs;
pub mod vectorization_jobs;
pub mod vectorized_periods;
