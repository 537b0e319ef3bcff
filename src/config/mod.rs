//! Application configuration
//!
//! Loaded from `sightline.json` in the data directory, created with defaults
//! when missing. Everything tunable at runtime lives here: store location,
//! extractor limits, worker pool size and the search fusion weights.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "sightline.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config schema version
    pub version: u32,

    /// Data directory path
    pub data_dir: PathBuf,

    /// Logging level filter (tracing env-filter syntax)
    pub log_level: String,

    pub database: DatabaseConfig,
    pub extractor: ExtractorConfig,
    pub jobs: JobsConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file name inside the data directory.
    pub file_name: String,
    /// Upper bound on total time spent retrying a failed store unit.
    pub retry_max_elapsed_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Maximum extractor calls in flight at once.
    pub max_concurrent: usize,
    /// Per-call timeout; a timed-out call fails only its unit of work.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Fixed size of the job worker pool.
    pub worker_pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Candidate pool size for the similarity lookup (top-K).
    pub max_candidates: u64,
    /// Number of ranked rows persisted as the final result set.
    pub max_results: usize,
    /// Candidates scored between cancellation/progress checkpoints.
    pub batch_size: usize,
    /// Scores below this are not considered a plate match at all.
    pub min_plate_similarity: f64,
    pub weights: FusionWeights,
}

/// Relative weights of the score components. Inapplicable components are
/// dropped and the remaining weights renormalized, so the values only need
/// to be meaningful relative to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionWeights {
    pub clip: f64,
    pub color: f64,
    pub plate: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            clip: 0.5,
            color: 0.25,
            plate: 0.25,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_with_dir(PathBuf::from("."))
    }
}

impl AppConfig {
    pub fn default_with_dir(data_dir: PathBuf) -> Self {
        Self {
            version: 1,
            data_dir,
            log_level: "info".to_string(),
            database: DatabaseConfig {
                file_name: "sightline.db".to_string(),
                retry_max_elapsed_secs: 10,
            },
            extractor: ExtractorConfig {
                max_concurrent: 4,
                timeout_secs: 30,
            },
            jobs: JobsConfig {
                worker_pool_size: 4,
            },
            search: SearchConfig {
                max_candidates: 500,
                max_results: 100,
                batch_size: 64,
                min_plate_similarity: 0.4,
                weights: FusionWeights::default(),
            },
        }
    }

    /// Load configuration from a data directory, creating the default file
    /// when none exists yet.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);

        if config_path.exists() {
            info!("Loading config from {:?}", config_path);
            let json = fs::read_to_string(&config_path)?;
            let config: AppConfig = serde_json::from_str(&json)?;
            Ok(config)
        } else {
            warn!("No config found, creating default at {:?}", config_path);
            let config = Self::default_with_dir(data_dir.to_path_buf());
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let config_path = self.data_dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, json)?;
        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database.file_name)
    }
}

/// Install the global tracing subscriber. Call once at process start.
pub fn init_tracing(filter: &str) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();
}
