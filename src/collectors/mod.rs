pub mod system;

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One successful read of every metric group. Values are already rounded to
/// their presentation precision so both sinks render identically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsBundle {
    pub cpu_usage_percent: u64,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
    pub memory_usage_percent: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub disk_usage_percent: f64,
    pub uptime_days: u64,
}

/// The frozen result of one collection attempt. A failed attempt carries no
/// metrics at all: a failure in any probe invalidates the whole bundle, and
/// partial reads are never persisted.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub taken_at: DateTime<Local>,
    pub metrics: Option<MetricsBundle>,
    pub error_cause: Option<String>,
}

impl Snapshot {
    pub fn collected(taken_at: DateTime<Local>, metrics: MetricsBundle) -> Self {
        Self {
            taken_at,
            metrics: Some(metrics),
            error_cause: None,
        }
    }

    pub fn degraded(taken_at: DateTime<Local>, cause: String) -> Self {
        Self {
            taken_at,
            metrics: None,
            error_cause: Some(cause),
        }
    }

    /// The trailing error-code line of the text log, `None` when the tick
    /// collected cleanly.
    pub fn error_code(&self) -> &str {
        self.error_cause.as_deref().unwrap_or("None")
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cpu statistics unavailable")]
    CpuUnavailable,
    #[error("memory statistics unavailable")]
    MemoryUnavailable,
    #[error("data path {} does not exist", .path.display())]
    DataPathMissing { path: PathBuf },
    #[error("no mounted filesystem contains {}", .path.display())]
    DiskPathNotFound { path: PathBuf },
}

/// Source of per-tick metric bundles. The scheduling loop only depends on
/// this seam, so tests drive it with canned bundles and failures.
pub trait MetricsProvider {
    fn collect(&mut self, data_path: &Path) -> Result<MetricsBundle, CollectError>;
}
