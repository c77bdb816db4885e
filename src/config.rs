use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Immutable run parameters, fully resolved and validated before the first tick.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub interval: Duration,
    pub total_runtime: Duration,
    pub log_dir: PathBuf,
    pub data_path: PathBuf,
    pub retention: Duration,
}

/// Static per-OS defaults for the log directory and the monitored data path.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    pub log_dir: PathBuf,
    pub data_path: PathBuf,
}

/// Optional overrides loaded from a YAML file via `--config`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Overrides {
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub data_path: Option<PathBuf>,
    #[serde(default)]
    pub retention_days: Option<u64>,
    #[serde(default)]
    pub interval_minutes: Option<u64>,
    #[serde(default)]
    pub runtime_hours: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("collection interval must be a positive number of minutes")]
    InvalidInterval,
    #[error("total runtime must be a positive number of hours")]
    InvalidRuntime,
    #[error("retention must be a positive number of days")]
    InvalidRetention,
    #[error("unsupported operating system '{0}'")]
    UnsupportedPlatform(String),
    #[error("could not locate a home directory for the default log path")]
    NoHomeDir,
    #[error("log directory {path} is not writable: {source}")]
    LogDirUnwritable {
        path: String,
        source: std::io::Error,
    },
    #[error("could not read overrides file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

impl PlatformPaths {
    /// Declarative OS-to-path table, checked once at startup. An OS outside
    /// the table is a configuration error, not a runtime branch.
    pub fn for_current_os() -> Result<Self, ConfigError> {
        Self::for_os(std::env::consts::OS)
    }

    fn for_os(os: &str) -> Result<Self, ConfigError> {
        match os {
            "linux" => Ok(Self {
                log_dir: PathBuf::from("/var/log/healthmon"),
                data_path: PathBuf::from("/opt"),
            }),
            "macos" => {
                let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
                Ok(Self {
                    log_dir: home.join("Documents").join("healthmon"),
                    data_path: PathBuf::from("/Library"),
                })
            }
            "windows" => Ok(Self {
                log_dir: PathBuf::from(r"C:\temp\healthmon"),
                data_path: PathBuf::from(r"C:\ProgramData"),
            }),
            other => Err(ConfigError::UnsupportedPlatform(other.to_string())),
        }
    }
}

impl Overrides {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })
    }
}

impl RunConfig {
    pub fn build(
        paths: PlatformPaths,
        overrides: &Overrides,
        interval_minutes: u64,
        runtime_hours: f64,
    ) -> Result<Self, ConfigError> {
        // Out-of-range values are configuration errors like any other bad
        // input, never arithmetic panics.
        let interval_secs = match interval_minutes.checked_mul(60) {
            Some(secs) if secs > 0 => secs,
            _ => return Err(ConfigError::InvalidInterval),
        };
        if !runtime_hours.is_finite() || runtime_hours <= 0.0 {
            return Err(ConfigError::InvalidRuntime);
        }
        let total_runtime = Duration::try_from_secs_f64(runtime_hours * 3600.0)
            .map_err(|_| ConfigError::InvalidRuntime)?;
        let retention_days = overrides.retention_days.unwrap_or(default_retention_days());
        let retention_secs = match retention_days.checked_mul(SECS_PER_DAY) {
            Some(secs) if secs > 0 => secs,
            _ => return Err(ConfigError::InvalidRetention),
        };

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            total_runtime,
            log_dir: overrides.log_dir.clone().unwrap_or(paths.log_dir),
            data_path: overrides.data_path.clone().unwrap_or(paths.data_path),
            retention: Duration::from_secs(retention_secs),
        })
    }
}

/// Creates the log directory and proves it is writable by writing and
/// removing a probe file, before any sampling state exists.
pub fn ensure_log_dir(dir: &Path) -> Result<(), ConfigError> {
    let unwritable = |source| ConfigError::LogDirUnwritable {
        path: dir.display().to_string(),
        source,
    };

    fs::create_dir_all(dir).map_err(unwritable)?;
    let probe = dir.join("permission_test.tmp");
    fs::write(&probe, b"test").map_err(unwritable)?;
    fs::remove_file(&probe).map_err(unwritable)?;
    Ok(())
}

const fn default_retention_days() -> u64 {
    30
}
