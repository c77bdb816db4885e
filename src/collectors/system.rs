use crate::collectors::{CollectError, MetricsBundle, MetricsProvider};
use std::path::Path;
use std::time::Duration;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use tracing::debug;

/// CPU usage is a delta between two refreshes; an instantaneous read would
/// always report zero.
const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(250);

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Platform-backed metrics provider. Holds the `sysinfo::System` handle for
/// the whole run so successive CPU refreshes measure real deltas.
pub struct SysinfoProvider {
    system: System,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for SysinfoProvider {
    fn collect(&mut self, data_path: &Path) -> Result<MetricsBundle, CollectError> {
        let system = &mut self.system;

        system.refresh_cpu();
        std::thread::sleep(CPU_SAMPLE_WINDOW);
        system.refresh_cpu();
        if system.cpus().is_empty() {
            return Err(CollectError::CpuUnavailable);
        }
        let cpu_usage_percent = system.global_cpu_info().cpu_usage().round().max(0.0) as u64;

        system.refresh_memory();
        let memory_total_bytes = system.total_memory();
        if memory_total_bytes == 0 {
            return Err(CollectError::MemoryUnavailable);
        }
        let memory_used_bytes = system.used_memory();
        let memory_usage_percent =
            round_percent(memory_used_bytes as f64 / memory_total_bytes as f64 * 100.0);

        system.refresh_disks_list();
        system.refresh_disks();
        let (disk_used_bytes, disk_total_bytes) = disk_usage_for_path(system, data_path)?;
        let disk_usage_percent = if disk_total_bytes > 0 {
            round_percent(disk_used_bytes as f64 / disk_total_bytes as f64 * 100.0)
        } else {
            0.0
        };

        let uptime_days = system.uptime() / SECS_PER_DAY;

        debug!(
            cpu = cpu_usage_percent,
            memory_used_bytes,
            disk_used_bytes,
            uptime_days,
            "collected metrics bundle"
        );

        Ok(MetricsBundle {
            cpu_usage_percent,
            memory_used_gb: round_gb(memory_used_bytes),
            memory_total_gb: round_gb(memory_total_bytes),
            memory_usage_percent,
            disk_used_gb: round_gb(disk_used_bytes),
            disk_total_gb: round_gb(disk_total_bytes),
            disk_usage_percent,
            uptime_days,
        })
    }
}

/// Resolves the data path to the mounted filesystem with the longest mount
/// point that is a prefix of it, the way `df` attributes a path to a mount.
/// A data path that does not exist fails the probe outright.
fn disk_usage_for_path(system: &System, data_path: &Path) -> Result<(u64, u64), CollectError> {
    if !data_path.exists() {
        return Err(CollectError::DataPathMissing {
            path: data_path.to_path_buf(),
        });
    }

    let best = system
        .disks()
        .iter()
        .filter(|d| data_path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len());

    match best {
        Some(disk) => {
            let total = disk.total_space();
            let used = total.saturating_sub(disk.available_space());
            Ok((used, total))
        }
        None => Err(CollectError::DiskPathNotFound {
            path: data_path.to_path_buf(),
        }),
    }
}

fn round_gb(bytes: u64) -> f64 {
    (bytes as f64 / GIB * 100.0).round() / 100.0
}

fn round_percent(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
