use crate::collectors::{MetricsProvider, Snapshot};
use crate::config::RunConfig;
use crate::host::HostIdentity;
use crate::ledger::{Ledger, LedgerRow};
use crate::logfile;
use chrono::Local;
use std::io;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

/// What the loop leaves behind for the summary reporter.
#[derive(Debug, Clone, Copy)]
pub struct SamplerOutcome {
    pub ticks: u64,
    pub start_row_count: usize,
}

/// Persistence failures end the run; permissions were proven at startup, so
/// anything failing here is worth stopping for.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not write activity log in {dir}: {source}")]
    LogFile { dir: String, source: io::Error },
    #[error("ledger I/O failed for {path}: {source}")]
    Ledger { path: String, source: io::Error },
    #[error("could not prune log directory {dir}: {source}")]
    Prune { dir: String, source: io::Error },
}

/// Drives the sampling run: collect, persist to both sinks, prune, then
/// either sleep one interval or stop. Collection failures degrade the tick
/// and the loop carries on; only persistence failures abort.
pub async fn run_sampler<P: MetricsProvider>(
    cfg: &RunConfig,
    identity: &HostIdentity,
    provider: &mut P,
    ledger: &Ledger,
) -> Result<SamplerOutcome, RunError> {
    let ledger_err = |source| RunError::Ledger {
        path: ledger.path().display().to_string(),
        source,
    };

    let start_row_count = ledger.row_count().map_err(ledger_err)?;
    let deadline = Instant::now() + cfg.total_runtime;
    let mut ticks = 0_u64;

    loop {
        let taken_at = Local::now();
        let snapshot = match provider.collect(&cfg.data_path) {
            Ok(bundle) => Snapshot::collected(taken_at, bundle),
            Err(err) => {
                warn!(error = %err, "metric collection failed, recording degraded sample");
                Snapshot::degraded(taken_at, err.to_string())
            }
        };

        let row = LedgerRow::from_snapshot(&snapshot, &identity.hostname);
        println!("{}", LedgerRow::display_header());
        println!("{}", row.display_line());

        logfile::write_snapshot_log(&cfg.log_dir, identity, &snapshot).map_err(|source| {
            RunError::LogFile {
                dir: cfg.log_dir.display().to_string(),
                source,
            }
        })?;
        ledger.append(&row).map_err(ledger_err)?;

        let removed = logfile::prune_old_logs(&cfg.log_dir, cfg.retention, Some(ledger.path()))
            .map_err(|source| RunError::Prune {
                dir: cfg.log_dir.display().to_string(),
                source,
            })?;
        if removed > 0 {
            info!(removed, "pruned expired activity logs");
        }

        ticks += 1;

        // Lookahead exit: stop as soon as another full interval no longer
        // fits before the deadline. This is the loop's only exit condition.
        if Instant::now() + cfg.interval >= deadline {
            println!("\nExiting metric collection");
            break;
        }

        println!("\nSampling run is in progress ...");
        tokio::time::sleep(cfg.interval).await;
    }

    info!(ticks, "sampling loop stopped");
    Ok(SamplerOutcome {
        ticks,
        start_row_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{CollectError, MetricsBundle};
    use crate::ledger::ledger_file_name;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    struct FakeProvider {
        fail: bool,
        calls: usize,
    }

    impl FakeProvider {
        fn healthy() -> Self {
            Self {
                fail: false,
                calls: 0,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                calls: 0,
            }
        }
    }

    impl MetricsProvider for FakeProvider {
        fn collect(&mut self, data_path: &Path) -> Result<MetricsBundle, CollectError> {
            self.calls += 1;
            if self.fail {
                return Err(CollectError::DataPathMissing {
                    path: data_path.to_path_buf(),
                });
            }
            Ok(MetricsBundle {
                cpu_usage_percent: 12,
                memory_used_gb: 4.2,
                memory_total_gb: 16.0,
                memory_usage_percent: 26.3,
                disk_used_gb: 100.0,
                disk_total_gb: 250.0,
                disk_usage_percent: 40.0,
                uptime_days: 3,
            })
        }
    }

    fn fixture(interval_secs: u64, runtime_secs: u64) -> (TempDir, RunConfig, HostIdentity, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            interval: Duration::from_secs(interval_secs),
            total_runtime: Duration::from_secs(runtime_secs),
            log_dir: dir.path().to_path_buf(),
            data_path: PathBuf::from("/unused/in/tests"),
            retention: Duration::from_secs(30 * 24 * 60 * 60),
        };
        let identity = HostIdentity {
            hostname: "host-a".to_string(),
            os_type: "Linux".to_string(),
            os_version: "6.1".to_string(),
            agent_version: "healthmon 0.1.0".to_string(),
        };
        let ledger = Ledger::new(dir.path().join(ledger_file_name(&identity.hostname)));
        (dir, cfg, identity, ledger)
    }

    fn activity_log_count(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .ends_with("_SystemHealth_Log.txt")
            })
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_shorter_than_interval_still_produces_one_tick() {
        let (dir, cfg, identity, ledger) = fixture(60, 10);
        let mut provider = FakeProvider::healthy();

        let outcome = run_sampler(&cfg, &identity, &mut provider, &ledger)
            .await
            .unwrap();

        assert_eq!(outcome.ticks, 1);
        assert_eq!(outcome.start_row_count, 0);
        assert_eq!(provider.calls, 1);
        assert_eq!(ledger.row_count().unwrap(), 1);
        assert_eq!(activity_log_count(dir.path()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_count_matches_an_exact_multiple_window() {
        // 300 s of runtime at a 60 s interval: ticks at 0/60/120/180/240,
        // then the lookahead sees 240 + 60 >= 300 and stops.
        let (_dir, cfg, identity, ledger) = fixture(60, 300);
        let mut provider = FakeProvider::healthy();

        let outcome = run_sampler(&cfg, &identity, &mut provider, &ledger)
            .await
            .unwrap();

        assert_eq!(outcome.ticks, 5);
        assert_eq!(ledger.row_count().unwrap(), 5);
        assert_eq!(ledger.rows_since(outcome.start_row_count).unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn non_multiple_window_runs_until_the_lookahead_trips() {
        // 150 s of runtime at a 60 s interval: ticks at 0/60/120; only at
        // 120 s does 120 + 60 >= 150 hold, so the loop never overshoots the
        // deadline but does use the partial tail of the window.
        let (_dir, cfg, identity, ledger) = fixture(60, 150);
        let mut provider = FakeProvider::healthy();

        let outcome = run_sampler(&cfg, &identity, &mut provider, &ledger)
            .await
            .unwrap();

        assert_eq!(outcome.ticks, 3);
        assert_eq!(ledger.row_count().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_collection_degrades_the_tick_but_not_the_run() {
        let (dir, cfg, identity, ledger) = fixture(60, 10);
        let mut provider = FakeProvider::failing();

        let outcome = run_sampler(&cfg, &identity, &mut provider, &ledger)
            .await
            .unwrap();

        assert_eq!(outcome.ticks, 1);
        let rows = ledger.rows_since(0).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_degraded());
        for field in &rows[0].fields()[2..] {
            assert_eq!(*field, "N/A");
        }

        // The activity log carries the cause verbatim.
        let log = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .find(|e| {
                e.file_name()
                    .to_string_lossy()
                    .ends_with("_SystemHealth_Log.txt")
            })
            .unwrap();
        let text = fs::read_to_string(log.path()).unwrap();
        assert!(text.contains("Error Code      : data path /unused/in/tests does not exist"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_count_is_captured_from_a_preexisting_ledger() {
        let (_dir, cfg, identity, ledger) = fixture(60, 10);
        let mut provider = FakeProvider::healthy();

        // Two rows from an earlier invocation.
        run_sampler(&cfg, &identity, &mut provider, &ledger)
            .await
            .unwrap();
        run_sampler(&cfg, &identity, &mut provider, &ledger)
            .await
            .unwrap();

        let outcome = run_sampler(&cfg, &identity, &mut provider, &ledger)
            .await
            .unwrap();
        assert_eq!(outcome.start_row_count, 2);
        assert_eq!(ledger.rows_since(outcome.start_row_count).unwrap().len(), 1);
        assert_eq!(ledger.row_count().unwrap(), 3);
    }
}
