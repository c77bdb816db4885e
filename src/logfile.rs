use crate::collectors::Snapshot;
use crate::host::HostIdentity;
use crate::ledger::LedgerRow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

const BANNER: &str = "==========================================================================================";

/// Writes the per-tick activity log as one whole file and returns its path.
/// File names carry second resolution, which stays collision-free while the
/// interval floor is one minute.
pub fn write_snapshot_log(
    dir: &Path,
    identity: &HostIdentity,
    snapshot: &Snapshot,
) -> io::Result<PathBuf> {
    let file_stamp = snapshot.taken_at.format("%Y-%m-%d_%H-%M-%S");
    let path = dir.join(format!(
        "{file_stamp}_{}_SystemHealth_Log.txt",
        identity.hostname
    ));

    let row = LedgerRow::from_snapshot(snapshot, &identity.hostname);
    let mut content = String::new();
    content.push_str(BANNER);
    content.push_str("\n\nSystem Health Log\n");
    content.push_str(BANNER);
    content.push('\n');
    content.push_str(&format!(
        "Script Run Time : {}\n",
        snapshot.taken_at.format("%Y-%m-%d %H:%M:%S")
    ));
    content.push_str(&format!("Hostname        : {}\n", identity.hostname));
    content.push_str(&format!("OS Type         : {}\n", identity.os_type));
    content.push_str(&format!("OS Version      : {}\n", identity.os_version));
    content.push_str(&format!("Agent Version   : {}\n\n", identity.agent_version));
    content.push_str(&LedgerRow::display_header());
    content.push('\n');
    content.push_str(&row.display_line());
    content.push_str("\n\n");
    content.push_str(&format!("Error Code      : {}\n", snapshot.error_code()));

    fs::write(&path, content)?;
    debug!(path = %path.display(), "wrote activity log");
    Ok(path)
}

/// Deletes regular files directly under `dir` whose modification time is
/// strictly older than `now - retention`. Subdirectories are not entered and
/// the active ledger file is never touched.
pub fn prune_old_logs(
    dir: &Path,
    retention: Duration,
    exclude: Option<&Path>,
) -> io::Result<usize> {
    let Some(cutoff) = SystemTime::now().checked_sub(retention) else {
        return Ok(0);
    };

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if exclude.is_some_and(|ex| ex == path) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if modified < cutoff {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }

    Ok(removed)
}
