use crate::collectors::Snapshot;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Fixed column order shared by the CSV header, the per-tick console echo and
/// the final summary table.
pub const COLUMNS: [&str; 10] = [
    "Timestamp",
    "Hostname",
    "CPU usage %",
    "Used Memory",
    "Total Memory",
    "Memory usage %",
    "Used Disk Space",
    "Total Disk Space",
    "Disk usage %",
    "Uptime",
];

const UNAVAILABLE: &str = "N/A";

pub fn ledger_file_name(hostname: &str) -> String {
    format!("Metric_History_csv_{hostname}.csv")
}

/// One persisted tick, already rendered to its column strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub timestamp: String,
    pub hostname: String,
    pub cpu_usage: String,
    pub memory_used: String,
    pub memory_total: String,
    pub memory_usage: String,
    pub disk_used: String,
    pub disk_total: String,
    pub disk_usage: String,
    pub uptime: String,
}

impl LedgerRow {
    pub fn from_snapshot(snapshot: &Snapshot, hostname: &str) -> Self {
        let timestamp = snapshot.taken_at.format("%Y-%m-%d %H:%M:%S").to_string();
        match &snapshot.metrics {
            Some(m) => Self {
                timestamp,
                hostname: hostname.to_string(),
                cpu_usage: format!("{}%", m.cpu_usage_percent),
                memory_used: format!("{:.2} GB", m.memory_used_gb),
                memory_total: format!("{:.2} GB", m.memory_total_gb),
                memory_usage: format!("{:.1}%", m.memory_usage_percent),
                disk_used: format!("{:.2} GB", m.disk_used_gb),
                disk_total: format!("{:.2} GB", m.disk_total_gb),
                disk_usage: format!("{:.1}%", m.disk_usage_percent),
                uptime: format!("{} Days", m.uptime_days),
            },
            None => Self {
                timestamp,
                hostname: hostname.to_string(),
                cpu_usage: UNAVAILABLE.to_string(),
                memory_used: UNAVAILABLE.to_string(),
                memory_total: UNAVAILABLE.to_string(),
                memory_usage: UNAVAILABLE.to_string(),
                disk_used: UNAVAILABLE.to_string(),
                disk_total: UNAVAILABLE.to_string(),
                disk_usage: UNAVAILABLE.to_string(),
                uptime: UNAVAILABLE.to_string(),
            },
        }
    }

    pub fn fields(&self) -> [&str; 10] {
        [
            &self.timestamp,
            &self.hostname,
            &self.cpu_usage,
            &self.memory_used,
            &self.memory_total,
            &self.memory_usage,
            &self.disk_used,
            &self.disk_total,
            &self.disk_usage,
            &self.uptime,
        ]
    }

    pub fn is_degraded(&self) -> bool {
        self.cpu_usage == UNAVAILABLE
    }

    fn to_csv_line(&self) -> String {
        self.fields().join(",")
    }

    fn from_csv_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != COLUMNS.len() {
            return None;
        }
        Some(Self {
            timestamp: parts[0].to_string(),
            hostname: parts[1].to_string(),
            cpu_usage: parts[2].to_string(),
            memory_used: parts[3].to_string(),
            memory_total: parts[4].to_string(),
            memory_usage: parts[5].to_string(),
            disk_used: parts[6].to_string(),
            disk_total: parts[7].to_string(),
            disk_usage: parts[8].to_string(),
            uptime: parts[9].to_string(),
        })
    }

    /// The `a | b | c` form echoed to the console on every tick.
    pub fn display_line(&self) -> String {
        self.fields().join(" | ")
    }

    pub fn display_header() -> String {
        COLUMNS.join(" | ")
    }
}

/// Append-only CSV ledger. The file outlives the process: the header is
/// written exactly once at creation and existing bytes are never rewritten.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows currently in the file, header excluded. A missing file
    /// counts as zero so a first run starts from an empty history.
    pub fn row_count(&self) -> io::Result<usize> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text.lines().count().saturating_sub(1)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err),
        }
    }

    /// Appends one row, prefixed by the header when the file is new. The row
    /// goes out in a single write so concurrent readers never see a torn line.
    pub fn append(&self, row: &LedgerRow) -> io::Result<()> {
        let need_header = !self.path.exists();
        let mut buf = String::new();
        if need_header {
            buf.push_str(&COLUMNS.join(","));
            buf.push('\n');
        }
        buf.push_str(&row.to_csv_line());
        buf.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())
    }

    /// The ordered suffix of rows appended after `start_count`, i.e. what this
    /// run added when `start_count` was captured before its first append.
    pub fn rows_since(&self, start_count: usize) -> io::Result<Vec<LedgerRow>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        Ok(text
            .lines()
            .skip(1)
            .skip(start_count)
            .filter_map(LedgerRow::from_csv_line)
            .collect())
    }
}
