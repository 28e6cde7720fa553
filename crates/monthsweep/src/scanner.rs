use crate::index::FileRecord;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, DirEntry, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const BUFFER_SIZE: usize = 1000;
/// Top-level entry count above which entries are walked on the rayon pool
const PARALLEL_THRESHOLD: usize = 100;

/// Which file timestamp decides the month a file lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Last modification time
    #[default]
    Modified,
    /// Earliest of creation, modification and access time
    Earliest,
}

impl TimestampPolicy {
    fn timestamp(self, metadata: &Metadata) -> io::Result<SystemTime> {
        let modified = metadata.modified()?;
        match self {
            TimestampPolicy::Modified => Ok(modified),
            TimestampPolicy::Earliest => Ok([metadata.created().ok(), metadata.accessed().ok()]
                .into_iter()
                .flatten()
                .fold(modified, SystemTime::min)),
        }
    }
}

/// A file or directory that could not be read. The scan skips it and goes on.
#[derive(Debug, Clone, Serialize)]
pub struct EntryError {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot list {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("scan of {} stopped before finishing", path.display())]
    Interrupted { path: PathBuf },
}

#[derive(Debug)]
pub enum ScanEvent {
    /// Sent once before any work, `total` is the number of top-level entries
    Started { total: usize },
    Records(Vec<FileRecord>),
    /// One top-level entry (file or whole subtree) is done
    Progress { completed: usize, total: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub top_level_entries: usize,
    pub files: u64,
    pub bytes: u64,
    pub errors: Vec<EntryError>,
}

impl ScanSummary {
    pub fn empty<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            top_level_entries: 0,
            files: 0,
            bytes: 0,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct ScanReport {
    pub summary: ScanSummary,
    /// Empty when streaming through a sender
    pub records: Vec<FileRecord>,
    pub fatal: Option<ScanError>,
}

pub struct Scanner {
    root_path: PathBuf,
    policy: TimestampPolicy,
    sender: Option<mpsc::UnboundedSender<ScanEvent>>,
    buffer: Mutex<Vec<FileRecord>>,
    collected: Mutex<Vec<FileRecord>>,
    errors: Mutex<Vec<EntryError>>,
    /// Top-level entries finished; held while sending so progress stays ordered
    completed: Mutex<usize>,
    total_files: AtomicU64,
    total_size: AtomicU64,
}

impl Scanner {
    /// Scanner that returns its records in the report.
    pub fn new<P: AsRef<Path>>(root_path: P) -> Self {
        Self {
            root_path: root_path.as_ref().to_path_buf(),
            policy: TimestampPolicy::default(),
            sender: None,
            buffer: Mutex::new(Vec::new()),
            collected: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            completed: Mutex::new(0),
            total_files: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
        }
    }

    /// Scanner that streams record batches and progress through `sender`.
    pub fn with_sender<P: AsRef<Path>>(
        root_path: P,
        sender: mpsc::UnboundedSender<ScanEvent>,
    ) -> Self {
        Self {
            sender: Some(sender),
            ..Self::new(root_path)
        }
    }

    pub fn timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn scan(&self) -> ScanReport {
        info!(root = %self.root_path.display(), policy = ?self.policy, "scan started");

        let entries: Vec<io::Result<DirEntry>> = match fs::read_dir(&self.root_path) {
            Ok(read_dir) => read_dir.collect(),
            Err(source) => {
                warn!(root = %self.root_path.display(), error = %source, "cannot list scan root");
                return ScanReport {
                    summary: self.summary(0),
                    records: Vec::new(),
                    fatal: Some(ScanError::RootUnreadable {
                        path: self.root_path.clone(),
                        source,
                    }),
                };
            }
        };

        let total = entries.len();
        self.emit(ScanEvent::Started { total });

        if total > PARALLEL_THRESHOLD {
            entries.par_iter().for_each(|entry| {
                self.scan_top_level(entry);
                self.top_level_done(total);
            });
        } else {
            for entry in &entries {
                self.scan_top_level(entry);
                self.top_level_done(total);
            }
        }

        self.flush_buffer();

        let summary = self.summary(total);
        info!(
            root = %self.root_path.display(),
            files = summary.files,
            bytes = summary.bytes,
            errors = summary.errors.len(),
            "scan finished"
        );

        ScanReport {
            summary,
            records: std::mem::take(&mut *lock(&self.collected)),
            fatal: None,
        }
    }

    fn scan_top_level(&self, entry: &io::Result<DirEntry>) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                self.record_error(&self.root_path, err.to_string());
                return;
            }
        };

        let path = entry.path();
        // DirEntry::file_type does not follow symlinks
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                self.record_error(&path, err.to_string());
                return;
            }
        };

        if file_type.is_dir() {
            self.walk_directory(&path);
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(metadata) => self.add_file(path, &metadata),
                Err(err) => self.record_error(&path, err.to_string()),
            }
        } else {
            debug!(path = %path.display(), "skipping non-regular entry");
        }
    }

    fn walk_directory(&self, dir: &Path) {
        for item in WalkDir::new(dir).follow_links(false).min_depth(1) {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    self.record_error(&path, err.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => self.add_file(entry.into_path(), &metadata),
                Err(err) => {
                    let path = entry.path().to_path_buf();
                    self.record_error(&path, err.to_string());
                }
            }
        }
    }

    fn add_file(&self, path: PathBuf, metadata: &Metadata) {
        let modified = match self.policy.timestamp(metadata) {
            Ok(time) => match to_datetime(time) {
                Some(modified) => modified,
                None => {
                    self.record_error(&path, format!("timestamp out of range: {:?}", time));
                    return;
                }
            },
            Err(err) => {
                self.record_error(&path, err.to_string());
                return;
            }
        };

        let size = metadata.len();
        self.total_files.fetch_add(1, Ordering::Relaxed);
        self.total_size.fetch_add(size, Ordering::Relaxed);

        let should_flush = {
            let mut buffer = lock(&self.buffer);
            buffer.push(FileRecord {
                path,
                size,
                modified,
            });
            buffer.len() >= BUFFER_SIZE
        };

        if should_flush {
            // Flush outside the lock to avoid holding it during send
            self.flush_buffer();
        }
    }

    fn flush_buffer(&self) {
        let batch: Vec<FileRecord> = lock(&self.buffer).drain(..).collect();
        if batch.is_empty() {
            return;
        }

        match &self.sender {
            Some(sender) => self.send(sender, ScanEvent::Records(batch)),
            None => lock(&self.collected).extend(batch),
        }
    }

    fn top_level_done(&self, total: usize) {
        let mut completed = lock(&self.completed);
        *completed += 1;
        self.emit(ScanEvent::Progress {
            completed: *completed,
            total,
        });
    }

    fn record_error(&self, path: &Path, reason: String) {
        warn!(path = %path.display(), %reason, "skipping unreadable entry");
        lock(&self.errors).push(EntryError {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(sender) = &self.sender {
            self.send(sender, event);
        }
    }

    fn send(&self, sender: &mpsc::UnboundedSender<ScanEvent>, event: ScanEvent) {
        if sender.send(event).is_err() {
            debug!("scan event receiver dropped");
        }
    }

    fn summary(&self, top_level_entries: usize) -> ScanSummary {
        ScanSummary {
            root: self.root_path.clone(),
            top_level_entries,
            files: self.total_files.load(Ordering::Relaxed),
            bytes: self.total_size.load(Ordering::Relaxed),
            errors: std::mem::take(&mut *lock(&self.errors)),
        }
    }
}

/// `None` when the time cannot be placed on a calendar, in UTC or local time.
fn to_datetime(time: SystemTime) -> Option<DateTime<Utc>> {
    let (secs, nanos) = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => (i64::try_from(after.as_secs()).ok()?, after.subsec_nanos()),
        Err(err) => {
            let before = err.duration();
            let secs = i64::try_from(before.as_secs()).ok()?;
            match before.subsec_nanos() {
                0 => (-secs, 0),
                nanos => (-secs - 1, 1_000_000_000 - nanos),
            }
        }
    };
    let datetime = DateTime::from_timestamp(secs, nanos)?;

    // Keep a year of headroom so the local offset cannot leave chrono's range
    let year = datetime.year();
    (year > NaiveDate::MIN.year() && year < NaiveDate::MAX.year()).then_some(datetime)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
