//! Best-effort bulk removal of files.
//!
//! Every path is attempted exactly once. A failure on one path is counted and
//! logged and never stops the rest of the batch.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Attempts between two progress reports
pub const PROGRESS_BATCH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteProgress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    NotFound,
    PermissionDenied,
    Other,
}

impl From<io::ErrorKind> for FailureKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => FailureKind::NotFound,
            io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            _ => FailureKind::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Error)]
#[error("could not delete {}: {reason}", path.display())]
pub struct DeleteFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

impl DeleteFailure {
    fn new(path: &Path, err: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: err.kind().into(),
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeletionResult {
    pub deleted: usize,
    pub failed: usize,
    pub failures: Vec<DeleteFailure>,
}

impl DeletionResult {
    pub fn processed(&self) -> usize {
        self.deleted + self.failed
    }
}

/// Remove a single file. Directories are never removed.
pub fn delete_file(path: &Path) -> Result<(), DeleteFailure> {
    fs::remove_file(path).map_err(|err| DeleteFailure::new(path, err))
}

#[derive(Default)]
pub struct BulkDeleter {
    progress: Option<mpsc::UnboundedSender<DeleteProgress>>,
}

impl BulkDeleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: mpsc::UnboundedSender<DeleteProgress>) -> Self {
        Self {
            progress: Some(progress),
        }
    }

    pub fn run(&self, paths: &[PathBuf]) -> DeletionResult {
        let total = paths.len();
        info!(total, "deleting files");

        let mut result = DeletionResult::default();
        for (i, path) in paths.iter().enumerate() {
            match delete_file(path) {
                Ok(()) => result.deleted += 1,
                Err(failure) => {
                    warn!(path = %path.display(), reason = %failure.reason, "could not delete");
                    result.failed += 1;
                    result.failures.push(failure);
                }
            }

            let completed = i + 1;
            if completed % PROGRESS_BATCH == 0 || completed == total {
                self.report(completed, total);
            }
        }

        if total == 0 {
            self.report(0, 0);
        }

        info!(
            deleted = result.deleted,
            failed = result.failed,
            "deletion finished"
        );
        result
    }

    fn report(&self, completed: usize, total: usize) {
        if let Some(progress) = &self.progress {
            if progress.send(DeleteProgress { completed, total }).is_err() {
                debug!("delete progress receiver dropped");
            }
        }
    }
}
