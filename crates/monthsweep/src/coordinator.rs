//! Drives scan, plan, confirm and delete for one root folder.
//!
//! The coordinator is the only owner of the [`TimeBucketIndex`]. Scans and
//! deletions run on blocking worker threads and hand their results back over
//! channels; every merge into the index happens here. Both take `&mut self`,
//! so a scan can never overlap another scan or a deletion.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::deleter::{self, BulkDeleter, DeletionResult};
use crate::index::{FileRecord, MonthKey, TimeBucketIndex};
use crate::pager::{PageError, PageView, SortDirection, SortKey};
use crate::planner::{self, is_image, Cutoff, DeletionPlan, PlanError, Selection};
use crate::scanner::{ScanError, ScanEvent, ScanSummary, Scanner, TimestampPolicy};

/// Everything the presentation layer has to provide.
pub trait Frontend {
    fn on_scan_progress(&mut self, completed: usize, total: usize);

    /// Fires exactly once per scan, also when the root could not be listed.
    fn on_scan_complete(
        &mut self,
        index: &TimeBucketIndex,
        summary: &ScanSummary,
        fatal: Option<&ScanError>,
    );

    fn on_delete_progress(&mut self, completed: usize, total: usize);

    fn on_delete_complete(&mut self, result: &DeletionResult);

    fn on_nothing_to_delete(&mut self, _cutoff: Cutoff) {}

    /// Blocks the purge until the user accepts or declines.
    fn request_confirmation(&mut self, plan: &DeletionPlan) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Deleting,
}

#[derive(Debug, Clone)]
pub enum PurgeOutcome {
    NothingToDelete(Cutoff),
    Declined(Cutoff),
    Deleted(DeletionResult),
}

pub struct Coordinator<F> {
    root: Option<PathBuf>,
    policy: TimestampPolicy,
    index: TimeBucketIndex,
    /// Bumped on every scan start
    generation: u64,
    phase: Phase,
    frontend: F,
}

impl<F: Frontend> Coordinator<F> {
    pub fn new(frontend: F) -> Self {
        Self {
            root: None,
            policy: TimestampPolicy::default(),
            index: TimeBucketIndex::new(),
            generation: 0,
            phase: Phase::Idle,
            frontend,
        }
    }

    pub fn timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Choosing a folder invalidates the current index.
    pub fn set_root<P: Into<PathBuf>>(&mut self, root: P) {
        let root = root.into();
        info!(root = %root.display(), "folder selected");
        self.root = Some(root);
        self.index.clear();
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn index(&self) -> &TimeBucketIndex {
        &self.index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, generation = self.generation, "phase change");
        self.phase = phase;
    }

    /// Rebuild the index from scratch. A root that cannot be listed leaves the
    /// index empty and is returned as an error after the frontend was told.
    pub async fn scan(&mut self) -> Result<ScanSummary> {
        let root = self.root.clone().context("No folder selected")?;

        self.index.clear();
        self.generation += 1;
        self.set_phase(Phase::Scanning);

        let (tx, mut rx) = mpsc::unbounded_channel::<ScanEvent>();
        let policy = self.policy;
        let scan_handle = tokio::task::spawn_blocking(move || {
            Scanner::with_sender(&root, tx)
                .timestamp_policy(policy)
                .scan()
        });

        let mut fresh = TimeBucketIndex::new();
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Started { total } => self.frontend.on_scan_progress(0, total),
                ScanEvent::Records(batch) => fresh.extend(batch),
                ScanEvent::Progress { completed, total } => {
                    self.frontend.on_scan_progress(completed, total)
                }
            }
        }

        let joined = scan_handle.await;
        self.set_phase(Phase::Idle);
        let report = match joined {
            Ok(report) => report,
            Err(join_err) => {
                // Partial batches are dropped; the index stays empty
                let root = self.root.clone().unwrap_or_default();
                let fatal = ScanError::Interrupted { path: root.clone() };
                self.frontend
                    .on_scan_complete(&self.index, &ScanSummary::empty(root), Some(&fatal));
                return Err(anyhow::Error::new(join_err).context(fatal));
            }
        };

        self.index = fresh;
        self.frontend
            .on_scan_complete(&self.index, &report.summary, report.fatal.as_ref());

        match report.fatal {
            Some(err) => Err(err.into()),
            None => Ok(report.summary),
        }
    }

    pub fn plan(&self, year: i64, month: i64) -> Result<Selection, PlanError> {
        planner::plan(&self.index, year, month)
    }

    pub fn plan_through(&self, cutoff: Cutoff) -> Selection {
        planner::plan_for(&self.index, cutoff)
    }

    /// Delete a plan's snapshot of paths. The index is stale afterwards.
    pub async fn delete(&mut self, plan: DeletionPlan) -> Result<DeletionResult> {
        self.set_phase(Phase::Deleting);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let targets = plan.targets;
        let delete_handle =
            tokio::task::spawn_blocking(move || BulkDeleter::with_progress(tx).run(&targets));

        while let Some(progress) = rx.recv().await {
            self.frontend
                .on_delete_progress(progress.completed, progress.total);
        }

        let result = delete_handle.await;
        self.set_phase(Phase::Idle);
        let result = result.context("Delete task failed")?;

        self.frontend.on_delete_complete(&result);
        Ok(result)
    }

    /// Plan, confirm, delete, then rescan.
    pub async fn purge(&mut self, year: i64, month: i64) -> Result<PurgeOutcome> {
        let plan = match self.plan(year, month)? {
            Selection::Empty(cutoff) => {
                info!(%cutoff, "nothing to delete");
                self.frontend.on_nothing_to_delete(cutoff);
                return Ok(PurgeOutcome::NothingToDelete(cutoff));
            }
            Selection::Ready(plan) => plan,
        };

        if !self.frontend.request_confirmation(&plan) {
            info!(cutoff = %plan.cutoff, "deletion declined");
            return Ok(PurgeOutcome::Declined(plan.cutoff));
        }

        let result = self.delete(plan).await?;

        // A failed rescan was already reported through on_scan_complete
        if let Err(err) = self.scan().await {
            warn!(error = %err, "rescan after deletion failed");
        }

        Ok(PurgeOutcome::Deleted(result))
    }

    /// Delete one file and drop it from the index.
    pub fn delete_file(&mut self, path: &Path) -> Result<Option<FileRecord>> {
        deleter::delete_file(path)?;
        info!(path = %path.display(), "deleted file");
        Ok(self.index.remove(path))
    }

    /// Delete a file shown in an open review and drop it from both the index
    /// and the view.
    pub fn delete_from_review(
        &mut self,
        view: &mut PageView,
        path: &Path,
    ) -> Result<Option<FileRecord>> {
        let removed = self.delete_file(path)?;
        let shown = view.remove(path);
        Ok(removed.or(shown))
    }

    /// Sorted, paginated view over one month.
    pub fn review(
        &self,
        month: MonthKey,
        images_only: bool,
        key: SortKey,
        direction: SortDirection,
        page_size: usize,
    ) -> Result<PageView, PageError> {
        let records = self
            .index
            .get(month)
            .map(|bucket| {
                bucket
                    .files
                    .iter()
                    .filter(|f| !images_only || is_image(&f.path))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        PageView::new(records, key, direction, page_size)
    }
}
