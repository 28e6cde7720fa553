//! Cutoff selection and preview sampling

use crate::index::{MonthKey, TimeBucketIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const PREVIEW_SAMPLE_SIZE: usize = 20;
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "bmp"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(i64),
    #[error("year must be a positive number, got {0}")]
    InvalidYear(i64),
    #[error("expected YYYY-MM, got {0:?}")]
    Malformed(String),
}

/// Validated cutoff month. Everything at or before it is eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cutoff(MonthKey);

impl Cutoff {
    pub fn new(year: i64, month: i64) -> Result<Self, PlanError> {
        if !(1..=12).contains(&month) {
            return Err(PlanError::InvalidMonth(month));
        }
        let year = i32::try_from(year)
            .ok()
            .filter(|y| *y > 0)
            .ok_or(PlanError::InvalidYear(year))?;
        Ok(Self(MonthKey {
            year,
            month: month as u32,
        }))
    }

    pub fn key(self) -> MonthKey {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year
    }

    pub fn month(self) -> u32 {
        self.0.month
    }

    /// Compared on (year, month) only, never on the day.
    pub fn includes(self, key: MonthKey) -> bool {
        key <= self.0
    }
}

impl FromStr for Cutoff {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PlanError::Malformed(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(malformed)?;
        let year = year.parse::<i64>().map_err(|_| malformed())?;
        let month = month.parse::<i64>().map_err(|_| malformed())?;
        Self::new(year, month)
    }
}

impl std::fmt::Display for Cutoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct DeletionPlan {
    pub cutoff: Cutoff,
    pub targets: Vec<PathBuf>,
    pub total_size: u64,
    /// Random image sample for review; never changes `targets`
    pub preview: Vec<PathBuf>,
}

impl DeletionPlan {
    pub fn file_count(&self) -> usize {
        self.targets.len()
    }
}

#[derive(Debug, Clone)]
pub enum Selection {
    /// Valid cutoff but nothing at or before it
    Empty(Cutoff),
    Ready(DeletionPlan),
}

pub fn plan(index: &TimeBucketIndex, year: i64, month: i64) -> Result<Selection, PlanError> {
    Ok(plan_with_rng(index, Cutoff::new(year, month)?, &mut rand::thread_rng()))
}

pub fn plan_for(index: &TimeBucketIndex, cutoff: Cutoff) -> Selection {
    plan_with_rng(index, cutoff, &mut rand::thread_rng())
}

pub fn plan_with_rng<R: Rng + ?Sized>(
    index: &TimeBucketIndex,
    cutoff: Cutoff,
    rng: &mut R,
) -> Selection {
    let mut targets = Vec::new();
    let mut total_size = 0;
    for bucket in index.through(cutoff.key()) {
        total_size += bucket.total_size;
        targets.extend(bucket.files.iter().map(|f| f.path.clone()));
    }

    if targets.is_empty() {
        return Selection::Empty(cutoff);
    }

    let preview = preview_sample(&targets, rng);
    Selection::Ready(DeletionPlan {
        cutoff,
        targets,
        total_size,
        preview,
    })
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Up to `PREVIEW_SAMPLE_SIZE` distinct image paths, uniformly at random.
pub fn preview_sample<R: Rng + ?Sized>(paths: &[PathBuf], rng: &mut R) -> Vec<PathBuf> {
    let images: Vec<&PathBuf> = paths.iter().filter(|p| is_image(p)).collect();
    images
        .choose_multiple(rng, PREVIEW_SAMPLE_SIZE)
        .map(|p| (*p).clone())
        .collect()
}
