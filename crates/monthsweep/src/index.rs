//! Month-bucketed index of scanned files

use chrono::{DateTime, Datelike, Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl FileRecord {
    pub fn month(&self) -> MonthKey {
        MonthKey::from_timestamp(self.modified)
    }
}

/// Calendar month, ordered by year then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Buckets by the local calendar, not UTC.
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        let local = timestamp.with_timezone(&Local);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthBucket {
    pub key: MonthKey,
    pub total_size: u64,
    /// Discovery order, not sorted
    pub files: Vec<FileRecord>,
}

impl MonthBucket {
    fn new(key: MonthKey) -> Self {
        Self {
            key,
            total_size: 0,
            files: Vec::new(),
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimeBucketIndex {
    buckets: BTreeMap<MonthKey, MonthBucket>,
}

impl TimeBucketIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I: IntoIterator<Item = FileRecord>>(records: I) -> Self {
        let mut index = Self::new();
        index.extend(records);
        index
    }

    /// Add a record to the bucket of its month, creating the bucket if needed.
    pub fn insert(&mut self, record: FileRecord) {
        let key = record.month();
        let bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| MonthBucket::new(key));
        bucket.total_size += record.size;
        bucket.files.push(record);
    }

    pub fn extend<I: IntoIterator<Item = FileRecord>>(&mut self, records: I) {
        for record in records {
            self.insert(record);
        }
    }

    /// Remove the record for `path`. Empty buckets are dropped.
    pub fn remove(&mut self, path: &Path) -> Option<FileRecord> {
        let (key, position) = self.buckets.iter().find_map(|(key, bucket)| {
            bucket
                .files
                .iter()
                .position(|f| f.path == path)
                .map(|pos| (*key, pos))
        })?;

        let bucket = self.buckets.get_mut(&key)?;
        let record = bucket.files.remove(position);
        bucket.total_size -= record.size;
        if bucket.files.is_empty() {
            self.buckets.remove(&key);
        }
        Some(record)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, key: MonthKey) -> Option<&MonthBucket> {
        self.buckets.get(&key)
    }

    /// Oldest month first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MonthBucket> {
        self.buckets.values()
    }

    /// Newest month first, the order the month table is rendered in.
    pub fn newest_first(&self) -> impl Iterator<Item = &MonthBucket> {
        self.buckets.values().rev()
    }

    /// Buckets at or before `cutoff`.
    pub fn through(&self, cutoff: MonthKey) -> impl Iterator<Item = &MonthBucket> {
        self.buckets.range(..=cutoff).map(|(_, bucket)| bucket)
    }

    pub fn month_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn file_count(&self) -> usize {
        self.buckets.values().map(MonthBucket::file_count).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.buckets.values().map(|b| b.total_size).sum()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.buckets
            .values()
            .any(|b| b.files.iter().any(|f| f.path == path))
    }
}
