//! Sorting and 1-based pagination for reviewing files before deletion

use crate::index::FileRecord;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use thiserror::Error;

pub const PAGE_SIZES: [usize; 5] = [5, 10, 20, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Modified,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

pub fn display_name(key: SortKey, direction: SortDirection) -> &'static str {
    match (key, direction) {
        (SortKey::Modified, SortDirection::Ascending) => "Time (Ascending)",
        (SortKey::Modified, SortDirection::Descending) => "Time (Descending)",
        (SortKey::Size, SortDirection::Ascending) => "Size (Ascending)",
        (SortKey::Size, SortDirection::Descending) => "Size (Descending)",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page size {0} is not one of 5, 10, 20, 50, 100")]
    InvalidPageSize(usize),
    #[error("page {page} is outside 1..={total_pages}")]
    OutOfRange { page: usize, total_pages: usize },
}

pub fn validate_page_size(page_size: usize) -> Result<usize, PageError> {
    if PAGE_SIZES.contains(&page_size) {
        Ok(page_size)
    } else {
        Err(PageError::InvalidPageSize(page_size))
    }
}

fn compare(a: &FileRecord, b: &FileRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Modified => a.modified.cmp(&b.modified),
        SortKey::Size => a.size.cmp(&b.size),
    }
}

/// Stable in both directions: equal keys keep their relative order.
pub fn sort_records(records: &mut [FileRecord], key: SortKey, direction: SortDirection) {
    match direction {
        SortDirection::Ascending => records.sort_by(|a, b| compare(a, b, key)),
        SortDirection::Descending => records.sort_by(|a, b| compare(b, a, key)),
    }
}

/// Never less than one, even for an empty list.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

pub fn paginate(
    records: &[FileRecord],
    page_size: usize,
    page: usize,
) -> Result<&[FileRecord], PageError> {
    let page_size = validate_page_size(page_size)?;
    let total_pages = total_pages(records.len(), page_size);
    if page == 0 || page > total_pages {
        return Err(PageError::OutOfRange { page, total_pages });
    }

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(records.len());
    Ok(&records[start..end])
}

/// Review state over a list of records: sort order, page size and current page.
#[derive(Debug, Clone)]
pub struct PageView {
    records: Vec<FileRecord>,
    key: SortKey,
    direction: SortDirection,
    page_size: usize,
    page: usize,
}

impl PageView {
    pub fn new(
        mut records: Vec<FileRecord>,
        key: SortKey,
        direction: SortDirection,
        page_size: usize,
    ) -> Result<Self, PageError> {
        let page_size = validate_page_size(page_size)?;
        sort_records(&mut records, key, direction);
        Ok(Self {
            records,
            key,
            direction,
            page_size,
            page: 1,
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn sort(&self) -> (SortKey, SortDirection) {
        (self.key, self.direction)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.records.len(), self.page_size)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.records.iter().any(|r| r.path == path)
    }

    pub fn current(&self) -> &[FileRecord] {
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.records.len());
        &self.records[start.min(end)..end]
    }

    /// Re-sorts and goes back to page 1.
    pub fn set_sort(&mut self, key: SortKey, direction: SortDirection) {
        self.key = key;
        self.direction = direction;
        sort_records(&mut self.records, key, direction);
        self.page = 1;
    }

    /// Goes back to page 1.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), PageError> {
        self.page_size = validate_page_size(page_size)?;
        self.page = 1;
        Ok(())
    }

    pub fn go_to(&mut self, page: usize) -> Result<(), PageError> {
        let total_pages = self.total_pages();
        if page == 0 || page > total_pages {
            return Err(PageError::OutOfRange { page, total_pages });
        }
        self.page = page;
        Ok(())
    }

    /// Returns false at the last page.
    pub fn next_page(&mut self) -> bool {
        self.go_to(self.page + 1).is_ok()
    }

    /// Returns false at the first page.
    pub fn prev_page(&mut self) -> bool {
        self.page > 1 && self.go_to(self.page - 1).is_ok()
    }

    /// Drop a record after it was deleted, keeping the current page in range.
    pub fn remove(&mut self, path: &Path) -> Option<FileRecord> {
        let position = self.records.iter().position(|r| r.path == path)?;
        let record = self.records.remove(position);
        self.page = self.page.min(self.total_pages());
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::record;
    use std::path::PathBuf;

    fn names(records: &[FileRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.path.display().to_string())
            .collect()
    }

    fn sized(count: usize) -> Vec<FileRecord> {
        (0..count)
            .map(|i| record(&format!("/{i}"), i as u64, 2023, 1 + (i % 12) as u32))
            .collect()
    }

    #[test]
    fn test_sort_by_size_and_time() {
        let mut records = vec![
            record("/mid", 50, 2023, 6),
            record("/big", 90, 2021, 1),
            record("/small", 10, 2024, 2),
        ];

        sort_records(&mut records, SortKey::Size, SortDirection::Descending);
        assert_eq!(names(&records), vec!["/big", "/mid", "/small"]);

        sort_records(&mut records, SortKey::Modified, SortDirection::Ascending);
        assert_eq!(names(&records), vec!["/big", "/mid", "/small"]);

        sort_records(&mut records, SortKey::Modified, SortDirection::Descending);
        assert_eq!(names(&records), vec!["/small", "/mid", "/big"]);
    }

    #[test]
    fn test_sort_is_stable_across_direction_changes() {
        let mut records = vec![
            record("/a", 10, 2023, 1),
            record("/b", 5, 2023, 1),
            record("/c", 10, 2023, 1),
            record("/d", 5, 2023, 1),
            record("/e", 10, 2023, 1),
        ];
        sort_records(&mut records, SortKey::Size, SortDirection::Ascending);
        let ascending = names(&records);
        assert_eq!(ascending, vec!["/b", "/d", "/a", "/c", "/e"]);

        sort_records(&mut records, SortKey::Size, SortDirection::Descending);
        assert_eq!(names(&records), vec!["/a", "/c", "/e", "/b", "/d"]);

        sort_records(&mut records, SortKey::Size, SortDirection::Ascending);
        assert_eq!(names(&records), ascending);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 20), 1);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(101, 5), 21);
    }

    #[test]
    fn test_pages_cover_every_record() {
        for count in [0, 1, 4, 5, 6, 49, 50, 51, 137] {
            let records = sized(count);
            for page_size in PAGE_SIZES {
                let pages = total_pages(count, page_size);
                let covered: usize = (1..=pages)
                    .map(|p| paginate(&records, page_size, p).unwrap().len())
                    .sum();
                assert_eq!(covered, count, "count={count} page_size={page_size}");
            }
        }
    }

    #[test]
    fn test_paginate_rejects_out_of_range() {
        let records = sized(12);
        assert_eq!(paginate(&records, 5, 3).unwrap().len(), 2);
        assert_eq!(
            paginate(&records, 5, 4),
            Err(PageError::OutOfRange {
                page: 4,
                total_pages: 3
            })
        );
        assert!(matches!(
            paginate(&records, 5, 0),
            Err(PageError::OutOfRange { page: 0, .. })
        ));
        assert_eq!(paginate(&records, 7, 1), Err(PageError::InvalidPageSize(7)));
        assert!(paginate(&[], 20, 1).unwrap().is_empty());
    }

    #[test]
    fn test_view_navigation_stays_in_bounds() {
        let mut view = PageView::new(sized(23), SortKey::Size, SortDirection::Ascending, 10).unwrap();
        assert_eq!(view.total_pages(), 3);
        assert!(!view.prev_page());
        assert!(view.next_page());
        assert!(view.next_page());
        assert_eq!(view.page(), 3);
        assert_eq!(view.current().len(), 3);
        assert!(!view.next_page());
        assert_eq!(view.page(), 3);
        assert!(view.go_to(4).is_err());
        assert!(view.prev_page());
        assert_eq!(view.page(), 2);
    }

    #[test]
    fn test_changing_size_or_sort_resets_page() {
        let mut view = PageView::new(sized(40), SortKey::Size, SortDirection::Ascending, 5).unwrap();
        view.go_to(6).unwrap();

        view.set_page_size(10).unwrap();
        assert_eq!(view.page(), 1);
        assert_eq!(view.current().len(), 10);

        view.go_to(3).unwrap();
        view.set_sort(SortKey::Size, SortDirection::Descending);
        assert_eq!(view.page(), 1);
        assert_eq!(view.current()[0].size, 39);

        view.go_to(2).unwrap();
        assert_eq!(view.set_page_size(3), Err(PageError::InvalidPageSize(3)));
        assert_eq!(view.page(), 2);
    }

    #[test]
    fn test_remove_clamps_current_page() {
        let mut view = PageView::new(sized(6), SortKey::Size, SortDirection::Ascending, 5).unwrap();
        view.go_to(2).unwrap();
        assert_eq!(view.current().len(), 1);

        assert!(view.contains(&PathBuf::from("/5")));
        let removed = view.remove(&PathBuf::from("/5")).unwrap();
        assert_eq!(removed.size, 5);
        assert_eq!(view.page(), 1);
        assert_eq!(view.total_pages(), 1);
        assert!(!view.contains(&PathBuf::from("/5")));
        assert!(view.remove(&PathBuf::from("/5")).is_none());
    }

    #[test]
    fn test_empty_view_has_one_empty_page() {
        let view = PageView::new(Vec::new(), SortKey::default(), SortDirection::default(), DEFAULT_PAGE_SIZE).unwrap();
        assert!(view.is_empty());
        assert_eq!(view.total_pages(), 1);
        assert!(view.current().is_empty());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(
            display_name(SortKey::Modified, SortDirection::Descending),
            "Time (Descending)"
        );
        assert_eq!(
            display_name(SortKey::Size, SortDirection::Ascending.toggle()),
            "Size (Descending)"
        );
    }
}
