use chrono::{Local, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use monthsweep::index::{FileRecord, TimeBucketIndex};
use monthsweep::pager::{sort_records, SortDirection, SortKey};
use monthsweep::scanner::Scanner;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

fn month_time(i: usize) -> SystemTime {
    let year = 2015 + (i / 12 % 10) as i32;
    let month = 1 + (i % 12) as u32;
    Local
        .with_ymd_and_hms(year, month, 15, 12, 0, 0)
        .unwrap()
        .into()
}

/// `dirs` album folders with `files_per_dir` photos each, spread over 120 months.
fn create_album_tree(root: &Path, dirs: usize, files_per_dir: usize) {
    for i in 0..dirs {
        let album = root.join(format!("album_{:04}", i));
        fs::create_dir_all(album.join("raw")).unwrap();

        for k in 0..files_per_dir {
            let path = if k % 4 == 0 {
                album.join("raw").join(format!("IMG_{:04}.png", k))
            } else {
                album.join(format!("IMG_{:04}.jpg", k))
            };
            fs::write(&path, "x".repeat(100)).unwrap();
            let file = File::options().write(true).open(&path).unwrap();
            file.set_modified(month_time(i * files_per_dir + k)).unwrap();
        }
    }
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");

    // Below the parallel threshold: top-level entries are walked in order
    let narrow = TempDir::new().unwrap();
    create_album_tree(narrow.path(), 20, 100);

    // Above it: top-level entries fan out over rayon
    let wide = TempDir::new().unwrap();
    create_album_tree(wide.path(), 200, 10);

    for (name, dir) in [("20x100", &narrow), ("200x10", &wide)] {
        let root: PathBuf = dir.path().to_path_buf();
        group.bench_with_input(BenchmarkId::new("albums", name), &root, |b, path| {
            b.iter(|| {
                let report = Scanner::new(black_box(path)).scan();
                TimeBucketIndex::from_records(report.records)
            })
        });
    }

    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_records");

    for count in [1_000, 10_000] {
        let records: Vec<FileRecord> = (0..count)
            .map(|i| FileRecord {
                path: PathBuf::from(format!("/photos/{}.jpg", i)),
                size: ((i * 7919) % 5000) as u64,
                modified: Utc.timestamp_opt(1_500_000_000 + (i as i64 * 3_600) % 9_000_000, 0).unwrap(),
            })
            .collect();

        for (key, direction) in [
            (SortKey::Modified, SortDirection::Descending),
            (SortKey::Size, SortDirection::Ascending),
        ] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}_{:?}", key, direction), count),
                &records,
                |b, records| {
                    b.iter(|| {
                        let mut records = records.clone();
                        sort_records(black_box(&mut records), key, direction);
                        records
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_scan, bench_sort);
criterion_main!(benches);
