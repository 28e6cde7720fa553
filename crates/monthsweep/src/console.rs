//! Plain terminal frontend used by the CLI.

use chrono::{DateTime, Local, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, Write};
use tracing::warn;

use crate::coordinator::Frontend;
use crate::deleter::DeletionResult;
use crate::index::{FileRecord, TimeBucketIndex};
use crate::pager::{display_name, PageView};
use crate::planner::{Cutoff, DeletionPlan};
use crate::scanner::{ScanError, ScanSummary};

const PATH_WIDTH: usize = 60;

#[derive(Debug, Default)]
pub struct ConsoleFrontend {
    assume_yes: bool,
    quiet: bool,
}

impl ConsoleFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the y/n prompt.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// No progress lines and no month table, for machine-readable output.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn read_answer() -> io::Result<bool> {
        enable_raw_mode()?;
        let answer = loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => break Ok(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => break Ok(false),
                    _ => {}
                },
                Ok(_) => {}
                Err(err) => break Err(err),
            }
        };
        disable_raw_mode()?;
        answer
    }
}

impl Frontend for ConsoleFrontend {
    fn on_scan_progress(&mut self, completed: usize, total: usize) {
        if self.quiet {
            return;
        }
        print!("\r\x1B[J");
        print!("Scanning: {}/{} top-level entries", completed, total);
        let _ = io::stdout().flush();
    }

    fn on_scan_complete(
        &mut self,
        index: &TimeBucketIndex,
        summary: &ScanSummary,
        fatal: Option<&ScanError>,
    ) {
        if self.quiet {
            return;
        }
        print!("\r\x1B[J");
        if let Some(err) = fatal {
            println!("Scan failed: {}", err);
            return;
        }

        println!("Scan complete: {}", summary.root.display());
        println!("  Files: {}", summary.files);
        println!("  Total size: {}", format_size(summary.bytes));
        if !summary.errors.is_empty() {
            println!("  Skipped: {} unreadable entries", summary.errors.len());
        }
        println!();
        print_month_table(index);
    }

    fn on_delete_progress(&mut self, completed: usize, total: usize) {
        if self.quiet {
            return;
        }
        print!("\r\x1B[J");
        print!("Deleting: {}/{}", completed, total);
        let _ = io::stdout().flush();
    }

    fn on_delete_complete(&mut self, result: &DeletionResult) {
        if self.quiet {
            return;
        }
        print!("\r\x1B[J");
        println!(
            "Deleted {} files, failed {}",
            result.deleted, result.failed
        );
        for failure in &result.failures {
            println!(
                "  ✗ {} ({})",
                smart_truncate_path(&failure.path.display().to_string(), PATH_WIDTH),
                failure.reason
            );
        }
    }

    fn on_nothing_to_delete(&mut self, cutoff: Cutoff) {
        if !self.quiet {
            println!("No files modified in or before {}", cutoff);
        }
    }

    fn request_confirmation(&mut self, plan: &DeletionPlan) -> bool {
        print_plan(plan);
        if self.assume_yes {
            return true;
        }

        print!("Delete {} files? [y/n] ", plan.file_count());
        let _ = io::stdout().flush();
        match Self::read_answer() {
            Ok(answer) => {
                println!("{}", if answer { "y" } else { "n" });
                answer
            }
            Err(err) => {
                let _ = disable_raw_mode();
                warn!(error = %err, "could not read confirmation");
                false
            }
        }
    }
}

pub fn print_month_table(index: &TimeBucketIndex) {
    if index.is_empty() {
        println!("No files found.");
        return;
    }

    println!("{:<10} {:>10} {:>12}", "Month", "Files", "Size");
    println!("{}", "-".repeat(34));
    for bucket in index.newest_first() {
        println!(
            "{:<10} {:>10} {:>12}",
            bucket.key.to_string(),
            bucket.file_count(),
            format_size(bucket.total_size)
        );
    }
    println!("{}", "-".repeat(34));
    println!(
        "{:<10} {:>10} {:>12}",
        "Total",
        index.file_count(),
        format_size(index.total_size())
    );
}

pub fn print_plan(plan: &DeletionPlan) {
    println!(
        "Through {}: {} files, {}",
        plan.cutoff,
        plan.file_count(),
        format_size(plan.total_size)
    );
    if !plan.preview.is_empty() {
        println!("Sample images:");
        for path in &plan.preview {
            println!(
                "  {}",
                smart_truncate_path(&path.display().to_string(), PATH_WIDTH)
            );
        }
    }
}

pub fn print_page(view: &PageView) {
    let (key, direction) = view.sort();
    println!(
        "Page {}/{} | {} per page | sorted by {} | {} files",
        view.page(),
        view.total_pages(),
        view.page_size(),
        display_name(key, direction),
        view.len()
    );
    for record in view.current() {
        print_record(record);
    }
}

fn print_record(record: &FileRecord) {
    println!(
        "  {:>10}  {}  {}",
        format_size(record.size),
        format_modified(record.modified),
        smart_truncate_path(&record.path.display().to_string(), PATH_WIDTH)
    );
}

/// Local time, matching the month the record is bucketed under.
pub fn format_modified(modified: DateTime<Utc>) -> String {
    modified
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    let (value, unit) = match bytes {
        b if b >= TB => (b as f64 / TB as f64, "TB"),
        b if b >= GB => (b as f64 / GB as f64, "GB"),
        b if b >= MB => (b as f64 / MB as f64, "MB"),
        b if b >= KB => (b as f64 / KB as f64, "KB"),
        b => return format!("{} B", b),
    };
    format!("{:.2} {}", value, unit)
}

/// Keep the head and the file name of long paths: `/home/user/.../2019/IMG_1.jpg`.
pub fn smart_truncate_path(path: &str, max_len: usize) -> String {
    let chars: Vec<char> = path.chars().collect();
    if chars.len() <= max_len {
        return path.to_string();
    }

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() > 3 {
        let head = parts[..2].join("/");
        let tail = parts[parts.len() - 2..].join("/");
        let shortened = format!("{}/.../{}", head, tail);
        if shortened.chars().count() <= max_len {
            return shortened;
        }
    }

    let keep = max_len.saturating_sub(3);
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("...{}", tail)
}
