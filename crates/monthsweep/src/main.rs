use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use monthsweep::console::{self, ConsoleFrontend};
use monthsweep::coordinator::{Coordinator, PurgeOutcome};
use monthsweep::index::MonthBucket;
use monthsweep::logging;
use monthsweep::pager::{SortDirection, SortKey};
use monthsweep::planner::{Cutoff, Selection};
use monthsweep::scanner::ScanSummary;
use monthsweep::settings::Settings;

#[derive(Parser)]
#[command(name = "monthsweep")]
#[command(about = "Group files by month and delete everything up to a cutoff", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to settings file
    #[arg(short = 'c', long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a folder and show files per month
    Scan {
        root: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what a purge would delete, without deleting
    Plan {
        root: PathBuf,
        /// Last month to include, as YYYY-MM
        #[arg(long)]
        through: Cutoff,
    },
    /// Delete every file modified in or before a month
    Purge {
        root: PathBuf,
        /// Last month to include, as YYYY-MM
        #[arg(long)]
        through: Cutoff,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// List one month's files, a page at a time
    Review {
        root: PathBuf,
        /// Month to list, as YYYY-MM
        #[arg(long)]
        month: Cutoff,
        #[arg(long, value_enum)]
        sort_key: Option<SortKey>,
        #[arg(long, value_enum)]
        direction: Option<SortDirection>,
        /// One of 5, 10, 20, 50, 100
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Only list image files
        #[arg(long)]
        images_only: bool,
        /// Delete this file from the listed month before printing the page
        #[arg(long, value_name = "FILE")]
        delete: Option<PathBuf>,
    },
    /// Delete a single file
    Remove { root: PathBuf, file: PathBuf },
    /// Write the default settings file
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    summary: &'a ScanSummary,
    months: Vec<&'a MonthBucket>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = if let Some(config) = &cli.config {
        PathBuf::from(shellexpand::tilde(config).to_string())
    } else {
        Settings::default_path()
    };
    let settings = Settings::load(&settings_path).context("Failed to load settings")?;
    logging::init(&settings.log.filter);

    match cli.command {
        Commands::Scan { root, json } => {
            let mut app = coordinator(&settings, root, ConsoleFrontend::new().quiet(json));
            let summary = app.scan().await?;
            if json {
                let output = ScanOutput {
                    summary: &summary,
                    months: app.index().newest_first().collect(),
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("Failed to encode scan")?
                );
            }
        }
        Commands::Plan { root, through } => {
            let mut app = coordinator(&settings, root, ConsoleFrontend::new().quiet(true));
            app.scan().await?;
            match app.plan_through(through) {
                Selection::Empty(cutoff) => {
                    println!("No files modified in or before {}", cutoff);
                }
                Selection::Ready(plan) => console::print_plan(&plan),
            }
        }
        Commands::Purge { root, through, yes } => {
            let mut app = coordinator(&settings, root, ConsoleFrontend::new().assume_yes(yes));
            app.scan().await?;
            let outcome = app
                .purge(i64::from(through.year()), i64::from(through.month()))
                .await?;
            if let PurgeOutcome::Declined(_) = outcome {
                println!("Nothing deleted.");
            }
        }
        Commands::Review {
            root,
            month,
            sort_key,
            direction,
            page_size,
            page,
            images_only,
            delete,
        } => {
            let mut app = coordinator(&settings, root, ConsoleFrontend::new().quiet(true));
            app.scan().await?;
            let mut view = app.review(
                month.key(),
                images_only,
                sort_key.unwrap_or(settings.review.sort_key),
                direction.unwrap_or(settings.review.sort_direction),
                page_size.unwrap_or(settings.review.page_size),
            )?;
            if let Some(file) = delete {
                if !view.contains(&file) {
                    bail!("{} is not listed under {}", file.display(), month);
                }
                app.delete_from_review(&mut view, &file)?;
                println!("Deleted {}", file.display());
            }
            view.go_to(page.min(view.total_pages()))?;
            console::print_page(&view);
        }
        Commands::Remove { root, file } => {
            let mut app = coordinator(&settings, root, ConsoleFrontend::new().quiet(true));
            app.scan().await?;
            if !app.index().contains(&file) {
                bail!("{} is not a scanned file", file.display());
            }
            let removed = app.delete_file(&file)?;
            if let Some(record) = removed {
                println!(
                    "Deleted {} ({}), {} files left in {}",
                    record.path.display(),
                    console::format_size(record.size),
                    app.index()
                        .get(record.month())
                        .map(|bucket| bucket.file_count())
                        .unwrap_or(0),
                    record.month()
                );
            }
        }
        Commands::InitConfig { force } => {
            if settings_path.exists() && !force {
                bail!(
                    "{} already exists, pass --force to replace it",
                    settings_path.display()
                );
            }
            Settings::default()
                .save(&settings_path)
                .context("Failed to write settings")?;
            println!("Wrote {}", settings_path.display());
        }
    }

    Ok(())
}

fn coordinator(
    settings: &Settings,
    root: PathBuf,
    frontend: ConsoleFrontend,
) -> Coordinator<ConsoleFrontend> {
    let root = PathBuf::from(shellexpand::tilde(&root.to_string_lossy()).to_string());
    let mut app = Coordinator::new(frontend).timestamp_policy(settings.scan.timestamp);
    app.set_root(root);
    app
}
