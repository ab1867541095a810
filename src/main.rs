use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{info, warn};

use company_master::config::Settings;
use company_master::merge::resolve::{Resolver, SourceStats};
use company_master::merge::{assemble, score};
use company_master::metrics::{new_run_id, RunTracker};
use company_master::{csv, db, report};

#[derive(Parser)]
#[command(
    name = "company_master",
    about = "Merge per-source company tables into one scored master table"
)]
struct Cli {
    /// Settings file (default: company_master.toml or $COMPANY_MASTER_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV/TSV file into the table of a configured source
    Import {
        /// Source name from the settings (e.g. "seed")
        #[arg(short, long)]
        source: String,
        file: PathBuf,
    },
    /// Resolve all source tables into the master table
    Merge,
    /// Master table overview, best scores first
    Overview {
        /// Only companies with at least this score
        #[arg(short = 's', long)]
        min_score: Option<u32>,
        /// Filter by industry (substring, case-insensitive)
        #[arg(short, long)]
        industry: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Data quality and support analysis of the master table
    Report {
        /// Companies in the top list (default: top_n from settings)
        #[arg(short = 'n', long)]
        top: Option<usize>,
    },
    /// Row counts and the latest merge run
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("loading settings")?;
    info!(db = %settings.db_path.display(), sources = settings.sources.len(), "settings loaded");

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Import { source, file } => run_import(&conn, &settings, &source, &file),
        Commands::Merge => run_merge(&conn, &settings),
        Commands::Overview {
            min_score,
            industry,
            limit,
        } => {
            let filter = db::CompanyFilter {
                min_score,
                industry: industry.as_deref(),
                limit: Some(limit),
            };
            let rows = db::fetch_companies(&conn, &settings.master_table, &filter)?;
            if rows.is_empty() {
                println!("No companies found. Run 'merge' first or relax the filters.");
                return Ok(());
            }
            print_overview(&rows);
            Ok(())
        }
        Commands::Report { top } => {
            let rows =
                db::fetch_companies(&conn, &settings.master_table, &db::CompanyFilter::default())?;
            if rows.is_empty() {
                println!("No companies found. Run 'merge' first.");
                return Ok(());
            }
            let report = report::analyze(&rows, top.unwrap_or(settings.top_n));
            print!("{}", report);
            Ok(())
        }
        Commands::Stats => {
            let s = db::get_stats(&conn, &settings)?;
            for t in &s.sources {
                let rows = t.rows.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                println!("{:<16} {:<24} {:>8}", t.name, t.table, rows);
            }
            let master = s.master.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
            println!("{:<16} {:<24} {:>8}", "master", settings.master_table, master);

            match &s.last_run {
                Some((run_id, metrics)) => {
                    println!("\nLast run: {}", run_id);
                    print_run_table(metrics);
                }
                None => println!("\nNo merge runs yet."),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run_import(conn: &Connection, settings: &Settings, source: &str, file: &Path) -> Result<()> {
    let spec = settings.source(source).with_context(|| {
        let known: Vec<&str> = settings.sources.iter().map(|s| s.name.as_str()).collect();
        format!("unknown source {:?} (configured: {})", source, known.join(", "))
    })?;
    let table = csv::read_table(file).with_context(|| format!("reading {}", file.display()))?;
    let columns = table.headers.len();
    let count = db::import_table(conn, &spec.table, &table)?;
    info!(source, table = %spec.table, rows = count, "imported");
    println!(
        "Imported {} rows ({} columns) into {} for source '{}'",
        count, columns, spec.table, source
    );
    Ok(())
}

fn run_merge(conn: &Connection, settings: &Settings) -> Result<()> {
    let pb = ProgressBar::new(settings.sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut tracker = RunTracker::new(new_run_id());
    let mut resolver = Resolver::new();

    for source in &settings.sources {
        pb.set_message(source.name.clone());
        match db::load_table(conn, &source.table)? {
            Some(rows) => {
                info!(source = %source.name, table = %source.table, rows = rows.len(), "table loaded");
                tracker.record(resolver.ingest(&source.name, &rows));
            }
            None => {
                warn!(source = %source.name, table = %source.table, "source table missing, skipped");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let index = resolver.finish();
    info!(companies = index.len(), "companies resolved");

    let dataset = assemble::assemble(score::enrich_all(index.into_fragments()));
    let saved = db::save_dataset(conn, &settings.master_table, &dataset)?;
    tracker.persist(conn)?;
    info!(table = %settings.master_table, rows = saved, columns = dataset.columns.len(), "master table written");

    println!("Run {}", tracker.run_id());
    print_run_table(tracker.metrics());
    println!(
        "\n{} rows read ({} without a name), {} companies saved to {}",
        tracker.total_rows(),
        tracker.total_skipped(),
        saved,
        settings.master_table
    );
    Ok(())
}

fn print_run_table(metrics: &[SourceStats]) {
    println!(
        "{:<16} | {:>7} | {:>7} | {:>7} | {:>7}",
        "Source", "Rows", "New", "Merged", "Skipped"
    );
    println!("{}", "-".repeat(58));
    for m in metrics {
        println!(
            "{:<16} | {:>7} | {:>7} | {:>7} | {:>7}",
            truncate(&m.source, 16),
            m.rows,
            m.new_companies,
            m.merged,
            m.skipped_blank_name
        );
    }
}

fn print_overview(rows: &[report::CompanyRow]) {
    println!(
        "{:>3} | {:<6} | {:<28} | {:<18} | {:>5} | {:>4} | {:>3} | {:<4} | {:<28}",
        "#", "ID", "Company", "Industry", "Score", "Team", "Ch", "24/7", "Site"
    );
    println!("{}", "-".repeat(124));

    for (i, r) in rows.iter().enumerate() {
        let industry = truncate(r.industry.as_deref().unwrap_or("-"), 18);
        let site = truncate(r.primary_site.as_deref().unwrap_or("-"), 28);
        let team = if r.team_size > 0 {
            r.team_size.to_string()
        } else if r.has_support_team {
            "?".into()
        } else {
            "-".into()
        };
        println!(
            "{:>3} | {:<6} | {:<28} | {:<18} | {:>5} | {:>4} | {:>3} | {:<4} | {:<28}",
            i + 1,
            r.company_id,
            truncate(&r.name, 28),
            industry,
            r.score,
            team,
            r.channels,
            if r.has_24_7 { "yes" } else { "" },
            site
        );
    }

    println!("\n{} companies", rows.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
