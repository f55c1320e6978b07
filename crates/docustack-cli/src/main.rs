//! DocuStack CLI - batch PDF extraction into a deduplicated master table.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::{Table, Tabled};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::RecvError};

use docustack::config::default_config_path;
use docustack::pipeline::skipped_message;
use docustack::registry::{JobEventBroadcaster, JobStatus, RegistryEvent};
use docustack::secrets::resolve_api_key;
use docustack::telemetry::{self, LogFormat};
use docustack::view::{self, DocumentDetail, MasterRow, QueueEntry, Summary};
use docustack::{
    load_config, load_config_or_default, BatchProcessor, BatchReport, Config, GeminiExtractor,
    JobRegistry, SourceFile,
};

#[derive(Parser)]
#[command(name = "docustack")]
#[command(about = "Batch PDF extraction with duplicate detection", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to <config dir>/docustack/config.json)
    #[arg(long, global = true, env = "DOCUSTACK_CONFIG")]
    config: Option<PathBuf>,

    /// Log format on stderr: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a batch of PDF files and print the master table
    Extract {
        /// PDF files to extract
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum number of files extracted at once
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Show the detail view of one file instead of the table
        #[arg(long)]
        show: Option<String>,
    },

    /// Interactive session: add batches, inspect results, clear
    Session {
        /// Maximum number of files extracted at once
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Tabled)]
struct MasterTableRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Grand total")]
    grand_total: String,
    #[tabled(rename = "Rows")]
    rows: usize,
}

impl From<&MasterRow> for MasterTableRow {
    fn from(row: &MasterRow) -> Self {
        Self {
            file: row.file_name.clone(),
            name: row.name.clone(),
            date: row.date.clone(),
            total: row.total.clone(),
            grand_total: row.grand_total.clone(),
            rows: row.row_count,
        }
    }
}

#[derive(Tabled)]
struct QueueTableRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl From<&QueueEntry> for QueueTableRow {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            file: entry.file_name.clone(),
            status: entry.status.to_string(),
            error: entry.error.clone().unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigReport<'a> {
    config_file: Option<String>,
    api_key_resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key_error: Option<String>,
    config: &'a Config,
}

impl<'a> ConfigReport<'a> {
    fn new(config: &'a Config, path: Option<&Path>) -> Self {
        let key = resolve_api_key(&config.extractor);
        Self {
            config_file: path.map(|p| p.display().to_string()),
            api_key_resolved: key.is_ok(),
            api_key_error: key.err().map(|e| e.to_string()),
            config,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistryListing {
    summary: Summary,
    documents: Vec<MasterRow>,
    queue: Vec<QueueEntry>,
}

fn load(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    match &cli.config {
        Some(path) => {
            let config = load_config(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok((config, Some(path.clone())))
        }
        None => {
            let path = default_config_path()?;
            let existing = path.exists().then(|| path.clone());
            let config = load_config_or_default(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok((config, existing))
        }
    }
}

fn build_processor(
    config: &Config,
    concurrency: Option<usize>,
    registry: JobRegistry,
) -> Result<BatchProcessor> {
    let extractor = GeminiExtractor::from_config(&config.extractor)
        .context("Failed to set up the extraction service")?;
    tracing::info!(model = extractor.model(), "Extraction service ready");

    Ok(
        BatchProcessor::new(Arc::new(registry), Arc::new(extractor))
            .with_max_concurrency(concurrency.or(config.pipeline.max_concurrency)),
    )
}

/// Turns paths into source files, leaving out anything that is not a PDF.
fn collect_sources(paths: &[PathBuf]) -> Vec<SourceFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = SourceFile::from_path(path);
        if file.is_pdf() {
            files.push(file);
        } else {
            println!(
                "{}",
                format!("Ignoring {} ({}): not a PDF", path.display(), file.media_type).yellow()
            );
        }
    }
    files
}

fn print_report(report: &BatchReport) {
    if let Some(message) = report.skipped_message() {
        println!("{}", message.yellow());
    }

    for outcome in &report.outcomes {
        if let Some(error) = outcome.error() {
            println!("{} {}: {}", "✗".red(), outcome.file_name, error.red());
        }
    }

    print_batch_summary(report);
}

fn print_batch_summary(report: &BatchReport) {
    let counts = report.counts();
    if counts.admitted > 0 {
        println!(
            "{}",
            format!(
                "✓ Batch done: {} completed, {} duplicate(s), {} failed",
                counts.completed, counts.rejected, counts.failed
            )
            .green()
            .bold()
        );
    }
}

fn print_summary(summary: &Summary) {
    let counts = summary.counts;
    let state = if summary.processing {
        "processing".yellow()
    } else {
        "idle".green()
    };
    println!(
        "{} documents: {}, queue: {} pending, {} processing, {} error ({})",
        "Summary".cyan().bold(),
        counts.completed,
        counts.pending,
        counts.processing,
        counts.error,
        state
    );
}

fn print_registry(registry: &JobRegistry, json: bool) -> Result<()> {
    let jobs = registry.snapshot();
    let listing = RegistryListing {
        summary: Summary::from(registry.counts()),
        documents: view::master_rows(&jobs),
        queue: view::queue(&jobs),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    print_summary(&listing.summary);
    println!();

    if listing.documents.is_empty() {
        println!("{}", "No extracted documents".yellow());
    } else {
        let rows: Vec<MasterTableRow> = listing.documents.iter().map(Into::into).collect();
        println!("{}", "Master table".cyan().bold());
        println!("{}", Table::new(rows));
    }

    if !listing.queue.is_empty() {
        println!();
        let rows: Vec<QueueTableRow> = listing.queue.iter().map(Into::into).collect();
        println!("{}", "Verification queue".cyan().bold());
        println!("{}", Table::new(rows));
    }

    Ok(())
}

fn print_detail(detail: &DocumentDetail) {
    println!("{}", detail.file_name.cyan().bold());
    if !detail.summary.is_empty() {
        println!("{}", detail.summary);
    }
    println!(
        "Name: {}  Date: {}  Total: {}  Grand total: {}",
        detail.name, detail.date, detail.total, detail.grand_total
    );

    if detail.headers.is_empty() {
        println!("{}", "No line items".yellow());
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(detail.headers.clone());
    for row in &detail.rows {
        builder.push_record(row.clone());
    }
    println!("{}", builder.build());
}

fn show_document(registry: &JobRegistry, name: &str, json: bool) -> Result<()> {
    let Some(job) = registry.find_by_name(name) else {
        println!("{}", format!("No document named '{}'", name).yellow());
        return Ok(());
    };

    match view::detail(&job) {
        Some(detail) if json => println!("{}", serde_json::to_string_pretty(&detail)?),
        Some(detail) => print_detail(&detail),
        None => {
            let status = match &job.error {
                Some(error) => format!("{}: {}", job.status, error),
                None => job.status.to_string(),
            };
            println!("{} has no extracted data ({})", job.file_name(), status);
        }
    }
    Ok(())
}

/// Plain-text line for a registry event shown during a session.
fn event_line(event: &RegistryEvent) -> Option<String> {
    match event {
        RegistryEvent::Admitted { skipped, .. } => skipped_message(*skipped),
        RegistryEvent::StatusChanged(change) => Some(match &change.error {
            Some(error) => format!("{} {}: {}", change.file_name, change.status, error),
            None => format!("{} {}", change.file_name, change.status),
        }),
        RegistryEvent::Cleared { .. } => None,
    }
}

fn print_event(event: &RegistryEvent) {
    let Some(line) = event_line(event) else {
        return;
    };
    let line = match event {
        RegistryEvent::StatusChanged(change) => match change.status {
            JobStatus::Completed => line.green(),
            JobStatus::Error => line.red(),
            JobStatus::Pending | JobStatus::Processing => line.normal(),
        },
        _ => line.yellow(),
    };
    println!("{}", line);
}

/// Prints registry events as they arrive until the registry is dropped.
fn watch_events(mut rx: broadcast::Receiver<RegistryEvent>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Status display lagged, missed {} updates", n);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn prompt(text: &str) -> Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}

fn print_session_help() {
    println!("{}", "Commands".cyan().bold());
    println!("  add <file.pdf>...   extract a batch in the background");
    println!("  list                master table, queue and summary");
    println!("  show <file name>    detail view of one document");
    println!("  clear               discard every document");
    println!("  quit                leave the session");
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>, question: &str) -> Result<bool> {
    prompt(&format!("{} [y/N] ", question))?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

async fn run_session(processor: BatchProcessor, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if let Some(rx) = processor.registry().subscribe() {
        watch_events(rx);
    }
    print_session_help();

    loop {
        prompt("docustack> ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => continue,
            "add" => {
                let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
                if paths.is_empty() {
                    println!("usage: add <file.pdf>...");
                    continue;
                }
                let files = collect_sources(&paths);
                let processor = processor.clone();
                // Skips and per-file results are printed by the event watcher
                tokio::spawn(async move {
                    let report = processor.submit(files).await;
                    print_batch_summary(&report);
                });
            }
            "list" | "ls" => print_registry(processor.registry(), json)?,
            "show" if rest.is_empty() => println!("usage: show <file name>"),
            "show" => show_document(processor.registry(), rest, json)?,
            "clear" => {
                if processor.registry().is_empty() {
                    println!("Nothing to clear");
                } else if confirm(&mut lines, "Purge all analysis data?").await? {
                    let count = processor.registry().clear();
                    println!("{}", format!("✓ Cleared {} document(s)", count).green());
                } else {
                    println!("Cancelled");
                }
            }
            "help" | "?" => print_session_help(),
            "quit" | "exit" => break,
            other => println!("Unknown command '{}'. Type 'help'.", other),
        }
    }

    if processor.registry().is_busy() {
        tracing::warn!("Leaving session with jobs still in flight");
    }
    Ok(())
}

fn print_config(config: &Config, path: Option<&Path>, json: bool) -> Result<()> {
    let report = ConfigReport::new(config, path);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &report.config_file {
        Some(path) => println!("{} {}", "Config file:".cyan().bold(), path),
        None => println!("{} (none, using defaults)", "Config file:".cyan().bold()),
    }
    let key_status = match &report.api_key_error {
        None => "configured".green(),
        Some(e) => format!("missing ({})", e).red(),
    };
    println!("{} {}", "API key:".cyan().bold(), key_status);
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_logging(cli.log_format, telemetry::DEFAULT_FILTER)
        .context("Failed to initialise logging")?;

    let (config, config_path) = load(&cli)?;

    match cli.command {
        Commands::Extract {
            ref files,
            concurrency,
            ref show,
        } => {
            let processor = build_processor(&config, concurrency, JobRegistry::new())?;
            let sources = collect_sources(files);
            if sources.is_empty() {
                anyhow::bail!("No PDF files to extract");
            }

            let report = processor.submit(sources).await;
            print_report(&report);
            println!();

            match show {
                Some(name) => show_document(processor.registry(), name, cli.json)?,
                None => print_registry(processor.registry(), cli.json)?,
            }
        }

        Commands::Session { concurrency } => {
            let registry = JobRegistry::with_events(JobEventBroadcaster::default());
            let processor = build_processor(&config, concurrency, registry)?;
            run_session(processor, cli.json).await?;
        }

        Commands::Config => print_config(&config, config_path.as_deref(), cli.json)?,
    }

    Ok(())
}
