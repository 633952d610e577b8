//! CLI binary for szamlamester.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs the batch, and writes the CSV export.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use szamlamester::{
    export_csv, process_batch, DueDateFallback, ExtractionConfig, InvoiceDocument, Ledger,
    PartyRegistry,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process a batch of invoices for the default company
  szamlamester szamla_01.pdf szamla_02.jpg -o szamlak.csv

  # Record for the second company
  szamlamester --company "DJ & K BT." beszerzes/*.pdf -o szamlak.csv

  # Structured JSON output instead of a table
  szamlamester --json szamla.pdf

  # List the configured companies
  szamlamester --list-companies

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY    OpenAI API key (required)
  OPENAI_BASE_URL   OpenAI-compatible endpoint override

SETUP:
  1. Set API key:   export OPENAI_API_KEY=sk-...
  2. Process:       szamlamester szamla.pdf -o szamlak.csv
"#;

/// Extract invoice fields from images and PDFs using a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "szamlamester",
    version,
    about = "Extract invoice fields from images and PDFs using a Vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Invoice files (JPEG/PNG images or single-page PDFs).
    #[arg(required_unless_present = "list_companies")]
    files: Vec<PathBuf>,

    /// Which of your companies the invoices are recorded for (the buyer).
    #[arg(short, long, default_value = "Tornyos Pékség Kft.")]
    company: String,

    /// Write the ledger to this CSV file.
    #[arg(short, long, env = "SZAMLAMESTER_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision model ID.
    #[arg(long, env = "SZAMLAMESTER_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Rendering DPI for PDF pages (72–600).
    #[arg(long, env = "SZAMLAMESTER_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Per-invoice model call timeout in seconds.
    #[arg(long, env = "SZAMLAMESTER_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Leave the due date empty when the invoice omits it, instead of
    /// copying the issue date.
    #[arg(long)]
    empty_due_date: bool,

    /// Output records as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// List the configured companies and exit.
    #[arg(long)]
    list_companies: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.list_companies {
        for party in PartyRegistry::default().parties() {
            println!("{}", party.name);
            for alias in &party.aliases {
                println!("  {}", dim(alias));
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = ExtractionConfig::builder()
        .model(&cli.model)
        .dpi(cli.dpi)
        .api_timeout_secs(cli.api_timeout)
        .due_date_fallback(if cli.empty_due_date {
            DueDateFallback::Empty
        } else {
            DueDateFallback::IssueDate
        })
        .build()
        .context("Invalid configuration")?;

    // ── Read input files ─────────────────────────────────────────────────
    // An unreadable file is reported and skipped; the batch continues.
    let mut documents = Vec::with_capacity(cli.files.len());
    let mut read_failures = 0usize;
    for path in &cli.files {
        match InvoiceDocument::from_path(path) {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                read_failures += 1;
                eprintln!("  {} {}", red("✗"), e);
            }
        }
    }

    // ── Progress bar ─────────────────────────────────────────────────────
    let bar = if show_progress {
        let bar = ProgressBar::new(documents.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} files  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    // ── Run the batch ────────────────────────────────────────────────────
    let results = process_batch(&documents, &cli.company, &config)
        .await
        .context("Batch setup failed")?;

    let mut ledger = Ledger::new();
    let mut failed = read_failures;
    for result in results {
        match result.outcome {
            Ok(record) => {
                if let Some(ref bar) = bar {
                    bar.println(format!(
                        "  {} {:<28} {:<24} {:>10}  {}",
                        green("✓"),
                        result.name,
                        record.counterparty,
                        record.amount,
                        dim(&format!("{:.1}s", result.duration_ms as f64 / 1000.0)),
                    ));
                }
                ledger.append(record);
            }
            Err(e) => {
                failed += 1;
                if let Some(ref bar) = bar {
                    bar.println(format!("  {} {:<28} {}", red("✗"), result.name, red(&e.to_string())));
                } else if !cli.quiet {
                    eprintln!("  {} {}: {}", red("✗"), result.name, e);
                }
            }
        }
        if let Some(ref bar) = bar {
            bar.inc(1);
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(ledger.records())
            .context("Failed to serialise records")?;
        println!("{json}");
    } else if !cli.quiet && !ledger.is_empty() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for (i, r) in ledger.records().iter().enumerate() {
            writeln!(
                handle,
                "{:>3}  {:<24} {:<12} {:>10}  {:<10} {}",
                i, r.counterparty, r.issue_date, r.amount, r.payment_method, r.status
            )
            .context("Failed to write to stdout")?;
        }
    }

    if let Some(ref output_path) = cli.output {
        export_csv(ledger.records(), output_path).context("Export failed")?;
        if !cli.quiet {
            eprintln!(
                "{} {} records  →  {}",
                green("✔"),
                bold(&ledger.len().to_string()),
                bold(&output_path.display().to_string()),
            );
        }
    }

    if !cli.quiet {
        if failed == 0 {
            eprintln!(
                "{} {} invoices extracted for {}",
                green("✔"),
                bold(&ledger.len().to_string()),
                cyan(&cli.company)
            );
        } else {
            eprintln!(
                "{} {}/{} invoices extracted  ({} failed)",
                if ledger.is_empty() { red("✘") } else { cyan("⚠") },
                bold(&ledger.len().to_string()),
                ledger.len() + failed,
                red(&failed.to_string()),
            );
        }
    }

    Ok(())
}
