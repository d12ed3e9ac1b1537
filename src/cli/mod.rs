//! # CLI Module
//!
//! Command-line interface for the hash signer.
//!
//! ## Usage
//! ```bash
//! # Sign explicit items
//! hash-signer sign 0 1 1 2 3 5 8
//!
//! # Sign a range with strict pacing
//! hash-signer sign --range 0..50 --capacity 1
//!
//! # Items from a file, simulating a slow external service
//! hash-signer sign --input items.txt --fast-latency-ms 1000 --slow-latency-ms 10
//!
//! # JSON output
//! hash-signer sign 1 2 3 --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use hash_signer::core::hasher::{HashPrimitiveKind, HasherConfig};
use hash_signer::core::pipeline::{Pipeline, PipelineConfig, PipelineResult};
use hash_signer::core::signer::Item;
use hash_signer::core::source::ItemSource;
use hash_signer::error::{Result, SignerError};
use hash_signer::events::{Event, EventChannel, ItemEvent, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Hash Signer - one deterministic digest for a batch of values
#[derive(Parser, Debug)]
#[command(name = "hash-signer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign a batch of integers
    Sign {
        /// Items to sign
        #[arg(allow_negative_numbers = true, conflicts_with_all = ["range", "input"])]
        items: Vec<Item>,

        /// Sign every integer in START..END
        #[arg(long, value_parser = parse_range, conflicts_with = "input")]
        range: Option<(Item, Item)>,

        /// Read items from a file (whitespace separated, `#` comments)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Capacity of every queue between stages
        #[arg(short, long, default_value = "100")]
        capacity: usize,

        /// Items a stage works on at once
        #[arg(long, default_value = "64")]
        max_in_flight: usize,

        /// Refuse runs producing more than this many results
        #[arg(long)]
        max_items: Option<usize>,

        /// Fast hash primitive
        #[arg(long, default_value = "crc32")]
        fast: FastPrimitive,

        /// Simulated latency per fast hash call
        #[arg(long, default_value = "0")]
        fast_latency_ms: u64,

        /// Simulated latency per slow hash call
        #[arg(long, default_value = "0")]
        slow_latency_ms: u64,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FastPrimitive {
    /// CRC-32, decimal (default)
    Crc32,
    /// xxh3-64, decimal
    Xxh3,
}

impl From<FastPrimitive> for HashPrimitiveKind {
    fn from(primitive: FastPrimitive) -> Self {
        match primitive {
            FastPrimitive::Crc32 => HashPrimitiveKind::Crc32,
            FastPrimitive::Xxh3 => HashPrimitiveKind::Xxh3,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// The digest only
    Minimal,
}

fn parse_range(value: &str) -> std::result::Result<(Item, Item), String> {
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got {value:?}"))?;
    let start = start
        .trim()
        .parse::<Item>()
        .map_err(|e| format!("bad range start {start:?}: {e}"))?;
    let end = end
        .trim()
        .parse::<Item>()
        .map_err(|e| format!("bad range end {end:?}: {e}"))?;
    Ok((start, end))
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign {
            items,
            range,
            input,
            capacity,
            max_in_flight,
            max_items,
            fast,
            fast_latency_ms,
            slow_latency_ms,
            output,
            verbose,
        } => {
            let source = match (range, input) {
                (Some((start, end)), _) => ItemSource::Range { start, end },
                (None, Some(path)) => ItemSource::File(path),
                (None, None) => ItemSource::List(items),
            };
            let config = PipelineConfig {
                capacity,
                max_in_flight,
                max_items,
                hasher: HasherConfig::new()
                    .fast(fast.into())
                    .fast_latency(Duration::from_millis(fast_latency_ms))
                    .slow_latency(Duration::from_millis(slow_latency_ms)),
            };
            run_sign(source, config, output, verbose)
        }
    }
}

fn run_sign(
    source: ItemSource,
    config: PipelineConfig,
    output: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Hash Signer").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let items = source.items()?;
    let pipeline = Pipeline::builder().config(config).build()?;

    if verbose && matches!(output, OutputFormat::Pretty) {
        let hasher = &pipeline.config().hasher;
        for (role, kind) in [("fast", hasher.fast_kind()), ("slow", hasher.slow_kind())] {
            term.write_line(&format!(
                "  {} {}",
                style(format!("{role}:")).dim(),
                kind.description()
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(items.len() as u64);
        let template = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| SignerError::Config(e.to_string()))?;
        pb.set_style(template.progress_chars("█▓░"));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Item(ItemEvent::Collected { collected }) => {
                    pb.set_position(collected as u64);
                }
                Event::Item(ItemEvent::Failed { stage, input, .. }) if verbose => {
                    pb.println(format!("  {} {} failed in {}", style("✗").red(), input, stage));
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Cancelled)
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(items, &sender);

    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, verbose),
        OutputFormat::Json => print_json_results(&result)?,
        OutputFormat::Minimal => println!("{}", result.digest),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &PipelineResult, verbose: bool) {
    term.write_line(&format!("{} Signing Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} items signed in {:.1}s",
        style(result.total_items).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    term.write_line(&format!(
        "  {} slow hash calls, peak concurrency {}",
        style(result.slow_hash.calls).cyan(),
        style(result.slow_hash.peak_concurrency).cyan()
    ))
    .ok();

    if verbose {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Stages:").bold().underlined()))
            .ok();
        for report in &result.stages {
            term.write_line(&format!(
                "  {:<10} {} processed, {} failed, {} skipped ({})",
                style(&report.stage).bold(),
                report.processed,
                report.failed,
                report.skipped,
                style(report.state).dim()
            ))
            .ok();
        }
        term.write_line(&format!("  {} {}", style("Run:").dim(), result.run_id))
            .ok();
    }

    term.write_line("").ok();
    println!("{}", result.digest);
}

fn print_json_results(result: &PipelineResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| SignerError::Config(format!("failed to render JSON: {e}")))?;
    println!("{json}");
    Ok(())
}
