//! dated CLI
//!
//! Command-line driver for the dated expiring resource cache.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dated_core::CacheConfig;

mod document;
mod replay;
mod session;

use replay::{ReplayEvent, Script};
use session::{DocumentSession, OpenOutcome};

/// dated - expiring cache for expensive, disposable resources
#[derive(Parser)]
#[command(name = "dated")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON cache configuration file
    #[arg(short, long, global = true, env = "DATED_CONFIG")]
    config: Option<PathBuf>,

    /// Idle seconds before an entry expires (0 disables expiration)
    #[arg(long, global = true)]
    ttl: Option<u64>,

    /// Minimum seconds between sweep passes
    #[arg(long, global = true)]
    sweep_interval: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open source files through the document cache
    Open {
        /// Files to open
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Number of passes over the file list
        #[arg(short, long, default_value = "2")]
        rounds: usize,
        /// Worker threads sharing the cache
        #[arg(short, long, default_value = "1")]
        threads: usize,
        /// Files to drop from the cache after the last pass
        #[arg(long)]
        forget: Vec<PathBuf>,
    },

    /// Replay a scripted timeline against a cache with a manual clock
    Replay {
        /// Path to the JSON script
        script: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective cache configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter(cli.verbose).into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = resolve_config(cli.config.as_deref(), cli.ttl, cli.sweep_interval)?;

    match cli.command {
        Commands::Open { files, rounds, threads, forget } => {
            cmd_open(config, &files, rounds, threads, &forget)
        }
        Commands::Replay { script, json } => cmd_replay(config, &script, json),
        Commands::Config => cmd_config(&config),
    }
}

/// Default log filter when `RUST_LOG` is unset.
fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "dated=debug,info"
    } else {
        "dated=info,warn"
    }
}

/// Runs `work` for each worker index on scoped threads and concatenates the
/// results in worker order. A panicking worker fails the whole run.
fn run_workers<T, F>(threads: usize, work: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync,
{
    std::thread::scope(|scope| {
        let work = &work;
        let workers: Vec<_> = (0..threads)
            .map(|worker| scope.spawn(move || work(worker)))
            .collect();

        let joined: Vec<_> = workers.into_iter().map(|handle| handle.join()).collect();

        let mut results = Vec::new();
        for (worker, batch) in joined.into_iter().enumerate() {
            match batch {
                Ok(batch) => results.extend(batch),
                Err(_) => bail!("worker {worker} panicked"),
            }
        }
        Ok(results)
    })
}

/// Defaults, then the config file, then command-line overrides.
fn resolve_config(
    path: Option<&Path>,
    ttl: Option<u64>,
    sweep_interval: Option<u64>,
) -> Result<CacheConfig> {
    let mut config = match path {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CacheConfig::default(),
    };
    if let Some(ttl) = ttl {
        config.ttl_seconds = ttl;
    }
    if let Some(interval) = sweep_interval {
        config.sweep_interval_seconds = interval;
    }
    config.validate().context("Invalid cache configuration")?;
    Ok(config)
}

/// Open files through a shared document cache
fn cmd_open(
    config: CacheConfig,
    files: &[PathBuf],
    rounds: usize,
    threads: usize,
    forget: &[PathBuf],
) -> Result<()> {
    if threads == 0 {
        bail!("--threads must be at least 1");
    }

    let session = DocumentSession::new(config)?;
    println!(
        "{} ttl={}s, {} file(s), {} round(s), {} thread(s)",
        "📂 Opening documents:".cyan().bold(),
        session.expiration(),
        files.len(),
        rounds,
        threads
    );

    for round in 1..=rounds {
        println!("\n{} {}", "Round".yellow().bold(), round);

        let results = run_workers(threads, |worker| {
            files
                .iter()
                .skip(worker)
                .step_by(threads)
                .map(|path| session.open(path))
                .collect::<Vec<_>>()
        })?;

        for result in results {
            match result {
                Ok(report) => {
                    let outcome = match report.outcome {
                        OpenOutcome::Loaded => "loaded  ".blue(),
                        OpenOutcome::Reparsed => "reparsed".green(),
                    };
                    println!(
                        "   {} {} ({} lines, rev {}) {}",
                        outcome,
                        report.key,
                        report.lines,
                        report.revision,
                        report.headline.unwrap_or_default().dimmed()
                    );
                }
                Err(err) => println!("   {} {:#}", "error   ".red(), err),
            }
        }
    }

    println!("\n{}", "📊 Memory usage:".cyan().bold());
    let usage = session.memory_usage();
    for entry in &usage {
        println!("   {:>10} B  {}", entry.bytes, entry.key);
    }
    let total: u64 = usage.iter().map(|e| e.bytes).sum();
    println!("   {:>10} B  {}", total, "total".dimmed());

    for path in forget {
        let dropped = session.clear_cache(Some(path.as_path()));
        println!("   {} {} ({})", "Forgot".yellow(), path.display(), dropped);
    }

    let stats = session.stats();
    println!("\n{}", "Cache statistics:".cyan().bold());
    println!("   {} {}", "Hits:".dimmed(), stats.hits);
    println!("   {} {}", "Misses:".dimmed(), stats.misses);
    println!("   {} {:.1}%", "Hit ratio:".dimmed(), stats.hit_ratio() * 100.0);
    println!("   {} {}", "Evictions:".dimmed(), stats.evictions);

    let cleared = session.clear_cache(None);
    println!(
        "\n{} {} cleared, {} released in total",
        "✅ Done:".green().bold(),
        cleared,
        session.released()
    );

    Ok(())
}

/// Replay a scripted timeline
fn cmd_replay(config: CacheConfig, path: &Path, json: bool) -> Result<()> {
    let script = Script::load(path)?;
    let config = script.config.clone().unwrap_or(config);
    let report = replay::run(&script, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} ttl={}s sweep_interval={}s",
        "▶️  Replaying:".cyan().bold(),
        report.config.ttl_seconds,
        report.config.sweep_interval_seconds
    );

    for event in &report.events {
        match event {
            ReplayEvent::Completed { time, step, outcome } => {
                println!("   t={:<6} {} → {}", time, step, outcome.green());
            }
            ReplayEvent::Failed { time, step, error } => {
                println!("   t={:<6} {} → {}", time, step, error.red());
            }
            ReplayEvent::Disposed { time, key, resource } => {
                let at = time.map_or_else(|| "end".to_string(), |t| t.to_string());
                println!(
                    "   t={:<6} {} {}",
                    at,
                    "dispose".yellow(),
                    format!("({key:?}, {resource})").yellow()
                );
            }
        }
    }

    let stats = &report.stats;
    println!("\n{}", "Cache statistics:".cyan().bold());
    println!("   {} {}", "Entries at end:".dimmed(), stats.entries);
    println!("   {} {} / {}", "Hits / misses:".dimmed(), stats.hits, stats.misses);
    println!("   {} {}", "Sweeps:".dimmed(), stats.sweeps);
    println!("   {} {}", "Evictions:".dimmed(), stats.evictions);
    println!("   {} {}", "Disposals:".dimmed(), report.disposals().count());

    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &CacheConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
