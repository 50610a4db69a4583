//! Sequoia CLI - Wyckoff screening over a stock universe.
//!
//! Commands:
//! - `screen` - one screening pass: fetch, liquidity filter, detectors, notify
//! - `daily` - run `screen` every weekday at the configured time
//! - `check` - print every detector's verdict for a few symbols

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use sequoia_core::data::{
    preprocess, CircuitBreaker, CsvDirProvider, DataProvider, LogProgress, UniverseFile,
    YahooProvider,
};
use sequoia_core::detect::{build_detectors, DetectorKind};
use sequoia_core::{RunContext, Symbol};
use sequoia_runner::{notify, schedule, RunReport, ScreenConfig, ScreeningPipeline};

#[derive(Parser)]
#[command(name = "sequoia", about = "Sequoia: Wyckoff pattern screener")]
struct Cli {
    /// Log level: trace, debug, info, warn, error.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Universe file (.toml with [[symbols]] or .csv with code,name).
    #[arg(long)]
    universe: PathBuf,

    /// Read bars from <dir>/<code>.csv instead of Yahoo Finance.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Screen as of this date (YYYY-MM-DD) instead of the latest bar.
    #[arg(long)]
    as_of: Option<String>,

    /// Fetch parallelism. Overrides worker_count from the config file.
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one screening pass.
    Screen {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Run a screening pass every weekday at a fixed time.
    Daily {
        #[command(flatten)]
        args: RunArgs,

        /// Trigger time (HH:MM). Overrides schedule.at from the config file.
        #[arg(long)]
        at: Option<String>,
    },
    /// Print each detector's verdict for the given symbol codes.
    Check {
        /// Symbol codes (e.g., 600519 000001).
        #[arg(required = true)]
        codes: Vec<String>,

        /// Path to a TOML config file for thresholds.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read bars from <dir>/<code>.csv instead of Yahoo Finance.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Evaluate as of this date (YYYY-MM-DD).
        #[arg(long)]
        as_of: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Screen { args } => run_screen(&args),
        Commands::Daily { args, at } => run_daily(&args, at.as_deref()),
        Commands::Check {
            codes,
            config,
            data_dir,
            as_of,
        } => run_check(&codes, config.as_deref(), data_dir, as_of.as_deref()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn load_config(path: Option<&Path>) -> Result<ScreenConfig> {
    match path {
        Some(p) => ScreenConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(ScreenConfig::default()),
    }
}

fn resolve_config(args: &RunArgs) -> Result<ScreenConfig> {
    let as_of = args.as_of.as_deref().map(parse_date).transpose()?;
    let config = load_config(args.config.as_deref())?.with_overrides(as_of, args.workers);
    config.validate()?;
    Ok(config)
}

fn provider(data_dir: Option<PathBuf>) -> Box<dyn DataProvider> {
    match data_dir {
        Some(dir) => Box::new(CsvDirProvider::new(dir)),
        None => {
            let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooProvider::new(circuit_breaker))
        }
    }
}

fn screen_once(config: &ScreenConfig, args: &RunArgs) -> Result<RunReport> {
    let universe = UniverseFile::new(&args.universe);
    let provider = provider(args.data_dir.clone());
    let pipeline = ScreeningPipeline::new(config, notify::from_config(&config.push));
    let report = pipeline.run(&universe, provider.as_ref(), &LogProgress::default())?;
    Ok(report)
}

fn run_screen(args: &RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let report = screen_once(&config, args)?;
    print_summary(&report);
    Ok(())
}

fn run_daily(args: &RunArgs, at: Option<&str>) -> Result<()> {
    let config = resolve_config(args)?;
    let at = match at {
        Some(s) => NaiveTime::parse_from_str(s, "%H:%M")
            .with_context(|| format!("invalid --at '{s}', expected HH:MM"))?,
        None => config.schedule.time()?,
    };

    loop {
        let now = chrono::Local::now().naive_local();
        let next = schedule::next_run(now, at);
        info!("next screening run at {next}");
        std::thread::sleep(schedule::until(now, next));

        match screen_once(&config, args) {
            Ok(report) => print_summary(&report),
            Err(e) => error!("screening run failed: {e:#}"),
        }
    }
}

fn run_check(
    codes: &[String],
    config: Option<&Path>,
    data_dir: Option<PathBuf>,
    as_of: Option<&str>,
) -> Result<()> {
    let config = load_config(config)?;
    let as_of = as_of.map(parse_date).transpose()?;
    let end = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    if end < config.history_start {
        bail!("as-of date {end} is before history_start {}", config.history_start);
    }

    let provider = provider(data_dir);
    let detectors = build_detectors(&DetectorKind::ALL, &config.detector_params());
    let ctx = RunContext { as_of };

    for code in codes {
        let symbol = Symbol::new(code.as_str(), "");
        let raw = match provider.fetch(&symbol, config.history_start, end) {
            Ok(raw) => raw,
            Err(e) => {
                println!("{code}: fetch failed: {e}");
                continue;
            }
        };
        let Some(series) = preprocess(symbol, raw) else {
            println!("{code}: no data");
            continue;
        };

        println!(
            "{code}: {} bars, {} .. {}",
            series.len(),
            series.first_date().map(|d| d.to_string()).unwrap_or_default(),
            series.last_date().map(|d| d.to_string()).unwrap_or_default(),
        );
        if !ctx.is_listed(&series) {
            println!("  not listed as of {end}");
            continue;
        }
        let liquid = config.liquidity.passes(ctx.view(series.bars()));
        println!("  {:<16} {}", "liquidity", if liquid { "pass" } else { "fail" });
        for det in &detectors {
            let d = det.detect(&series.symbol, series.bars(), &ctx);
            let verdict = if d.matched { "MATCH" } else { "-" };
            println!("  {:<16} {verdict}", det.name());
            if let Some(diag) = &d.diagnostic {
                println!("    {diag}");
            }
        }
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("=== Screening Summary ===");
    if let Some(as_of) = report.as_of {
        println!("As of:      {as_of}");
    }
    println!("Fetched:    {}/{}", report.fetched, report.universe_size);
    println!("Empty:      {}", report.empty);
    println!("Failed:     {}", report.failed);
    println!("Liquid:     {}/{}", report.liquid, report.fetched);
    println!("{}", report.breadth);
    for r in &report.results {
        println!();
        println!("{} ({}/{})", r.label, r.matches.len(), r.candidates);
        for m in &r.matches {
            let date = m
                .detection
                .event_date
                .map(|d| d.to_string())
                .unwrap_or_default();
            println!("  {:<10} {:<12} {date}", m.symbol.code, m.symbol.name);
        }
    }
}
