//! npsboard - Net Promoter Score survey dashboard
//!
//! A CLI tool that loads a classified survey results table and writes
//! an NPS summary report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing input, invalid data, config, write failure)

use anyhow::{Context, Result};
use chrono::Utc;
use npsboard::cli::Args;
use npsboard::config::{Config, CONFIG_FILE};
use npsboard::models::{Report, ReportMetadata};
use npsboard::{loader, report, Dashboard};
use std::path::PathBuf;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `[general] verbose` applies
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("npsboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    if let Err(e) = run(&args, config) {
        error!("Report failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .npsboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize filters, column names, and report options.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load, filter, aggregate and export.
fn run(args: &Args, config: Config) -> Result<()> {
    config.validate()?;

    let input = args
        .input
        .clone()
        .context("An input file is required (--input)")?;

    if config.filters.start_date.is_some() != config.filters.end_date.is_some() {
        warn!("Only one end of the date range is set; the date filter is ignored");
    }

    // Step 1: Load surveys
    println!("📥 Loading surveys: {}", input.display());
    let records = loader::load_csv(&input, &config.columns)
        .with_context(|| format!("Failed to load surveys from {}", input.display()))?;

    // Step 2: Compute every view for the current filters
    let filters = config.filter_state();
    let dashboard = Dashboard::compute(&records, &filters);

    if dashboard.is_empty() {
        warn!("No surveys match the current filters");
    }

    // Step 3: Build and write the report
    let metadata = ReportMetadata {
        title: config.report.title.clone(),
        source: input.display().to_string(),
        generated_at: Utc::now(),
        records_loaded: records.len(),
    };
    let report = Report::new(metadata, dashboard);

    let output = PathBuf::from(&config.general.output);
    report::write_report(&report, &config.report, config.general.format, &output)?;

    print_summary(&report);
    println!("\n✅ Report saved to: {}", output.display());

    Ok(())
}

/// Print the headline indicators to the terminal.
fn print_summary(report: &Report) {
    println!("\n📊 Summary:");
    for (label, value) in &report.kpis {
        println!("   {}: {}", label, value);
    }
    println!(
        "   Agents: {} | Weeks: {} | Non-recoverable: {}",
        report.dashboard.agent_month.agents.len(),
        report.dashboard.weekly_trend.len(),
        report.dashboard.non_recoverable.len()
    );
}

/// Where the configuration came from, reported once logging is up.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    Fallback(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(e))),
    }
}
