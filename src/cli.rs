//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::OutputFormat;
use crate::models::Segment;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// npsboard - Net Promoter Score survey dashboard
///
/// Loads a classified survey results table, computes NPS indicators,
/// trends and breakdowns, and writes a Markdown or JSON report.
///
/// Examples:
///   npsboard --input surveys.csv
///   npsboard --input surveys.csv --from 2024-01-01 --to 2024-01-31
///   npsboard --input surveys.csv --segments detractor,neutral --focus detractor
///   npsboard --input surveys.csv --format json --output report.json
///   npsboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Survey results table (CSV)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting or nps_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .npsboard.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "NPSBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Segments to include (comma-separated)
    ///
    /// Example: --segments promoter,neutral
    #[arg(long, value_name = "SEGMENTS", value_delimiter = ',')]
    pub segments: Option<Vec<Segment>>,

    /// First opening date to include (YYYY-MM-DD)
    ///
    /// The date range only applies when both --from and --to are given.
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Last opening date to include (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Segment analysed in the category views
    #[arg(long, value_name = "SEGMENT")]
    pub focus: Option<Segment>,

    /// Number of entries in the top-categories table
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .npsboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        if let Some(ref segments) = self.segments {
            if segments.is_empty() {
                return Err("At least one segment must be selected".to_string());
            }
        }

        if self.top == Some(0) {
            return Err("Top categories must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
