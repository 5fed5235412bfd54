//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.npsboard.toml` files.

use crate::analysis::dashboard::{FilterState, DEFAULT_TOP_CATEGORIES};
use crate::loader::ColumnMap;
use crate::models::Segment;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".npsboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dashboard filters.
    #[serde(default)]
    pub filters: FilterConfig,

    /// Input column names.
    #[serde(default)]
    pub columns: ColumnMap,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "nps_report.md".to_string()
}

/// Dashboard filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Segments to include.
    #[serde(default = "default_segments")]
    pub segments: Vec<Segment>,

    /// First opening date to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Last opening date to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Segment analysed in the category views.
    #[serde(default = "default_focus_segment")]
    pub focus_segment: Segment,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            segments: default_segments(),
            start_date: None,
            end_date: None,
            focus_segment: default_focus_segment(),
        }
    }
}

fn default_segments() -> Vec<Segment> {
    Segment::ALL.to_vec()
}

fn default_focus_segment() -> Segment {
    Segment::Promoter
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Number of entries in the top-categories table.
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,

    /// Maximum rows in the case detail table (0 hides it).
    #[serde(default = "default_max_detail_rows")]
    pub max_detail_rows: usize,

    /// Include customer comments and recommendations.
    #[serde(default = "default_true")]
    pub include_comments: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            top_categories: default_top_categories(),
            max_detail_rows: default_max_detail_rows(),
            include_comments: true,
        }
    }
}

fn default_title() -> String {
    "NPS Report".to_string()
}

fn default_top_categories() -> usize {
    DEFAULT_TOP_CATEGORIES
}

fn default_max_detail_rows() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.npsboard.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref segments) = args.segments {
            self.filters.segments = segments.clone();
        }
        if let Some(from) = args.from {
            self.filters.start_date = Some(from);
        }
        if let Some(to) = args.to {
            self.filters.end_date = Some(to);
        }
        if let Some(focus) = args.focus {
            self.filters.focus_segment = focus;
        }
        if let Some(top) = args.top {
            self.report.top_categories = top;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check settings that may come from the file rather than the CLI.
    pub fn validate(&self) -> Result<()> {
        if self.report.top_categories == 0 {
            anyhow::bail!("[report] top_categories must be at least 1");
        }
        Ok(())
    }

    /// Build the dashboard filter state from the configured filters.
    ///
    /// The date range only carries both endpoints when both are set; a
    /// single date leaves the range empty, which disables the date filter.
    pub fn filter_state(&self) -> FilterState {
        let date_range = match (self.filters.start_date, self.filters.end_date) {
            (Some(start), Some(end)) => vec![start, end],
            _ => Vec::new(),
        };

        FilterState {
            segments: self.filters.segments.clone(),
            date_range,
            focus_segment: self.filters.focus_segment,
            top_n: self.report.top_categories,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
