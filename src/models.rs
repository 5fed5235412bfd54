//! Data models for the NPS dashboard.
//!
//! This module contains the typed survey record loaded from the results
//! table and every derived view the aggregation pipeline produces.

use crate::analysis::Dashboard;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A validated Net Promoter Score answer (0-10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct NpsScore(u8);

impl NpsScore {
    pub const MAX: u8 = 10;

    /// Creates a score, rejecting anything outside 0-10.
    pub fn new(value: i64) -> Result<Self> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(PipelineError::invalid(
                None,
                "nps_score",
                value.to_string(),
                "score must be between 0 and 10",
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Returns the segment this score falls into.
    pub fn segment(self) -> Segment {
        match self.0 {
            9..=10 => Segment::Promoter,
            7..=8 => Segment::Neutral,
            _ => Segment::Detractor,
        }
    }
}

impl TryFrom<i64> for NpsScore {
    type Error = PipelineError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<NpsScore> for u8 {
    fn from(score: NpsScore) -> Self {
        score.0
    }
}

impl fmt::Display for NpsScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// NPS segment of a single response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Scores 9-10
    Promoter,
    /// Scores 7-8
    Neutral,
    /// Scores 0-6
    Detractor,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Promoter, Segment::Neutral, Segment::Detractor];

    /// Returns an emoji representation of the segment.
    pub fn emoji(&self) -> &'static str {
        match self {
            Segment::Promoter => "🟢",
            Segment::Neutral => "🟡",
            Segment::Detractor => "🔴",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Promoter => write!(f, "Promoter"),
            Segment::Neutral => write!(f, "Neutral"),
            Segment::Detractor => write!(f, "Detractor"),
        }
    }
}

impl std::str::FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "promoter" | "promoters" => Ok(Segment::Promoter),
            "neutral" | "neutrals" | "passive" | "passives" => Ok(Segment::Neutral),
            "detractor" | "detractors" => Ok(Segment::Detractor),
            other => Err(format!("unknown segment: {}", other)),
        }
    }
}

/// Whether a case can still be recovered through follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recoverability {
    Recoverable,
    NotRecoverable,
}

impl Recoverability {
    /// Parses the boolean-like flag written by the upstream classifier.
    ///
    /// This is the only place where raw flag strings are interpreted.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "sí" | "si" | "1" | "recoverable" | "recuperable" => {
                Some(Recoverability::Recoverable)
            }
            "false" | "no" | "n" | "0" | "not recoverable" | "no recuperable" => {
                Some(Recoverability::NotRecoverable)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Recoverability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recoverability::Recoverable => write!(f, "Recoverable"),
            Recoverability::NotRecoverable => write!(f, "Not Recoverable"),
        }
    }
}

/// One completed survey, as loaded from the results table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    /// Case identifier (may be empty if the column is absent).
    pub case_number: String,
    /// Score given by the customer.
    pub nps_score: NpsScore,
    /// When the case was opened. `None` if the timestamp could not be parsed.
    pub opened_at: Option<NaiveDateTime>,
    /// Agent who resolved the case.
    pub agent_id: String,
    /// Generic category assigned by the classifier.
    pub category: String,
    /// Root cause assigned by the classifier.
    pub root_cause: String,
    /// Recoverability flag.
    pub is_recoverable: Recoverability,
    /// Case type.
    pub case_type: String,
    /// Free-text customer comment.
    pub comment: String,
    /// Suggested follow-up action.
    pub recommendation: String,
}

impl SurveyRecord {
    pub fn segment(&self) -> Segment {
        self.nps_score.segment()
    }

    /// Calendar date the case was opened, if known.
    pub fn opened_on(&self) -> Option<NaiveDate> {
        self.opened_at.map(|ts| ts.date())
    }
}

/// Segment shares of a record set, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentRates {
    pub pct_promoter: f64,
    pub pct_neutral: f64,
    pub pct_detractor: f64,
    /// `pct_promoter - pct_detractor`, range -100..=100.
    pub nps: f64,
}

/// Headline indicators for a record set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// Number of surveys.
    pub total: usize,
    /// Segment shares. `None` when there are no surveys.
    pub rates: Option<SegmentRates>,
}

/// Mean score for one calendar week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    /// Monday of the week.
    pub week_start: NaiveDate,
    pub mean_nps: f64,
    pub responses: usize,
}

/// Segment counts and NPS for one agent in one month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpsCell {
    pub promoters: usize,
    pub neutrals: usize,
    pub detractors: usize,
    pub total: usize,
    /// NPS percentage rounded to 1 decimal.
    pub nps: f64,
}

/// NPS percentage per agent and month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NpsMatrix {
    /// Agent identifiers, sorted.
    pub agents: Vec<String>,
    /// Months (`YYYY-MM`) in the order they were first seen.
    pub months: Vec<String>,
    /// Cells keyed by `agent` then `month`. Groups without records are absent.
    pub cells: HashMap<String, HashMap<String, NpsCell>>,
}

impl NpsMatrix {
    /// Returns the cell for an agent and month, or `None` if undefined.
    pub fn cell(&self, agent: &str, month: &str) -> Option<&NpsCell> {
        self.cells.get(agent).and_then(|row| row.get(month))
    }

    /// NPS percentage for an agent and month, or `None` if undefined.
    pub fn nps(&self, agent: &str, month: &str) -> Option<f64> {
        self.cell(agent, month).map(|c| c.nps)
    }

    /// Months in chronological order.
    pub fn sorted_months(&self) -> Vec<String> {
        let mut months = self.months.clone();
        months.sort();
        months
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Count cross tabulation with sorted row and column labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossTab {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub counts: HashMap<String, HashMap<String, usize>>,
}

impl CrossTab {
    /// Count for a row/column pair; missing combinations are zero.
    pub fn count(&self, row: &str, column: &str) -> usize {
        self.counts
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(0)
    }
}

/// Share of recoverable and non-recoverable cases (sums to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoverabilityBreakdown {
    pub recoverable: f64,
    pub not_recoverable: f64,
}

impl RecoverabilityBreakdown {
    pub fn share(&self, state: Recoverability) -> f64 {
        match state {
            Recoverability::Recoverable => self.recoverable,
            Recoverability::NotRecoverable => self.not_recoverable,
        }
    }
}

/// Comment and recommendation of a case that cannot be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseNote {
    pub case_number: String,
    pub comment: String,
    pub recommendation: String,
}

/// Metadata about the exported report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report title.
    pub title: String,
    /// Input file the surveys were loaded from.
    pub source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of surveys loaded before filtering.
    pub records_loaded: usize,
}

/// The complete exported report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Metadata about the report.
    pub metadata: ReportMetadata,
    /// Headline indicators as label/value pairs, in display order.
    pub kpis: Vec<(String, String)>,
    /// Every view computed for the current filters.
    pub dashboard: Dashboard,
}

impl Report {
    /// Creates a report, deriving the KPI labels from the dashboard.
    pub fn new(metadata: ReportMetadata, dashboard: Dashboard) -> Self {
        let kpis = kpi_labels(&dashboard.kpis);
        Self {
            metadata,
            kpis,
            dashboard,
        }
    }
}

/// Label/value pairs for the headline indicators.
///
/// "Total" is the number of surveys left after filtering.
pub fn kpi_labels(kpis: &Kpis) -> Vec<(String, String)> {
    let fmt_pct = |value: Option<f64>| match value {
        Some(v) => format!("{:.1} %", v),
        None => "-".to_string(),
    };
    let rates = kpis.rates;

    vec![
        ("Total".to_string(), kpis.total.to_string()),
        (
            "% Promoters".to_string(),
            fmt_pct(rates.map(|r| r.pct_promoter)),
        ),
        ("% Neutrals".to_string(), fmt_pct(rates.map(|r| r.pct_neutral))),
        (
            "% Detractors".to_string(),
            fmt_pct(rates.map(|r| r.pct_detractor)),
        ),
        (
            "NPS".to_string(),
            rates
                .map(|r| format!("{:.1}", r.nps))
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]
}
