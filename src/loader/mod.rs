//! Survey table loading.
//!
//! This module reads the results table exported by the classification step,
//! checks the header once and turns every row into a typed `SurveyRecord`.

use crate::error::{PipelineError, Result};
use crate::models::{NpsScore, Recoverability, SurveyRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Header names of each record field in the input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    #[serde(default = "default_nps_score")]
    pub nps_score: String,
    #[serde(default = "default_opened_at")]
    pub opened_at: String,
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_root_cause")]
    pub root_cause: String,
    #[serde(default = "default_is_recoverable")]
    pub is_recoverable: String,
    #[serde(default = "default_case_type")]
    pub case_type: String,
    /// Optional column.
    #[serde(default = "default_case_number")]
    pub case_number: String,
    /// Optional column.
    #[serde(default = "default_comment")]
    pub comment: String,
    /// Optional column.
    #[serde(default = "default_recommendation")]
    pub recommendation: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            nps_score: default_nps_score(),
            opened_at: default_opened_at(),
            agent_id: default_agent_id(),
            category: default_category(),
            root_cause: default_root_cause(),
            is_recoverable: default_is_recoverable(),
            case_type: default_case_type(),
            case_number: default_case_number(),
            comment: default_comment(),
            recommendation: default_recommendation(),
        }
    }
}

fn default_nps_score() -> String {
    "nps_score".to_string()
}

fn default_opened_at() -> String {
    "opened_at".to_string()
}

fn default_agent_id() -> String {
    "agent_id".to_string()
}

fn default_category() -> String {
    "category".to_string()
}

fn default_root_cause() -> String {
    "root_cause".to_string()
}

fn default_is_recoverable() -> String {
    "is_recoverable".to_string()
}

fn default_case_type() -> String {
    "case_type".to_string()
}

fn default_case_number() -> String {
    "case_number".to_string()
}

fn default_comment() -> String {
    "comment".to_string()
}

fn default_recommendation() -> String {
    "recommendation".to_string()
}

/// Positions of each field in the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    nps_score: usize,
    opened_at: usize,
    agent_id: usize,
    category: usize,
    root_cause: usize,
    is_recoverable: usize,
    case_type: usize,
    case_number: Option<usize>,
    comment: Option<usize>,
    recommendation: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &ColumnMap) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| PipelineError::MissingColumn {
                column: name.to_string(),
            })
        };

        Ok(Self {
            nps_score: require(&columns.nps_score)?,
            opened_at: require(&columns.opened_at)?,
            agent_id: require(&columns.agent_id)?,
            category: require(&columns.category)?,
            root_cause: require(&columns.root_cause)?,
            is_recoverable: require(&columns.is_recoverable)?,
            case_type: require(&columns.case_type)?,
            case_number: find(&columns.case_number),
            comment: find(&columns.comment),
            recommendation: find(&columns.recommendation),
        })
    }
}

/// Timestamp layouts accepted for the opening date, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Parse an opening timestamp. Unrecognised values yield `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a score cell. Integral floats such as `9.0` are accepted.
pub fn parse_score(raw: &str, row: usize, column: &str) -> Result<NpsScore> {
    let raw = raw.trim();
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => match raw.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v.is_finite() => v as i64,
            _ => {
                return Err(PipelineError::invalid(
                    Some(row),
                    column,
                    raw,
                    "score must be a whole number",
                ))
            }
        },
    };

    NpsScore::new(value).map_err(|_| {
        PipelineError::invalid(Some(row), column, raw, "score must be between 0 and 10")
    })
}

fn cell(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

fn optional_cell(record: &StringRecord, index: Option<usize>) -> String {
    index
        .map(|i| cell(record, i).to_string())
        .unwrap_or_default()
}

fn parse_row(
    record: &StringRecord,
    row: usize,
    idx: &ColumnIndex,
    columns: &ColumnMap,
) -> Result<SurveyRecord> {
    let nps_score = parse_score(cell(record, idx.nps_score), row, &columns.nps_score)?;

    let raw_opened = cell(record, idx.opened_at);
    let opened_at = parse_timestamp(raw_opened);
    if opened_at.is_none() {
        debug!(
            "Row {}: unparsed timestamp {:?}, excluded from date views",
            row, raw_opened
        );
    }

    let raw_flag = cell(record, idx.is_recoverable);
    let is_recoverable = Recoverability::parse(raw_flag).ok_or_else(|| {
        PipelineError::invalid(
            Some(row),
            &columns.is_recoverable,
            raw_flag,
            "expected a yes/no flag",
        )
    })?;

    Ok(SurveyRecord {
        case_number: optional_cell(record, idx.case_number),
        nps_score,
        opened_at,
        agent_id: cell(record, idx.agent_id).to_string(),
        category: cell(record, idx.category).to_string(),
        root_cause: cell(record, idx.root_cause).to_string(),
        is_recoverable,
        case_type: cell(record, idx.case_type).to_string(),
        comment: optional_cell(record, idx.comment),
        recommendation: optional_cell(record, idx.recommendation),
    })
}

/// Read survey records from any CSV source.
pub fn read_records<R: Read>(reader: R, columns: &ColumnMap) -> Result<Vec<SurveyRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let idx = ColumnIndex::resolve(&headers, columns)?;

    let mut records = Vec::new();
    for (i, result) in csv_reader.records().enumerate() {
        let record = result?;
        records.push(parse_row(&record, i + 1, &idx, columns)?);
    }

    let undated = records.iter().filter(|r| r.opened_at.is_none()).count();
    if undated > 0 {
        info!("{} records have no usable opening date", undated);
    }

    Ok(records)
}

/// Load survey records from a CSV file.
pub fn load_csv(path: &Path, columns: &ColumnMap) -> Result<Vec<SurveyRecord>> {
    info!("Loading surveys from {}", path.display());
    let file = std::fs::File::open(path)?;
    let records = read_records(file, columns)?;
    info!("Loaded {} surveys", records.len());
    Ok(records)
}
