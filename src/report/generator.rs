//! Markdown report generation.
//!
//! This module generates the NPS summary document from a computed
//! dashboard. Tables stand in for the charts of the interactive view.

use crate::analysis::{Dashboard, SegmentFocus};
use crate::config::{OutputFormat, ReportConfig};
use crate::models::{
    CaseNote, NpsMatrix, Recoverability, RecoverabilityBreakdown, Report, ReportMetadata,
    SurveyRecord, WeeklyPoint,
};
use anyhow::{Context, Result};
use std::path::Path;

const NO_DATA: &str = "No surveys match the current filters.\n\n";

/// Make a free-text value safe inside a table cell or a one-line quote.
fn escape_inline(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, settings: &ReportConfig) -> String {
    let dashboard = &report.dashboard;
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", report.metadata.title));

    output.push_str(&generate_metadata_section(&report.metadata, dashboard));
    output.push_str(&generate_kpi_section(&report.kpis));
    output.push_str(&generate_trend_section(&dashboard.weekly_trend));
    output.push_str(&generate_agent_month_section(&dashboard.agent_month));
    output.push_str(&generate_focus_section(&dashboard.focus));
    output.push_str(&generate_recoverability_section(dashboard.recoverability));

    if settings.include_comments {
        output.push_str(&generate_case_notes_section(&dashboard.non_recoverable));
        output.push_str(&generate_recommendations_section(&dashboard.non_recoverable));
    }

    if settings.max_detail_rows > 0 {
        output.push_str(&generate_detail_section(
            &dashboard.records,
            settings.max_detail_rows,
        ));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, dashboard: &Dashboard) -> String {
    let mut section = String::new();
    let filters = &dashboard.filters;

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Surveys:** {} loaded, {} after filters\n",
        metadata.records_loaded, dashboard.kpis.total
    ));

    let segments: Vec<String> = filters.segments.iter().map(|s| s.to_string()).collect();
    section.push_str(&format!("- **Segments:** {}\n", segments.join(", ")));

    match filters.date_range.as_slice() {
        [start, end] => section.push_str(&format!("- **Opened:** {} to {}\n", start, end)),
        _ => section.push_str("- **Opened:** all dates\n"),
    }
    section.push('\n');

    section
}

/// Generate the key indicators section.
fn generate_kpi_section(kpis: &[(String, String)]) -> String {
    let mut section = String::new();

    section.push_str("## Key Indicators\n\n");

    let labels: Vec<&str> = kpis.iter().map(|(label, _)| label.as_str()).collect();
    let values: Vec<String> = kpis.iter().map(|(_, value)| format!("**{}**", value)).collect();

    section.push_str(&format!("| {} |\n", labels.join(" | ")));
    section.push_str(&format!("|{}\n", ":---:|".repeat(kpis.len())));
    section.push_str(&format!("| {} |\n\n", values.join(" | ")));

    section
}

/// Generate the weekly trend section.
fn generate_trend_section(trend: &[WeeklyPoint]) -> String {
    let mut section = String::new();

    section.push_str("## Weekly NPS Trend\n\n");

    if trend.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    section.push_str("| Week of | Mean score | Responses |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for point in trend {
        section.push_str(&format!(
            "| {} | {:.2} | {} |\n",
            point.week_start, point.mean_nps, point.responses
        ));
    }
    section.push('\n');

    section
}

/// Generate the agent by month NPS table.
fn generate_agent_month_section(matrix: &NpsMatrix) -> String {
    let mut section = String::new();

    section.push_str("## NPS (%) by Agent and Month\n\n");

    if matrix.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    let months = matrix.sorted_months();

    section.push_str(&format!("| Agent | {} |\n", months.join(" | ")));
    section.push_str(&format!("|:---|{}\n", ":---:|".repeat(months.len())));

    for agent in &matrix.agents {
        let cells: Vec<String> = months
            .iter()
            .map(|month| match matrix.nps(agent, month) {
                Some(nps) => format!("{:.1}", nps),
                None => "-".to_string(),
            })
            .collect();
        section.push_str(&format!(
            "| {} | {} |\n",
            escape_inline(agent),
            cells.join(" | ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the category analysis for the focus segment.
fn generate_focus_section(focus: &SegmentFocus) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "## Results Analysis: {} {}\n\n",
        focus.segment.emoji(),
        focus.segment
    ));

    if focus.responses == 0 {
        section.push_str(&format!(
            "No {} responses match the current filters.\n\n",
            focus.segment.to_string().to_lowercase()
        ));
        return section;
    }

    section.push_str(&format!(
        "### Top {} Categories\n\n",
        focus.top_categories.len()
    ));
    section.push_str("| Category | Cases |\n");
    section.push_str("|:---|:---:|\n");
    for (category, count) in &focus.top_categories {
        section.push_str(&format!("| {} | {} |\n", escape_inline(category), count));
    }
    section.push('\n');

    let tab = &focus.cause_matrix;
    section.push_str("### Root Cause by Category\n\n");
    let headers: Vec<String> = tab.columns.iter().map(|c| escape_inline(c)).collect();
    section.push_str(&format!("| Root cause | {} |\n", headers.join(" | ")));
    section.push_str(&format!("|:---|{}\n", ":---:|".repeat(tab.columns.len())));
    for cause in &tab.rows {
        let counts: Vec<String> = tab
            .columns
            .iter()
            .map(|category| tab.count(cause, category).to_string())
            .collect();
        section.push_str(&format!(
            "| {} | {} |\n",
            escape_inline(cause),
            counts.join(" | ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the recoverability section.
fn generate_recoverability_section(breakdown: Option<RecoverabilityBreakdown>) -> String {
    let mut section = String::new();

    section.push_str("## Recoverable vs Not Recoverable\n\n");

    let Some(breakdown) = breakdown else {
        section.push_str(NO_DATA);
        return section;
    };

    section.push_str("| State | Share |\n");
    section.push_str("|:---|:---:|\n");
    for state in [Recoverability::Recoverable, Recoverability::NotRecoverable] {
        section.push_str(&format!(
            "| {} | {:.1} % |\n",
            state,
            breakdown.share(state) * 100.0
        ));
    }
    section.push('\n');

    section
}

/// Generate the comments and recommendations of non-recoverable cases.
fn generate_case_notes_section(notes: &[CaseNote]) -> String {
    let mut section = String::new();

    section.push_str("## Non-Recoverable Comments\n\n");

    if notes.is_empty() {
        section.push_str("No non-recoverable cases.\n\n");
        return section;
    }

    for note in notes {
        section.push_str(&format!(
            "> **{}**: {}\n\n",
            escape_inline(&note.case_number),
            escape_inline(&note.comment)
        ));
    }

    section
}

/// Generate the recommendations recorded for non-recoverable cases.
fn generate_recommendations_section(notes: &[CaseNote]) -> String {
    let mut section = String::new();

    section.push_str("## Recommendations\n\n");

    let recommended: Vec<&CaseNote> = notes
        .iter()
        .filter(|n| !n.recommendation.is_empty())
        .collect();

    if recommended.is_empty() {
        section.push_str("No recommendations recorded.\n\n");
        return section;
    }

    for note in recommended {
        section.push_str(&format!(
            "- **{}**: {}\n",
            escape_inline(&note.case_number),
            escape_inline(&note.recommendation)
        ));
    }
    section.push('\n');

    section
}

/// Generate the case detail table.
fn generate_detail_section(records: &[SurveyRecord], max_rows: usize) -> String {
    let mut section = String::new();

    section.push_str("## Case Detail\n\n");

    if records.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    section.push_str(
        "| Case | Opened | Segment | Type | Category | Root cause | Recoverable | Agent |\n",
    );
    section.push_str("|:---|:---|:---|:---|:---|:---|:---|:---|\n");

    for record in records.iter().take(max_rows) {
        let opened = record
            .opened_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
            escape_inline(&record.case_number),
            opened,
            record.segment(),
            escape_inline(&record.case_type),
            escape_inline(&record.category),
            escape_inline(&record.root_cause),
            record.is_recoverable,
            escape_inline(&record.agent_id)
        ));
    }

    if records.len() > max_rows {
        section.push_str(&format!(
            "\n*Showing {} of {} cases.*\n",
            max_rows,
            records.len()
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by npsboard v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write the report to a file in the requested format.
pub fn write_report(
    report: &Report,
    settings: &ReportConfig,
    format: OutputFormat,
    path: &Path,
) -> Result<()> {
    let content = match format {
        OutputFormat::Markdown => generate_markdown_report(report, settings),
        OutputFormat::Json => generate_json_report(report)?,
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}
