//! Full dashboard recomputation for a given filter state.
//!
//! The caller owns the loaded records and the current filter selection;
//! `Dashboard::compute` derives every view from scratch on each call.

use crate::analysis::aggregator::{
    agent_month_nps_matrix, category_cause_matrix, compute_overall_kpis, filter_by_date_range,
    filter_by_segment, non_recoverable_cases, recoverability_breakdown, top_categories,
    weekly_trend,
};
use crate::models::{
    CaseNote, CrossTab, Kpis, NpsMatrix, RecoverabilityBreakdown, Segment, SurveyRecord,
    WeeklyPoint,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default number of categories in the top-categories view.
pub const DEFAULT_TOP_CATEGORIES: usize = 5;

/// User-selected filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    /// Segments to keep.
    pub segments: Vec<Segment>,
    /// Opening-date range. Applied only when it holds exactly two dates.
    pub date_range: Vec<NaiveDate>,
    /// Segment analysed in the category views.
    pub focus_segment: Segment,
    /// Number of entries in the top-categories view.
    pub top_n: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            segments: Segment::ALL.to_vec(),
            date_range: Vec::new(),
            focus_segment: Segment::Promoter,
            top_n: DEFAULT_TOP_CATEGORIES,
        }
    }
}

/// Category views restricted to a single segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFocus {
    pub segment: Segment,
    pub responses: usize,
    pub top_categories: Vec<(String, usize)>,
    pub cause_matrix: CrossTab,
}

/// Category views for the records of one segment.
pub fn segment_focus(records: &[SurveyRecord], segment: Segment, n: usize) -> SegmentFocus {
    let local = filter_by_segment(records, &[segment]);

    SegmentFocus {
        segment,
        responses: local.len(),
        top_categories: top_categories(&local, n),
        cause_matrix: category_cause_matrix(&local),
    }
}

/// Every derived view for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub filters: FilterState,
    pub kpis: Kpis,
    pub weekly_trend: Vec<WeeklyPoint>,
    pub agent_month: NpsMatrix,
    pub focus: SegmentFocus,
    pub recoverability: Option<RecoverabilityBreakdown>,
    pub non_recoverable: Vec<CaseNote>,
    /// The filtered records the views were computed from.
    pub records: Vec<SurveyRecord>,
}

impl Dashboard {
    /// Apply `filters` to `records` and compute every view.
    pub fn compute(records: &[SurveyRecord], filters: &FilterState) -> Self {
        let by_segment = filter_by_segment(records, &filters.segments);
        let filtered = filter_by_date_range(&by_segment, &filters.date_range);

        debug!(
            "Filtered {} of {} records (segments: {:?}, range: {:?})",
            filtered.len(),
            records.len(),
            filters.segments,
            filters.date_range
        );

        Self {
            filters: filters.clone(),
            kpis: compute_overall_kpis(&filtered),
            weekly_trend: weekly_trend(&filtered),
            agent_month: agent_month_nps_matrix(&filtered),
            focus: segment_focus(&filtered, filters.focus_segment, filters.top_n),
            recoverability: recoverability_breakdown(&filtered),
            non_recoverable: non_recoverable_cases(&filtered),
            records: filtered,
        }
    }

    /// True when no record matches the current filters.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::tests::record;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> Vec<SurveyRecord> {
        vec![
            record(10, Some("2024-01-03 10:00:00"), "A1", "Logistics"),
            record(9, Some("2024-01-04 10:00:00"), "A2", "Billing"),
            record(7, Some("2024-01-20 10:00:00"), "A1", "Logistics"),
            record(2, Some("2024-02-02 10:00:00"), "A2", "Billing"),
            record(5, Some("2024-02-10 10:00:00"), "A1", "Logistics"),
        ]
    }

    #[test]
    fn test_default_filters_keep_everything() {
        let records = sample();
        let dashboard = Dashboard::compute(&records, &FilterState::default());

        assert_eq!(dashboard.kpis.total, 5);
        assert_eq!(dashboard.records.len(), 5);
        assert_eq!(dashboard.focus.segment, Segment::Promoter);
        assert_eq!(dashboard.focus.responses, 2);
        assert_eq!(dashboard.agent_month.agents, vec!["A1", "A2"]);
    }

    #[test]
    fn test_filters_are_applied_in_order() {
        let records = sample();
        let filters = FilterState {
            segments: vec![Segment::Detractor, Segment::Neutral],
            date_range: vec![date("2024-01-15"), date("2024-02-05")],
            focus_segment: Segment::Detractor,
            top_n: 3,
        };

        let dashboard = Dashboard::compute(&records, &filters);
        assert_eq!(dashboard.kpis.total, 2);
        assert_eq!(dashboard.focus.responses, 1);
        assert_eq!(
            dashboard.focus.top_categories,
            vec![("Billing".to_string(), 1)]
        );
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let records = sample();
        let filters = FilterState {
            date_range: vec![date("2025-01-01"), date("2024-01-01")],
            ..FilterState::default()
        };

        let dashboard = Dashboard::compute(&records, &filters);
        assert!(dashboard.is_empty());
        assert!(dashboard.kpis.rates.is_none());
        assert!(dashboard.recoverability.is_none());
        assert!(dashboard.weekly_trend.is_empty());
        assert!(dashboard.agent_month.is_empty());
    }

    #[test]
    fn test_recompute_with_different_filters_is_independent() {
        let records = sample();
        let all = Dashboard::compute(&records, &FilterState::default());
        let promoters = Dashboard::compute(
            &records,
            &FilterState {
                segments: vec![Segment::Promoter],
                ..FilterState::default()
            },
        );
        let again = Dashboard::compute(&records, &FilterState::default());

        assert_eq!(promoters.kpis.total, 2);
        assert_eq!(all, again);
        assert_eq!(records.len(), 5);
    }
}
