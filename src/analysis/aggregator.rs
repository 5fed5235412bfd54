//! Survey aggregation and statistics.
//!
//! Every function here is pure: it borrows the record set, never mutates it,
//! and returns freshly computed values.

use crate::error::{PipelineError, Result};
use crate::models::{
    CaseNote, CrossTab, Kpis, NpsCell, NpsMatrix, NpsScore, Recoverability,
    RecoverabilityBreakdown, Segment, SegmentRates, SurveyRecord, WeeklyPoint,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Round to one decimal place, ties to the even digit (6.25 -> 6.2).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Classify a validated score.
pub fn classify_segment(score: NpsScore) -> Segment {
    score.segment()
}

/// Classify a raw integer score, rejecting values outside 0-10.
pub fn classify_raw_score(score: i64) -> Result<Segment> {
    NpsScore::new(score).map(classify_segment)
}

/// Keep only records whose segment is selected.
pub fn filter_by_segment(records: &[SurveyRecord], selected: &[Segment]) -> Vec<SurveyRecord> {
    records
        .iter()
        .filter(|r| selected.contains(&r.segment()))
        .cloned()
        .collect()
}

/// Keep records opened within `range` (inclusive on both ends).
///
/// The filter only applies when exactly two dates are given; otherwise the
/// records are returned unchanged. Records without an opening date never
/// match an applied range.
pub fn filter_by_date_range(records: &[SurveyRecord], range: &[NaiveDate]) -> Vec<SurveyRecord> {
    let (start, end) = match range {
        [start, end] => (*start, *end),
        _ => return records.to_vec(),
    };

    records
        .iter()
        .filter(|r| matches!(r.opened_on(), Some(day) if day >= start && day <= end))
        .cloned()
        .collect()
}

/// Count records per segment as (promoters, neutrals, detractors).
pub fn segment_counts(records: &[SurveyRecord]) -> (usize, usize, usize) {
    records
        .iter()
        .fold((0, 0, 0), |(p, n, d), r| match r.segment() {
            Segment::Promoter => (p + 1, n, d),
            Segment::Neutral => (p, n + 1, d),
            Segment::Detractor => (p, n, d + 1),
        })
}

/// Headline indicators: total, segment shares and NPS.
pub fn compute_overall_kpis(records: &[SurveyRecord]) -> Kpis {
    let total = records.len();
    if total == 0 {
        return Kpis { total, rates: None };
    }

    let (promoters, neutrals, detractors) = segment_counts(records);
    let pct = |count: usize| round1(count as f64 / total as f64 * 100.0);
    let pct_promoter = pct(promoters);
    let pct_detractor = pct(detractors);

    Kpis {
        total,
        rates: Some(SegmentRates {
            pct_promoter,
            pct_neutral: pct(neutrals),
            pct_detractor,
            nps: round1(pct_promoter - pct_detractor),
        }),
    }
}

/// NPS percentage for a group: `(promoters - detractors) / total * 100`.
pub fn nps_percentage(promoters: usize, neutrals: usize, detractors: usize) -> Result<f64> {
    let total = promoters + neutrals + detractors;
    if total == 0 {
        return Err(PipelineError::EmptyGroup(
            "cannot compute NPS over zero responses".to_string(),
        ));
    }

    Ok(round1(
        (promoters as f64 - detractors as f64) / total as f64 * 100.0,
    ))
}

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// Mean score per calendar week, oldest first.
///
/// Weeks without responses are left out.
pub fn weekly_trend(records: &[SurveyRecord]) -> Vec<WeeklyPoint> {
    let mut weeks: BTreeMap<NaiveDate, (u64, usize)> = BTreeMap::new();

    for record in records {
        if let Some(day) = record.opened_on() {
            let entry = weeks.entry(week_start(day)).or_insert((0, 0));
            entry.0 += u64::from(record.nps_score.value());
            entry.1 += 1;
        }
    }

    weeks
        .into_iter()
        .map(|(week_start, (sum, responses))| WeeklyPoint {
            week_start,
            mean_nps: sum as f64 / responses as f64,
            responses,
        })
        .collect()
}

/// NPS percentage per agent and month (`YYYY-MM`).
pub fn agent_month_nps_matrix(records: &[SurveyRecord]) -> NpsMatrix {
    let mut counts: HashMap<String, HashMap<String, (usize, usize, usize)>> = HashMap::new();
    let mut months = Vec::new();
    let mut seen_months = HashSet::new();

    for record in records {
        let Some(opened_at) = record.opened_at else {
            continue;
        };
        let month = opened_at.format("%Y-%m").to_string();
        if seen_months.insert(month.clone()) {
            months.push(month.clone());
        }

        let entry = counts
            .entry(record.agent_id.clone())
            .or_default()
            .entry(month)
            .or_insert((0, 0, 0));
        match record.segment() {
            Segment::Promoter => entry.0 += 1,
            Segment::Neutral => entry.1 += 1,
            Segment::Detractor => entry.2 += 1,
        }
    }

    let mut agents: Vec<String> = counts.keys().cloned().collect();
    agents.sort();

    let mut cells: HashMap<String, HashMap<String, NpsCell>> = HashMap::new();
    for (agent, by_month) in counts {
        let row = cells.entry(agent).or_default();
        for (month, (promoters, neutrals, detractors)) in by_month {
            // Every materialised group has at least one record.
            if let Ok(nps) = nps_percentage(promoters, neutrals, detractors) {
                row.insert(
                    month,
                    NpsCell {
                        promoters,
                        neutrals,
                        detractors,
                        total: promoters + neutrals + detractors,
                        nps,
                    },
                );
            }
        }
    }

    NpsMatrix {
        agents,
        months,
        cells,
    }
}

/// The `n` most frequent categories, most frequent first.
///
/// Ties keep the order in which categories were first seen.
pub fn top_categories(records: &[SurveyRecord], n: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        match index.get(record.category.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(record.category.as_str(), counts.len());
                counts.push((record.category.clone(), 1));
            }
        }
    }

    // stable sort: ties stay in first-seen order
    counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    counts.truncate(n);
    counts
}

/// Cross tabulation of root cause (rows) by category (columns).
pub fn category_cause_matrix(records: &[SurveyRecord]) -> CrossTab {
    let mut rows = BTreeSet::new();
    let mut columns = BTreeSet::new();
    let mut counts: HashMap<String, HashMap<String, usize>> = HashMap::new();

    for record in records {
        rows.insert(record.root_cause.clone());
        columns.insert(record.category.clone());
        *counts
            .entry(record.root_cause.clone())
            .or_default()
            .entry(record.category.clone())
            .or_default() += 1;
    }

    CrossTab {
        rows: rows.into_iter().collect(),
        columns: columns.into_iter().collect(),
        counts,
    }
}

/// Share of recoverable vs non-recoverable cases. `None` for no records.
pub fn recoverability_breakdown(records: &[SurveyRecord]) -> Option<RecoverabilityBreakdown> {
    if records.is_empty() {
        return None;
    }

    let recoverable = records
        .iter()
        .filter(|r| r.is_recoverable == Recoverability::Recoverable)
        .count();
    let total = records.len() as f64;

    Some(RecoverabilityBreakdown {
        recoverable: recoverable as f64 / total,
        not_recoverable: (records.len() - recoverable) as f64 / total,
    })
}

/// Comments and recommendations for every non-recoverable case.
pub fn non_recoverable_cases(records: &[SurveyRecord]) -> Vec<CaseNote> {
    records
        .iter()
        .filter(|r| r.is_recoverable == Recoverability::NotRecoverable)
        .map(|r| CaseNote {
            case_number: r.case_number.clone(),
            comment: r.comment.clone(),
            recommendation: r.recommendation.clone(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    pub(crate) fn record(
        score: i64,
        opened_at: Option<&str>,
        agent: &str,
        category: &str,
    ) -> SurveyRecord {
        SurveyRecord {
            case_number: format!("C-{}", score),
            nps_score: NpsScore::new(score).unwrap(),
            opened_at: opened_at
                .map(|ts| NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap()),
            agent_id: agent.to_string(),
            category: category.to_string(),
            root_cause: "Late delivery".to_string(),
            is_recoverable: Recoverability::Recoverable,
            case_type: "Complaint".to_string(),
            comment: String::new(),
            recommendation: String::new(),
        }
    }

    fn scored(scores: &[i64]) -> Vec<SurveyRecord> {
        scores
            .iter()
            .map(|s| record(*s, Some("2024-01-10 09:00:00"), "A1", "Logistics"))
            .collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_classify_segment_boundaries() {
        for score in 0..=10 {
            let expected = match score {
                9 | 10 => Segment::Promoter,
                7 | 8 => Segment::Neutral,
                _ => Segment::Detractor,
            };
            assert_eq!(classify_raw_score(score).unwrap(), expected);
            // deterministic
            assert_eq!(classify_raw_score(score).unwrap(), expected);
        }
        assert!(classify_raw_score(11).is_err());
        assert!(classify_raw_score(-3).is_err());
    }

    #[test]
    fn test_filter_by_segment() {
        let records = scored(&[10, 8, 3, 9]);
        let promoters = filter_by_segment(&records, &[Segment::Promoter]);
        assert_eq!(promoters.len(), 2);
        assert!(promoters.iter().all(|r| r.segment() == Segment::Promoter));

        let none = filter_by_segment(&records, &[]);
        assert!(none.is_empty());
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn test_filter_by_date_range() {
        let records = vec![
            record(9, Some("2024-01-01 08:00:00"), "A1", "X"),
            record(9, Some("2024-01-15 23:59:00"), "A1", "X"),
            record(9, Some("2024-02-01 00:00:00"), "A1", "X"),
            record(9, None, "A1", "X"),
        ];

        let inside = filter_by_date_range(&records, &[date("2024-01-01"), date("2024-01-15")]);
        assert_eq!(inside.len(), 2);

        // fewer than two endpoints: no-op
        assert_eq!(filter_by_date_range(&records, &[date("2024-01-01")]).len(), 4);
        assert_eq!(filter_by_date_range(&records, &[]).len(), 4);

        // inverted range: empty, not an error
        let inverted = filter_by_date_range(&records, &[date("2024-03-01"), date("2024-01-01")]);
        assert!(inverted.is_empty());
    }

    #[test]
    fn test_overall_kpis_scenario() {
        let records = scored(&[9, 9, 10, 10, 9, 10, 7, 8, 0, 6]);
        let kpis = compute_overall_kpis(&records);
        let rates = kpis.rates.unwrap();

        assert_eq!(kpis.total, 10);
        assert_eq!(rates.pct_promoter, 60.0);
        assert_eq!(rates.pct_neutral, 20.0);
        assert_eq!(rates.pct_detractor, 20.0);
        assert_eq!(rates.nps, 40.0);
    }

    #[test]
    fn test_overall_kpis_sum_to_hundred() {
        for scores in [
            vec![9, 7, 3],
            vec![10, 10, 8, 1, 2, 9, 7],
            vec![0],
            vec![9, 9, 9, 8, 8, 8, 5, 5, 5, 5, 5],
        ] {
            let rates = compute_overall_kpis(&scored(&scores)).rates.unwrap();
            let sum = rates.pct_promoter + rates.pct_neutral + rates.pct_detractor;
            assert!((sum - 100.0).abs() <= 0.1 + 1e-9, "sum was {}", sum);
            assert!((-100.0..=100.0).contains(&rates.nps));
        }
    }

    #[test]
    fn test_half_percentages_round_to_even() {
        let mut scores = vec![10];
        scores.extend([7; 15]);
        let records = scored(&scores);

        let rates = compute_overall_kpis(&records).rates.unwrap();
        assert_eq!(rates.pct_promoter, 6.2);
        assert_eq!(rates.nps, 6.2);

        let matrix = agent_month_nps_matrix(&records);
        assert_eq!(matrix.nps("A1", "2024-01"), Some(6.2));

        assert_eq!(round1(-6.25), -6.2);
    }

    #[test]
    fn test_overall_kpis_empty() {
        let kpis = compute_overall_kpis(&[]);
        assert_eq!(kpis.total, 0);
        assert!(kpis.rates.is_none());
    }

    #[test]
    fn test_nps_percentage() {
        assert_eq!(nps_percentage(2, 0, 1).unwrap(), 33.3);
        assert_eq!(nps_percentage(0, 0, 4).unwrap(), -100.0);
        assert!(matches!(
            nps_percentage(0, 0, 0),
            Err(PipelineError::EmptyGroup(_))
        ));
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-01-10 is a Wednesday
        assert_eq!(week_start(date("2024-01-10")), date("2024-01-08"));
        assert_eq!(week_start(date("2024-01-08")), date("2024-01-08"));
        assert_eq!(week_start(date("2024-01-14")), date("2024-01-08"));
    }

    #[test]
    fn test_weekly_trend() {
        let records = vec![
            record(10, Some("2024-01-17 10:00:00"), "A1", "X"),
            record(6, Some("2024-01-09 10:00:00"), "A1", "X"),
            record(8, Some("2024-01-11 10:00:00"), "A1", "X"),
            record(0, None, "A1", "X"),
            // skips the week of 2024-01-22
            record(4, Some("2024-01-30 10:00:00"), "A1", "X"),
        ];

        let trend = weekly_trend(&records);
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].week_start, date("2024-01-08"));
        assert_eq!(trend[0].mean_nps, 7.0);
        assert_eq!(trend[0].responses, 2);
        assert_eq!(trend[1].week_start, date("2024-01-15"));
        assert_eq!(trend[2].week_start, date("2024-01-29"));
    }

    #[test]
    fn test_agent_month_matrix_scenario() {
        let records = vec![
            record(9, Some("2024-01-03 10:00:00"), "A1", "X"),
            record(10, Some("2024-01-20 10:00:00"), "A1", "X"),
            record(2, Some("2024-01-31 10:00:00"), "A1", "X"),
            record(8, Some("2023-12-05 10:00:00"), "B7", "X"),
            record(5, None, "C3", "X"),
        ];

        let matrix = agent_month_nps_matrix(&records);
        let cell = matrix.cell("A1", "2024-01").unwrap();

        assert_eq!(cell.promoters, 2);
        assert_eq!(cell.detractors, 1);
        assert_eq!(cell.total, cell.promoters + cell.neutrals + cell.detractors);
        assert_eq!(cell.nps, 33.3);
        assert_eq!(matrix.nps("B7", "2023-12"), Some(0.0));

        // undefined, not zero
        assert_eq!(matrix.nps("B7", "2024-01"), None);
        assert_eq!(matrix.agents, vec!["A1", "B7"]);
        assert_eq!(matrix.months, vec!["2024-01", "2023-12"]);
        assert_eq!(matrix.sorted_months(), vec!["2023-12", "2024-01"]);
    }

    #[test]
    fn test_top_categories() {
        let records: Vec<_> = [
            "Billing", "Logistics", "Billing", "Support", "Logistics", "Returns", "Stock",
            "Payments", "Billing",
        ]
        .iter()
        .map(|c| record(5, None, "A1", c))
        .collect();

        let top = top_categories(&records, 5);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0], ("Billing".to_string(), 3));
        assert_eq!(top[1], ("Logistics".to_string(), 2));
        // ties keep first-seen order
        assert_eq!(top[2].0, "Support");
        assert_eq!(top[3].0, "Returns");
        assert_eq!(top[4].0, "Stock");
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));

        assert_eq!(top_categories(&records, 2).len(), 2);
        assert!(top_categories(&[], 5).is_empty());
    }

    #[test]
    fn test_category_cause_matrix() {
        let mut records = vec![
            record(5, None, "A1", "Logistics"),
            record(5, None, "A1", "Logistics"),
            record(5, None, "A1", "Billing"),
        ];
        records[2].root_cause = "Double charge".to_string();

        let tab = category_cause_matrix(&records);
        assert_eq!(tab.rows, vec!["Double charge", "Late delivery"]);
        assert_eq!(tab.columns, vec!["Billing", "Logistics"]);
        assert_eq!(tab.count("Late delivery", "Logistics"), 2);
        assert_eq!(tab.count("Double charge", "Billing"), 1);
        assert_eq!(tab.count("Double charge", "Logistics"), 0);
    }

    #[test]
    fn test_recoverability_breakdown_scenario() {
        let mut records = scored(&[3, 4, 5, 6]);
        records[3].is_recoverable = Recoverability::NotRecoverable;

        let breakdown = recoverability_breakdown(&records).unwrap();
        assert_eq!(breakdown.recoverable, 0.75);
        assert_eq!(breakdown.not_recoverable, 0.25);
        assert_eq!(breakdown.share(Recoverability::NotRecoverable), 0.25);
        assert!(recoverability_breakdown(&[]).is_none());
    }

    #[test]
    fn test_non_recoverable_cases() {
        let mut records = scored(&[1, 2]);
        records[1].is_recoverable = Recoverability::NotRecoverable;
        records[1].comment = "Nobody called back".to_string();
        records[1].recommendation = "Call the customer within 24h".to_string();

        let notes = non_recoverable_cases(&records);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].case_number, "C-2");
        assert_eq!(notes[0].comment, "Nobody called back");
    }

    #[test]
    fn test_aggregations_are_idempotent() {
        let records = vec![
            record(9, Some("2024-01-03 10:00:00"), "A1", "X"),
            record(3, Some("2024-02-03 10:00:00"), "B2", "Y"),
            record(7, Some("2024-02-04 10:00:00"), "A1", "Y"),
        ];

        assert_eq!(compute_overall_kpis(&records), compute_overall_kpis(&records));
        assert_eq!(weekly_trend(&records), weekly_trend(&records));
        assert_eq!(agent_month_nps_matrix(&records), agent_month_nps_matrix(&records));
        assert_eq!(top_categories(&records, 5), top_categories(&records, 5));
        assert_eq!(category_cause_matrix(&records), category_cause_matrix(&records));
    }
}
