use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{Assignment, Grade, GradeSection, GradeStatus, LetterSplit};

/// Half-up decimal rounding used for final percentages:
/// `round(x * 10^digits) / 10^digits`.
pub fn round_to(x: f64, digits: u32) -> f64 {
    let factor = 10_f64.powi(digits as i32);
    (x * factor).round() / factor
}

/// Letter for a final percentage. Splits are scanned from the highest
/// `min_percent` down; the first threshold at or below `final_percent`
/// wins. With splits configured but none matching the result is "N/A";
/// with no splits at all there is no letter.
pub fn letter_for(splits: &[LetterSplit], final_percent: f64) -> Option<String> {
    if splits.is_empty() {
        return None;
    }
    let mut sorted: Vec<&LetterSplit> = splits.iter().collect();
    sorted.sort_by(|a, b| {
        b.min_percent
            .partial_cmp(&a.min_percent)
            .unwrap_or(Ordering::Equal)
    });
    for split in sorted {
        if split.min_percent <= final_percent {
            return Some(split.label.clone());
        }
    }
    Some("N/A".to_string())
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOptions {
    /// Skip assignments with no grade instead of counting them as zero.
    #[serde(default)]
    pub only_graded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBreakdown {
    /// The section's configured weight, echoed for display.
    pub percent: f64,
    /// Raw per-assignment average in points, not a percentage. Callers
    /// multiply by the assignment count to show points earned.
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    #[serde(rename = "final")]
    pub final_percent: f64,
    pub letter: Option<String>,
    pub breakdown: HashMap<String, SectionBreakdown>,
}

fn parse_when(s: &str) -> Option<chrono::NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

/// LATE status wins; legacy rows predating the status column fall back to
/// comparing submission and due timestamps. Unparseable dates mean on time.
pub fn is_late(grade: &Grade, assignment: &Assignment) -> bool {
    if grade.status == GradeStatus::Late {
        return true;
    }
    if grade.status == GradeStatus::Exempt {
        return false;
    }
    match (
        grade.submitted_at.as_deref().and_then(parse_when),
        assignment.due_date.as_deref().and_then(parse_when),
    ) {
        (Some(submitted), Some(due)) => submitted > due,
        _ => false,
    }
}

fn penalized_score(raw: f64, late: bool, late_penalty: f64) -> f64 {
    if !late {
        return raw;
    }
    (raw * (1.0 - late_penalty / 100.0)).max(0.0)
}

/// Weighted final for one student's grade set.
///
/// Sections without assignments (or without any counted grade) are absent
/// from both numerator and denominator, and the result is renormalized
/// against only the weights that did contribute, so a partially graded
/// course is not deflated. Total function: every missing or degenerate
/// input becomes an exclusion, never an error.
pub fn aggregate(
    sections: &[GradeSection],
    assignments: &[Assignment],
    grades: &[Grade],
    late_penalty: f64,
    rounding: u32,
    letter_splits: &[LetterSplit],
    opts: AggregateOptions,
) -> GradeReport {
    let mut by_section: HashMap<&str, Vec<&Assignment>> = HashMap::new();
    for a in assignments {
        by_section.entry(a.section_id.as_str()).or_default().push(a);
    }
    let grade_by_assignment: HashMap<&str, &Grade> = grades
        .iter()
        .map(|g| (g.assignment_id.as_str(), g))
        .collect();

    let mut total = 0.0_f64;
    let mut total_weight = 0.0_f64;
    let mut breakdown: HashMap<String, SectionBreakdown> = HashMap::new();

    for section in sections {
        let Some(section_assignments) = by_section.get(section.id.as_str()) else {
            continue;
        };

        let mut percent_sum = 0.0_f64;
        let mut raw_sum = 0.0_f64;
        let mut counted = 0_usize;

        for a in section_assignments {
            let raw = match grade_by_assignment.get(a.id.as_str()) {
                None => {
                    if opts.only_graded {
                        continue;
                    }
                    0.0
                }
                Some(g) if g.status == GradeStatus::Exempt => continue,
                Some(g) => penalized_score(g.score, is_late(g, a), late_penalty),
            };
            let percent = if a.max_score > 0.0 {
                100.0 * raw / a.max_score
            } else {
                0.0
            };
            percent_sum += percent;
            raw_sum += raw;
            counted += 1;
        }

        if counted == 0 {
            continue;
        }

        let mean_percent = percent_sum / counted as f64;
        total += mean_percent * (section.weight / 100.0);
        total_weight += section.weight;
        breakdown.insert(
            section.id.clone(),
            SectionBreakdown {
                percent: section.weight,
                mean: raw_sum / counted as f64,
            },
        );
    }

    let final_raw = if total_weight > 0.0 {
        total / (total_weight / 100.0)
    } else {
        0.0
    };
    let final_percent = round_to(final_raw, rounding);

    GradeReport {
        final_percent,
        letter: letter_for(letter_splits, final_percent),
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, weight: f64) -> GradeSection {
        GradeSection {
            id: id.to_string(),
            course_id: None,
            name: id.to_string(),
            weight,
            order: 0,
        }
    }

    fn assignment(id: &str, section_id: &str, max_score: f64) -> Assignment {
        Assignment {
            id: id.to_string(),
            course_id: None,
            section_id: section_id.to_string(),
            name: id.to_string(),
            due_date: None,
            max_score,
            kind: None,
        }
    }

    fn grade(assignment_id: &str, score: f64, status: GradeStatus) -> Grade {
        Grade {
            id: format!("g-{assignment_id}"),
            assignment_id: assignment_id.to_string(),
            student_id: "s1".to_string(),
            score,
            status,
            submitted_at: None,
            comment: None,
            is_published: true,
            rubric_selections: Vec::new(),
        }
    }

    fn splits() -> Vec<LetterSplit> {
        vec![
            LetterSplit {
                label: "A".into(),
                min_percent: 90.0,
            },
            LetterSplit {
                label: "B".into(),
                min_percent: 80.0,
            },
            LetterSplit {
                label: "C".into(),
                min_percent: 70.0,
            },
        ]
    }

    #[test]
    fn round_to_digits() {
        assert_eq!(round_to(87.666, 0), 88.0);
        assert_eq!(round_to(87.666, 2), 87.67);
        assert_eq!(round_to(87.0, 5), 87.0);
    }

    #[test]
    fn letter_thresholds() {
        let s = splits();
        assert_eq!(letter_for(&s, 89.99), Some("B".to_string()));
        assert_eq!(letter_for(&s, 70.0), Some("C".to_string()));
        assert_eq!(letter_for(&s, 65.0), Some("N/A".to_string()));
        assert_eq!(letter_for(&[], 65.0), None);
    }

    #[test]
    fn renormalizes_over_graded_sections_only() {
        // Section A (60%) has no graded work; section B (40%) is at 100%.
        let sections = vec![section("A", 60.0), section("B", 40.0)];
        let assignments = vec![assignment("b1", "B", 10.0)];
        let grades = vec![grade("b1", 10.0, GradeStatus::OnTime)];
        let report = aggregate(
            &sections,
            &assignments,
            &grades,
            0.0,
            2,
            &[],
            AggregateOptions::default(),
        );
        assert_eq!(report.final_percent, 100.0);
        assert!(!report.breakdown.contains_key("A"));
        assert_eq!(report.breakdown["B"].percent, 40.0);
        assert_eq!(report.breakdown["B"].mean, 10.0);
    }

    #[test]
    fn missing_grade_counts_as_zero_unless_only_graded() {
        let sections = vec![section("A", 100.0)];
        let assignments = vec![assignment("a1", "A", 10.0), assignment("a2", "A", 10.0)];
        let grades = vec![grade("a1", 10.0, GradeStatus::OnTime)];

        let full = aggregate(
            &sections,
            &assignments,
            &grades,
            0.0,
            2,
            &[],
            AggregateOptions::default(),
        );
        assert_eq!(full.final_percent, 50.0);

        let graded_only = aggregate(
            &sections,
            &assignments,
            &grades,
            0.0,
            2,
            &[],
            AggregateOptions { only_graded: true },
        );
        assert_eq!(graded_only.final_percent, 100.0);
    }

    #[test]
    fn late_penalty_reduces_section_mean() {
        let sections = vec![section("A", 100.0)];
        let assignments = vec![assignment("a1", "A", 100.0)];
        let grades = vec![grade("a1", 80.0, GradeStatus::Late)];
        let report = aggregate(
            &sections,
            &assignments,
            &grades,
            25.0,
            2,
            &[],
            AggregateOptions::default(),
        );
        assert_eq!(report.final_percent, 60.0);
        assert_eq!(report.breakdown["A"].mean, 60.0);
    }

    #[test]
    fn penalty_over_100_floors_at_zero() {
        let sections = vec![section("A", 100.0)];
        let assignments = vec![assignment("a1", "A", 100.0)];
        let grades = vec![grade("a1", 80.0, GradeStatus::Late)];
        let report = aggregate(
            &sections,
            &assignments,
            &grades,
            150.0,
            2,
            &[],
            AggregateOptions::default(),
        );
        assert_eq!(report.final_percent, 0.0);
    }

    #[test]
    fn legacy_late_detection_compares_timestamps() {
        let sections = vec![section("A", 100.0)];
        let mut a = assignment("a1", "A", 100.0);
        a.due_date = Some("2026-03-01T00:00:00Z".to_string());
        let mut g = grade("a1", 100.0, GradeStatus::OnTime);
        g.submitted_at = Some("2026-03-02T12:00:00Z".to_string());
        let report = aggregate(
            &sections,
            &[a],
            &[g],
            50.0,
            2,
            &[],
            AggregateOptions::default(),
        );
        assert_eq!(report.final_percent, 50.0);
    }

    #[test]
    fn exempt_grade_is_excluded_entirely() {
        let sections = vec![section("A", 100.0)];
        let assignments = vec![assignment("a1", "A", 10.0), assignment("a2", "A", 10.0)];
        let grades = vec![
            grade("a1", 10.0, GradeStatus::OnTime),
            grade("a2", 0.0, GradeStatus::Exempt),
        ];
        let report = aggregate(
            &sections,
            &assignments,
            &grades,
            0.0,
            2,
            &[],
            AggregateOptions::default(),
        );
        assert_eq!(report.final_percent, 100.0);
    }

    #[test]
    fn empty_everything_yields_zero_without_letter() {
        let report = aggregate(&[], &[], &[], 0.0, 2, &[], AggregateOptions::default());
        assert_eq!(report.final_percent, 0.0);
        assert_eq!(report.letter, None);
        assert!(report.breakdown.is_empty());
    }

    #[test]
    fn aggregate_is_idempotent() {
        let sections = vec![section("A", 30.0), section("B", 50.0)];
        let assignments = vec![
            assignment("a1", "A", 20.0),
            assignment("a2", "A", 20.0),
            assignment("b1", "B", 50.0),
        ];
        let grades = vec![
            grade("a1", 17.0, GradeStatus::OnTime),
            grade("a2", 13.5, GradeStatus::Late),
            grade("b1", 44.0, GradeStatus::OnTime),
        ];
        let s = splits();
        let first = aggregate(
            &sections,
            &assignments,
            &grades,
            10.0,
            2,
            &s,
            AggregateOptions::default(),
        );
        let second = aggregate(
            &sections,
            &assignments,
            &grades,
            10.0,
            2,
            &s,
            AggregateOptions::default(),
        );
        assert_eq!(first.final_percent, second.final_percent);
        assert_eq!(first.letter, second.letter);
        assert_eq!(first.breakdown, second.breakdown);
    }

    #[test]
    fn final_stays_in_percent_range_for_nonstandard_max_scores() {
        let sections = vec![section("A", 70.0), section("B", 30.0)];
        let assignments = vec![assignment("a1", "A", 250.0), assignment("b1", "B", 7.0)];
        let grades = vec![
            grade("a1", 250.0, GradeStatus::OnTime),
            grade("b1", 7.0, GradeStatus::OnTime),
        ];
        let report = aggregate(
            &sections,
            &assignments,
            &grades,
            0.0,
            2,
            &[],
            AggregateOptions::default(),
        );
        assert_eq!(report.final_percent, 100.0);
    }

    #[test]
    fn zero_max_score_contributes_zero_percent() {
        let sections = vec![section("A", 100.0)];
        let assignments = vec![assignment("a1", "A", 0.0)];
        let grades = vec![grade("a1", 5.0, GradeStatus::OnTime)];
        let report = aggregate(
            &sections,
            &assignments,
            &grades,
            0.0,
            2,
            &[],
            AggregateOptions::default(),
        );
        assert_eq!(report.final_percent, 0.0);
        // Raw mean still reflects the stored points.
        assert_eq!(report.breakdown["A"].mean, 5.0);
    }
}
