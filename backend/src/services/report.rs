//! Reporting aggregator: percentages derived from completed sessions and
//! the ledger. Reads degrade to empty results with the failure logged;
//! a broken report must never take down the page that asked for it.

use serde::Serialize;
use sqlx::PgPool;

use crate::repositories::{
    attendance::RecordFilters,
    report::{self, SubjectTotals, SummaryCounts},
};

#[derive(Debug, Clone, Serialize)]
pub struct SubjectReportRow {
    pub subject_id: String,
    pub subject_name: String,
    pub total_classes: i64,
    pub attended: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSummaryRow {
    pub sid: String,
    pub name: String,
    pub subject_id: String,
    pub subject_name: String,
    pub present: i64,
    pub total: i64,
    pub percentage: f64,
    pub badge_class: &'static str,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Attendance percentage, 0 when nothing has been held yet. A subject with
/// zero completed sessions reports 0%, never a division error and never a
/// padded denominator.
pub fn percentage(attended: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(attended as f64 / total as f64 * 100.0)
}

/// Badge tier for the summary view.
pub fn badge_for(percentage: f64) -> &'static str {
    if percentage >= 75.0 {
        "badge-green"
    } else if percentage >= 60.0 {
        "badge-yellow"
    } else {
        "badge-red"
    }
}

fn report_row(totals: SubjectTotals) -> SubjectReportRow {
    let percentage = percentage(totals.attended, totals.total_sessions);
    SubjectReportRow {
        subject_id: totals.subject_id,
        subject_name: totals.subject_name,
        total_classes: totals.total_sessions,
        attended: totals.attended,
        percentage,
    }
}

fn summary_row(counts: SummaryCounts) -> StudentSummaryRow {
    let percentage = percentage(counts.present, counts.total);
    StudentSummaryRow {
        sid: counts.sid,
        name: counts.name,
        subject_id: counts.subject_id,
        subject_name: counts.subject_name,
        present: counts.present,
        total: counts.total,
        percentage,
        badge_class: badge_for(percentage),
    }
}

/// Per-subject attendance report for one student.
pub async fn subject_report(pool: &PgPool, sid: &str) -> Vec<SubjectReportRow> {
    match report::subject_totals_for_student(pool, sid).await {
        Ok(rows) => rows.into_iter().map(report_row).collect(),
        Err(err) => {
            tracing::error!(sid, error = ?err, "subject report query failed");
            Vec::new()
        }
    }
}

/// Cross-student summary grouped by (student, subject) with badge tiers.
pub async fn cross_student_summary(
    pool: &PgPool,
    filters: &RecordFilters,
) -> Vec<StudentSummaryRow> {
    match report::cross_student_counts(pool, filters).await {
        Ok(rows) => rows.into_iter().map(summary_row).collect(),
        Err(err) => {
            tracing::error!(error = ?err, "cross-student summary query failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_completed_sessions_report_zero_percent() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn badge_tiers_split_at_75_and_60() {
        assert_eq!(badge_for(75.0), "badge-green");
        assert_eq!(badge_for(74.99), "badge-yellow");
        assert_eq!(badge_for(60.0), "badge-yellow");
        assert_eq!(badge_for(59.99), "badge-red");
    }
}
