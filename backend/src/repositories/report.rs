//! Aggregation queries feeding the reporting views. Reads only; these never
//! touch live session state.

use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::repositories::attendance::RecordFilters;

/// Per-subject counts for one student: completed sessions held vs distinct
/// sessions the student holds a present record for.
#[derive(Debug, Clone, FromRow)]
pub struct SubjectTotals {
    pub subject_id: String,
    pub subject_name: String,
    pub total_sessions: i64,
    pub attended: i64,
}

/// Per-(student, subject) present/total counts for the summary view.
#[derive(Debug, Clone, FromRow)]
pub struct SummaryCounts {
    pub sid: String,
    pub name: String,
    pub subject_id: String,
    pub subject_name: String,
    pub present: i64,
    pub total: i64,
}

/// Counts per subject for one student. Only inactive (completed) sessions
/// count toward the denominator; legacy NULL-status records count as
/// present.
pub async fn subject_totals_for_student(
    pool: &PgPool,
    sid: &str,
) -> Result<Vec<SubjectTotals>, sqlx::Error> {
    sqlx::query_as::<_, SubjectTotals>(
        "SELECT s.id AS subject_id, \
                s.subject_name, \
                COUNT(DISTINCT cs.id) AS total_sessions, \
                COUNT(DISTINCT ar.session_id) AS attended \
         FROM subjects s \
         LEFT JOIN attendance_sessions cs \
             ON cs.subject_id = s.id AND cs.active = FALSE \
         LEFT JOIN attendance_records ar \
             ON ar.subject_id = s.id \
            AND ar.sid = $1 \
            AND COALESCE(ar.status, 'present') = 'present' \
         GROUP BY s.id, s.subject_name \
         ORDER BY s.subject_name",
    )
    .bind(sid)
    .fetch_all(pool)
    .await
}

/// Present/total counts grouped by (student, subject), honoring the same
/// filters as the listing view.
pub async fn cross_student_counts(
    pool: &PgPool,
    filters: &RecordFilters,
) -> Result<Vec<SummaryCounts>, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT sid, \
                MAX(name) AS name, \
                subject_id, \
                MAX(subject_name) AS subject_name, \
                COUNT(*) FILTER (WHERE COALESCE(status, 'present') = 'present') AS present, \
                COUNT(*) AS total \
         FROM attendance_records WHERE 1 = 1",
    );

    if let Some(sid) = &filters.sid {
        builder.push(" AND sid = ").push_bind(sid);
    }
    if let Some(subject_id) = &filters.subject_id {
        builder.push(" AND subject_id = ").push_bind(subject_id);
    }
    if let Some(from) = filters.from_date {
        builder.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filters.to_date {
        builder.push(" AND date <= ").push_bind(to);
    }
    if let Some(search) = &filters.name_search {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", search));
    }
    builder.push(" GROUP BY sid, subject_id ORDER BY MAX(name), subject_id");

    builder
        .build_query_as::<SummaryCounts>()
        .fetch_all(pool)
        .await
}
