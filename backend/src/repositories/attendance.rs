//! Attendance ledger storage. The `(session_id, sid)` uniqueness constraint
//! is the source of truth for exactly-once marking; duplicate checks in the
//! services are a fast path only.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::attendance::{AttendanceRecord, AttendanceStatus, MarkedType};

const SELECT_COLUMNS: &str =
    "id, session_id, sid, name, subject_id, subject_name, date, time, status, marked_type, marked_by";

/// Filters for the attendance listing views. `sid` restricts students to
/// their own rows; teachers and admins leave it unset.
#[derive(Debug, Default, Clone)]
pub struct RecordFilters {
    pub sid: Option<String>,
    pub subject_id: Option<String>,
    pub from_date: Option<chrono::NaiveDate>,
    pub to_date: Option<chrono::NaiveDate>,
    pub name_search: Option<String>,
}

pub async fn find_record(
    pool: &PgPool,
    session_id: &str,
    sid: &str,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM attendance_records WHERE session_id = $1 AND sid = $2",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, AttendanceRecord>(&query)
        .bind(session_id)
        .bind(sid)
        .fetch_optional(pool)
        .await
}

/// Plain insert. A unique violation bubbles up for the caller to map to
/// the duplicate-mark rejection.
pub async fn insert(
    pool: &PgPool,
    record: &AttendanceRecord,
) -> Result<AttendanceRecord, sqlx::Error> {
    let query = format!(
        "INSERT INTO attendance_records \
            (id, session_id, sid, name, subject_id, subject_name, date, time, status, marked_type, marked_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {}",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, AttendanceRecord>(&query)
        .bind(&record.id)
        .bind(&record.session_id)
        .bind(&record.sid)
        .bind(&record.name)
        .bind(&record.subject_id)
        .bind(&record.subject_name)
        .bind(record.date)
        .bind(record.time)
        .bind(record.status.map(|s| s.as_str()))
        .bind(record.marked_type.map(|m| m.as_str()))
        .bind(&record.marked_by)
        .fetch_one(pool)
        .await
}

/// Insert-or-overwrite for teacher overrides. Manual always wins: an
/// existing self/auto/manual row for the pair is rewritten in place so the
/// uniqueness invariant holds without a delete-insert window.
pub async fn upsert_manual(
    pool: &PgPool,
    record: &AttendanceRecord,
    status: AttendanceStatus,
    marker: &str,
) -> Result<AttendanceRecord, sqlx::Error> {
    let query = format!(
        "INSERT INTO attendance_records \
            (id, session_id, sid, name, subject_id, subject_name, date, time, status, marked_type, marked_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (session_id, sid) DO UPDATE \
            SET status = EXCLUDED.status, \
                marked_type = EXCLUDED.marked_type, \
                marked_by = EXCLUDED.marked_by, \
                date = EXCLUDED.date, \
                time = EXCLUDED.time \
         RETURNING {}",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, AttendanceRecord>(&query)
        .bind(&record.id)
        .bind(&record.session_id)
        .bind(&record.sid)
        .bind(&record.name)
        .bind(&record.subject_id)
        .bind(&record.subject_name)
        .bind(record.date)
        .bind(record.time)
        .bind(status.as_str())
        .bind(MarkedType::Manual.as_str())
        .bind(marker)
        .fetch_one(pool)
        .await
}

/// Removes the pair's record, if any. Used by the `clear` manual action.
pub async fn delete_record(
    pool: &PgPool,
    session_id: &str,
    sid: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM attendance_records WHERE session_id = $1 AND sid = $2")
        .bind(session_id)
        .bind(sid)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Students with a present record for the session. Legacy NULL status rows
/// count as present.
pub async fn present_sids(pool: &PgPool, session_id: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT sid FROM attendance_records \
         WHERE session_id = $1 AND COALESCE(status, 'present') = 'present'",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
}

/// Bulk-inserts absent/auto records, skipping any student that already has
/// a record of any status for the session. A concurrent self-mark that
/// lands first simply wins the conflict; that is the correct end state.
pub async fn insert_absentees(
    pool: &PgPool,
    records: &[AttendanceRecord],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for record in records {
        let result = sqlx::query(
            "INSERT INTO attendance_records \
                (id, session_id, sid, name, subject_id, subject_name, date, time, status, marked_type, marked_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (session_id, sid) DO NOTHING",
        )
        .bind(&record.id)
        .bind(&record.session_id)
        .bind(&record.sid)
        .bind(&record.name)
        .bind(&record.subject_id)
        .bind(&record.subject_name)
        .bind(record.date)
        .bind(record.time)
        .bind(record.status.map(|s| s.as_str()))
        .bind(record.marked_type.map(|m| m.as_str()))
        .bind(&record.marked_by)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

pub async fn count_for_session(pool: &PgPool, session_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attendance_records WHERE session_id = $1")
        .bind(session_id)
        .fetch_one(pool)
        .await
}

/// Listing for the attendance views, newest first.
pub async fn list_filtered(
    pool: &PgPool,
    filters: &RecordFilters,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {} FROM attendance_records WHERE 1 = 1",
        SELECT_COLUMNS
    ));

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
    builder.push(" ORDER BY date DESC, time DESC");

    builder
        .build_query_as::<AttendanceRecord>()
        .fetch_all(pool)
        .await
}

/// A student's most recent marks, for the dashboard history panel.
pub async fn list_recent_for_student(
    pool: &PgPool,
    sid: &str,
    limit: i64,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM attendance_records WHERE sid = $1 \
         ORDER BY date DESC, time DESC LIMIT $2",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, AttendanceRecord>(&query)
        .bind(sid)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Present records in insertion order, for the CSV export.
pub async fn list_present_for_export(
    pool: &PgPool,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM attendance_records \
         WHERE COALESCE(status, 'present') = 'present' \
         ORDER BY created_at, id",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, AttendanceRecord>(&query)
        .fetch_all(pool)
        .await
}
