//! Session persistence. The single-active-session invariant is enforced by
//! a partial unique index; every activation runs as deactivate-then-insert
//! inside one transaction so readers never observe two active rows.

use sqlx::PgPool;

use crate::models::session::AttendanceSession;

const SELECT_COLUMNS: &str =
    "id, subject_id, teacher_id, subject_name, label, date, start_time, active";

/// Deactivates whatever is active and inserts the new session, atomically
/// from the caller's perspective. Safe to call regardless of the previous
/// state: exactly one session is active afterwards.
pub async fn insert_active(
    pool: &PgPool,
    session: &AttendanceSession,
) -> Result<AttendanceSession, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE attendance_sessions SET active = FALSE WHERE active = TRUE")
        .execute(tx.as_mut())
        .await?;

    let query = format!(
        "INSERT INTO attendance_sessions \
            (id, subject_id, teacher_id, subject_name, label, date, start_time, active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE) \
         RETURNING {}",
        SELECT_COLUMNS
    );
    let inserted = sqlx::query_as::<_, AttendanceSession>(&query)
        .bind(&session.id)
        .bind(&session.subject_id)
        .bind(&session.teacher_id)
        .bind(&session.subject_name)
        .bind(&session.label)
        .bind(session.date)
        .bind(session.start_time)
        .fetch_one(tx.as_mut())
        .await?;

    tx.commit().await?;
    Ok(inserted)
}

/// Returns the currently active session, if any.
pub async fn find_active(pool: &PgPool) -> Result<Option<AttendanceSession>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM attendance_sessions WHERE active = TRUE",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, AttendanceSession>(&query)
        .fetch_optional(pool)
        .await
}

/// Marks a session inactive. Terminal: stopped sessions are never reactivated.
pub async fn deactivate(pool: &PgPool, session_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE attendance_sessions SET active = FALSE WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_by_id(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<AttendanceSession>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM attendance_sessions WHERE id = $1",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, AttendanceSession>(&query)
        .bind(session_id)
        .fetch_optional(pool)
        .await
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attendance_sessions")
        .fetch_one(pool)
        .await
}

pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attendance_sessions WHERE active = TRUE")
        .fetch_one(pool)
        .await
}

/// How many sessions reference a subject; non-zero blocks subject deletion.
pub async fn count_for_subject(pool: &PgPool, subject_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attendance_sessions WHERE subject_id = $1")
        .bind(subject_id)
        .fetch_one(pool)
        .await
}
