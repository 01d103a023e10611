//! Attendance ledger: every path that writes a (session, student) mark.
//!
//! The storage-layer uniqueness constraint is what makes these operations
//! exactly-once under concurrency; the checks in front of it only produce
//! friendlier errors on the common path.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        attendance::{AttendanceRecord, AttendanceStatus, ManualAction, ManualMarkRequest},
        session::AttendanceSession,
        user::User,
    },
    repositories::{attendance, session as session_repo, token as token_repo, user as user_repo},
    utils::time,
};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Records a student's scan as a present/self mark.
///
/// The only token-gated path. Fails with `NoActiveSession`, `DuplicateMark`
/// (idempotent rejection, never overwrite), `InvalidToken`, or
/// `TokenUnavailable` when the token store cannot be consulted; a degraded
/// store must never let a scan through.
pub async fn mark_self(
    pool: &PgPool,
    config: &Config,
    student: &User,
    submitted_token: &str,
) -> Result<AttendanceRecord, AppError> {
    // Opportunistic cleanup; validity is re-checked against expiry below
    // either way.
    if let Err(err) = token_repo::purge_expired(pool).await {
        tracing::warn!(error = ?err, "expired-token purge failed before scan");
    }

    let session = session_repo::find_active(pool)
        .await?
        .ok_or(AppError::NoActiveSession)?;

    if attendance::find_record(pool, &session.id, &student.sid)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateMark);
    }

    token_repo::find_valid(pool, submitted_token)
        .await
        .map_err(|_| AppError::TokenUnavailable)?
        .ok_or(AppError::InvalidToken)?;

    let tz = &config.time_zone;
    let record = AttendanceRecord::self_mark(
        session.id.clone(),
        student.sid.clone(),
        student.name.clone(),
        session.subject_id.clone(),
        session.subject_name.clone(),
        time::today_local(tz),
        time::time_of_day_local(tz),
    );

    match attendance::insert(pool, &record).await {
        Ok(inserted) => {
            tracing::info!(
                session_id = %session.id,
                sid = %student.sid,
                "attendance self-marked"
            );
            Ok(inserted)
        }
        // Lost the race against a concurrent scan by the same student.
        Err(err) if is_unique_violation(&err) => Err(AppError::DuplicateMark),
        Err(err) => Err(err.into()),
    }
}

/// Applies a teacher override for a student in the active session.
///
/// `present`/`absent` insert-or-update the pair's single record with
/// `marked_type = manual`; `clear` deletes it. Manual always wins and may
/// be repeated freely; there is no token check on this path.
pub async fn mark_manual(
    pool: &PgPool,
    config: &Config,
    teacher: &User,
    request: ManualMarkRequest,
) -> Result<Option<AttendanceRecord>, AppError> {
    let session = session_repo::find_active(pool)
        .await?
        .ok_or(AppError::NoActiveSession)?;

    let student = user_repo::find_by_sid(pool, &request.sid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student {} not found", request.sid)))?;

    match request.action {
        ManualAction::Clear => {
            let removed = attendance::delete_record(pool, &session.id, &student.sid).await?;
            if removed {
                tracing::info!(
                    session_id = %session.id,
                    sid = %student.sid,
                    marker = %teacher.sid,
                    "attendance mark cleared"
                );
            }
            Ok(None)
        }
        ManualAction::Present | ManualAction::Absent => {
            let status = match request.action {
                ManualAction::Present => AttendanceStatus::Present,
                _ => AttendanceStatus::Absent,
            };
            let tz = &config.time_zone;
            let record = AttendanceRecord::self_mark(
                session.id.clone(),
                student.sid.clone(),
                student.name.clone(),
                session.subject_id.clone(),
                session.subject_name.clone(),
                time::today_local(tz),
                time::time_of_day_local(tz),
            );
            let saved = attendance::upsert_manual(pool, &record, status, &teacher.sid).await?;
            tracing::info!(
                session_id = %session.id,
                sid = %student.sid,
                status = status.as_str(),
                marker = %teacher.sid,
                "attendance manually marked"
            );
            Ok(Some(saved))
        }
    }
}

/// Inserts absent/auto records for every eligible student without a mark.
///
/// A self-scan racing the sweep is resolved by the uniqueness constraint:
/// whichever insert lands first stands, and the sweep's losing insert is
/// skipped rather than surfaced, since either way the student has exactly
/// one record.
pub async fn reconcile_absentees(
    pool: &PgPool,
    config: &Config,
    session: &AttendanceSession,
    eligible: &[User],
) -> Result<u64, AppError> {
    let present: HashSet<String> = attendance::present_sids(pool, &session.id)
        .await?
        .into_iter()
        .collect();

    let tz = &config.time_zone;
    let date = time::today_local(tz);
    let time_of_day = time::time_of_day_local(tz);

    let absentees: Vec<AttendanceRecord> = eligible
        .iter()
        .filter(|student| !present.contains(&student.sid))
        .map(|student| {
            AttendanceRecord::auto_absent(
                session.id.clone(),
                student.sid.clone(),
                student.name.clone(),
                session.subject_id.clone(),
                session.subject_name.clone(),
                date,
                time_of_day,
            )
        })
        .collect();

    if absentees.is_empty() {
        return Ok(0);
    }

    let inserted = attendance::insert_absentees(pool, &absentees).await?;
    Ok(inserted)
}

/// Student ids holding a present record for the session.
pub async fn present_for(pool: &PgPool, session_id: &str) -> Result<Vec<String>, AppError> {
    Ok(attendance::present_sids(pool, session_id).await?)
}
