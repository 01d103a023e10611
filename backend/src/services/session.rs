//! Session state machine: start/stop transitions and the lazy QR token
//! rotation. State is never held in process memory; it is derived from the
//! store's single active row, so any number of handler instances agree.

use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        session::{AttendanceSession, LiveSessionResponse, StartSessionRequest, StopSessionResponse},
        token::ScanToken,
        user::User,
    },
    repositories::{attendance, enrollment, session as session_repo, subject as subject_repo, token as token_repo},
    services::ledger,
    utils::{qr, time},
};

/// Opens a session for a subject, ending whatever session was active.
///
/// The deactivate-then-insert transition leaves exactly one active session
/// no matter what state preceded it, so a crashed or forgotten session can
/// never block the next class.
pub async fn start_session(
    pool: &PgPool,
    config: &Config,
    teacher: &User,
    request: StartSessionRequest,
) -> Result<AttendanceSession, AppError> {
    let subject = subject_repo::find_by_id(pool, &request.subject_id)
        .await?
        .ok_or(AppError::SubjectNotFound)?;

    let now_local = time::now_in_timezone(&config.time_zone);
    let session = AttendanceSession::new(
        subject.id.clone(),
        teacher.sid.clone(),
        subject.subject_name.clone(),
        request.label,
        now_local.date_naive(),
        now_local.with_timezone(&chrono::Utc),
    );

    let inserted = session_repo::insert_active(pool, &session).await?;
    tracing::info!(
        session_id = %inserted.id,
        subject = %inserted.subject_name,
        teacher = %teacher.sid,
        "attendance session started"
    );
    Ok(inserted)
}

/// Returns the live session view, rotating the scan token as a side effect.
///
/// Rotation is lazy: each read purges expired tokens and mints a fresh one
/// when none is valid or the newest has aged past the refresh interval.
/// A superseded token stays valid until its own expiry, so the windows
/// overlap and a student mid-scan is never cut off by rotation.
pub async fn live_view(
    pool: &PgPool,
    config: &Config,
) -> Result<Option<LiveSessionResponse>, AppError> {
    let Some(session) = session_repo::find_active(pool).await? else {
        return Ok(None);
    };

    let token = refresh_token(pool, config).await?;
    let marked_count = attendance::count_for_session(pool, &session.id).await?;
    let scan_url = qr::scan_url(&config.base_url, &token.token);

    Ok(Some(LiveSessionResponse {
        session,
        scan_url,
        token_expires_at: token.expires_at,
        token: token.token,
        marked_count,
    }))
}

async fn refresh_token(pool: &PgPool, config: &Config) -> Result<ScanToken, AppError> {
    token_repo::purge_expired(pool)
        .await
        .map_err(|_| AppError::TokenUnavailable)?;

    let now = chrono::Utc::now();
    let current = token_repo::latest_valid(pool)
        .await
        .map_err(|_| AppError::TokenUnavailable)?;

    match current {
        Some(token) if !token.needs_rotation_at(now, config.qr_refresh_seconds) => Ok(token),
        _ => {
            // Two concurrent readers may both decide to mint; both tokens
            // are valid and the newer QR wins on display, which is fine.
            let minted = token_repo::mint(pool, config.token_valid_seconds)
                .await
                .map_err(|_| AppError::TokenUnavailable)?;
            tracing::debug!(expires_at = %minted.expires_at, "scan token rotated");
            Ok(minted)
        }
    }
}

/// Stops the active session: sweep in absentees, deactivate, purge tokens.
///
/// The absentee sweep is deliberately best-effort. An enrollment lookup
/// failure is logged and swallowed so the session still deactivates and
/// tokens are still purged; a session stuck active would be worse than a
/// degraded reconciliation.
pub async fn stop_session(pool: &PgPool, config: &Config) -> Result<StopSessionResponse, AppError> {
    let session = session_repo::find_active(pool)
        .await?
        .ok_or(AppError::NoActiveSession)?;

    let absentees_marked = match reconcile(pool, config, &session).await {
        Ok(count) => count,
        Err(err) => {
            tracing::warn!(
                session_id = %session.id,
                error = ?err,
                "absentee reconciliation failed; stopping session anyway"
            );
            0
        }
    };

    session_repo::deactivate(pool, &session.id).await?;
    token_repo::purge_all(pool)
        .await
        .map_err(|_| AppError::TokenUnavailable)?;

    tracing::info!(
        session_id = %session.id,
        absentees_marked,
        "attendance session stopped"
    );

    let session = session_repo::find_by_id(pool, &session.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session disappeared during stop".to_string()))?;

    Ok(StopSessionResponse {
        session,
        absentees_marked,
    })
}

async fn reconcile(
    pool: &PgPool,
    config: &Config,
    session: &AttendanceSession,
) -> Result<u64, AppError> {
    let Some(subject) = subject_repo::find_by_id(pool, &session.subject_id).await? else {
        // Subject vanished under the session; nothing to reconcile against.
        return Ok(0);
    };

    let eligible = enrollment::eligible_students(pool, &subject).await?;
    if eligible.is_empty() {
        return Ok(0);
    }

    ledger::reconcile_absentees(pool, config, session, &eligible).await
}
