use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::{
        attendance::ManualMarkRequest,
        session::{StartSessionRequest, StopSessionResponse},
        user::User,
    },
    services::{ledger, session as session_service},
};

/// Starts a session for a subject. Any previously active session is ended
/// by the same transition, so this never fails with "already running".
pub async fn start_session(
    State((pool, config)): State<(PgPool, Config)>,
    Extension(user): Extension<User>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let session = session_service::start_session(&pool, &config, &user, payload).await?;
    Ok(Json(json!({
        "message": "Session started",
        "session": session,
    })))
}

/// Live session view for the teacher dashboard. Each read lazily rotates
/// the scan token, so polling this endpoint is what keeps the QR fresh.
pub async fn current_session(
    State((pool, config)): State<(PgPool, Config)>,
) -> Result<Json<Value>, AppError> {
    match session_service::live_view(&pool, &config).await? {
        Some(live) => Ok(Json(json!({ "active": true, "live": live }))),
        None => Ok(Json(json!({ "active": false }))),
    }
}

/// Stops the active session, sweeping in absentees first.
pub async fn stop_session(
    State((pool, config)): State<(PgPool, Config)>,
) -> Result<Json<StopSessionResponse>, AppError> {
    let stopped = session_service::stop_session(&pool, &config).await?;
    Ok(Json(stopped))
}

/// Teacher override for one student's mark in the active session.
pub async fn manual_mark(
    State((pool, config)): State<(PgPool, Config)>,
    Extension(user): Extension<User>,
    Json(payload): Json<ManualMarkRequest>,
) -> Result<Json<Value>, AppError> {
    let sid = payload.sid.clone();
    match ledger::mark_manual(&pool, &config, &user, payload).await? {
        Some(record) => Ok(Json(json!({
            "message": "Mark updated",
            "record": record,
        }))),
        None => Ok(Json(json!({
            "message": "Mark cleared",
            "sid": sid,
        }))),
    }
}
