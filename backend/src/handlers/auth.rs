use axum::{extract::State, Json};
use serde_json::{json, Value};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{AccountStatus, LoginRequest, LoginResponse, RegisterRequest, User, UserResponse},
    repositories::user as user_repo,
    utils::{jwt, password},
};

/// Student self-registration. The account lands in `pending` and cannot
/// log in until a teacher or admin approves it.
pub async fn register(
    State((pool, _config)): State<(PgPool, Config)>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    if user_repo::find_by_sid(&pool, &payload.sid).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "An account with ID {} already exists",
            payload.sid
        )));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let user = User::new_student(
        payload.sid,
        payload.name,
        password_hash,
        payload.department,
        payload.semester,
        payload.section,
    );
    let created = user_repo::create_user(&pool, &user).await?;

    tracing::info!(sid = %created.sid, "student registration submitted");
    Ok(Json(json!({
        "message": "Registration submitted; await approval",
        "user": UserResponse::from(created),
    })))
}

/// Role-checked login. Selecting the wrong portal role is rejected the same
/// way as a bad password, so the form leaks nothing about which roles exist
/// for an ID.
pub async fn login(
    State((pool, config)): State<(PgPool, Config)>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = user_repo::find_by_sid(&pool, &payload.sid)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if user.role != payload.role {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    if !password::verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    match user.status {
        AccountStatus::Pending => {
            return Err(AppError::Forbidden(
                "Your registration is awaiting approval".to_string(),
            ))
        }
        AccountStatus::Rejected => {
            return Err(AppError::Forbidden(
                "Your registration was rejected".to_string(),
            ))
        }
        AccountStatus::Approved => {}
    }

    let access_token = jwt::create_access_token(
        user.sid.clone(),
        user.name.clone(),
        user.role.as_str().to_string(),
        &config.jwt_secret,
        config.jwt_expiration_hours,
    )?;

    tracing::info!(sid = %user.sid, role = user.role.as_str(), "login succeeded");
    Ok(Json(LoginResponse {
        access_token,
        user: UserResponse::from(user),
    }))
}
