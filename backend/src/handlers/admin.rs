use std::collections::HashMap;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        subject::{CreateSubjectRequest, Subject, SubjectResponse, UpdateSubjectRequest},
        user::{AccountStatus, CreateTeacherRequest, User, UserResponse, UserRole},
    },
    repositories::{session as session_repo, subject as subject_repo, user as user_repo},
    utils::password,
};

/// The bootstrap account; it must always be able to log in.
const PROTECTED_ADMIN_SID: &str = "admin";

/// Dashboard stats. Every count degrades to zero on a failed read so the
/// admin landing page always renders.
pub async fn stats(State((pool, _config)): State<(PgPool, Config)>) -> Json<Value> {
    let teachers = count_or_zero(user_repo::count_by_role(&pool, UserRole::Teacher).await);
    let students = count_or_zero(user_repo::count_by_role(&pool, UserRole::Student).await);
    let sessions = count_or_zero(session_repo::count_all(&pool).await);
    let active_sessions = count_or_zero(session_repo::count_active(&pool).await);

    let pending = match user_repo::list_pending_students(&pool).await {
        Ok(users) => users.into_iter().map(UserResponse::from).collect(),
        Err(err) => {
            tracing::warn!(error = ?err, "pending student listing failed");
            Vec::new()
        }
    };

    Json(json!({
        "teachers": teachers,
        "students": students,
        "sessions": sessions,
        "active_sessions": active_sessions,
        "pending_students": pending,
    }))
}

fn count_or_zero(result: Result<i64, sqlx::Error>) -> i64 {
    result.unwrap_or_else(|err| {
        tracing::warn!(error = ?err, "stats count failed");
        0
    })
}

/// Provisions a teacher account; teachers skip the approval queue.
pub async fn create_teacher(
    State((pool, _config)): State<(PgPool, Config)>,
    Json(payload): Json<CreateTeacherRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    if user_repo::find_by_sid(&pool, &payload.sid).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "An account with ID {} already exists",
            payload.sid
        )));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let teacher = User::new_teacher(payload.sid, payload.name, password_hash);
    let created = user_repo::create_user(&pool, &teacher).await?;

    tracing::info!(sid = %created.sid, "teacher account created");
    Ok(Json(json!({
        "message": "Teacher created",
        "user": UserResponse::from(created),
    })))
}

pub async fn list_users(
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Json<Value>, AppError> {
    let teachers: Vec<UserResponse> = user_repo::list_by_role(&pool, UserRole::Teacher)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    let students: Vec<UserResponse> = user_repo::list_by_role(&pool, UserRole::Student)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(json!({
        "teachers": teachers,
        "students": students,
    })))
}

pub async fn delete_user(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(sid): Path<String>,
) -> Result<Json<Value>, AppError> {
    if sid == PROTECTED_ADMIN_SID {
        return Err(AppError::Forbidden(
            "The admin account cannot be deleted".to_string(),
        ));
    }

    let deleted = match user_repo::delete_user(&pool, &sid).await {
        Ok(deleted) => deleted,
        Err(err) if is_foreign_key_violation(&err) => {
            return Err(AppError::ReferentialConflict(format!(
                "User {} has attendance records and cannot be deleted",
                sid
            )));
        }
        Err(err) => return Err(err.into()),
    };
    if !deleted {
        return Err(AppError::NotFound(format!("User {} not found", sid)));
    }

    tracing::info!(sid = %sid, "user deleted");
    Ok(Json(json!({ "message": "User deleted", "sid": sid })))
}

/// Pending registrations awaiting a decision. Teachers can see and decide
/// these as well as admins.
pub async fn pending_students(
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Json<Value>, AppError> {
    let pending: Vec<UserResponse> = user_repo::list_pending_students(&pool)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(json!({ "pending_students": pending })))
}

pub async fn approve_student(
    State((pool, _config)): State<(PgPool, Config)>,
    Extension(decider): Extension<User>,
    Path(sid): Path<String>,
) -> Result<Json<Value>, AppError> {
    decide(&pool, &decider, &sid, AccountStatus::Approved).await
}

pub async fn reject_student(
    State((pool, _config)): State<(PgPool, Config)>,
    Extension(decider): Extension<User>,
    Path(sid): Path<String>,
) -> Result<Json<Value>, AppError> {
    decide(&pool, &decider, &sid, AccountStatus::Rejected).await
}

/// Applies an approval decision. Only a `pending` account transitions, so
/// repeating a decision (or racing another decider) is reported as a
/// conflict rather than silently rewriting history.
async fn decide(
    pool: &PgPool,
    decider: &User,
    sid: &str,
    decision: AccountStatus,
) -> Result<Json<Value>, AppError> {
    let moved = user_repo::decide_pending(pool, sid, decision).await?;
    if !moved {
        return Err(AppError::Conflict(format!(
            "No pending registration for {}",
            sid
        )));
    }

    tracing::info!(
        sid = %sid,
        decision = decision.as_str(),
        decided_by = %decider.sid,
        "registration decided"
    );
    Ok(Json(json!({
        "message": format!("Registration {}", decision.as_str()),
        "sid": sid,
    })))
}

pub async fn list_subjects(
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Json<Value>, AppError> {
    let subjects = subject_repo::list_all(&pool).await?;

    // Resolve creator display names once per distinct sid.
    let mut names: HashMap<String, String> = HashMap::new();
    for subject in &subjects {
        if !names.contains_key(&subject.added_by) {
            let name = user_repo::find_by_sid(&pool, &subject.added_by)
                .await?
                .map(|u| u.name)
                .unwrap_or_else(|| subject.added_by.clone());
            names.insert(subject.added_by.clone(), name);
        }
    }

    let responses: Vec<SubjectResponse> = subjects
        .into_iter()
        .map(|subject| {
            let added_by_name = names
                .get(&subject.added_by)
                .cloned()
                .unwrap_or_else(|| subject.added_by.clone());
            SubjectResponse {
                id: subject.id,
                subject_name: subject.subject_name,
                class_name: subject.class_name,
                department: subject.department,
                semester: subject.semester,
                section: subject.section,
                added_by: subject.added_by,
                added_by_name,
                created_at: subject.created_at,
            }
        })
        .collect();

    Ok(Json(json!({ "subjects": responses })))
}

pub async fn create_subject(
    State((pool, _config)): State<(PgPool, Config)>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    let subject = Subject::new(payload, user.sid.clone());
    let created = subject_repo::create_subject(&pool, &subject).await?;

    tracing::info!(subject_id = %created.id, added_by = %user.sid, "subject created");
    Ok(Json(json!({
        "message": "Subject created",
        "subject": created,
    })))
}

pub async fn update_subject(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    let updated = subject_repo::update_subject(&pool, &id, &payload)
        .await?
        .ok_or(AppError::SubjectNotFound)?;

    Ok(Json(json!({
        "message": "Subject updated",
        "subject": updated,
    })))
}

/// Deletes a subject unless sessions still reference it. The explicit count
/// check gives a clean conflict message; the foreign key backstops the race.
pub async fn delete_subject(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if subject_repo::find_by_id(&pool, &id).await?.is_none() {
        return Err(AppError::SubjectNotFound);
    }

    let referencing = session_repo::count_for_subject(&pool, &id).await?;
    if referencing > 0 {
        return Err(AppError::ReferentialConflict(format!(
            "Subject has {} attendance session(s) and cannot be deleted",
            referencing
        )));
    }

    let deleted = match subject_repo::delete_subject(&pool, &id).await {
        Ok(deleted) => deleted,
        Err(err) if is_foreign_key_violation(&err) => {
            return Err(AppError::ReferentialConflict(
                "Subject is still referenced by attendance data".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };
    if !deleted {
        return Err(AppError::SubjectNotFound);
    }

    tracing::info!(subject_id = %id, "subject deleted");
    Ok(Json(json!({ "message": "Subject deleted", "id": id })))
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_foreign_key_violation())
        .unwrap_or(false)
}
