use sqlx::PgPool;

use crate::models::user::{AccountStatus, User, UserRole};

const SELECT_COLUMNS: &str =
    "sid, name, password_hash, role, status, department, semester, section, created_at, updated_at";

pub async fn create_user(pool: &PgPool, user: &User) -> Result<User, sqlx::Error> {
    let query = format!(
        "INSERT INTO users \
            (sid, name, password_hash, role, status, department, semester, section, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {}",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(&user.sid)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(&user.department)
        .bind(&user.semester)
        .bind(&user.section)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(pool)
        .await
}

pub async fn find_by_sid(pool: &PgPool, sid: &str) -> Result<Option<User>, sqlx::Error> {
    let query = format!("SELECT {} FROM users WHERE sid = $1", SELECT_COLUMNS);
    sqlx::query_as::<_, User>(&query)
        .bind(sid)
        .fetch_optional(pool)
        .await
}

pub async fn list_by_role(pool: &PgPool, role: UserRole) -> Result<Vec<User>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM users WHERE role = $1 ORDER BY sid",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(role.as_str())
        .fetch_all(pool)
        .await
}

/// Students awaiting an approve/reject decision.
pub async fn list_pending_students(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM users WHERE role = 'student' AND status = 'pending' ORDER BY created_at",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, User>(&query).fetch_all(pool).await
}

/// Applies an approval decision. The transition is monotonic: only a
/// `pending` account moves, so repeated or conflicting decisions are
/// no-ops reported via the return value.
pub async fn decide_pending(
    pool: &PgPool,
    sid: &str,
    decision: AccountStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET status = $1, updated_at = NOW() \
         WHERE sid = $2 AND status = 'pending'",
    )
    .bind(decision.as_str())
    .bind(sid)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_user(pool: &PgPool, sid: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE sid = $1")
        .bind(sid)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_by_role(pool: &PgPool, role: UserRole) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(role.as_str())
        .fetch_one(pool)
        .await
}
