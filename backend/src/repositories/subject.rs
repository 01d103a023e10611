use sqlx::PgPool;

use crate::models::subject::{Subject, UpdateSubjectRequest};

const SELECT_COLUMNS: &str =
    "id, subject_name, class_name, department, semester, section, added_by, created_at";

pub async fn create_subject(pool: &PgPool, subject: &Subject) -> Result<Subject, sqlx::Error> {
    let query = format!(
        "INSERT INTO subjects \
            (id, subject_name, class_name, department, semester, section, added_by, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {}",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, Subject>(&query)
        .bind(&subject.id)
        .bind(&subject.subject_name)
        .bind(&subject.class_name)
        .bind(&subject.department)
        .bind(&subject.semester)
        .bind(&subject.section)
        .bind(&subject.added_by)
        .bind(subject.created_at)
        .fetch_one(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Subject>, sqlx::Error> {
    let query = format!("SELECT {} FROM subjects WHERE id = $1", SELECT_COLUMNS);
    sqlx::query_as::<_, Subject>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Subject>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM subjects ORDER BY subject_name",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, Subject>(&query).fetch_all(pool).await
}

pub async fn update_subject(
    pool: &PgPool,
    id: &str,
    update: &UpdateSubjectRequest,
) -> Result<Option<Subject>, sqlx::Error> {
    let query = format!(
        "UPDATE subjects \
         SET subject_name = $2, class_name = $3, department = $4, semester = $5, section = $6 \
         WHERE id = $1 \
         RETURNING {}",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, Subject>(&query)
        .bind(id)
        .bind(&update.subject_name)
        .bind(&update.class_name)
        .bind(&update.department)
        .bind(&update.semester)
        .bind(&update.section)
        .fetch_optional(pool)
        .await
}

/// Deletes a subject row. Callers must check the referential guard first;
/// the foreign key from sessions backstops it either way.
pub async fn delete_subject(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
