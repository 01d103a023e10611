//! Enrollment resolver: which students a subject's attendance applies to.

use sqlx::PgPool;

use crate::models::subject::Subject;
use crate::models::user::User;

const SELECT_COLUMNS: &str =
    "sid, name, password_hash, role, status, department, semester, section, created_at, updated_at";

/// Returns every student whose (department, semester, section) exactly
/// matches the subject's cohort.
///
/// Subjects with an unset cohort resolve to the empty set, which turns the
/// stop-time absentee sweep into a no-op for them rather than over-marking
/// legacy subjects.
pub async fn eligible_students(pool: &PgPool, subject: &Subject) -> Result<Vec<User>, sqlx::Error> {
    let Some(cohort) = subject.cohort() else {
        return Ok(Vec::new());
    };

    let query = format!(
        "SELECT {} FROM users \
         WHERE role = 'student' AND department = $1 AND semester = $2 AND section = $3 \
         ORDER BY sid",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, User>(&query)
        .bind(&cohort.department)
        .bind(&cohort.semester)
        .bind(&cohort.section)
        .fetch_all(pool)
        .await
}
