use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// One teacher-initiated attendance window for a subject.
///
/// At most one row system-wide has `active = true`; the schema enforces
/// this with a partial unique index, so the state machine's state is
/// always derivable by querying for the active row.
pub struct AttendanceSession {
    pub id: String,
    pub subject_id: String,
    pub teacher_id: String,
    /// Snapshot of the subject name at start time.
    pub subject_name: String,
    pub label: Option<String>,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub subject_id: String,
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
/// Live view returned to the teacher while a session runs. Reading it
/// drives the lazy token rotation.
pub struct LiveSessionResponse {
    pub session: AttendanceSession,
    pub token: String,
    pub token_expires_at: DateTime<Utc>,
    /// URL the QR encoder renders; scanning it opens the student scan page.
    pub scan_url: String,
    pub marked_count: i64,
}

#[derive(Debug, Serialize)]
/// Result of stopping a session, including how many absentees were swept in.
pub struct StopSessionResponse {
    pub session: AttendanceSession,
    pub absentees_marked: u64,
}

impl AttendanceSession {
    pub fn new(
        subject_id: String,
        teacher_id: String,
        subject_name: String,
        label: Option<String>,
        date: NaiveDate,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            subject_id,
            teacher_id,
            subject_name,
            label,
            date,
            start_time,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_active() {
        let session = AttendanceSession::new(
            "sub-1".into(),
            "t01".into(),
            "Algorithms".into(),
            Some("Lecture 4".into()),
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            Utc::now(),
        );
        assert!(session.active);
        assert_eq!(session.subject_name, "Algorithms");
    }
}
