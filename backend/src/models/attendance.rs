use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// One attendance mark for a (session, student) pair.
///
/// The pair is unique at the storage layer; that constraint, not the
/// application checks in front of it, is what makes marking exactly-once
/// under concurrent requests. `status` and `marked_type` are optional
/// because rows predating absent-marking carry neither; readers treat those
/// as present/self.
pub struct AttendanceRecord {
    pub id: String,
    pub session_id: String,
    pub sid: String,
    /// Snapshot of the student's display name at marking time.
    pub name: String,
    pub subject_id: String,
    pub subject_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: Option<AttendanceStatus>,
    pub marked_type: Option<MarkedType>,
    /// Identity of the teacher for manual marks.
    pub marked_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["present", "absent"],
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// How a record came to exist: a student scan, the stop-time absentee
/// sweep, or a teacher override.
pub enum MarkedType {
    #[default]
    #[sqlx(rename = "self")]
    SelfScan,
    Auto,
    Manual,
}

impl MarkedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkedType::SelfScan => "self",
            MarkedType::Auto => "auto",
            MarkedType::Manual => "manual",
        }
    }
}

impl Serialize for MarkedType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MarkedType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "self" => Ok(MarkedType::SelfScan),
            "auto" => Ok(MarkedType::Auto),
            "manual" => Ok(MarkedType::Manual),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["self", "auto", "manual"],
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Teacher-entered override action for a student's mark.
pub enum ManualAction {
    Present,
    Absent,
    Clear,
}

#[derive(Debug, Deserialize)]
/// Payload a student posts after scanning the QR code.
pub struct ScanRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ManualMarkRequest {
    pub sid: String,
    pub action: ManualAction,
}

impl AttendanceRecord {
    /// Reads the status, defaulting legacy NULLs to present.
    pub fn effective_status(&self) -> AttendanceStatus {
        self.status.unwrap_or_default()
    }

    /// Reads the marked type, defaulting legacy NULLs to self.
    pub fn effective_marked_type(&self) -> MarkedType {
        self.marked_type.unwrap_or_default()
    }

    /// Builds a present/self record for a successful scan.
    pub fn self_mark(
        session_id: String,
        sid: String,
        name: String,
        subject_id: String,
        subject_name: String,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id,
            sid,
            name,
            subject_id,
            subject_name,
            date,
            time,
            status: Some(AttendanceStatus::Present),
            marked_type: Some(MarkedType::SelfScan),
            marked_by: None,
        }
    }

    /// Builds an absent/auto record for the stop-time reconciliation sweep.
    pub fn auto_absent(
        session_id: String,
        sid: String,
        name: String,
        subject_id: String,
        subject_name: String,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id,
            sid,
            name,
            subject_id,
            subject_name,
            date,
            time,
            status: Some(AttendanceStatus::Absent),
            marked_type: Some(MarkedType::Auto),
            marked_by: None,
        }
    }
}
