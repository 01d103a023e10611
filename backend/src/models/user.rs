//! Models that represent accounts, registration payloads, and role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use validator::Validate;

use crate::validation::rules::validate_sid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of an account. The `sid` doubles as the login
/// name and the identifier attendance records reference.
pub struct User {
    pub sid: String,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
    /// Approval state; only students ever sit in `pending`/`rejected`.
    pub status: AccountStatus,
    /// Placement attributes used for enrollment matching.
    pub department: Option<String>,
    pub semester: Option<String>,
    pub section: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "student" => Ok(UserRole::Student),
            "teacher" => Ok(UserRole::Teacher),
            "admin" => Ok(UserRole::Admin),
            // tolerate common legacy casings
            "Student" | "STUDENT" => Ok(UserRole::Student),
            "Teacher" | "TEACHER" => Ok(UserRole::Teacher),
            "Admin" | "ADMIN" => Ok(UserRole::Admin),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["student", "teacher", "admin"],
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Registration approval state. Transitions are monotonic: `pending` moves
/// to `approved` or `rejected` exactly once and never back.
pub enum AccountStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Approved => "approved",
            AccountStatus::Rejected => "rejected",
        }
    }
}

impl Serialize for AccountStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AccountStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "pending" => Ok(AccountStatus::Pending),
            "approved" => Ok(AccountStatus::Approved),
            "rejected" => Ok(AccountStatus::Rejected),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["pending", "approved", "rejected"],
            )),
        }
    }
}

/// The (department, semester, section) tuple a subject's enrollment is
/// resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    pub department: String,
    pub semester: String,
    pub section: String,
}

#[derive(Debug, Deserialize, Validate)]
/// Payload for student self-registration. Accounts start out `pending`.
pub struct RegisterRequest {
    #[validate(custom(function = "validate_sid"))]
    pub sid: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1))]
    pub password: String,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub section: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
/// Payload for admin provisioning of a teacher account (pre-approved).
pub struct CreateTeacherRequest {
    #[validate(custom(function = "validate_sid"))]
    pub sid: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
/// Credentials submitted by a user attempting to authenticate. The role is
/// part of the form: logging into the wrong portal is rejected outright.
pub struct LoginRequest {
    pub sid: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
/// Public-facing representation of an account, without the credential.
pub struct UserResponse {
    pub sid: String,
    pub name: String,
    pub role: String,
    pub status: String,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub section: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            sid: user.sid,
            name: user.name,
            role: user.role.as_str().to_string(),
            status: user.status.as_str().to_string(),
            department: user.department,
            semester: user.semester,
            section: user.section,
        }
    }
}

impl User {
    /// Constructs a self-registered student awaiting approval.
    pub fn new_student(
        sid: String,
        name: String,
        password_hash: String,
        department: Option<String>,
        semester: Option<String>,
        section: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sid,
            name,
            password_hash,
            role: UserRole::Student,
            status: AccountStatus::Pending,
            department,
            semester,
            section,
            created_at: now,
            updated_at: now,
        }
    }

    /// Constructs a teacher account; teachers are implicitly approved.
    pub fn new_teacher(sid: String, name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            sid,
            name,
            password_hash,
            role: UserRole::Teacher,
            status: AccountStatus::Approved,
            department: None,
            semester: None,
            section: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }

    pub fn is_teacher(&self) -> bool {
        self.role == UserRole::Teacher
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Returns the placement tuple when fully set.
    pub fn cohort(&self) -> Option<Cohort> {
        match (&self.department, &self.semester, &self.section) {
            (Some(department), Some(semester), Some(section)) => Some(Cohort {
                department: department.clone(),
                semester: semester.clone(),
                section: section.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn user_role_serde_accepts_and_emits_snake_case() {
        let s: UserRole = serde_json::from_str("\"student\"").unwrap();
        let t: UserRole = serde_json::from_str("\"teacher\"").unwrap();
        let a: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(s, UserRole::Student);
        assert_eq!(t, UserRole::Teacher);
        assert_eq!(a, UserRole::Admin);

        let emitted = serde_json::to_value(UserRole::Teacher).unwrap();
        assert_eq!(emitted, Value::String("teacher".into()));
    }

    #[test]
    fn account_status_serde_roundtrip() {
        let p: AccountStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(p, AccountStatus::Pending);
        assert_eq!(
            serde_json::to_value(AccountStatus::Rejected).unwrap(),
            Value::String("rejected".into())
        );
    }

    #[test]
    fn new_student_starts_pending() {
        let user = User::new_student(
            "cs21-001".into(),
            "Alice".into(),
            "hash".into(),
            Some("CS".into()),
            Some("5".into()),
            Some("A".into()),
        );
        assert_eq!(user.status, AccountStatus::Pending);
        assert!(user.is_student());
        assert!(user.cohort().is_some());
    }

    #[test]
    fn cohort_requires_all_three_attributes() {
        let mut user = User::new_student(
            "cs21-002".into(),
            "Bob".into(),
            "hash".into(),
            Some("CS".into()),
            None,
            Some("A".into()),
        );
        assert!(user.cohort().is_none());
        user.semester = Some("5".into());
        assert!(user.cohort().is_some());
    }

    #[test]
    fn teacher_is_implicitly_approved() {
        let user = User::new_teacher("t01".into(), "Prof".into(), "hash".into());
        assert_eq!(user.status, AccountStatus::Approved);
        assert!(user.is_teacher());
    }
}
