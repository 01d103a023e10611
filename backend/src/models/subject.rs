use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::user::Cohort;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: String,
    pub subject_name: String,
    /// Human-readable class/grouping label shown alongside the subject.
    pub class_name: String,
    /// Cohort attributes defining who is enrolled. All-unset means the
    /// subject has no resolvable enrollment (legacy/loosely configured).
    pub department: Option<String>,
    pub semester: Option<String>,
    pub section: Option<String>,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub subject_name: String,
    #[validate(length(min = 1, max = 100))]
    pub class_name: String,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub section: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub subject_name: String,
    #[validate(length(min = 1, max = 100))]
    pub class_name: String,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub section: Option<String>,
}

#[derive(Debug, Serialize)]
/// Listing row joined with the name of whoever created the subject.
pub struct SubjectResponse {
    pub id: String,
    pub subject_name: String,
    pub class_name: String,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub section: Option<String>,
    pub added_by: String,
    pub added_by_name: String,
    pub created_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(request: CreateSubjectRequest, added_by: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            subject_name: request.subject_name,
            class_name: request.class_name,
            department: request.department,
            semester: request.semester,
            section: request.section,
            added_by,
            created_at: Utc::now(),
        }
    }

    /// Returns the enrollment cohort when fully configured.
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

    #[test]
    fn subject_without_cohort_attributes_has_no_cohort() {
        let subject = Subject::new(
            CreateSubjectRequest {
                subject_name: "Algorithms".into(),
                class_name: "CS-A".into(),
                department: None,
                semester: None,
                section: None,
            },
            "admin".into(),
        );
        assert!(subject.cohort().is_none());
    }

    #[test]
    fn subject_cohort_matches_student_cohort() {
        let subject = Subject::new(
            CreateSubjectRequest {
                subject_name: "Algorithms".into(),
                class_name: "CS-A".into(),
                department: Some("CS".into()),
                semester: Some("5".into()),
                section: Some("A".into()),
            },
            "admin".into(),
        );
        let cohort = subject.cohort().expect("cohort set");
        assert_eq!(cohort.department, "CS");
        assert_eq!(cohort.semester, "5");
        assert_eq!(cohort.section, "A");
    }
}
