use axum::{
    body::Body,
    extract::{Extension, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue,
    },
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::{attendance::ScanRequest, user::User},
    repositories::attendance as attendance_repo,
    repositories::attendance::RecordFilters,
    services::{ledger, report as report_service},
    utils::csv::append_csv_row,
};

#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    pub subject_id: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub search: Option<String>,
}

impl RecordQuery {
    fn into_filters(self, restrict_to: Option<&str>) -> RecordFilters {
        RecordFilters {
            sid: restrict_to.map(|s| s.to_string()),
            subject_id: self.subject_id,
            from_date: self.from_date,
            to_date: self.to_date,
            name_search: self.search,
        }
    }
}

/// Student scan submission. Marks the caller present in the active session
/// when the token checks out.
pub async fn scan(
    State((pool, config)): State<(PgPool, Config)>,
    Extension(user): Extension<User>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_student() {
        return Err(AppError::Forbidden(
            "Only students can mark attendance by scan".to_string(),
        ));
    }

    let record = ledger::mark_self(&pool, &config, &user, payload.token.trim()).await?;
    Ok(Json(json!({
        "message": "Attendance marked",
        "record": record,
    })))
}

/// Attendance record listing. Students only ever see their own rows; staff
/// see everything the filters allow. A failed read degrades to an empty
/// list rather than an error page.
pub async fn list_records(
    State((pool, _config)): State<(PgPool, Config)>,
    Extension(user): Extension<User>,
    Query(query): Query<RecordQuery>,
) -> Json<Value> {
    let restrict_to = user.is_student().then_some(user.sid.as_str());
    let filters = query.into_filters(restrict_to);

    let records = match attendance_repo::list_filtered(&pool, &filters).await {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(error = ?err, "attendance listing failed, returning empty");
            Vec::new()
        }
    };
    Json(json!({ "records": records }))
}

/// CSV export of present records, one row per mark in insertion order.
pub async fn export_records(
    State((pool, _config)): State<(PgPool, Config)>,
) -> Result<Response, AppError> {
    let records = attendance_repo::list_present_for_export(&pool).await?;

    let mut buffer = String::new();
    append_csv_row(
        &mut buffer,
        &[
            "Session".into(),
            "Name".into(),
            "ID".into(),
            "Subject".into(),
            "Date".into(),
            "Time".into(),
        ],
    );
    for record in &records {
        append_csv_row(
            &mut buffer,
            &[
                record.session_id.clone(),
                record.name.clone(),
                record.sid.clone(),
                record.subject_name.clone(),
                record.date.format("%Y-%m-%d").to_string(),
                record.time.format("%H:%M:%S").to_string(),
            ],
        );
    }

    let mut response = Response::new(Body::from(buffer));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    response.headers_mut().insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"attendance.csv\""),
    );
    Ok(response)
}

/// Cross-student summary with badge tiers, honoring the listing filters.
pub async fn summary(
    State((pool, _config)): State<(PgPool, Config)>,
    Query(query): Query<RecordQuery>,
) -> Json<Value> {
    let filters = query.into_filters(None);
    let rows = report_service::cross_student_summary(&pool, &filters).await;
    Json(json!({ "summary": rows }))
}
