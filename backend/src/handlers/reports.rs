use axum::{
    body::Body,
    extract::{Extension, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue,
    },
    response::Response,
    Json,
};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::user::User,
    repositories::{attendance as attendance_repo, session as session_repo},
    services::report as report_service,
    utils::csv::append_csv_row,
};

const DASHBOARD_HISTORY_LIMIT: i64 = 10;

/// Student dashboard: whether a session is open plus recent marks. Both
/// reads degrade independently so a broken history panel never hides an
/// open session.
pub async fn dashboard(
    State((pool, _config)): State<(PgPool, Config)>,
    Extension(user): Extension<User>,
) -> Json<Value> {
    let active_session = match session_repo::find_active(&pool).await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(error = ?err, "active session lookup failed for dashboard");
            None
        }
    };

    let recent =
        match attendance_repo::list_recent_for_student(&pool, &user.sid, DASHBOARD_HISTORY_LIMIT)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(sid = %user.sid, error = ?err, "recent marks lookup failed");
                Vec::new()
            }
        };

    Json(json!({
        "active_session": active_session,
        "recent_marks": recent,
    }))
}

/// Per-subject attendance percentages for the calling student.
pub async fn my_report(
    State((pool, _config)): State<(PgPool, Config)>,
    Extension(user): Extension<User>,
) -> Json<Value> {
    let rows = report_service::subject_report(&pool, &user.sid).await;
    Json(json!({ "report": rows }))
}

/// CSV export of the calling student's per-subject report.
pub async fn export_my_report(
    State((pool, _config)): State<(PgPool, Config)>,
    Extension(user): Extension<User>,
) -> Result<Response, AppError> {
    let rows = report_service::subject_report(&pool, &user.sid).await;

    let mut buffer = String::new();
    append_csv_row(
        &mut buffer,
        &[
            "Subject".into(),
            "Total Classes".into(),
            "Attended".into(),
            "Percentage".into(),
        ],
    );
    for row in &rows {
        append_csv_row(
            &mut buffer,
            &[
                row.subject_name.clone(),
                row.total_classes.to_string(),
                row.attended.to_string(),
                format!("{}%", row.percentage),
            ],
        );
    }

    let filename = format!("attendance_report_{}.csv", user.sid);
    let mut response = Response::new(Body::from(buffer));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    response.headers_mut().insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    Ok(response)
}
