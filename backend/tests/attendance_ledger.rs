use std::sync::OnceLock;

use rollcall_backend::{
    error::AppError,
    models::attendance::{AttendanceStatus, ManualAction, ManualMarkRequest, MarkedType},
    repositories::attendance as attendance_repo,
    services::{ledger, session as session_service},
};
use tokio::sync::Mutex;

#[path = "support/mod.rs"]
mod support;

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    GUARD.get_or_init(|| Mutex::new(())).lock().await
}

#[tokio::test]
async fn scan_marks_the_student_present_once() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;
    let config = support::test_config();

    let teacher = support::seed_teacher(&pool).await;
    let subject = support::seed_subject(&pool, &teacher.sid, None).await;
    let session = support::seed_active_session(&pool, &subject, &teacher.sid).await;
    let student = support::seed_student(&pool, None).await;
    support::seed_token(&pool, "123456", 40).await;

    let record = ledger::mark_self(&pool, &config, &student, "123456")
        .await
        .expect("first scan succeeds");
    assert_eq!(record.session_id, session.id);
    assert_eq!(record.effective_status(), AttendanceStatus::Present);
    assert_eq!(record.effective_marked_type(), MarkedType::SelfScan);

    let err = ledger::mark_self(&pool, &config, &student, "123456")
        .await
        .expect_err("second scan is a duplicate");
    assert!(matches!(err, AppError::DuplicateMark));
}

#[tokio::test]
async fn scan_without_active_session_is_rejected() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;
    let config = support::test_config();

    let student = support::seed_student(&pool, None).await;
    support::seed_token(&pool, "123456", 40).await;

    let err = ledger::mark_self(&pool, &config, &student, "123456")
        .await
        .expect_err("no session open");
    assert!(matches!(err, AppError::NoActiveSession));
}

#[tokio::test]
async fn scan_with_unknown_or_expired_token_is_rejected() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;
    let config = support::test_config();

    let teacher = support::seed_teacher(&pool).await;
    let subject = support::seed_subject(&pool, &teacher.sid, None).await;
    support::seed_active_session(&pool, &subject, &teacher.sid).await;
    let student = support::seed_student(&pool, None).await;

    let err = ledger::mark_self(&pool, &config, &student, "000000")
        .await
        .expect_err("unknown token");
    assert!(matches!(err, AppError::InvalidToken));

    support::seed_token(&pool, "123456", -5).await;
    let err = ledger::mark_self(&pool, &config, &student, "123456")
        .await
        .expect_err("expired token");
    assert!(matches!(err, AppError::InvalidToken));
}

#[tokio::test]
async fn concurrent_scans_yield_one_record() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;
    let config = support::test_config();

    let teacher = support::seed_teacher(&pool).await;
    let subject = support::seed_subject(&pool, &teacher.sid, None).await;
    let session = support::seed_active_session(&pool, &subject, &teacher.sid).await;
    let student = support::seed_student(&pool, None).await;
    support::seed_token(&pool, "123456", 40).await;

    let (a, b) = tokio::join!(
        ledger::mark_self(&pool, &config, &student, "123456"),
        ledger::mark_self(&pool, &config, &student, "123456"),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one scan may land");
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(err, AppError::DuplicateMark));
        }
    }

    let count = attendance_repo::count_for_session(&pool, &session.id)
        .await
        .expect("count records");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn manual_mark_overrides_a_scan_and_clear_removes_it() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;
    let config = support::test_config();

    let teacher = support::seed_teacher(&pool).await;
    let subject = support::seed_subject(&pool, &teacher.sid, None).await;
    let session = support::seed_active_session(&pool, &subject, &teacher.sid).await;
    let student = support::seed_student(&pool, None).await;
    support::seed_token(&pool, "123456", 40).await;

    ledger::mark_self(&pool, &config, &student, "123456")
        .await
        .expect("scan");

    let overridden = ledger::mark_manual(
        &pool,
        &config,
        &teacher,
        ManualMarkRequest {
            sid: student.sid.clone(),
            action: ManualAction::Absent,
        },
    )
    .await
    .expect("manual absent")
    .expect("record kept");
    assert_eq!(overridden.effective_status(), AttendanceStatus::Absent);
    assert_eq!(overridden.effective_marked_type(), MarkedType::Manual);
    assert_eq!(overridden.marked_by.as_deref(), Some(teacher.sid.as_str()));

    // Still exactly one row for the pair.
    let count = attendance_repo::count_for_session(&pool, &session.id)
        .await
        .expect("count records");
    assert_eq!(count, 1);

    let cleared = ledger::mark_manual(
        &pool,
        &config,
        &teacher,
        ManualMarkRequest {
            sid: student.sid.clone(),
            action: ManualAction::Clear,
        },
    )
    .await
    .expect("manual clear");
    assert!(cleared.is_none());

    let record = attendance_repo::find_record(&pool, &session.id, &student.sid)
        .await
        .expect("find_record");
    assert!(record.is_none());
}

#[tokio::test]
async fn manual_mark_for_unknown_student_is_rejected() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;
    let config = support::test_config();

    let teacher = support::seed_teacher(&pool).await;
    let subject = support::seed_subject(&pool, &teacher.sid, None).await;
    support::seed_active_session(&pool, &subject, &teacher.sid).await;

    let err = ledger::mark_manual(
        &pool,
        &config,
        &teacher,
        ManualMarkRequest {
            sid: "ghost".into(),
            action: ManualAction::Present,
        },
    )
    .await
    .expect_err("unknown student");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn reconciliation_leaves_manual_and_scanned_marks_standing() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;
    let config = support::test_config();

    let teacher = support::seed_teacher(&pool).await;
    let cohort = Some(("CS", "5", "A"));
    let subject = support::seed_subject(&pool, &teacher.sid, cohort).await;
    let session = support::seed_active_session(&pool, &subject, &teacher.sid).await;

    let scanned = support::seed_student(&pool, cohort).await;
    let manual_absent = support::seed_student(&pool, cohort).await;
    let unmarked = support::seed_student(&pool, cohort).await;

    support::seed_token(&pool, "123456", 40).await;
    ledger::mark_self(&pool, &config, &scanned, "123456")
        .await
        .expect("scan");
    ledger::mark_manual(
        &pool,
        &config,
        &teacher,
        ManualMarkRequest {
            sid: manual_absent.sid.clone(),
            action: ManualAction::Absent,
        },
    )
    .await
    .expect("manual absent");

    let stopped = session_service::stop_session(&pool, &config)
        .await
        .expect("stop session");
    assert_eq!(stopped.absentees_marked, 1);

    let scanned_row = attendance_repo::find_record(&pool, &session.id, &scanned.sid)
        .await
        .expect("find_record")
        .expect("scan kept");
    assert_eq!(scanned_row.effective_status(), AttendanceStatus::Present);
    assert_eq!(scanned_row.effective_marked_type(), MarkedType::SelfScan);

    let manual_row = attendance_repo::find_record(&pool, &session.id, &manual_absent.sid)
        .await
        .expect("find_record")
        .expect("manual kept");
    assert_eq!(manual_row.effective_marked_type(), MarkedType::Manual);

    let swept_row = attendance_repo::find_record(&pool, &session.id, &unmarked.sid)
        .await
        .expect("find_record")
        .expect("absentee swept in");
    assert_eq!(swept_row.effective_status(), AttendanceStatus::Absent);
    assert_eq!(swept_row.effective_marked_type(), MarkedType::Auto);
}
