use std::sync::OnceLock;

use chrono::Utc;
use rollcall_backend::repositories::token as token_repo;
use tokio::sync::Mutex;

#[path = "support/mod.rs"]
mod support;

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    GUARD.get_or_init(|| Mutex::new(())).lock().await
}

#[tokio::test]
async fn mint_produces_six_digit_token_with_validity_window() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;

    let token = token_repo::mint(&pool, 40).await.expect("mint token");

    let value: u32 = token.token.parse().expect("numeric token");
    assert!((100_000..=999_999).contains(&value));
    let window = (token.expires_at - token.created_at).num_seconds();
    assert_eq!(window, 40);

    let found = token_repo::find_valid(&pool, &token.token)
        .await
        .expect("find_valid")
        .expect("token should be live");
    assert_eq!(found.token, token.token);
}

#[tokio::test]
async fn find_valid_rejects_expired_tokens() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;

    support::seed_token(&pool, "111111", -5).await;

    let found = token_repo::find_valid(&pool, "111111")
        .await
        .expect("find_valid");
    assert!(found.is_none());
}

#[tokio::test]
async fn latest_valid_returns_newest_live_token() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;

    support::seed_token(&pool, "222222", 40).await;
    support::age_token(&pool, "222222", 30).await;
    support::seed_token(&pool, "333333", 40).await;
    support::seed_token(&pool, "444444", -5).await;

    let latest = token_repo::latest_valid(&pool)
        .await
        .expect("latest_valid")
        .expect("a live token exists");
    assert_eq!(latest.token, "333333");
    assert!(latest.expires_at > Utc::now());
}

#[tokio::test]
async fn purge_expired_leaves_live_tokens_alone() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;

    support::seed_token(&pool, "555555", 40).await;
    support::seed_token(&pool, "666666", -5).await;
    support::seed_token(&pool, "777777", -60).await;

    let removed = token_repo::purge_expired(&pool).await.expect("purge_expired");
    assert_eq!(removed, 2);

    assert!(token_repo::find_valid(&pool, "555555")
        .await
        .expect("find_valid")
        .is_some());
}

#[tokio::test]
async fn purge_all_empties_the_store() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;

    support::seed_token(&pool, "888888", 40).await;
    support::seed_token(&pool, "999999", 40).await;

    let removed = token_repo::purge_all(&pool).await.expect("purge_all");
    assert_eq!(removed, 2);
    assert!(token_repo::latest_valid(&pool)
        .await
        .expect("latest_valid")
        .is_none());
}

#[tokio::test]
async fn minting_twice_keeps_both_tokens_live() {
    let _guard = integration_guard().await;
    let pool = support::test_pool().await;
    support::reset_db(&pool).await;

    let first = token_repo::mint(&pool, 40).await.expect("first mint");
    let second = token_repo::mint(&pool, 40).await.expect("second mint");

    // Overlapping validity: a superseded token still authorizes a scan.
    assert!(token_repo::find_valid(&pool, &first.token)
        .await
        .expect("find_valid")
        .is_some());
    assert!(token_repo::find_valid(&pool, &second.token)
        .await
        .expect("find_valid")
        .is_some());
}
