//! Token store: the rotating short-lived credentials that authorize scans.
//!
//! All timestamps are UTC. Expiry cleanup happens inline from the callers
//! (before reads and mints); there is no background timer.

use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::PgPool;

use crate::models::token::ScanToken;

/// Collision retries when the generated numeral is already a live token.
const MINT_ATTEMPTS: u32 = 5;

fn random_token_value() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Mints and persists a fresh token valid for `valid_seconds`.
///
/// Values may repeat across time, but never among currently-valid tokens:
/// the primary key rejects a collision with a live token and we re-roll.
/// Rotation policy (when to mint) lives with the session state machine,
/// not here.
pub async fn mint(pool: &PgPool, valid_seconds: i64) -> Result<ScanToken, sqlx::Error> {
    let mut last_err: Option<sqlx::Error> = None;

    for _ in 0..MINT_ATTEMPTS {
        let now = Utc::now();
        let token = ScanToken {
            token: random_token_value(),
            created_at: now,
            expires_at: now + Duration::seconds(valid_seconds),
        };

        let result = sqlx::query(
            "INSERT INTO valid_tokens (token, created_at, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&token.token)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(pool)
        .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) => {
                let collision = err
                    .as_database_error()
                    .map(|db| db.is_unique_violation())
                    .unwrap_or(false);
                if !collision {
                    return Err(err);
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or(sqlx::Error::PoolClosed))
}

/// Looks up a token that exists and has not expired.
pub async fn find_valid(pool: &PgPool, value: &str) -> Result<Option<ScanToken>, sqlx::Error> {
    sqlx::query_as::<_, ScanToken>(
        "SELECT token, created_at, expires_at FROM valid_tokens \
         WHERE token = $1 AND expires_at >= NOW()",
    )
    .bind(value)
    .fetch_optional(pool)
    .await
}

/// Returns the most recently minted still-valid token, if any.
pub async fn latest_valid(pool: &PgPool) -> Result<Option<ScanToken>, sqlx::Error> {
    sqlx::query_as::<_, ScanToken>(
        "SELECT token, created_at, expires_at FROM valid_tokens \
         WHERE expires_at >= NOW() \
         ORDER BY created_at DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

/// Deletes every token whose expiry has passed.
pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM valid_tokens WHERE expires_at < NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Deletes every outstanding token. Called on session stop so a stale QR
/// cannot authorize attendance on a future session.
pub async fn purge_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM valid_tokens")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_value_is_six_digits() {
        for _ in 0..100 {
            let value = random_token_value();
            assert_eq!(value.len(), 6);
            let parsed: u32 = value.parse().unwrap();
            assert!((100_000..=999_999).contains(&parsed));
        }
    }
}
