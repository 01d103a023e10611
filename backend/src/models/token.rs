use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Short-lived numeral credential authorizing one scan-based mark.
///
/// Tokens are created and expired, never updated. Both timestamps are UTC;
/// validity is always `now <= expires_at` in a single timezone so local
/// clock offsets cannot produce the naive/aware comparison bug.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanToken {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ScanToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the live view should mint a replacement for this token.
    pub fn needs_rotation_at(&self, now: DateTime<Utc>, refresh_seconds: i64) -> bool {
        now - self.created_at > Duration::seconds(refresh_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_minted_at(created_at: DateTime<Utc>) -> ScanToken {
        ScanToken {
            token: "123456".into(),
            created_at,
            expires_at: created_at + Duration::seconds(40),
        }
    }

    #[test]
    fn token_is_valid_until_expiry_passes() {
        let minted = Utc::now();
        let token = token_minted_at(minted);
        assert!(!token.is_expired_at(minted + Duration::seconds(39)));
        assert!(token.is_expired_at(minted + Duration::seconds(41)));
    }

    #[test]
    fn rotation_threshold_is_sooner_than_expiry() {
        let minted = Utc::now();
        let token = token_minted_at(minted);
        let at_16s = minted + Duration::seconds(16);
        // Due for rotation but still valid: a superseded token keeps
        // authorizing scans until its own expiry.
        assert!(token.needs_rotation_at(at_16s, 15));
        assert!(!token.is_expired_at(at_16s));
    }
}
