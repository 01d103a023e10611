use anyhow::anyhow;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    pub time_zone: Tz,
    /// Public base URL embedded in the scan link rendered as a QR code.
    pub base_url: String,
    /// How long a minted scan token stays valid, in seconds.
    pub token_valid_seconds: i64,
    /// Age after which the live view mints a replacement token, in seconds.
    /// Shorter than the validity window so rotation never cuts off a
    /// student mid-scan.
    pub qr_refresh_seconds: i64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/rollcall".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let jwt_expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        let time_zone_name = env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

        let token_valid_seconds = env::var("TOKEN_VALID_SECONDS")
            .unwrap_or_else(|_| "40".to_string())
            .parse()
            .unwrap_or(40);

        let qr_refresh_seconds = env::var("QR_REFRESH_SECONDS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expiration_hours,
            time_zone,
            base_url,
            token_valid_seconds,
            qr_refresh_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_rotation_windows() {
        let config = Config {
            database_url: "postgres://localhost/rollcall".into(),
            jwt_secret: "secret".into(),
            jwt_expiration_hours: 1,
            time_zone: chrono_tz::UTC,
            base_url: "http://127.0.0.1:3000".into(),
            token_valid_seconds: 40,
            qr_refresh_seconds: 15,
        };
        assert!(config.qr_refresh_seconds < config.token_valid_seconds);
    }
}
