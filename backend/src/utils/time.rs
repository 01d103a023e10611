use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

/// Returns the current time in the configured timezone.
pub fn now_in_timezone(tz: &Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(tz)
}

/// Returns today's date in the configured timezone.
pub fn today_local(tz: &Tz) -> NaiveDate {
    now_in_timezone(tz).date_naive()
}

/// Returns the current wall-clock time in the configured timezone.
pub fn time_of_day_local(tz: &Tz) -> NaiveTime {
    now_in_timezone(tz).time()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_in_timezone_returns_datetime_in_tz() {
        let tz = chrono_tz::UTC;
        let result = now_in_timezone(&tz);
        assert_eq!(result.timezone(), tz);
    }

    #[test]
    fn today_local_matches_now_in_timezone() {
        let tz = chrono_tz::UTC;
        assert_eq!(today_local(&tz), now_in_timezone(&tz).date_naive());
    }

    #[test]
    fn local_clock_is_close_to_utc_for_utc_zone() {
        let tz = chrono_tz::UTC;
        let diff = (now_in_timezone(&tz).with_timezone(&Utc) - Utc::now())
            .num_seconds()
            .abs();
        assert!(diff < 2, "Difference should be less than 2 seconds");
    }
}
