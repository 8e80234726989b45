use chrono::{NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Calendar date "today" in the report timezone. Never cached: the nightly
/// job can run close to local midnight, so callers ask fresh every time.
pub fn local_today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Whole days from the timezone-local today until `date`. Negative once the
/// date has passed.
pub fn days_until(date: NaiveDate, tz: Tz) -> i64 {
    (date - local_today(tz)).num_days()
}

/// Parse the timestamp shapes the ticketing vendors emit: naive ISO with a
/// `T` separator, naive ISO with a space, or a bare date. Returns `None` on
/// anything else; vendor dates are advisory, never load-bearing.
pub fn parse_vendor_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(stamp.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::parse_vendor_date;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_t_separated_vendor_timestamps() {
        assert_eq!(parse_vendor_date("2026-01-31T10:15:00"), Some(date(2026, 1, 31)));
    }

    #[test]
    fn parses_space_separated_vendor_timestamps() {
        assert_eq!(parse_vendor_date(" 2025-12-18 14:00:00 "), Some(date(2025, 12, 18)));
    }

    #[test]
    fn parses_bare_dates() {
        assert_eq!(parse_vendor_date("2026-02-21"), Some(date(2026, 2, 21)));
    }

    #[test]
    fn rejects_garbage_without_panicking() {
        assert_eq!(parse_vendor_date(""), None);
        assert_eq!(parse_vendor_date("next tuesday"), None);
        assert_eq!(parse_vendor_date("2026-13-40T99:99:99"), None);
    }
}
