use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::error::{DashError, Result};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// `true` when `tz_name` is a recognised IANA timezone.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Naive layouts seen in billing exports, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Offset-carrying layouts that are not strict RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

/// Parses extract timestamps into wall-clock time of the source timezone.
///
/// Offset-aware inputs are converted into the source timezone; naive inputs
/// are taken to already be in it. Date comparisons and period bucketing then
/// operate on the calendar date as seen in that zone.
#[derive(Debug, Clone)]
pub struct TimezoneHandler {
    source_tz: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { source_tz: Tz::UTC }
    }
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// If `tz_name` is not recognised, falls back to UTC and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { source_tz: tz }
    }

    pub fn source_tz(&self) -> Tz {
        self.source_tz
    }

    /// Parse one cell. Returns `None` for empty or unrecognised input; callers
    /// store that as a null timestamp rather than failing.
    pub fn parse_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = match s.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&self.source_tz).naive_local());
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&normalised, fmt) {
                return Some(dt.with_timezone(&self.source_tz).naive_local());
            }
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date.and_time(NaiveTime::MIN));
            }
        }
        // Monthly rollups carry "YYYY-MM".
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return Some(date.and_time(NaiveTime::MIN));
        }

        if s.len() >= 9 && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(dt) = s
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
            {
                return Some(self.source_tz.from_utc_datetime(&dt.naive_utc()).naive_local());
            }
        }

        debug!("TimezoneHandler: could not parse timestamp \"{}\"", s);
        None
    }
}

// ── User-supplied dates ───────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` date entered by the user.
pub fn parse_user_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| DashError::InvalidDate(format!("{} (expected YYYY-MM-DD)", s.trim())))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ndt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("UTC"));
        assert!(validate_timezone("Europe/Berlin"));
        assert!(!validate_timezone("Mars/Olympus"));
    }

    #[test]
    fn test_invalid_timezone_falls_back_to_utc() {
        let handler = TimezoneHandler::new("Not/AZone");
        assert_eq!(handler.source_tz(), Tz::UTC);
    }

    #[test]
    fn test_parse_naive_datetime() {
        let h = TimezoneHandler::default();
        assert_eq!(
            h.parse_timestamp("2024-01-05 10:30:00"),
            Some(ndt("2024-01-05 10:30:00"))
        );
        assert_eq!(
            h.parse_timestamp("2024-01-05 10:30"),
            Some(ndt("2024-01-05 10:30:00"))
        );
        assert_eq!(
            h.parse_timestamp("2024-01-05T10:30:00.250"),
            Some(ndt("2024-01-05 10:30:00") + chrono::Duration::milliseconds(250))
        );
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        let h = TimezoneHandler::default();
        assert_eq!(
            h.parse_timestamp("2024-02-01"),
            Some(ndt("2024-02-01 00:00:00"))
        );
        assert_eq!(
            h.parse_timestamp("02/01/2024"),
            Some(ndt("2024-02-01 00:00:00"))
        );
    }

    #[test]
    fn test_parse_year_month() {
        let h = TimezoneHandler::default();
        assert_eq!(h.parse_timestamp("2024-03"), Some(ndt("2024-03-01 00:00:00")));
    }

    #[test]
    fn test_parse_rfc3339_converted_to_source_tz() {
        let h = TimezoneHandler::new("America/New_York");
        // 03:00 UTC is 22:00 the previous day in New York (EST, UTC-5).
        assert_eq!(
            h.parse_timestamp("2024-01-10T03:00:00Z"),
            Some(ndt("2024-01-09 22:00:00"))
        );
    }

    #[test]
    fn test_parse_space_separated_offset() {
        let h = TimezoneHandler::default();
        assert_eq!(
            h.parse_timestamp("2024-01-10 03:00:00+02:00"),
            Some(ndt("2024-01-10 01:00:00"))
        );
    }

    #[test]
    fn test_parse_unix_seconds() {
        let h = TimezoneHandler::default();
        assert_eq!(
            h.parse_timestamp("1704067200"),
            Some(ndt("2024-01-01 00:00:00"))
        );
    }

    #[test]
    fn test_parse_garbage_is_none() {
        let h = TimezoneHandler::default();
        assert_eq!(h.parse_timestamp(""), None);
        assert_eq!(h.parse_timestamp("   "), None);
        assert_eq!(h.parse_timestamp("not a date"), None);
        assert_eq!(h.parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_parse_user_date() {
        assert_eq!(
            parse_user_date(" 2024-06-30 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
        );
        let err = parse_user_date("30/06/2024").unwrap_err();
        assert!(matches!(err, DashError::InvalidDate(_)));
    }
}
