use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse the timestamp shapes seen in harvested metadata into UTC.
///
/// Values carrying an offset are converted, naive values are taken as UTC
/// and date-only values land on midnight UTC. Returns `None` for anything
/// else so callers can keep the raw text.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(midnight_utc)
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_offset_with_space() {
        let parsed = parse_datetime("2023-04-17 15:35:37 +0000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 4, 17, 15, 35, 37).unwrap());
    }

    #[test]
    fn test_parse_converts_offset_to_utc() {
        let parsed = parse_datetime("2025-01-10T09:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 10, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_and_date_only() {
        assert_eq!(
            parse_datetime("2025-01-10T09:30:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, 9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_datetime(" 2025-01-25 ").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 25, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_datetime("sometime next spring").is_none());
        assert!(parse_datetime("").is_none());
    }
}
