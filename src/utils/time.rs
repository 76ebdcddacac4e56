//! Timestamp parsing tolerant of the handful of formats pump/CGM exports use.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::OrefError;

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, OrefError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(millis) = s.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| OrefError::InvalidTimestamp(s.to_string()));
    }
    Err(OrefError::InvalidTimestamp(s.to_string()))
}

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        assert!(parse_timestamp("2024-01-01T12:00:00Z").is_ok());
    }

    #[test]
    fn parses_space_separated() {
        assert!(parse_timestamp("2024-01-01 12:00:00").is_ok());
    }

    #[test]
    fn parses_unix_millis() {
        assert!(parse_timestamp("1704110400000").is_ok());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("not a date").is_err());
    }
}
