use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Milliseconds in the proleptic Gregorian calendar, Unix epoch.
pub type TimeMillis = i64;

/// Wire format of every timestamp in visibility and schedule files,
/// e.g. `1 Jun 2027 00:04:21.296`. Day unpadded, fraction always 3 digits.
pub const TIMESTAMP_FORMAT: &str = "%-d %b %Y %H:%M:%S%.3f";

#[derive(Debug, Error)]
#[error("invalid timestamp {text:?}: {source}")]
pub struct TimestampError {
    pub text: String,
    #[source]
    source: chrono::ParseError,
}

pub fn parse_timestamp(text: &str) -> Result<TimeMillis, TimestampError> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc().timestamp_millis())
        .map_err(|source| TimestampError {
            text: text.to_string(),
            source,
        })
}

pub fn format_timestamp(at: TimeMillis) -> String {
    let dt = DateTime::<Utc>::from_timestamp_millis(at)
        .expect("timestamp outside the representable range");
    dt.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_timestamp() {
        let at = parse_timestamp("1 Jun 2027 00:00:01.000").unwrap();
        assert_eq!(format_timestamp(at), "1 Jun 2027 00:00:01.000");
    }

    #[test]
    fn parse_then_format_is_identity() {
        for text in [
            "1 Jan 1970 00:00:00.000",
            "31 Dec 2027 23:59:59.999",
            "29 Feb 2028 12:00:00.500",
            "15 Aug 2030 07:03:09.040",
        ] {
            let at = parse_timestamp(text).unwrap();
            assert_eq!(format_timestamp(at), text, "round trip of {text}");
        }
    }

    #[test]
    fn format_then_parse_is_identity() {
        for at in [0, 1, 999, 86_400_000, 1_812_345_678_901] {
            assert_eq!(parse_timestamp(&format_timestamp(at)).unwrap(), at);
        }
    }

    #[test]
    fn epoch_formats_as_1970() {
        assert_eq!(format_timestamp(0), "1 Jan 1970 00:00:00.000");
    }

    #[test]
    fn millisecond_arithmetic_is_exact() {
        let start = parse_timestamp("1 Jun 2027 00:00:01.000").unwrap();
        let stop = parse_timestamp("1 Jun 2027 00:04:21.296").unwrap();
        assert_eq!(stop - start, 260_296);
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("1 Junk 2027 00:00:01.000").is_err());
        assert!(parse_timestamp("32 Jun 2027 00:00:01.000").is_err());
        assert!(parse_timestamp("1 Jun 2027 00:00:01").is_err());
    }
}
