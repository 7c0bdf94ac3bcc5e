use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/* Validates datetime string against atproto Lexicon 'datetime' format.
 * Syntax is described at: https://atproto.com/specs/lexicon#datetime
 */

lazy_static! {
    static ref DATETIME_REGEX: Regex = Regex::new(
        r"^[0-9]{4}-[01][0-9]-[0-3][0-9]T[0-2][0-9]:[0-5][0-9]:[0-5][0-9](.[0-9]{1,20})?(Z|([+-][0-2][0-9]:[0-5][0-9]))$"
    ).unwrap();
}

#[derive(Error, Debug)]
#[error("InvalidDatetimeError: {0}")]
pub struct InvalidDatetimeError(String);

pub fn ensure_valid_datetime<S: Into<String>>(
    dt_str: S,
) -> Result<DateTime<FixedOffset>, InvalidDatetimeError> {
    let dt_str: String = dt_str.into();
    // Regex check first - this validates the basic format
    if !DATETIME_REGEX.is_match(&dt_str) {
        return Err(InvalidDatetimeError(
            "datetime didn't validate via regex".into(),
        ));
    }

    // Check for negative dates and year zero
    if dt_str.starts_with('-') {
        return Err(InvalidDatetimeError(
            "datetime normalized to a negative time".into(),
        ));
    }

    if dt_str.starts_with("000") {
        return Err(InvalidDatetimeError(
            "datetime so close to year zero not allowed".into(),
        ));
    }

    // Must parse as ISO 8601; this also verifies semantics like month is not 13 or 00
    let parsed = DateTime::parse_from_rfc3339(&dt_str)
        .map_err(|_| InvalidDatetimeError("datetime did not parse as ISO 8601".into()))?;

    if dt_str.len() > 64 {
        return Err(InvalidDatetimeError(
            "datetime is too long (64 chars max)".into(),
        ));
    }

    if dt_str.ends_with("-00:00") {
        return Err(InvalidDatetimeError(
            "datetime can not use \"-00:00\" for UTC timezone".into(),
        ));
    }

    // Additional validation: the datetime must be valid according to the calendar
    if parsed.year() < 1 {
        return Err(InvalidDatetimeError(
            "datetime before year 1 not allowed".into(),
        ));
    }

    Ok(parsed)
}

pub fn is_valid_datetime<S: Into<String>>(dt_str: S) -> bool {
    ensure_valid_datetime(dt_str).is_ok()
}

/* Takes a flexible datetime string and normalizes representation.
 *
 * This function will work with any valid atproto datetime (eg, anything which is_valid_datetime() is true for).
 * It *additionally* is more flexible about accepting datetimes that don't comply to RFC 3339,
 * or are missing timezone information, and normalizing them to a valid datetime.
 *
 * One use-case is a consistent, sortable string. Another is to work with older invalid createdAt datetimes.
 *
 * Successful output will be a valid atproto datetime with millisecond precision (3 sub-second digits)
 * and UTC timezone with trailing 'Z' syntax. Throws `InvalidDatetimeError` if the input string could
 * not be parsed as a datetime, even with permissive parsing.
 *
 * Expected output format: YYYY-MM-DDTHH:mm:ss.sssZ
 */
pub fn normalize_datetime<S: Into<String>>(dt_str: S) -> Result<String, InvalidDatetimeError> {
    let dt_str: String = dt_str.into();
    // First try strict RFC3339/ISO8601 parsing
    if let Ok(dt) = DateTime::parse_from_rfc3339(&dt_str) {
        let utc_dt = dt.with_timezone(&Utc);
        let formatted = utc_dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        if is_valid_datetime(&formatted) {
            return Ok(formatted);
        }
    }

    // Special case for timestamps with milliseconds but no timezone
    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&dt_str, "%Y-%m-%dT%H:%M:%S%.3f") {
        let utc_dt = DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc);
        let formatted = utc_dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        if is_valid_datetime(&formatted) {
            return Ok(formatted);
        }
    }

    // If no timezone specified, try parsing as naive datetime and then convert to UTC
    if !dt_str.ends_with('Z') && !dt_str.contains('+') && !dt_str.contains('-') {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&dt_str, "%Y-%m-%dT%H:%M:%S") {
            let utc_dt = DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc);
            let formatted = utc_dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
            if is_valid_datetime(&formatted) {
                return Ok(formatted);
            }
        }
    }

    // Try other flexible parsing formats
    let parsed = DateTime::parse_from_rfc3339(&dt_str)
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%Y-%m-%dT%H:%M:%S%.f%:z"))
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%Y-%m-%d %H:%M:%S%.f%:z"))
        // Try multiple variations of the RFC 822/RFC 2822 date format
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%a, %d %b %Y %H:%M:%S GMT"))
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%a, %d %B %Y %H:%M:%S GMT")) // Full month name
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%A, %d %b %Y %H:%M:%S GMT")) // Full weekday
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%A, %d %B %Y %H:%M:%S GMT")) // Both full
        // Try with %Z
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%a, %d %b %Y %H:%M:%S %Z"))
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%a, %d %B %Y %H:%M:%S %Z")) // Full month name
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%A, %d %b %Y %H:%M:%S %Z")) // Full weekday
        .or_else(|_| DateTime::parse_from_str(&dt_str, "%A, %d %B %Y %H:%M:%S %Z")) // Both full
        // Try multiple variations of the RFC 822/RFC 2822 date format
        .or_else(|_| DateTime::parse_from_rfc2822(&dt_str)); // last chance to parse format

    match parsed {
        Ok(dt) => {
            let utc_dt = dt.with_timezone(&Utc);
            let formatted = utc_dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
            if is_valid_datetime(&formatted) {
                Ok(formatted)
            } else {
                Err(InvalidDatetimeError(
                    "datetime normalized to invalid timestamp string".into(),
                ))
            }
        }
        Err(e) => {
            let kind_error = format!(
                "datetime did not parse as any timestamp format, ParseErrorKind: {:?}",
                e.kind()
            );
            Err(InvalidDatetimeError(kind_error))
        }
    }
}

/* Variant of normalizeDatetime() which always returns a valid datetime string.
 *
 * If a InvalidDatetimeError is encountered, returns the UNIX epoch time as a UTC datetime (1970-01-01T00:00:00.000Z).
 */
pub fn normalize_datetime_always<S: Into<String>>(dt_str: S) -> String {
    match normalize_datetime(dt_str) {
        Ok(dt) => dt,
        Err(_) => "1970-01-01T00:00:00.000Z".to_string(),
    }
}
