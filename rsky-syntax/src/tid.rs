use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    // Reference regex for TID:
    // Must be exactly 13 characters from base32-sortable charset
    // First character must be one of 234567abcdefghij
    // All other characters from base32-sortable charset: 234567abcdefghijklmnopqrstuvwxyz
    static ref TID_REGEX: Regex = Regex::new(
        r"^[234567abcdefghij][234567abcdefghijklmnopqrstuvwxyz]{12}$"
    ).unwrap();
}

#[derive(Error, Debug)]
#[error("InvalidTidError: {0}")]
pub struct InvalidTidError(String);

/// Validates a TID string according to the atproto specification.
///
/// TID ("timestamp identifier") is a compact string identifier based on an integer timestamp.
/// The string must be:
/// - 64-bit integer based
/// - big-endian byte ordering
/// - encoded as base32-sortable (chars: 234567abcdefghijklmnopqrstuvwxyz)
/// - no padding characters
/// - length is always 13 ASCII characters
/// - first character must be one of 234567abcdefghij (indicating high bit is 0)
///
/// The integer layout is:
/// - top bit always 0
/// - next 53 bits are microseconds since UNIX epoch (for JavaScript safe integers)
/// - final 10 bits are a random "clock identifier"
pub fn ensure_valid_tid<S: Into<String>>(tid: S) -> Result<(), InvalidTidError> {
    let tid: String = tid.into();
    // Check fixed length
    if tid.len() != 13 {
        return Err(InvalidTidError("TID must be 13 characters".into()));
    }

    // Validate format using regex
    if !TID_REGEX.is_match(&tid) {
        return Err(InvalidTidError("TID syntax not valid (regex)".into()));
    }

    Ok(())
}

/// Returns true if the given string is a valid TID, false otherwise.
pub fn is_valid_tid<S: Into<String>>(tid: S) -> bool {
    ensure_valid_tid(tid).is_ok()
}
