//! Phone number normalization.
//!
//! Turns whatever the caller typed (`"0812-345"`, `"+62 812 345"`, `62812345`)
//! into the digit string the messaging protocol addresses.

use serde_json::Value;

use crate::models::lookup::NormalizedNumber;

/// National trunk prefix replaced by the country code.
const TRUNK_PREFIX: char = '0';

/// Normalize a raw phone number.
///
/// Keeps only digits (a leading `+` is accepted and dropped) and replaces a
/// leading trunk `0` with `country_code`. Returns `None` when no digits remain.
///
/// `country_code` must itself be digits without a leading zero, which
/// [`crate::config::Config::validate`] guarantees; under that condition the
/// function is idempotent.
pub fn normalize(raw: &str, country_code: &str) -> Option<NormalizedNumber> {
    let digits: String = raw.trim().chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return None;
    }

    let digits = match digits.strip_prefix(TRUNK_PREFIX) {
        Some(rest) => format!("{country_code}{rest}"),
        None => digits,
    };

    Some(NormalizedNumber::from_digits(digits))
}

/// Normalize a JSON value from a request body.
///
/// Strings and numbers are accepted; anything else normalizes to `None`.
pub fn normalize_value(value: &Value, country_code: &str) -> Option<NormalizedNumber> {
    match value {
        Value::String(s) => normalize(s, country_code),
        Value::Number(n) => normalize(&n.to_string(), country_code),
        _ => None,
    }
}
