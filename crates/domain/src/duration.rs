//! Duration string parsing and formatting
//!
//! Rule delay times arrive as strings like `"100ms"`, `"1.5s"` or
//! `"1m30s"`: a sequence of decimal numbers, each followed by a unit
//! (`ns`, `us`, `ms`, `s`, `m`, `h`). Negative durations are rejected.

use std::time::Duration;

use crate::errors::DomainError;

/// Nanoseconds per unit suffix, longest suffix first so `ms` wins over `s`
const UNITS: &[(&str, u64)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

/// Parse a duration string into a [`Duration`]
///
/// # Errors
///
/// Returns [`DomainError::DurationParseError`] for malformed input,
/// unknown units or negative values.
pub fn parse_duration(input: &str) -> Result<Duration, DomainError> {
    let malformed = || DomainError::DurationParseError(input.to_string());

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(malformed());
    }
    if trimmed.starts_with('-') {
        return Err(malformed());
    }
    // "0" is allowed without a unit
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: u128 = 0;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(malformed)?;
        if number_len == 0 {
            return Err(malformed());
        }
        let (number, tail) = rest.split_at(number_len);
        let (unit, unit_nanos) = UNITS
            .iter()
            .find(|(suffix, _)| tail.starts_with(suffix) && is_unit_boundary(tail, suffix))
            .ok_or_else(malformed)?;
        total_nanos += scale(number, *unit_nanos).ok_or_else(malformed)?;
        rest = &tail[unit.len()..];
    }

    u64::try_from(total_nanos)
        .map(Duration::from_nanos)
        .map_err(|_| malformed())
}

/// A unit suffix only matches when not followed by another letter, so the
/// `m` in `"ms"` is not taken for minutes.
fn is_unit_boundary(tail: &str, suffix: &str) -> bool {
    tail[suffix.len()..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_ascii_alphabetic())
}

/// Scale a decimal number string by the unit's nanosecond count without
/// going through floating point.
fn scale(number: &str, unit_nanos: u64) -> Option<u128> {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.contains('.') {
        return None;
    }

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut nanos = int_value.checked_mul(u128::from(unit_nanos))?;

    // Fractional digits: accumulate numerator/denominator, then round
    if !frac_part.is_empty() {
        let numerator: u128 = frac_part.parse().ok()?;
        let denominator = 10u128.checked_pow(u32::try_from(frac_part.len()).ok()?)?;
        let frac_nanos =
            (numerator.checked_mul(u128::from(unit_nanos))? + denominator / 2) / denominator;
        nanos = nanos.checked_add(frac_nanos)?;
    }
    Some(nanos)
}

/// Format a [`Duration`] into a string [`parse_duration`] accepts
///
/// Picks the coarsest unit that represents the value exactly, so
/// formatting and re-parsing always round-trips.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos % 1_000_000_000 == 0 {
        format!("{}s", nanos / 1_000_000_000)
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{nanos}ns")
    }
}
