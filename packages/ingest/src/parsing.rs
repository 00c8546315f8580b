//! Shared parsing utilities for incident source files.
//!
//! The source files use a fixed regional convention: UTF-16 LE text,
//! decimal-comma numerics, and day-first dates.

use chrono::NaiveDate;

/// Decodes a UTF-16 LE byte buffer, tolerating an optional BOM.
///
/// Returns `None` if the buffer has an odd length or contains unpaired
/// surrogates.
#[must_use]
pub fn decode_utf16_le(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }

    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    if units.first() == Some(&0xFEFF) {
        units.remove(0);
    }

    String::from_utf16(&units).ok()
}

/// Parses a decimal-comma number (e.g. `-23,55`). Returns `None` if the
/// field is empty, unparseable, or non-finite.
#[must_use]
pub fn parse_decimal_comma(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value = trimmed.replace(',', ".").parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a day-first date (`%d/%m/%Y`).
#[must_use]
pub fn parse_day_first_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok()
}
