//! Pure string and parsing helpers.
//!
//! Lengths count `char`s, not bytes.

use std::fmt::{Display, Write};
use std::str::FromStr;

use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};

use crate::spec::{ExportError, Result};

fn validate_input_len(input: &str, n_len: usize) -> Result<usize> {
    if input.is_empty() {
        return Err(ExportError::invalid("The input string is empty."));
    }
    if n_len == 0 {
        return Err(ExportError::invalid("The length must be greater than 0."));
    }
    Ok(input.chars().count())
}

/// First `n_len` characters of `input`.
pub fn left(input: &str, n_len: usize) -> Result<String> {
    let n_chars = validate_input_len(input, n_len)?;
    if n_len > n_chars {
        return Err(ExportError::invalid(
            "The length must be smaller or equal to the length of the input string.",
        ));
    }
    Ok(input.chars().take(n_len).collect())
}

/// Last `n_len` characters of `input`.
pub fn right(input: &str, n_len: usize) -> Result<String> {
    let n_chars = validate_input_len(input, n_len)?;
    if n_len > n_chars {
        return Err(ExportError::invalid(
            "The length must be smaller or equal to the length of the input string.",
        ));
    }
    Ok(input.chars().skip(n_chars - n_len).collect())
}

/// `input` with `n_len` spaces prepended.
pub fn pad_left(input: &str, n_len: usize) -> Result<String> {
    validate_input_len(input, n_len)?;
    Ok(format!("{}{input}", " ".repeat(n_len)))
}

/// `input` with `n_len` spaces appended.
pub fn pad_right(input: &str, n_len: usize) -> Result<String> {
    validate_input_len(input, n_len)?;
    Ok(format!("{input}{}", " ".repeat(n_len)))
}

pub fn to_trimmed_string<V: Display + ?Sized>(value: &V) -> String {
    value.to_string().trim().to_string()
}

/// Parse `input` as `V`; `label` names the target in the error.
pub fn parse_value<V: FromStr>(input: &str, label: &str) -> Result<V> {
    input
        .trim()
        .parse::<V>()
        .map_err(|_| ExportError::invalid(format!("The input cannot be changed into a {label}: {input:?}")))
}

/// Case-insensitive `true`/`false`.
pub fn parse_bool(input: &str) -> Result<bool> {
    let c_raw = input.trim();
    if c_raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if c_raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ExportError::invalid(format!(
            "The input cannot be changed into a bool: {input:?}"
        )))
    }
}

/// Reject empty or malformed `chrono` strftime patterns.
///
/// Patterns that parse but cannot render a naive date-time (offset or
/// zone specifiers such as `%z`) are rejected too.
pub fn validate_datetime_format(format: &str) -> Result<()> {
    if format.is_empty() {
        return Err(ExportError::invalid("Date-time format must not be empty."));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ExportError::invalid(format!(
            "Invalid date-time format: {format:?}"
        )));
    }
    let mut c_sample = String::new();
    if write!(c_sample, "{}", NaiveDateTime::default().format(format)).is_err() {
        return Err(ExportError::invalid(format!(
            "Date-time format needs an offset or time zone: {format:?}"
        )));
    }
    Ok(())
}
