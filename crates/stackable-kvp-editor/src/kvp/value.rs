use std::sync::LazyLock;

use regex::Regex;
use snafu::ensure;

use crate::validation::{
    ErrorKind, ErrorSet, ValuePatternInvalidSnafu, ValueTooLongSnafu, collect_all,
};

pub const VALUE_MAX_LEN: usize = 63;

// Lazily initialized regular expressions
static VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$")
        .expect("failed to compile value regex")
});

/// The value can be empty, but cannot exceed 63 characters.
pub fn validate_value_length(value: &str) -> Result<(), ErrorKind> {
    ensure!(value.len() <= VALUE_MAX_LEN, ValueTooLongSnafu);
    Ok(())
}

/// The value must be empty or use the format specified by Kubernetes.
pub fn validate_value_pattern(value: &str) -> Result<(), ErrorKind> {
    ensure!(VALUE_REGEX.is_match(value), ValuePatternInvalidSnafu);
    Ok(())
}

/// Like [`validate_value_length`], but fails if any of `values` fails.
pub fn validate_values_length<S: AsRef<str>>(values: &[S]) -> Result<(), ErrorKind> {
    values
        .iter()
        .try_for_each(|value| validate_value_length(value.as_ref()))
}

/// Like [`validate_value_pattern`], but fails if any of `values` fails.
pub fn validate_values_pattern<S: AsRef<str>>(values: &[S]) -> Result<(), ErrorKind> {
    values
        .iter()
        .try_for_each(|value| validate_value_pattern(value.as_ref()))
}

/// Runs every check required for label (and taint) values and returns all
/// failures.
pub fn validate_label_value(value: &str) -> ErrorSet {
    collect_all([validate_value_length(value), validate_value_pattern(value)])
}
