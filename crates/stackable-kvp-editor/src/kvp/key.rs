//! Syntax checks for attribute keys.
//!
//! A key has the general format `(<PREFIX>/)<NAME>`. The prefix is everything
//! before the first slash, the name is everything after the last slash. See
//! <https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/#syntax-and-character-set>
//! for the rules enforced here.
//!
//! Every check is independent from the others, so a single key can fail
//! several of them at once. An entirely empty key passes all of them, the
//! editor reports [`ErrorKind::Required`] separately when a filled row is
//! missing its key.
use std::sync::LazyLock;

use const_format::concatcp;
use regex::Regex;
use snafu::ensure;

use crate::validation::{
    ErrorKind, ErrorSet, KeyNamePatternInvalidSnafu, KeyPrefixPatternInvalidSnafu,
    KeyPrefixTooLongSnafu, KeyTooLongSnafu, collect_all,
};

pub const KEY_PREFIX_MAX_LEN: usize = 253;
pub const KEY_NAME_MAX_LEN: usize = 63;

const KEY_NAME_FMT: &str = "[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?";
const DNS_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const KEY_PREFIX_FMT: &str = concatcp!(DNS_LABEL_FMT, "(\\.", DNS_LABEL_FMT, ")*");

// Lazily initialized regular expressions
static KEY_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concatcp!("^", KEY_NAME_FMT, "$")).expect("failed to compile key name regex")
});

static KEY_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concatcp!("^", KEY_PREFIX_FMT, "$")).expect("failed to compile key prefix regex")
});

/// Returns the prefix segment of `key`, if the key contains a slash.
///
/// ```
/// use stackable_kvp_editor::kvp::key_prefix;
///
/// assert_eq!(key_prefix("app.kubernetes.io/name"), Some("app.kubernetes.io"));
/// assert_eq!(key_prefix("name"), None);
/// ```
pub fn key_prefix(key: &str) -> Option<&str> {
    key.split_once('/').map(|(prefix, _)| prefix)
}

/// Returns the name segment of `key`, which is the whole key if it doesn't
/// contain a slash.
///
/// ```
/// use stackable_kvp_editor::kvp::key_name;
///
/// assert_eq!(key_name("app.kubernetes.io/name"), "name");
/// assert_eq!(key_name("name"), "name");
/// ```
pub fn key_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

pub fn validate_key_name_length(key: &str) -> Result<(), ErrorKind> {
    ensure!(key_name(key).len() <= KEY_NAME_MAX_LEN, KeyTooLongSnafu);
    Ok(())
}

pub fn validate_key_prefix_length(key: &str) -> Result<(), ErrorKind> {
    let prefix = key_prefix(key).unwrap_or_default();
    ensure!(prefix.len() <= KEY_PREFIX_MAX_LEN, KeyPrefixTooLongSnafu);
    Ok(())
}

/// The name segment must match the Kubernetes name format. An empty key is
/// accepted, an empty name behind a prefix (like `example.com/`) is not.
pub fn validate_key_name_pattern(key: &str) -> Result<(), ErrorKind> {
    if key.is_empty() {
        return Ok(());
    }

    ensure!(
        KEY_NAME_REGEX.is_match(key_name(key)),
        KeyNamePatternInvalidSnafu
    );
    Ok(())
}

/// The prefix, if present, must be a lowercase DNS subdomain. A leading slash
/// counts as an (invalid) empty prefix.
pub fn validate_key_prefix_pattern(key: &str) -> Result<(), ErrorKind> {
    if let Some(prefix) = key_prefix(key) {
        ensure!(KEY_PREFIX_REGEX.is_match(prefix), KeyPrefixPatternInvalidSnafu);
    }

    Ok(())
}

/// Runs every key check and returns all failures.
pub fn validate_key(key: &str) -> ErrorSet {
    collect_all([
        validate_key_name_length(key),
        validate_key_prefix_length(key),
        validate_key_name_pattern(key),
        validate_key_prefix_pattern(key),
    ])
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("stackable.tech/vendor", Some("stackable.tech"), "vendor")]
    #[case("vendor", None, "vendor")]
    #[case("a/b/c", Some("a"), "c")]
    #[case("/name", Some(""), "name")]
    #[case("", None, "")]
    fn split_key(#[case] key: &str, #[case] prefix: Option<&str>, #[case] name: &str) {
        assert_eq!(key_prefix(key), prefix);
        assert_eq!(key_name(key), name);
    }

    #[rstest]
    #[case("app.kubernetes.io/name")]
    #[case("kubernetes.io/os")]
    #[case("env")]
    #[case("Team_Name.v1")]
    #[case("1")]
    #[case("")]
    #[case(&"a".repeat(63))]
    #[case(&format!("{}/name", "a".repeat(253)))]
    fn valid_key(#[case] key: &str) {
        assert_eq!(validate_key(key), ErrorSet::new());
    }

    #[rstest]
    #[case(&"a".repeat(64), ErrorKind::KeyTooLong)]
    #[case(&format!("{}/name", "a".repeat(254)), ErrorKind::KeyPrefixTooLong)]
    #[case("-env", ErrorKind::KeyNamePatternInvalid)]
    #[case("env_", ErrorKind::KeyNamePatternInvalid)]
    #[case("stäckable", ErrorKind::KeyNamePatternInvalid)]
    #[case("example.com/", ErrorKind::KeyNamePatternInvalid)]
    #[case("Example.com/name", ErrorKind::KeyPrefixPatternInvalid)]
    #[case("example..com/name", ErrorKind::KeyPrefixPatternInvalid)]
    #[case("example.com-/name", ErrorKind::KeyPrefixPatternInvalid)]
    #[case("/name", ErrorKind::KeyPrefixPatternInvalid)]
    fn invalid_key(#[case] key: &str, #[case] error: ErrorKind) {
        assert!(
            validate_key(key).contains(&error),
            "expected {error:?} for {key:?}"
        );
    }

    #[test]
    fn reports_every_failure() {
        let key = format!("{}/{}", "A".repeat(254), "b".repeat(64));

        assert_eq!(
            validate_key(&key),
            ErrorSet::from([
                ErrorKind::KeyTooLong,
                ErrorKind::KeyPrefixTooLong,
                ErrorKind::KeyPrefixPatternInvalid,
            ])
        );
    }
}
