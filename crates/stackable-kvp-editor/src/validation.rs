//! Row-level validation errors reported by the attribute editor.
//!
//! None of these errors are fatal. They are attached to the row (and field)
//! which caused them and surface through [`Errors`] when the host asks the
//! editor to [validate](crate::binding::AttributeBinding::validate) itself.
use std::{collections::BTreeSet, fmt::Display};

use serde::Serialize;
use snafu::Snafu;
use strum::{AsRefStr, EnumIter};

/// The set of errors currently attached to a single row.
pub type ErrorSet = BTreeSet<ErrorKind>;

/// The result of validating a whole editor.
pub type ValidationResult = Result<(), Errors>;

/// A single validation problem of a key, value or effect field.
///
/// The [`Display`] implementation produces a human-readable message, while
/// [`AsRef<str>`] returns a stable camelCase identifier (e.g. `keyTooLong`)
/// which hosts can use to look up localized messages.
#[derive(
    AsRefStr,
    Clone,
    Copy,
    Debug,
    EnumIter,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Snafu,
)]
#[serde(rename_all = "camelCase")]
#[snafu(visibility(pub(crate)))]
#[strum(serialize_all = "camelCase")]
pub enum ErrorKind {
    #[snafu(display("name segment of key exceeds the maximum length of 63 characters"))]
    KeyTooLong,

    #[snafu(display("prefix segment of key exceeds the maximum length of 253 characters"))]
    KeyPrefixTooLong,

    #[snafu(display(
        "name segment of key must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
    ))]
    KeyNamePatternInvalid,

    #[snafu(display(
        "prefix segment of key must be a lowercase DNS subdomain, e.g. \"example.com\""
    ))]
    KeyPrefixPatternInvalid,

    #[snafu(display("value exceeds the maximum length of 63 characters"))]
    ValueTooLong,

    #[snafu(display(
        "value must be empty or consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
    ))]
    ValuePatternInvalid,

    #[snafu(display("effect must be one of NoSchedule, PreferNoSchedule or NoExecute"))]
    InvalidEffect,

    #[snafu(display("key is used more than once"))]
    DuplicateKey,

    #[snafu(display("key is restricted and cannot be added"))]
    ForbiddenKey,

    #[snafu(display("field is required"))]
    Required,
}

/// A validation error located at a specific row of an editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub index: usize,
    pub key: String,
    pub kind: ErrorKind,
}

impl Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { index, key, kind } = self;
        write!(f, "row {index} ({key:?}): {kind}")
    }
}

/// A collection of errors discovered during validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Errors(Vec<RowError>);

impl Errors {
    pub fn iter(&self) -> impl Iterator<Item = &RowError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether any row reports `kind`.
    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        self.0.iter().any(|error| error.kind == kind)
    }
}

impl FromIterator<RowError> for Errors {
    fn from_iter<T: IntoIterator<Item = RowError>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Errors {
    type IntoIter = std::vec::IntoIter<RowError>;
    type Item = RowError;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

/// Returns [`Ok`] if *all* validations are [`Ok`], otherwise returns every
/// reported [`ErrorKind`].
pub(crate) fn collect_all(
    validations: impl IntoIterator<Item = Result<(), ErrorKind>>,
) -> ErrorSet {
    validations
        .into_iter()
        .filter_map(Result::err)
        .collect()
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    #[case(ErrorKind::KeyTooLong, "keyTooLong")]
    #[case(ErrorKind::KeyPrefixPatternInvalid, "keyPrefixPatternInvalid")]
    #[case(ErrorKind::DuplicateKey, "duplicateKey")]
    #[case(ErrorKind::Required, "required")]
    fn error_kind_identifier(#[case] kind: ErrorKind, #[case] expected: &str) {
        assert_eq!(kind.as_ref(), expected);
        assert_eq!(
            serde_json::to_value(kind).unwrap(),
            serde_json::Value::String(expected.to_owned())
        );
    }

    #[test]
    fn every_kind_has_a_message() {
        for kind in ErrorKind::iter() {
            assert!(!kind.to_string().is_empty(), "{kind:?} has no message");
        }
    }

    #[test]
    fn errors_display() {
        let errors = Errors::from_iter([
            RowError {
                index: 0,
                key: "env".to_owned(),
                kind: ErrorKind::DuplicateKey,
            },
            RowError {
                index: 2,
                key: "env".to_owned(),
                kind: ErrorKind::DuplicateKey,
            },
        ]);

        assert_eq!(
            errors.to_string(),
            r#"row 0 ("env"): key is used more than once, row 2 ("env"): key is used more than once"#
        );
        assert!(errors.contains_kind(ErrorKind::DuplicateKey));
        assert!(!errors.contains_kind(ErrorKind::Required));
    }

    #[test]
    fn collect_all_keeps_every_error() {
        let errors = collect_all([
            Ok(()),
            Err(ErrorKind::ValueTooLong),
            Err(ErrorKind::ValuePatternInvalid),
        ]);

        assert_eq!(
            errors,
            ErrorSet::from([ErrorKind::ValueTooLong, ErrorKind::ValuePatternInvalid])
        );
    }
}
