//! Administrator settings restricting which attributes users may see or edit.
//!
//! The settings are usually delivered by the admin settings endpoint of the
//! console backend, but can also be loaded from YAML:
//!
//! ```
//! use stackable_kvp_editor::restriction::RestrictionSettings;
//!
//! let settings = RestrictionSettings::from_yaml_str(
//!     r#"
//! hiddenKeys: [example.com/internal]
//! protectedKeys: [owner]
//! staticLabels:
//!   - key: cost-center
//!     values: [eng, sales]
//!     default: true
//!     protected: true
//! "#,
//! )
//! .unwrap();
//!
//! assert!(settings.validate().is_ok());
//! ```
use std::{
    collections::{BTreeSet, HashSet},
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};

use crate::{
    kvp::{validate_key, validate_values_length, validate_values_pattern},
    validation::{ErrorKind, ErrorSet},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read restriction settings from {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse restriction settings YAML"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display(
        "restriction settings contain {count} invalid entries",
        count = problems.len()
    ))]
    InvalidSettings { problems: Vec<SettingsProblem> },
}

/// A statically configured label, offered to users with a fixed set of values.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaticLabel {
    pub key: String,

    /// The allowed values. The first one is used when the label is
    /// synthesized as a default.
    #[serde(default)]
    pub values: Vec<String>,

    /// Add the label to every resource, even if the user didn't supply it.
    #[serde(default)]
    pub default: bool,

    /// Prevent users from removing or changing the label.
    #[serde(default)]
    pub protected: bool,
}

/// Read-only snapshot of the administrator's attribute restrictions.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionSettings {
    /// Keys which are never shown to or editable by users.
    #[serde(default)]
    pub hidden_keys: BTreeSet<String>,

    /// Keys which are shown, but cannot be removed, changed or added by users.
    #[serde(default)]
    pub protected_keys: BTreeSet<String>,

    #[serde(default)]
    pub static_labels: Vec<StaticLabel>,
}

/// A single invalid entry of [`RestrictionSettings`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsProblem {
    /// The settings field containing the entry, e.g. `hiddenKeys`.
    pub field: &'static str,
    pub entry: String,
    pub kind: ErrorKind,
}

impl Display for SettingsProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { field, entry, kind } = self;
        write!(f, "{field} entry {entry:?}: {kind}")
    }
}

impl RestrictionSettings {
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context(ParseYamlSnafu)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading restriction settings");

        let contents = fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::from_yaml_str(&contents)
    }

    /// Returns every problem found in the settings: keys violating the key
    /// syntax, static label values violating the value syntax, and static
    /// labels configured more than once.
    pub fn problems(&self) -> Vec<SettingsProblem> {
        let mut problems = Vec::new();

        let mut check_key = |field: &'static str, key: &str| {
            let errors = if key.is_empty() {
                ErrorSet::from([ErrorKind::Required])
            } else {
                validate_key(key)
            };

            problems.extend(errors.into_iter().map(|kind| SettingsProblem {
                field,
                entry: key.to_owned(),
                kind,
            }));
        };

        for key in &self.hidden_keys {
            check_key("hiddenKeys", key);
        }

        for key in &self.protected_keys {
            check_key("protectedKeys", key);
        }

        for label in &self.static_labels {
            check_key("staticLabels", &label.key);
        }

        let mut seen = HashSet::new();
        for label in &self.static_labels {
            if !seen.insert(label.key.as_str()) {
                problems.push(SettingsProblem {
                    field: "staticLabels",
                    entry: label.key.clone(),
                    kind: ErrorKind::DuplicateKey,
                });
            }

            for validation in [
                validate_values_length(&label.values),
                validate_values_pattern(&label.values),
            ] {
                if let Err(kind) = validation {
                    problems.push(SettingsProblem {
                        field: "staticLabels",
                        entry: label.key.clone(),
                        kind,
                    });
                }
            }
        }

        problems
    }

    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        ensure!(problems.is_empty(), InvalidSettingsSnafu { problems });
        Ok(())
    }
}
