//! Classification of attributes into normal, protected, inherited and hidden
//! ones, based on administrator settings and the parent resource.
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    editor::Row,
    kvp::{Attribute, AttributeKind},
};

mod settings;

pub use settings::*;

/// How an attribute key is treated by the editor, in order of precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RowClass {
    /// Never shown, never editable and never part of the emitted patch.
    Hidden,

    /// Enforced by an administrator. Shown read-only and not deletable.
    Protected,

    /// Copied from a parent resource. Shown read-only and not deletable.
    Inherited,

    Normal,
}

/// Decides which attributes users may see, edit and introduce.
///
/// ```
/// use stackable_kvp_editor::restriction::{RestrictionPolicy, RowClass};
///
/// let policy = RestrictionPolicy::new()
///     .with_hidden_keys(["internal"])
///     .with_protected_keys(["owner"]);
///
/// assert_eq!(policy.classify("internal"), RowClass::Hidden);
/// assert_eq!(policy.classify("owner"), RowClass::Protected);
/// assert_eq!(policy.classify("env"), RowClass::Normal);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestrictionPolicy {
    hidden_keys: BTreeSet<String>,
    protected_keys: BTreeSet<String>,
    inherited: BTreeMap<String, String>,
    static_labels: Vec<StaticLabel>,
}

impl RestrictionPolicy {
    /// Creates a policy without any restrictions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy from administrator settings. Protected static labels
    /// are added to the protected keys.
    pub fn from_settings(settings: &RestrictionSettings) -> Self {
        Self::new()
            .with_hidden_keys(settings.hidden_keys.iter().cloned())
            .with_protected_keys(settings.protected_keys.iter().cloned())
            .with_static_labels(settings.static_labels.iter().cloned())
    }

    pub fn with_hidden_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.hidden_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_protected_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.protected_keys
            .extend(keys.into_iter().map(Into::into));
        self
    }

    /// Adds attributes inherited from the parent resource.
    pub fn with_inherited<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inherited.extend(
            attributes
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        self
    }

    pub fn with_static_labels(mut self, labels: impl IntoIterator<Item = StaticLabel>) -> Self {
        for label in labels {
            if label.protected {
                self.protected_keys.insert(label.key.clone());
            }
            self.static_labels.push(label);
        }
        self
    }

    pub fn classify(&self, key: &str) -> RowClass {
        if self.is_hidden(key) {
            RowClass::Hidden
        } else if self.is_protected(key) {
            RowClass::Protected
        } else if self.is_inherited(key) {
            RowClass::Inherited
        } else {
            RowClass::Normal
        }
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden_keys.contains(key)
    }

    pub fn is_protected(&self, key: &str) -> bool {
        self.protected_keys.contains(key)
    }

    pub fn is_inherited(&self, key: &str) -> bool {
        self.inherited.contains_key(key)
    }

    /// Returns `true` if users are not allowed to introduce `key` as a new,
    /// independent attribute.
    pub fn is_forbidden(&self, key: &str) -> bool {
        self.is_hidden(key) || self.is_protected(key)
    }

    /// Removes every hidden attribute.
    pub fn visible(&self, attributes: Vec<Attribute>) -> Vec<Attribute> {
        attributes
            .into_iter()
            .filter(|attribute| !self.is_hidden(&attribute.key))
            .collect()
    }

    /// Builds a row for `attribute`, tagged according to its key.
    pub(crate) fn tag(&self, attribute: Attribute) -> Row {
        let protected = self.is_protected(&attribute.key);
        let inherited = self.is_inherited(&attribute.key);

        Row::new(attribute)
            .with_protected(protected)
            .with_inherited(inherited)
    }

    /// Produces the initial row set (without the trailing blank row) from the
    /// visible attributes:
    ///
    /// 1. every visible attribute of `initial`, in order,
    /// 2. inherited attributes missing from `initial`,
    /// 3. static default labels missing from `initial`, if the kind supports
    ///    them.
    pub fn initial_rows<K: AttributeKind>(&self, initial: Vec<Attribute>) -> Vec<Row> {
        let mut rows = self
            .visible(initial)
            .into_iter()
            .map(|attribute| self.tag(attribute))
            .collect::<Vec<_>>();

        let missing = |rows: &[Row], key: &str| {
            !self.is_hidden(key) && rows.iter().all(|row| row.key() != key)
        };

        for (key, value) in &self.inherited {
            if missing(rows.as_slice(), key.as_str()) {
                rows.push(self.tag(Attribute::new(key, value)));
            }
        }

        if K::STATIC_DEFAULTS {
            for label in self.static_labels.iter().filter(|label| label.default) {
                if missing(rows.as_slice(), label.key.as_str()) {
                    tracing::debug!(key = %label.key, kind = K::NAME, "adding static default");
                    let value = label.values.first().cloned().unwrap_or_default();
                    rows.push(self.tag(Attribute::new(&label.key, value)));
                }
            }
        }

        rows
    }
}
