//! Computes the delta the editor emits to its host.
//!
//! Labels and annotations are persisted with a JSON merge patch
//! ([RFC 7396](https://www.rfc-editor.org/rfc/rfc7396)). Keys which are absent
//! from a merge patch are left untouched by the server, so every key that
//! existed initially but has been removed must be sent as an explicit `null`
//! tombstone.
use std::collections::BTreeMap;

use serde_json::Value;
use snafu::{ResultExt, Snafu};

use crate::kvp::{Attribute, to_map};

type Result<T, E = Error> = std::result::Result<T, E>;

/// A merge patch for a string map. [`None`] values serialize to `null` and
/// mark keys which should be removed.
pub type MergePatch = BTreeMap<String, Option<String>>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize map to JSON"))]
    SerializeMap { source: serde_json::Error },

    #[snafu(display("merge patch produced a document which is not a string map"))]
    DeserializePatched { source: serde_json::Error },
}

/// An immutable copy of the attributes as they existed when the editor was
/// constructed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot(Vec<Attribute>);

impl Snapshot {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self(attributes)
    }

    /// Returns the first attribute recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.0.iter().find(|attribute| attribute.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.0
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        to_map(&self.0)
    }
}

/// Computes the merge patch turning `initial` into `current`.
///
/// Every entry of `current` is included verbatim, even if it didn't change.
/// Every key of `initial` which is missing in `current` is added as a `null`
/// tombstone. A missing `initial` map is treated as empty.
///
/// ```
/// use std::collections::BTreeMap;
/// use stackable_kvp_editor::patch::diff;
///
/// let initial = BTreeMap::from([
///     ("env".to_owned(), "prod".to_owned()),
///     ("team".to_owned(), "x".to_owned()),
/// ]);
/// let current = BTreeMap::from([
///     ("env".to_owned(), "prod".to_owned()),
///     ("tier".to_owned(), "gold".to_owned()),
/// ]);
///
/// let patch = diff(&current, Some(&initial));
/// assert_eq!(patch.get("team"), Some(&None));
/// assert_eq!(patch.get("tier"), Some(&Some("gold".to_owned())));
/// ```
pub fn diff(
    current: &BTreeMap<String, String>,
    initial: Option<&BTreeMap<String, String>>,
) -> MergePatch {
    let mut patch = current
        .iter()
        .map(|(key, value)| (key.clone(), Some(value.clone())))
        .collect::<MergePatch>();

    for key in initial.into_iter().flat_map(BTreeMap::keys) {
        if !current.contains_key(key) {
            patch.insert(key.clone(), None);
        }
    }

    patch
}

/// Returns whether `attribute` differs from the value recorded for the same
/// key in `snapshot`.
///
/// Attributes with a key that doesn't exist in the snapshot count as changed,
/// unless the key is empty.
pub fn is_changed(attribute: &Attribute, snapshot: &Snapshot) -> bool {
    if attribute.key.is_empty() {
        return false;
    }

    match snapshot.get(&attribute.key) {
        Some(initial) => initial.value != attribute.value || initial.effect != attribute.effect,
        None => true,
    }
}

/// Renders `patch` as a JSON object, with tombstones as `null`.
pub fn to_json(patch: &MergePatch) -> Value {
    Value::Object(
        patch
            .iter()
            .map(|(key, value)| {
                let value = value.clone().map_or(Value::Null, Value::String);
                (key.clone(), value)
            })
            .collect(),
    )
}

/// Applies `patch` to `base` with merge patch semantics, as the API server
/// would.
pub fn apply(
    base: &BTreeMap<String, String>,
    patch: &MergePatch,
) -> Result<BTreeMap<String, String>> {
    let mut document = serde_json::to_value(base).context(SerializeMapSnafu)?;
    json_patch::merge(&mut document, &to_json(patch));
    serde_json::from_value(document).context(DeserializePatchedSnafu)
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::kvp::TaintEffect;

    fn map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> BTreeMap<String, String> {
        pairs
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect()
    }

    #[test]
    fn tombstones_removed_keys() {
        let initial = map([("env", "prod"), ("team", "x")]);
        let current = map([("env", "prod"), ("tier", "gold")]);

        let patch = diff(&current, Some(&initial));

        assert_eq!(
            to_json(&patch),
            json!({"env": "prod", "tier": "gold", "team": null})
        );
    }

    #[test]
    fn self_diff_has_no_tombstones() {
        let initial = map([("env", "prod"), ("team", "x")]);

        let patch = diff(&initial, Some(&initial));

        assert!(patch.values().all(Option::is_some));
        assert_eq!(apply(&initial, &patch).unwrap(), initial);
        assert_eq!(to_json(&patch), json!({"env": "prod", "team": "x"}));
    }

    #[test]
    fn missing_initial_is_empty() {
        let current = map([("a", "1")]);

        let patch = diff(&current, None);

        assert_eq!(to_json(&patch), json!({"a": "1"}));
    }

    #[test]
    fn removing_everything() {
        let initial = map([("a", "1"), ("b", "2")]);

        let patch = diff(&BTreeMap::new(), Some(&initial));

        assert_eq!(to_json(&patch), json!({"a": null, "b": null}));
        assert_eq!(apply(&initial, &patch).unwrap(), BTreeMap::new());
    }

    #[test]
    fn apply_reproduces_current() {
        let initial = map([("env", "prod"), ("team", "x"), ("zone", "eu")]);
        let current = map([("env", "staging"), ("zone", "eu"), ("tier", "gold")]);

        let patch = diff(&current, Some(&initial));

        assert_eq!(apply(&initial, &patch).unwrap(), current);
    }

    #[rstest]
    #[case(Attribute::new("env", "prod"), false)]
    #[case(Attribute::new("env", "staging"), true)]
    #[case(Attribute::new("tier", "gold"), true)]
    #[case(Attribute::new("", ""), false)]
    #[case(Attribute::taint("dedicated", "gpu", TaintEffect::NoSchedule), false)]
    #[case(Attribute::taint("dedicated", "gpu", TaintEffect::NoExecute), true)]
    fn changed(#[case] attribute: Attribute, #[case] expected: bool) {
        let snapshot = Snapshot::new(vec![
            Attribute::new("env", "prod"),
            Attribute::taint("dedicated", "gpu", TaintEffect::NoSchedule),
        ]);

        assert_eq!(is_changed(&attribute, &snapshot), expected);
    }
}
