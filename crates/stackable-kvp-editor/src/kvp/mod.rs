//! Kubernetes attribute types (labels, annotations and taints) and the syntax
//! rules their keys, values and effects must follow.
//!
//! The editor is generic over an [`AttributeKind`], which captures the few
//! differences between the three variants: which fields are required, how the
//! value is validated and what shape the editor emits to its host.
use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{
    patch::{self, MergePatch, Snapshot},
    validation::ErrorSet,
};

mod key;
mod taint;
mod value;

pub use key::*;
pub use taint::*;
pub use value::*;

/// A single, unvalidated key/value(/effect) entry as edited by the user.
///
/// `effect` is only used by taints and is skipped during serialization when
/// absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,

    #[serde(default)]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<TaintEffect>,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            effect: None,
        }
    }

    pub fn taint(key: impl Into<String>, value: impl Into<String>, effect: TaintEffect) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            effect: Some(effect),
        }
    }

    /// Returns `true` if no field has been filled in.
    pub fn is_blank(&self) -> bool {
        self.key.is_empty() && self.value.is_empty() && self.effect.is_none()
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)?;
        if let Some(effect) = self.effect {
            write!(f, ":{effect}")?;
        }
        Ok(())
    }
}

/// Collects `attributes` into a map, skipping entries without a key. Later
/// entries win if a key appears multiple times.
pub fn to_map<'a>(attributes: impl IntoIterator<Item = &'a Attribute>) -> BTreeMap<String, String> {
    attributes
        .into_iter()
        .filter(|attribute| !attribute.key.is_empty())
        .map(|attribute| (attribute.key.clone(), attribute.value.clone()))
        .collect()
}

/// The strategy describing one attribute variant.
///
/// See [`LabelKind`], [`AnnotationKind`] and [`TaintKind`] for the
/// implementations used by the console.
pub trait AttributeKind {
    /// The shape of the initial data supplied by the host.
    type Input;

    /// The shape emitted to the host after every mutation.
    type Output: Clone + std::fmt::Debug + PartialEq + Serialize;

    /// Human-readable name, used in log messages.
    const NAME: &'static str;

    /// Whether a filled row must carry a non-empty value.
    const VALUE_REQUIRED: bool;

    /// Whether rows carry a [`TaintEffect`], which is then required.
    const HAS_EFFECT: bool = false;

    /// Whether statically configured default entries are synthesized.
    const STATIC_DEFAULTS: bool = false;

    fn into_attributes(input: Self::Input) -> Vec<Attribute>;

    /// Validates the value field of a row.
    fn validate_value(value: &str) -> ErrorSet;

    /// Produces the host-facing output from the materialized rows.
    fn emit(current: &[Attribute], snapshot: &Snapshot) -> Self::Output;

    /// Returns `true` if every required field of `attribute` is filled in.
    fn is_filled(attribute: &Attribute) -> bool {
        !attribute.key.is_empty()
            && (!Self::VALUE_REQUIRED || !attribute.value.is_empty())
            && (!Self::HAS_EFFECT || attribute.effect.is_some())
    }
}

/// Kubernetes labels. Values follow the label value syntax and are required.
/// Emits a [`MergePatch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LabelKind;

impl AttributeKind for LabelKind {
    type Input = BTreeMap<String, String>;
    type Output = MergePatch;

    const NAME: &'static str = "label";
    const STATIC_DEFAULTS: bool = true;
    const VALUE_REQUIRED: bool = true;

    fn into_attributes(input: Self::Input) -> Vec<Attribute> {
        input
            .into_iter()
            .map(|(key, value)| Attribute::new(key, value))
            .collect()
    }

    fn validate_value(value: &str) -> ErrorSet {
        validate_label_value(value)
    }

    fn emit(current: &[Attribute], snapshot: &Snapshot) -> Self::Output {
        patch::diff(&to_map(current), Some(&snapshot.to_map()))
    }
}

/// Kubernetes annotations. Values can contain any UTF-8 data and may be empty.
/// Emits a [`MergePatch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnotationKind;

impl AttributeKind for AnnotationKind {
    type Input = BTreeMap<String, String>;
    type Output = MergePatch;

    const NAME: &'static str = "annotation";
    const VALUE_REQUIRED: bool = false;

    fn into_attributes(input: Self::Input) -> Vec<Attribute> {
        LabelKind::into_attributes(input)
    }

    fn validate_value(_value: &str) -> ErrorSet {
        ErrorSet::new()
    }

    fn emit(current: &[Attribute], snapshot: &Snapshot) -> Self::Output {
        patch::diff(&to_map(current), Some(&snapshot.to_map()))
    }
}

/// Node taints. Values follow the label value syntax but may be empty, the
/// effect is required.
///
/// Taints are a list in the Kubernetes API, and JSON merge patches replace
/// lists as a whole, so the full current list is emitted instead of a keyed
/// patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaintKind;

impl AttributeKind for TaintKind {
    type Input = Vec<Attribute>;
    type Output = Vec<Attribute>;

    const HAS_EFFECT: bool = true;
    const NAME: &'static str = "taint";
    const VALUE_REQUIRED: bool = false;

    fn into_attributes(input: Self::Input) -> Vec<Attribute> {
        input
    }

    fn validate_value(value: &str) -> ErrorSet {
        validate_label_value(value)
    }

    fn emit(current: &[Attribute], _snapshot: &Snapshot) -> Self::Output {
        current
            .iter()
            .filter(|attribute| !attribute.key.is_empty())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Attribute::new("env", "prod"), "env=prod")]
    #[case(Attribute::new("team", ""), "team=")]
    #[case(
        Attribute::taint("dedicated", "gpu", TaintEffect::NoSchedule),
        "dedicated=gpu:NoSchedule"
    )]
    fn display(#[case] attribute: Attribute, #[case] expected: &str) {
        assert_eq!(attribute.to_string(), expected);
    }

    #[rstest]
    #[case(Attribute::new("env", "prod"), true, true, false)]
    #[case(Attribute::new("env", ""), false, true, false)]
    #[case(Attribute::new("", "prod"), false, false, false)]
    #[case(
        Attribute::taint("dedicated", "", TaintEffect::NoExecute),
        false,
        true,
        true
    )]
    fn is_filled(
        #[case] attribute: Attribute,
        #[case] label: bool,
        #[case] annotation: bool,
        #[case] taint: bool,
    ) {
        assert_eq!(LabelKind::is_filled(&attribute), label);
        assert_eq!(AnnotationKind::is_filled(&attribute), annotation);
        assert_eq!(TaintKind::is_filled(&attribute), taint);
    }

    #[test]
    fn annotation_values_are_unrestricted() {
        assert!(AnnotationKind::validate_value("Stäckable / any text").is_empty());
        assert!(!LabelKind::validate_value("Stäckable / any text").is_empty());
    }

    #[test]
    fn taints_deserialize_from_yaml() {
        let taints: Vec<Attribute> = serde_yaml::from_str(indoc::indoc! {"
            - key: dedicated
              value: gpu
              effect: NoSchedule
            - key: maintenance
              effect: NoExecute
        "})
        .expect("test YAML is valid");

        assert_eq!(
            taints,
            vec![
                Attribute::taint("dedicated", "gpu", TaintEffect::NoSchedule),
                Attribute::taint("maintenance", "", TaintEffect::NoExecute),
            ]
        );
    }

    #[test]
    fn to_map_skips_blank_keys() {
        let map = to_map(&[
            Attribute::new("env", "prod"),
            Attribute::new("", "orphan"),
            Attribute::new("team", "x"),
        ]);

        assert_eq!(
            map,
            BTreeMap::from([
                ("env".to_owned(), "prod".to_owned()),
                ("team".to_owned(), "x".to_owned()),
            ])
        );
    }
}
