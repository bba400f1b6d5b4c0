use crate::{
    kvp::{Attribute, TaintEffect},
    validation::{ErrorKind, ErrorSet},
};

/// A mutable, editor-local wrapper around an [`Attribute`].
///
/// Rows which are protected or inherited are [disabled](Row::is_disabled):
/// their fields cannot be edited and they cannot be deleted, but they are
/// still part of the emitted attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    attribute: Attribute,
    protected: bool,
    inherited: bool,
    errors: ErrorSet,

    /// Raw effect input which failed to parse, kept until the effect is
    /// edited again.
    rejected_effect: Option<String>,
}

impl Row {
    pub(crate) fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            ..Self::default()
        }
    }

    pub(crate) fn blank() -> Self {
        Self::default()
    }

    pub(crate) fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub(crate) fn with_inherited(mut self, inherited: bool) -> Self {
        self.inherited = inherited;
        self
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn key(&self) -> &str {
        &self.attribute.key
    }

    pub fn value(&self) -> &str {
        &self.attribute.value
    }

    pub fn effect(&self) -> Option<TaintEffect> {
        self.attribute.effect
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn is_disabled(&self) -> bool {
        self.protected || self.inherited
    }

    /// Returns `true` if no field has been filled in, including rejected
    /// effect input.
    pub fn is_blank(&self) -> bool {
        self.attribute.is_blank() && self.rejected_effect.is_none()
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn has_error(&self, kind: ErrorKind) -> bool {
        self.errors.contains(&kind)
    }

    pub(crate) fn attribute_mut(&mut self) -> &mut Attribute {
        &mut self.attribute
    }

    pub(crate) fn rejected_effect(&self) -> Option<&str> {
        self.rejected_effect.as_deref()
    }

    pub(crate) fn set_effect(&mut self, effect: Option<TaintEffect>, rejected: Option<String>) {
        self.attribute.effect = effect;
        self.rejected_effect = rejected;
    }

    pub(crate) fn set_errors(&mut self, errors: ErrorSet) {
        self.errors = errors;
    }
}
