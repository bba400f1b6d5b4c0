//! The stateful attribute list editor.
//!
//! The editor owns an ordered list of [`Row`]s and keeps exactly one blank row
//! at the end, which acts as the "add new entry" affordance. Hosts mutate rows
//! through [`AttributeListEditor::edit_key`] and friends (or write fields and
//! call [`AttributeListEditor::check`]), delete rows with
//! [`AttributeListEditor::delete`], and receive an owned [`Emission`] after
//! every mutation.
//!
//! ```
//! use std::collections::BTreeMap;
//! use stackable_kvp_editor::{
//!     editor::{EditorOptions, LabelEditor},
//!     patch,
//!     restriction::RestrictionPolicy,
//! };
//!
//! let initial = BTreeMap::from([
//!     ("env".to_owned(), "prod".to_owned()),
//!     ("team".to_owned(), "x".to_owned()),
//! ]);
//! let mut editor = LabelEditor::new(initial, RestrictionPolicy::new(), EditorOptions::default());
//!
//! // Rows: env, team, <blank>
//! editor.delete(1);
//! editor.edit_key(1, "tier");
//! editor.edit_value(1, "gold");
//!
//! assert!(editor.is_valid());
//! assert_eq!(
//!     patch::to_json(&editor.output()),
//!     serde_json::json!({"env": "prod", "tier": "gold", "team": null}),
//! );
//! ```
use std::{fmt::Debug, marker::PhantomData};

use serde::{Deserialize, Serialize};

use crate::{
    binding::AttributeBinding,
    kvp::{
        AnnotationKind, Attribute, AttributeKind, LabelKind, TaintEffect, TaintKind,
        validate_effect, validate_key,
    },
    patch::{self, Snapshot},
    restriction::RestrictionPolicy,
    validation::{ErrorKind, ErrorSet, Errors, RowError, ValidationResult},
};

mod row;
mod uniqueness;

pub use row::*;
pub use uniqueness::*;

pub type LabelEditor = AttributeListEditor<LabelKind>;
pub type AnnotationEditor = AttributeListEditor<AnnotationKind>;
pub type TaintEditor = AttributeListEditor<TaintKind>;

/// A callback receiving every [`Emission`] of an editor.
pub type Listener<T> = Box<dyn FnMut(&Emission<T>)>;

/// Host-supplied switches, fixed for the lifetime of an editor session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditorOptions {
    /// The host modifies an existing resource. Enables removed entry tracking
    /// and change highlighting.
    pub edit_context: bool,

    /// Report syntax, uniqueness and required errors. Disabled for read-only
    /// previews.
    pub validation_enabled: bool,

    /// Disallow any edits. No trailing blank row is kept.
    pub read_only: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            edit_context: false,
            validation_enabled: true,
            read_only: false,
        }
    }
}

/// An attribute which existed when the editor was opened and has since been
/// deleted by the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedEntry {
    pub key: String,
    pub value: String,
}

/// Everything the host needs after a mutation. All fields are owned copies.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Emission<T> {
    pub attributes: T,
    pub valid: bool,
    pub removed: Vec<RemovedEntry>,
}

/// Editor for a list of attributes of kind `K`.
///
/// See the [module documentation](self) for an example.
pub struct AttributeListEditor<K: AttributeKind> {
    rows: Vec<Row>,
    snapshot: Snapshot,
    policy: RestrictionPolicy,
    options: EditorOptions,
    removed: Vec<RemovedEntry>,

    /// The single externally claimed attribute, shown as a disabled row.
    pinned: Option<Attribute>,

    /// The normal row which was taken out of the list because it shares its
    /// key with `pinned`.
    displaced: Option<Row>,

    listeners: Vec<Listener<K::Output>>,
    kind: PhantomData<K>,
}

impl<K: AttributeKind> Debug for AttributeListEditor<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeListEditor")
            .field("kind", &K::NAME)
            .field("rows", &self.rows)
            .field("snapshot", &self.snapshot)
            .field("policy", &self.policy)
            .field("options", &self.options)
            .field("removed", &self.removed)
            .field("pinned", &self.pinned)
            .field("displaced", &self.displaced)
            .finish_non_exhaustive()
    }
}

impl<K: AttributeKind> AttributeListEditor<K> {
    /// Creates an editor for `initial`. Hidden attributes are dropped from
    /// both the rows and the snapshot, so they are never tombstoned.
    pub fn new(initial: K::Input, policy: RestrictionPolicy, options: EditorOptions) -> Self {
        let initial = policy.visible(K::into_attributes(initial));
        let rows = policy.initial_rows::<K>(initial.clone());

        let mut editor = Self {
            rows,
            snapshot: Snapshot::new(initial),
            policy,
            options,
            removed: Vec::new(),
            pinned: None,
            displaced: None,
            listeners: Vec::new(),
            kind: PhantomData,
        };

        editor.ensure_trailing_row();
        editor.revalidate();
        editor
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn pinned(&self) -> Option<&Attribute> {
        self.pinned.as_ref()
    }

    pub fn removed_entries(&self) -> &[RemovedEntry] {
        &self.removed
    }

    /// Returns the index of the trailing blank row, if there is one.
    pub fn trailing_index(&self) -> Option<usize> {
        let last = self.rows.last()?;
        (last.is_blank() && !last.is_disabled()).then(|| self.rows.len() - 1)
    }

    pub fn is_trailing(&self, index: usize) -> bool {
        self.trailing_index() == Some(index)
    }

    /// A row can be removed unless it is the trailing blank row, protected or
    /// inherited.
    pub fn is_removable(&self, index: usize) -> bool {
        match self.rows.get(index) {
            Some(row) => !self.options.read_only && !row.is_disabled() && !self.is_trailing(index),
            None => false,
        }
    }

    /// Returns whether the row differs from the value it had when the editor
    /// was opened. Always `false` outside of the edit context and for
    /// disabled rows, which users cannot change.
    pub fn is_changed(&self, index: usize) -> bool {
        self.options.edit_context
            && self.rows.get(index).is_some_and(|row| {
                !row.is_disabled() && patch::is_changed(row.attribute(), &self.snapshot)
            })
    }

    /// Sets the key of an enabled row and runs [`Self::check`]. Returns
    /// `false` if the row cannot be edited.
    pub fn edit_key(&mut self, index: usize, key: &str) -> bool {
        self.edit(index, |row| row.attribute_mut().key = key.to_owned())
    }

    /// Sets the value of an enabled row and runs [`Self::check`]. Returns
    /// `false` if the row cannot be edited.
    pub fn edit_value(&mut self, index: usize, value: &str) -> bool {
        self.edit(index, |row| row.attribute_mut().value = value.to_owned())
    }

    /// Sets the effect of an enabled row from raw user input and runs
    /// [`Self::check`]. Input which is not a valid [`TaintEffect`] is kept and
    /// reported as [`ErrorKind::InvalidEffect`]. Empty input clears the
    /// effect.
    pub fn edit_effect(&mut self, index: usize, effect: &str) -> bool {
        self.edit(index, |row| {
            if effect.is_empty() {
                row.set_effect(None, None);
            } else {
                match validate_effect(effect) {
                    Ok(effect) => row.set_effect(Some(effect), None),
                    Err(_) => row.set_effect(None, Some(effect.to_owned())),
                }
            }
        })
    }

    /// Like [`Self::edit_effect`], but with an already parsed effect.
    pub fn set_effect(&mut self, index: usize, effect: Option<TaintEffect>) -> bool {
        self.edit(index, |row| row.set_effect(effect, None))
    }

    fn edit(&mut self, index: usize, mutate: impl FnOnce(&mut Row)) -> bool {
        if self.options.read_only {
            tracing::debug!(index, kind = K::NAME, "ignoring edit of read-only editor");
            return false;
        }

        match self.rows.get_mut(index) {
            Some(row) if !row.is_disabled() => mutate(row),
            Some(_) => {
                tracing::debug!(index, kind = K::NAME, "ignoring edit of disabled row");
                return false;
            }
            None => {
                tracing::debug!(index, kind = K::NAME, "ignoring edit of unknown row");
                return false;
            }
        }

        self.check(index);
        true
    }

    /// Re-evaluates the editor after row `index` changed: keeps the trailing
    /// blank row in place, revalidates every row (duplicates can appear or
    /// disappear in other rows), evicts removed entries whose key is back and
    /// notifies listeners.
    pub fn check(&mut self, index: usize) {
        tracing::trace!(index, kind = K::NAME, "checking row");
        self.refresh();
    }

    /// Deletes row `index`, unless it is not [removable](Self::is_removable).
    /// Returns whether the row was deleted.
    ///
    /// In the edit context, deleting a row whose key existed when the editor
    /// was opened records a [`RemovedEntry`].
    pub fn delete(&mut self, index: usize) -> bool {
        if !self.is_removable(index) {
            tracing::debug!(index, kind = K::NAME, "refusing to delete row");
            return false;
        }

        let row = self.rows.remove(index);
        tracing::debug!(index, key = row.key(), kind = K::NAME, "deleted row");

        if self.options.edit_context
            && self.snapshot.contains_key(row.key())
            && !self.removed.iter().any(|entry| entry.key == row.key())
        {
            self.removed.push(RemovedEntry {
                key: row.key().to_owned(),
                value: row.value().to_owned(),
            });
        }

        self.refresh();
        true
    }

    /// Claims a key for an attribute managed elsewhere by the host.
    ///
    /// A normal row with the same key is taken out of the list without
    /// reporting a duplicate, and put back once the pinned attribute is
    /// cleared or moves to another key. The pinned attribute is part of the
    /// emitted attributes, unless its key is hidden, in which case it is
    /// ignored.
    pub fn set_pinned(&mut self, pinned: Option<Attribute>) {
        let pinned = pinned.filter(|pinned| {
            let hidden = self.policy.is_hidden(&pinned.key);
            if hidden {
                tracing::debug!(key = %pinned.key, kind = K::NAME, "ignoring pinned hidden key");
            }
            !hidden
        });

        if self.pinned == pinned {
            return;
        }

        self.restore_displaced();
        self.pinned = pinned;
        self.displace_pinned();
        self.refresh();
    }

    /// Switches between create and edit context. Removed entry tracking
    /// starts over, row errors are kept.
    pub fn set_edit_context(&mut self, edit_context: bool) {
        if self.options.edit_context == edit_context {
            return;
        }

        tracing::debug!(edit_context, kind = K::NAME, "edit context changed");
        self.options.edit_context = edit_context;
        self.removed.clear();
        self.notify();
    }

    /// The materialized attributes: the pinned attribute followed by every
    /// row with a non-empty key, including disabled rows.
    pub fn current_attributes(&self) -> Vec<Attribute> {
        self.pinned
            .iter()
            .chain(self.rows.iter().map(Row::attribute))
            .filter(|attribute| !attribute.key.is_empty())
            .cloned()
            .collect()
    }

    pub fn output(&self) -> K::Output {
        K::emit(&self.current_attributes(), &self.snapshot)
    }

    /// The editor is valid if validation is disabled, or if no row reports an
    /// error.
    pub fn is_valid(&self) -> bool {
        !self.options.validation_enabled || self.rows.iter().all(|row| row.errors().is_empty())
    }

    pub fn emission(&self) -> Emission<K::Output> {
        Emission {
            attributes: self.output(),
            valid: self.is_valid(),
            removed: self.removed.clone(),
        }
    }

    fn refresh(&mut self) {
        self.ensure_trailing_row();
        self.revalidate();
        self.evict_removed();
        self.notify();
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }

        let emission = self.emission();
        for listener in &mut self.listeners {
            listener(&emission);
        }
    }

    fn ensure_trailing_row(&mut self) {
        if self.options.read_only {
            return;
        }

        // Collapse blank rows at the end, which appear when the user clears
        // the last filled row.
        while let [.., before, last] = self.rows.as_slice() {
            if !(before.is_blank() && !before.is_disabled() && last.is_blank()) {
                break;
            }
            self.rows.pop();
        }

        let append = match self.rows.last() {
            None => true,
            Some(last) if last.is_disabled() => true,
            Some(last) => K::is_filled(last.attribute()),
        };

        if append {
            tracing::trace!(kind = K::NAME, "appending trailing blank row");
            self.rows.push(Row::blank());
        }
    }

    fn revalidate(&mut self) {
        let errors = (0..self.rows.len())
            .map(|index| self.row_errors(index))
            .collect::<Vec<_>>();

        for (row, errors) in self.rows.iter_mut().zip(errors) {
            row.set_errors(errors);
        }
    }

    fn row_errors(&self, index: usize) -> ErrorSet {
        let mut errors = ErrorSet::new();
        let row = &self.rows[index];

        if !self.options.validation_enabled || row.is_disabled() || self.is_trailing(index) {
            return errors;
        }

        let attribute = row.attribute();
        if attribute.key.is_empty() {
            errors.insert(ErrorKind::Required);
        } else {
            errors.extend(validate_key(&attribute.key));
        }

        if K::VALUE_REQUIRED && attribute.value.is_empty() {
            errors.insert(ErrorKind::Required);
        }
        errors.extend(K::validate_value(&attribute.value));

        if K::HAS_EFFECT {
            if row.rejected_effect().is_some() {
                errors.insert(ErrorKind::InvalidEffect);
            } else if attribute.effect.is_none() {
                errors.insert(ErrorKind::Required);
            }
        }

        if is_duplicate(&self.rows, index, self.pinned.as_ref()) {
            errors.insert(ErrorKind::DuplicateKey);
        }

        if !attribute.key.is_empty() && self.policy.is_forbidden(&attribute.key) {
            errors.insert(ErrorKind::ForbiddenKey);
        }

        errors
    }

    /// Drops removed entries whose key is present again.
    fn evict_removed(&mut self) {
        let rows = &self.rows;
        let pinned = self.pinned.as_ref();

        self.removed.retain(|entry| {
            let present = rows.iter().any(|row| row.key() == entry.key)
                || pinned.is_some_and(|pinned| pinned.key == entry.key);
            if present {
                tracing::debug!(key = %entry.key, "key was added back, no longer removed");
            }
            !present
        });
    }

    /// Replaces protected attributes in `attributes` with their snapshot
    /// version and appends the protected snapshot attributes which are
    /// missing.
    fn with_protected_snapshot(&self, attributes: Vec<Attribute>) -> Vec<Attribute> {
        let snapshot = &self.snapshot;
        let policy = &self.policy;

        let mut attributes = policy
            .visible(attributes)
            .into_iter()
            .map(|attribute| match snapshot.get(&attribute.key) {
                Some(initial) if policy.is_protected(&attribute.key) => initial.clone(),
                _ => attribute,
            })
            .collect::<Vec<_>>();

        for initial in snapshot.attributes() {
            if policy.is_protected(&initial.key)
                && attributes.iter().all(|attribute| attribute.key != initial.key)
            {
                tracing::debug!(
                    key = %initial.key,
                    kind = K::NAME,
                    "keeping protected attribute missing from external value"
                );
                attributes.push(initial.clone());
            }
        }

        attributes
    }

    fn displace_pinned(&mut self) {
        let Some(pinned) = &self.pinned else {
            return;
        };

        if let Some(index) = self
            .rows
            .iter()
            .position(|row| !row.is_disabled() && row.key() == pinned.key)
        {
            tracing::debug!(
                index,
                key = %pinned.key,
                kind = K::NAME,
                "pinned attribute displaces row"
            );
            self.displaced = Some(self.rows.remove(index));
        }
    }

    fn restore_displaced(&mut self) {
        if let Some(row) = self.displaced.take() {
            let index = self.trailing_index().unwrap_or(self.rows.len());
            tracing::debug!(index, key = row.key(), kind = K::NAME, "restoring displaced row");
            self.rows.insert(index, row);
        }
    }
}

impl<K: AttributeKind> AttributeBinding for AttributeListEditor<K> {
    type Output = K::Output;
    type Value = K::Input;

    /// Replaces all rows with `external`. The snapshot taken at construction
    /// is kept, so in the edit context every snapshot key missing from
    /// `external` is recorded as removed.
    ///
    /// Protected attributes of the snapshot survive unchanged, whether
    /// `external` omits them or carries a different value.
    fn set_value(&mut self, external: K::Input) {
        let attributes = self.with_protected_snapshot(K::into_attributes(external));
        self.rows = self.policy.initial_rows::<K>(attributes);
        self.displaced = None;
        self.displace_pinned();

        self.removed.clear();
        if self.options.edit_context {
            let rows = &self.rows;
            self.removed = self
                .snapshot
                .attributes()
                .iter()
                .filter(|initial| rows.iter().all(|row| row.key() != initial.key))
                .map(|initial| RemovedEntry {
                    key: initial.key.clone(),
                    value: initial.value.clone(),
                })
                .collect();
        }

        self.refresh();
    }

    fn on_value_change(&mut self, callback: Listener<K::Output>) {
        self.listeners.push(callback);
    }

    fn validate(&self) -> ValidationResult {
        let errors = self
            .rows
            .iter()
            .enumerate()
            .flat_map(|(index, row)| {
                row.errors().iter().map(move |&kind| RowError {
                    index,
                    key: row.key().to_owned(),
                    kind,
                })
            })
            .collect::<Errors>();

        if errors.is_empty() || !self.options.validation_enabled {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
