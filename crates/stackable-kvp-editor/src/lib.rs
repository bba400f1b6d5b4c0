//! An editor for Kubernetes labels, annotations and taints.
//!
//! The crate models the state behind an editable list of key/value entries:
//!
//! - [`kvp`] contains the attribute types and the Kubernetes syntax rules for
//!   keys, values and taint effects.
//! - [`restriction`] decides which keys users may see, change or introduce.
//! - [`editor`] holds the rows, keeps a blank row for new entries, validates
//!   every row and emits the result after each mutation.
//! - [`patch`] turns the edited attributes into a JSON merge patch, including
//!   `null` tombstones for removed keys.
//! - [`binding`] is the seam to the form framework hosting an editor.

pub mod binding;
pub mod editor;
pub mod kvp;
pub mod patch;
pub mod restriction;
pub mod validation;
