//! The seam between an editor and the form framework hosting it.
use crate::{editor::Listener, validation::ValidationResult};

/// A component which is bound to a value owned by a surrounding form.
///
/// The host pushes external values in with [`AttributeBinding::set_value`],
/// subscribes to changes with [`AttributeBinding::on_value_change`] and asks
/// for the current validation state with [`AttributeBinding::validate`].
pub trait AttributeBinding {
    /// The shape of values written by the host.
    type Value;

    /// The shape of values emitted to the host.
    type Output;

    /// Replaces the edited value without resetting the initial snapshot.
    fn set_value(&mut self, external: Self::Value);

    /// Registers a callback which is invoked after every mutation.
    fn on_value_change(&mut self, callback: Listener<Self::Output>);

    /// Returns every row error, or `Ok(())` if the value is valid.
    fn validate(&self) -> ValidationResult;
}
