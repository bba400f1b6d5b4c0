use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::validation::{ErrorKind, InvalidEffectSnafu};

/// The effect of a node taint on pods that do not tolerate it.
///
/// See <https://kubernetes.io/docs/concepts/scheduling-eviction/taint-and-toleration/>.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

/// Parses `effect`, which must be one of the literals `NoSchedule`,
/// `PreferNoSchedule` or `NoExecute` (case-sensitive).
pub fn validate_effect(effect: &str) -> Result<TaintEffect, ErrorKind> {
    effect.parse().map_err(|_| InvalidEffectSnafu.build())
}
