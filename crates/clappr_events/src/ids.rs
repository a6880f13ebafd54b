//! Identity types used by the bus
//!
//! Bindings never hold a reference to the objects they connect. They only
//! store these identifiers, so a listener or an emitter can be dropped at any
//! time without leaving a dangling callback owner behind.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of an observable (or observing) object.
///
/// Every [`BaseObject`](crate::BaseObject) allocates one on construction. The
/// same id is used whether the object acts as an emitter or as a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Creates a new random object id using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a single binding.
///
/// Two registrations of the very same closure still produce two distinct
/// bindings, so this id is what stands in for "callback identity" when a
/// binding has to be removed on its own with [`EventBus::off`](crate::EventBus::off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingId(pub Uuid);

impl BindingId {
    /// Creates a new random binding id using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a binding id from its string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for BindingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id handed back to player-level subscribers by `on`.
pub type SubscriptionId = BindingId;
