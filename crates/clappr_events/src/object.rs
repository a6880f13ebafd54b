//! Observable objects

use crate::bus::{EventBus, UserInfo};
use crate::error::EventError;
use crate::ids::{BindingId, ObjectId};
use std::fmt;
use std::sync::Arc;

/// The identity and bus handle every observable object embeds.
///
/// A `BaseObject` can emit events, subscribe to itself with [`on`](Self::on)
/// and subscribe to other objects with [`listen_to`](Self::listen_to). When it
/// is dropped every binding it is part of is removed, on both the listener and
/// the emitter side.
pub struct BaseObject {
    id: ObjectId,
    bus: Arc<EventBus>,
}

impl BaseObject {
    /// Create a new object attached to `bus`
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            id: ObjectId::new(),
            bus,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Fire an event on this object
    pub fn trigger(&self, event: impl AsRef<str>, info: Option<&UserInfo>) {
        self.bus.trigger(self.id, event.as_ref(), info);
    }

    /// Subscribe to one of this object's own events
    pub fn on<F>(&self, event: impl AsRef<str>, callback: F) -> BindingId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bus.listen_to(self.id, self.id, event.as_ref(), callback)
    }

    /// Subscribe to the next occurrence of one of this object's own events
    pub fn once<F>(&self, event: impl AsRef<str>, callback: F) -> BindingId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bus.listen_to_once(self.id, self.id, event.as_ref(), callback)
    }

    /// Subscribe to an event of another object
    pub fn listen_to<E, F>(&self, emitter: &E, event: impl AsRef<str>, callback: F) -> BindingId
    where
        E: EventEmitter + ?Sized,
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bus
            .listen_to(self.id, emitter.object_id(), event.as_ref(), callback)
    }

    /// Subscribe to the next occurrence of an event of another object
    pub fn listen_to_once<E, F>(
        &self,
        emitter: &E,
        event: impl AsRef<str>,
        callback: F,
    ) -> BindingId
    where
        E: EventEmitter + ?Sized,
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bus
            .listen_to_once(self.id, emitter.object_id(), event.as_ref(), callback)
    }

    /// Remove one binding
    pub fn off(&self, binding: BindingId) -> bool {
        self.bus.off(binding)
    }

    /// Drop every binding this object registered as a listener
    pub fn stop_listening(&self) -> usize {
        self.bus.stop_listening(self.id)
    }

    /// Drop the bindings this object holds on `emitter`
    pub fn stop_listening_to(&self, emitter: ObjectId) -> usize {
        self.bus.stop_listening_to(self.id, emitter, None)
    }
}

impl fmt::Debug for BaseObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseObject").field("id", &self.id).finish()
    }
}

impl Drop for BaseObject {
    fn drop(&mut self) {
        self.bus.stop_listening(self.id);
        self.bus.remove_emitter(self.id);
    }
}

/// Anything that embeds a [`BaseObject`] and can therefore be observed.
pub trait EventEmitter {
    fn base(&self) -> &BaseObject;

    fn object_id(&self) -> ObjectId {
        self.base().id()
    }
}

impl EventEmitter for BaseObject {
    fn base(&self) -> &BaseObject {
        self
    }
}
