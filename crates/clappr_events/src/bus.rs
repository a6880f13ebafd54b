//! Binding registry with synchronous, snapshot-based dispatch

use crate::error::EventError;
use crate::ids::{BindingId, ObjectId};
use compact_str::CompactString;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, trace};

/// Payload attached to an event.
pub type UserInfo = Map<String, Value>;

/// Callback stored in a binding.
pub type EventCallback =
    Arc<dyn Fn(Option<&UserInfo>) -> Result<(), EventError> + Send + Sync + 'static>;

/// A single subscription linking a listener, an emitter, an event name and a callback.
#[derive(Clone)]
pub struct Binding {
    /// Binding identity
    pub id: BindingId,
    /// Object that registered the binding
    pub listener: ObjectId,
    /// Object whose events are observed
    pub emitter: ObjectId,
    /// Event name
    pub event_name: CompactString,
    /// Removed right before its first invocation when set
    pub once: bool,
    callback: EventCallback,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("listener", &self.listener)
            .field("emitter", &self.emitter)
            .field("event_name", &self.event_name)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

/// Statistics for event system monitoring
#[derive(Debug, Clone, Default)]
pub struct EventStats {
    pub events_emitted: u64,
    pub events_handled: u64,
    pub handler_failures: u64,
    pub total_bindings: usize,
}

type EventIndex = HashMap<CompactString, SmallVec<[BindingId; 4]>>;

#[derive(Default)]
struct Registry {
    bindings: HashMap<BindingId, Binding>,
    /// emitter -> event name -> bindings in registration order
    by_emitter: HashMap<ObjectId, EventIndex>,
    by_listener: HashMap<ObjectId, HashSet<BindingId>>,
    stats: EventStats,
}

impl Registry {
    fn insert(&mut self, binding: Binding) -> BindingId {
        let id = binding.id;
        self.by_emitter
            .entry(binding.emitter)
            .or_default()
            .entry(binding.event_name.clone())
            .or_default()
            .push(id);
        self.by_listener
            .entry(binding.listener)
            .or_default()
            .insert(id);
        self.bindings.insert(id, binding);
        self.stats.total_bindings = self.bindings.len();
        id
    }

    fn remove(&mut self, id: BindingId) -> Option<Binding> {
        let binding = self.bindings.remove(&id)?;

        if let Some(events) = self.by_emitter.get_mut(&binding.emitter) {
            if let Some(ids) = events.get_mut(&binding.event_name) {
                ids.retain(|candidate| *candidate != id);
                if ids.is_empty() {
                    events.remove(&binding.event_name);
                }
            }
            if events.is_empty() {
                self.by_emitter.remove(&binding.emitter);
            }
        }

        if let Some(ids) = self.by_listener.get_mut(&binding.listener) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_listener.remove(&binding.listener);
            }
        }

        self.stats.total_bindings = self.bindings.len();
        Some(binding)
    }

    fn remove_all(&mut self, ids: Vec<BindingId>) -> usize {
        ids.into_iter().filter_map(|id| self.remove(id)).count()
    }
}

/// Event bus shared by every object of one player.
///
/// The bus owns every binding. Emitters and listeners are referred to only by
/// their [`ObjectId`], and two reverse indices allow either side to drop all
/// of its bindings without scanning the whole registry.
///
/// Dispatch is synchronous. The registry lock is released before any callback
/// runs, so callbacks are free to subscribe, unsubscribe or trigger further
/// events on the same bus.
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("bindings", &self.binding_count())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Create an empty bus behind an `Arc`, the form objects share it in
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `callback` to `event_name` fired by `emitter`, on behalf of `listener`.
    pub fn listen_to<F>(
        &self,
        listener: ObjectId,
        emitter: ObjectId,
        event_name: &str,
        callback: F,
    ) -> BindingId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bind(listener, emitter, event_name, Arc::new(callback), false)
    }

    /// Like [`listen_to`](Self::listen_to), but the binding is dropped before it first fires.
    pub fn listen_to_once<F>(
        &self,
        listener: ObjectId,
        emitter: ObjectId,
        event_name: &str,
        callback: F,
    ) -> BindingId
    where
        F: Fn(Option<&UserInfo>) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bind(listener, emitter, event_name, Arc::new(callback), true)
    }

    /// Register an already shared callback
    pub fn bind(
        &self,
        listener: ObjectId,
        emitter: ObjectId,
        event_name: &str,
        callback: EventCallback,
        once: bool,
    ) -> BindingId {
        let binding = Binding {
            id: BindingId::new(),
            listener,
            emitter,
            event_name: CompactString::new(event_name),
            once,
            callback,
        };
        let id = self.registry().insert(binding);
        trace!("📝 Bound {} on {} for listener {}", event_name, emitter, listener);
        id
    }

    /// Remove a single binding. Returns whether it was still registered.
    pub fn off(&self, id: BindingId) -> bool {
        self.registry().remove(id).is_some()
    }

    /// Remove every binding registered by `listener`, whatever the emitter.
    pub fn stop_listening(&self, listener: ObjectId) -> usize {
        let mut registry = self.registry();
        let ids: Vec<BindingId> = registry
            .by_listener
            .get(&listener)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        let removed = registry.remove_all(ids);
        if removed > 0 {
            debug!("🔇 {} stopped listening ({} bindings)", listener, removed);
        }
        removed
    }

    /// Remove the bindings `listener` holds on `emitter`, optionally only for one event.
    pub fn stop_listening_to(
        &self,
        listener: ObjectId,
        emitter: ObjectId,
        event_name: Option<&str>,
    ) -> usize {
        let mut registry = self.registry();
        let ids: Vec<BindingId> = match registry.by_listener.get(&listener) {
            Some(ids) => ids
                .iter()
                .filter(|id| {
                    registry.bindings.get(id).is_some_and(|binding| {
                        binding.emitter == emitter
                            && event_name.map_or(true, |name| binding.event_name == name)
                    })
                })
                .copied()
                .collect(),
            None => return 0,
        };
        registry.remove_all(ids)
    }

    /// Remove every binding that observes `emitter`. Called when the emitter goes away.
    pub fn remove_emitter(&self, emitter: ObjectId) -> usize {
        let mut registry = self.registry();
        let ids: Vec<BindingId> = registry
            .by_emitter
            .get(&emitter)
            .map(|events| events.values().flatten().copied().collect())
            .unwrap_or_default();
        registry.remove_all(ids)
    }

    /// Fire `event_name` on `emitter`.
    ///
    /// Callbacks run in registration order against a snapshot taken when the
    /// dispatch starts: bindings added meanwhile wait for the next trigger and
    /// bindings removed before being reached are skipped. Failing or panicking
    /// callbacks are logged and do not stop the dispatch.
    pub fn trigger(&self, emitter: ObjectId, event_name: &str, info: Option<&UserInfo>) {
        let snapshot: SmallVec<[BindingId; 8]> = {
            let mut registry = self.registry();
            let ids: SmallVec<[BindingId; 8]> = registry
                .by_emitter
                .get(&emitter)
                .and_then(|events| events.get(event_name))
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default();
            if ids.is_empty() {
                trace!("No bindings for {} on {}", event_name, emitter);
                return;
            }
            registry.stats.events_emitted += 1;
            ids
        };

        debug!("📤 Triggering {} on {} to {} bindings", event_name, emitter, snapshot.len());

        for id in snapshot {
            let callback = {
                let mut registry = self.registry();
                let (callback, once) = match registry.bindings.get(&id) {
                    Some(binding) => (binding.callback.clone(), binding.once),
                    None => continue,
                };
                if once {
                    registry.remove(id);
                }
                callback
            };

            let failed = match catch_unwind(AssertUnwindSafe(|| callback(info))) {
                Ok(Ok(())) => false,
                Ok(Err(e)) => {
                    error!("❌ Handler for {} on {} failed: {}", event_name, emitter, e);
                    true
                }
                Err(panic_info) => {
                    let e = EventError::Panicked(panic_message(panic_info));
                    error!("❌ Handler for {} on {} failed: {}", event_name, emitter, e);
                    true
                }
            };

            let mut registry = self.registry();
            if failed {
                registry.stats.handler_failures += 1;
            } else {
                registry.stats.events_handled += 1;
            }
        }
    }

    /// Whether anything currently observes `event_name` on `emitter`
    pub fn has_bindings(&self, emitter: ObjectId, event_name: &str) -> bool {
        self.registry()
            .by_emitter
            .get(&emitter)
            .and_then(|events| events.get(event_name))
            .is_some_and(|ids| !ids.is_empty())
    }

    /// Total number of live bindings
    pub fn binding_count(&self) -> usize {
        self.registry().bindings.len()
    }

    /// Number of bindings registered by `listener`
    pub fn listener_binding_count(&self, listener: ObjectId) -> usize {
        self.registry()
            .by_listener
            .get(&listener)
            .map_or(0, HashSet::len)
    }

    /// Number of bindings observing `emitter`
    pub fn emitter_binding_count(&self, emitter: ObjectId) -> usize {
        self.registry()
            .by_emitter
            .get(&emitter)
            .map_or(0, |events| events.values().map(SmallVec::len).sum())
    }

    /// Get current statistics
    pub fn stats(&self) -> EventStats {
        self.registry().stats.clone()
    }
}

fn panic_message(panic_info: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
