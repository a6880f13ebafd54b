//! Plugin context and dependency injection

use crate::options::Options;
use clappr_events::EventBus;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What every component of one player is constructed with: the shared bus,
/// the options bag and any collaborator a host chose to provide.
pub struct PluginContext {
    bus: Arc<EventBus>,
    options: Arc<Options>,
    providers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PluginContext {
    pub fn new(bus: Arc<EventBus>, options: Options) -> Self {
        Self {
            bus,
            options: Arc::new(options),
            providers: HashMap::new(),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    /// Add a context provider. A provider of the same type is replaced.
    pub fn add_provider<T: Send + Sync + 'static>(&mut self, provider: T) {
        self.providers.insert(TypeId::of::<T>(), Box::new(provider));
    }

    /// Get a context provider
    pub fn get_provider<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.providers.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }

    pub fn has_provider<T: Send + Sync + 'static>(&self) -> bool {
        self.providers.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("options", &self.options)
            .field("providers", &self.providers.len())
            .finish()
    }
}
