//! Plugin traits and the per-scope plugin registry

use crate::container::Container;
use crate::core::Core;
use crate::error::PluginError;
use crate::playback::Playback;
use crate::view::View;
use clappr_events::EventEmitter;
use compact_str::CompactString;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Where a plugin lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    /// Attached to the core, follows the active container
    Core,
    /// Attached to a container, follows its playback
    Container,
    /// A container plugin that also renders into the container view
    UiContainer,
}

/// Behavior shared by every plugin, whatever its scope.
///
/// Plugins are identified by [`plugin_name`](Self::plugin_name), unique within
/// the registry they are added to.
pub trait Plugin: EventEmitter + Send + Sync + 'static {
    fn plugin_name(&self) -> &str;

    fn kind(&self) -> PluginKind;

    /// View the plugin renders into, if it renders at all
    fn view(&self) -> Option<&Arc<View>> {
        None
    }

    fn render(&self) {}

    /// Drop every binding the plugin holds
    fn destroy(&self) {
        self.base().stop_listening();
    }
}

/// Compile-time identity of a plugin type, used for presence checks by type.
pub trait NamedPlugin {
    const NAME: &'static str;
}

/// A plugin attached to the core
pub trait CorePlugin: Plugin {
    /// Called once when the plugin is added to a core
    fn bind_core(&self, _core: &Arc<Core>) {}

    /// Called with the active container, again every time it changes.
    /// Bindings on the previous container are already gone at that point.
    fn bind_container(&self, _container: &Arc<Container>) {}
}

/// A plugin attached to a container
pub trait ContainerPlugin: Plugin {
    /// Called once when the plugin is added to a container
    fn bind_container(&self, container: &Arc<Container>);

    /// Called with the container's playback, again after every load.
    /// Bindings on the previous playback are already gone at that point.
    fn bind_playback(&self, _playback: &Arc<dyn Playback>) {}
}

struct Registered<P: ?Sized> {
    order: u64,
    plugin: Arc<P>,
}

/// Name-keyed plugin registry of one scope.
///
/// A plugin whose name is already taken is rejected and the registry is left
/// unchanged. Iteration follows insertion order.
pub struct PluginRegistry<P: ?Sized> {
    plugins: DashMap<CompactString, Registered<P>>,
    sequence: AtomicU64,
}

impl<P: ?Sized> Default for PluginRegistry<P> {
    fn default() -> Self {
        Self {
            plugins: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }
}

impl<P: Plugin + ?Sized> PluginRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin under its own name
    pub fn add(&self, plugin: Arc<P>) -> Result<(), PluginError> {
        let name = CompactString::new(plugin.plugin_name());
        match self.plugins.entry(name) {
            Entry::Occupied(entry) => Err(PluginError::AlreadyExists(entry.key().to_string())),
            Entry::Vacant(entry) => {
                debug!("🔌 Registered plugin {}", entry.key());
                let order = self.sequence.fetch_add(1, Ordering::Relaxed);
                entry.insert(Registered { order, plugin });
                Ok(())
            }
        }
    }

    /// Unregister a plugin, handing it back to the caller
    pub fn remove(&self, name: &str) -> Result<Arc<P>, PluginError> {
        self.plugins
            .remove(name)
            .map(|(_, registered)| registered.plugin)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<Arc<P>> {
        self.plugins.get(name).map(|entry| entry.plugin.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Presence check by logical identity
    pub fn contains_type<T: NamedPlugin>(&self) -> bool {
        self.contains(T::NAME)
    }

    /// Snapshot of every plugin, in insertion order
    pub fn all(&self) -> Vec<Arc<P>> {
        let mut plugins: Vec<(u64, Arc<P>)> = self
            .plugins
            .iter()
            .map(|entry| (entry.order, entry.plugin.clone()))
            .collect();
        plugins.sort_by_key(|(order, _)| *order);
        plugins.into_iter().map(|(_, plugin)| plugin).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.all()
            .iter()
            .map(|plugin| plugin.plugin_name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Empty the registry, handing every plugin back in insertion order
    pub fn drain(&self) -> Vec<Arc<P>> {
        let plugins = self.all();
        self.plugins.clear();
        plugins
    }
}

impl<P: Plugin + ?Sized> fmt::Debug for PluginRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
