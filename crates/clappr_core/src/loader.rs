//! Plugin manifest
//!
//! The loader merges the host's external plugins with the built-in ones and
//! builds fresh instances on demand. External playbacks are consulted before
//! the built-in ones, and an external plugin named like a built-in one
//! replaces it.

use crate::context::PluginContext;
use crate::playback::{MediaPlaybackFactory, NoOpPlaybackFactory, Playback, PlaybackFactory};
use crate::plugin::{ContainerPlugin, CorePlugin, NamedPlugin, Plugin};
use crate::poster::PosterPlugin;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Simple plugin factory that wraps a constructor function
pub struct SimplePluginFactory<P: ?Sized> {
    name: &'static str,
    constructor: Box<dyn Fn(&PluginContext) -> Arc<P> + Send + Sync>,
}

impl<P: Plugin + ?Sized> SimplePluginFactory<P> {
    pub fn new<F>(name: &'static str, constructor: F) -> Self
    where
        F: Fn(&PluginContext) -> Arc<P> + Send + Sync + 'static,
    {
        Self {
            name,
            constructor: Box::new(constructor),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn create(&self, context: &PluginContext) -> Arc<P> {
        (self.constructor)(context)
    }
}

impl<P: ?Sized> fmt::Debug for SimplePluginFactory<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimplePluginFactory")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One entry of a plugin manifest
#[derive(Clone)]
pub enum PluginFactory {
    Playback(Arc<dyn PlaybackFactory>),
    Core(Arc<SimplePluginFactory<dyn CorePlugin>>),
    Container(Arc<SimplePluginFactory<dyn ContainerPlugin>>),
}

impl PluginFactory {
    pub fn playback<F: PlaybackFactory + 'static>(factory: F) -> Self {
        PluginFactory::Playback(Arc::new(factory))
    }

    pub fn core<T, F>(constructor: F) -> Self
    where
        T: CorePlugin + NamedPlugin,
        F: Fn(&PluginContext) -> Arc<T> + Send + Sync + 'static,
    {
        PluginFactory::Core(Arc::new(SimplePluginFactory::new(T::NAME, move |context| {
            constructor(context) as Arc<dyn CorePlugin>
        })))
    }

    pub fn container<T, F>(constructor: F) -> Self
    where
        T: ContainerPlugin + NamedPlugin,
        F: Fn(&PluginContext) -> Arc<T> + Send + Sync + 'static,
    {
        PluginFactory::Container(Arc::new(SimplePluginFactory::new(T::NAME, move |context| {
            constructor(context) as Arc<dyn ContainerPlugin>
        })))
    }

    pub fn name(&self) -> &str {
        match self {
            PluginFactory::Playback(factory) => factory.name(),
            PluginFactory::Core(factory) => factory.name(),
            PluginFactory::Container(factory) => factory.name(),
        }
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self {
            PluginFactory::Playback(_) => "Playback",
            PluginFactory::Core(_) => "Core",
            PluginFactory::Container(_) => "Container",
        };
        f.debug_tuple(scope).field(&self.name()).finish()
    }
}

/// Merge `external` into `defaults`: externals first, same-name built-ins dropped
fn merge<T>(external: Vec<T>, defaults: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(external.len() + defaults.len());
    for entry in external.into_iter().chain(defaults) {
        if merged.iter().any(|kept| name(kept) == name(&entry)) {
            debug!("Skipping shadowed plugin {}", name(&entry));
            continue;
        }
        merged.push(entry);
    }
    merged
}

/// The resolved plugin manifest of one player
pub struct Loader {
    playbacks: Vec<Arc<dyn PlaybackFactory>>,
    core_plugins: Vec<Arc<SimplePluginFactory<dyn CorePlugin>>>,
    container_plugins: Vec<Arc<SimplePluginFactory<dyn ContainerPlugin>>>,
    fallback: NoOpPlaybackFactory,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Loader {
    pub fn new(external: Vec<PluginFactory>) -> Self {
        let mut playbacks = Vec::new();
        let mut core_plugins = Vec::new();
        let mut container_plugins = Vec::new();
        for factory in external {
            match factory {
                PluginFactory::Playback(factory) => playbacks.push(factory),
                PluginFactory::Core(factory) => core_plugins.push(factory),
                PluginFactory::Container(factory) => container_plugins.push(factory),
            }
        }

        let default_playbacks: Vec<Arc<dyn PlaybackFactory>> = vec![
            Arc::new(MediaPlaybackFactory::progressive()),
            Arc::new(MediaPlaybackFactory::adaptive()),
        ];
        let default_container_plugins = vec![Arc::new(SimplePluginFactory::new(
            PosterPlugin::NAME,
            |context: &PluginContext| PosterPlugin::new(context) as Arc<dyn ContainerPlugin>,
        ))];

        let loader = Self {
            playbacks: merge(playbacks, default_playbacks, |f| f.name()),
            core_plugins: merge(core_plugins, Vec::new(), |f| f.name()),
            container_plugins: merge(container_plugins, default_container_plugins, |f| f.name()),
            fallback: NoOpPlaybackFactory,
        };
        debug!(
            "📦 Loader ready: {} playbacks, {} core plugins, {} container plugins",
            loader.playbacks.len(),
            loader.core_plugins.len(),
            loader.container_plugins.len()
        );
        loader
    }

    /// Instantiate the first playback able to play `source`, NoOp otherwise
    pub fn playback_for(
        &self,
        context: &PluginContext,
        source: Option<&str>,
        mime_type: Option<&str>,
    ) -> Arc<dyn Playback> {
        if let Some(source) = source {
            if let Some(factory) = self
                .playbacks
                .iter()
                .find(|factory| factory.can_play(source, mime_type))
            {
                debug!("🎬 {} selected for {}", factory.name(), source);
                return factory.create(context, Some(source), mime_type);
            }
            warn!("⚠️ No playback registered for {}", source);
        }
        self.fallback.create(context, source, mime_type)
    }

    pub fn create_core_plugins(&self, context: &PluginContext) -> Vec<Arc<dyn CorePlugin>> {
        self.core_plugins
            .iter()
            .map(|factory| factory.create(context))
            .collect()
    }

    pub fn create_container_plugins(&self, context: &PluginContext) -> Vec<Arc<dyn ContainerPlugin>> {
        self.container_plugins
            .iter()
            .map(|factory| factory.create(context))
            .collect()
    }

    pub fn playback_names(&self) -> Vec<&str> {
        self.playbacks.iter().map(|factory| factory.name()).collect()
    }

    pub fn container_plugin_names(&self) -> Vec<&str> {
        self.container_plugins.iter().map(|factory| factory.name()).collect()
    }

    pub fn core_plugin_names(&self) -> Vec<&str> {
        self.core_plugins.iter().map(|factory| factory.name()).collect()
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("playbacks", &self.playback_names())
            .field("core_plugins", &self.core_plugin_names())
            .field("container_plugins", &self.container_plugin_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::playback::NoOpPlayback;
    use clappr_events::{BaseObject, EventBus, EventEmitter};

    struct StubPlayback {
        base: BaseObject,
    }

    impl EventEmitter for StubPlayback {
        fn base(&self) -> &BaseObject {
            &self.base
        }
    }

    impl Playback for StubPlayback {
        fn plugin_name(&self) -> &str {
            "MediaPlayback"
        }

        fn source(&self) -> Option<String> {
            None
        }

        fn duration(&self) -> f64 {
            7.0
        }
    }

    struct StubFactory;

    impl PlaybackFactory for StubFactory {
        fn name(&self) -> &str {
            "MediaPlayback"
        }

        fn can_play(&self, source: &str, _mime_type: Option<&str>) -> bool {
            source.starts_with("stub:") || source.ends_with(".mp4")
        }

        fn create(&self, context: &PluginContext, _: Option<&str>, _: Option<&str>) -> Arc<dyn Playback> {
            Arc::new(StubPlayback {
                base: BaseObject::new(context.bus().clone()),
            })
        }
    }

    fn context() -> PluginContext {
        PluginContext::new(EventBus::shared(), Options::new())
    }

    #[test]
    fn test_defaults() {
        let loader = Loader::default();
        assert_eq!(loader.playback_names(), vec!["MediaPlayback", "AdaptiveMediaPlayback"]);
        assert_eq!(loader.container_plugin_names(), vec!["poster"]);
        assert!(loader.core_plugin_names().is_empty());
    }

    #[test]
    fn test_selection_falls_back_to_no_op() {
        let loader = Loader::default();
        let context = context();

        let mp4 = loader.playback_for(&context, Some("http://x/video.mp4"), None);
        assert_eq!(mp4.plugin_name(), "MediaPlayback");
        let hls = loader.playback_for(&context, Some("http://x/index.m3u8"), None);
        assert_eq!(hls.plugin_name(), "AdaptiveMediaPlayback");
        let unknown = loader.playback_for(&context, Some("http//test.com"), None);
        assert_eq!(unknown.plugin_name(), NoOpPlayback::NAME);
        let none = loader.playback_for(&context, None, None);
        assert_eq!(none.plugin_name(), NoOpPlayback::NAME);
    }

    #[test]
    fn test_external_playback_overrides_builtin_of_same_name() {
        let loader = Loader::new(vec![PluginFactory::playback(StubFactory)]);
        assert_eq!(loader.playback_names(), vec!["MediaPlayback", "AdaptiveMediaPlayback"]);

        let playback = loader.playback_for(&context(), Some("http://x/video.mp4"), None);
        assert_eq!(playback.duration(), 7.0);
    }
}
