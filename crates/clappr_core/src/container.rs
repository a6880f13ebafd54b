//! Container: owner of the active playback and of the container plugins
//!
//! The container re-emits the playback events its listeners care about under
//! container event names, so most plugins never bind to a playback directly
//! and are unaffected when the playback is swapped by [`Container::load`].

use crate::context::PluginContext;
use crate::error::PluginError;
use crate::loader::Loader;
use crate::options::Options;
use crate::playback::{MediaOption, Playback, PlaybackType};
use crate::plugin::{ContainerPlugin, NamedPlugin, Plugin, PluginRegistry};
use crate::view::View;
use arc_swap::ArcSwap;
use clappr_events::{BaseObject, ContainerEvent, Event, EventEmitter, InternalEvent};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Playback events re-emitted by the container, with their container names
const FORWARDED: [(Event, ContainerEvent); 8] = [
    (Event::Playing, ContainerEvent::Play),
    (Event::DidPause, ContainerEvent::Pause),
    (Event::DidStop, ContainerEvent::Stop),
    (Event::DidComplete, ContainerEvent::Ended),
    (Event::Ready, ContainerEvent::Ready),
    (Event::Error, ContainerEvent::Error),
    (Event::Stalled, ContainerEvent::Stalled),
    (Event::TimeUpdated, ContainerEvent::TimeUpdated),
];

pub struct Container {
    base: BaseObject,
    weak_self: Weak<Container>,
    context: Arc<PluginContext>,
    loader: Arc<Loader>,
    playback: ArcSwap<Arc<dyn Playback>>,
    plugins: PluginRegistry<dyn ContainerPlugin>,
    view: Arc<View>,
    media_control_enabled: AtomicBool,
    paused_in_background: AtomicBool,
    destroyed: AtomicBool,
}

impl Container {
    /// Build a container for the source configured in the options, with the
    /// loader's container plugins attached.
    pub fn new(context: Arc<PluginContext>, loader: Arc<Loader>) -> Arc<Self> {
        let playback = {
            let options = context.options().unboxed();
            loader.playback_for(&context, options.source_url(), options.mime_type())
        };
        let plugins = loader.create_container_plugins(&context);
        let container = Self::assemble(context, loader, playback);
        for plugin in plugins {
            if let Err(e) = container.add_plugin(plugin) {
                warn!("⚠️ Skipping container plugin: {}", e);
            }
        }
        container
    }

    /// Build a bare container around an existing playback, without plugins.
    pub fn with_playback(playback: Arc<dyn Playback>, options: Options) -> Arc<Self> {
        let context = Arc::new(PluginContext::new(playback.base().bus().clone(), options));
        Self::assemble(context, Arc::new(Loader::default()), playback)
    }

    fn assemble(
        context: Arc<PluginContext>,
        loader: Arc<Loader>,
        playback: Arc<dyn Playback>,
    ) -> Arc<Self> {
        let container = Arc::new_cyclic(|weak_self| Self {
            base: BaseObject::new(context.bus().clone()),
            weak_self: weak_self.clone(),
            context,
            loader,
            playback: ArcSwap::from_pointee(playback.clone()),
            plugins: PluginRegistry::new(),
            view: View::new("container"),
            media_control_enabled: AtomicBool::new(false),
            paused_in_background: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        });
        container.bind_playback_events(&playback);
        debug!("📦 Container {} created with {}", container.object_id(), playback.plugin_name());
        container
    }

    fn bind_playback_events(&self, playback: &Arc<dyn Playback>) {
        for (from, to) in FORWARDED {
            let container = self.weak_self.clone();
            self.base.listen_to(&**playback, from, move |info| {
                if let Some(container) = container.upgrade() {
                    container.base.trigger(to, info);
                }
                Ok(())
            });
        }
    }

    pub fn weak(&self) -> Weak<Container> {
        self.weak_self.clone()
    }

    pub fn context(&self) -> &Arc<PluginContext> {
        &self.context
    }

    pub fn options(&self) -> &Options {
        self.context.options()
    }

    pub fn view(&self) -> &Arc<View> {
        &self.view
    }

    /// The active playback
    pub fn playback(&self) -> Arc<dyn Playback> {
        let current = self.playback.load();
        Arc::clone(&**current)
    }

    /// Swap the active playback for one able to play `source`.
    ///
    /// Every binding the container and its plugins hold on the previous
    /// playback is dropped, the previous playback is destroyed, and the new
    /// one is only activated once everybody is bound to it.
    pub fn load(&self, source: &str, mime_type: Option<&str>) {
        if self.is_destroyed() {
            warn!("⚠️ Container {} is destroyed, not loading {}", self.object_id(), source);
            return;
        }
        let old = self.playback();
        let old_id = old.object_id();
        let plugins = self.plugins.all();

        self.base.stop_listening_to(old_id);
        for plugin in &plugins {
            plugin.base().stop_listening_to(old_id);
        }
        old.destroy();

        let playback = self
            .loader
            .playback_for(&self.context, Some(source), mime_type);
        self.playback.store(Arc::new(playback.clone()));

        self.bind_playback_events(&playback);
        for plugin in &plugins {
            plugin.bind_playback(&playback);
        }

        info!("🔄 Container {} loaded {} with {}", self.object_id(), source, playback.plugin_name());
        self.base.trigger(InternalEvent::DidChangePlayback, None);
        playback.activate();
    }

    /// Register and bind a plugin. A plugin whose name is taken is rejected.
    pub fn add_plugin(&self, plugin: Arc<dyn ContainerPlugin>) -> Result<(), PluginError> {
        self.plugins.add(plugin.clone())?;
        if let Some(container) = self.weak_self.upgrade() {
            plugin.bind_container(&container);
            plugin.bind_playback(&self.playback());
        }
        Ok(())
    }

    /// Unregister a plugin and drop its bindings
    pub fn remove_plugin(&self, name: &str) -> Result<Arc<dyn ContainerPlugin>, PluginError> {
        let plugin = self.plugins.remove(name)?;
        plugin.destroy();
        if let Some(view) = plugin.view() {
            view.remove_from_superview();
        }
        Ok(plugin)
    }

    pub fn plugin(&self, name: &str) -> Option<Arc<dyn ContainerPlugin>> {
        self.plugins.get(name)
    }

    pub fn plugins(&self) -> Vec<Arc<dyn ContainerPlugin>> {
        self.plugins.all()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains(name)
    }

    pub fn has_plugin_of<T: NamedPlugin>(&self) -> bool {
        self.plugins.contains_type::<T>()
    }

    /// Lay the plugin views out and let the playback start emitting
    pub fn render(&self) {
        for plugin in self.plugins.all() {
            if let Some(view) = plugin.view() {
                self.view.add_subview(view);
            }
            plugin.render();
        }
        let playback = self.playback();
        playback.activate();
        if self.options().unboxed().autoplay() {
            playback.play();
        }
    }

    pub fn play(&self) {
        self.playback().play();
    }

    pub fn pause(&self) {
        self.playback().pause();
    }

    pub fn stop(&self) {
        self.playback().stop();
    }

    pub fn seek(&self, position: f64) {
        self.playback().seek(position);
    }

    pub fn playback_type(&self) -> PlaybackType {
        self.playback().playback_type()
    }

    pub fn is_playing(&self) -> bool {
        self.playback().is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.playback().is_paused()
    }

    pub fn is_buffering(&self) -> bool {
        self.playback().is_buffering()
    }

    pub fn duration(&self) -> f64 {
        self.playback().duration()
    }

    pub fn position(&self) -> f64 {
        self.playback().position()
    }

    pub fn subtitles(&self) -> Vec<MediaOption> {
        self.playback().subtitles()
    }

    pub fn audio_sources(&self) -> Vec<MediaOption> {
        self.playback().audio_sources()
    }

    pub fn media_control_enabled(&self) -> bool {
        self.media_control_enabled.load(Ordering::Acquire)
    }

    pub fn set_media_control_enabled(&self, enabled: bool) {
        self.media_control_enabled.store(enabled, Ordering::Release);
        let event = if enabled {
            ContainerEvent::MediaControlEnabled
        } else {
            ContainerEvent::MediaControlDisabled
        };
        self.base.trigger(event, None);
    }

    /// Pause for the app going to background, remembering to resume later
    pub fn suspend(&self) {
        if self.is_playing() {
            self.paused_in_background.store(true, Ordering::Release);
            self.pause();
        }
    }

    /// Resume what [`suspend`](Self::suspend) paused
    pub fn resume(&self) {
        if self.paused_in_background.swap(false, Ordering::AcqRel) {
            self.play();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        for plugin in self.plugins.drain() {
            plugin.destroy();
        }
        self.playback().destroy();
        self.base.stop_listening();
        self.base.bus().remove_emitter(self.object_id());
        self.view.remove_from_superview();
        debug!("🗑️ Container {} destroyed", self.object_id());
    }
}

impl EventEmitter for Container {
    fn base(&self) -> &BaseObject {
        &self.base
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.object_id())
            .field("playback", &self.playback().plugin_name())
            .field("plugins", &self.plugins)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::keys;
    use crate::plugin::PluginKind;
    use clappr_events::EventBus;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Watcher {
        base: BaseObject,
        log: Log,
    }

    impl Watcher {
        fn new(bus: Arc<EventBus>, log: Log) -> Arc<Self> {
            Arc::new(Self {
                base: BaseObject::new(bus),
                log,
            })
        }
    }

    impl EventEmitter for Watcher {
        fn base(&self) -> &BaseObject {
            &self.base
        }
    }

    impl Plugin for Watcher {
        fn plugin_name(&self) -> &str {
            "watcher"
        }

        fn kind(&self) -> PluginKind {
            PluginKind::Container
        }
    }

    impl ContainerPlugin for Watcher {
        fn bind_container(&self, _container: &Arc<Container>) {}

        fn bind_playback(&self, playback: &Arc<dyn Playback>) {
            let log = self.log.clone();
            let name = playback.plugin_name().to_string();
            self.base.listen_to(&**playback, Event::TimeUpdated, move |_| {
                log.lock().unwrap().push(name.clone());
                Ok(())
            });
        }
    }

    fn context(options: Options) -> Arc<PluginContext> {
        Arc::new(PluginContext::new(EventBus::shared(), options))
    }

    fn media(container: &Container) -> Arc<dyn Playback> {
        container.playback()
    }

    fn report_time(playback: &Arc<dyn Playback>) {
        let info = clappr_events::payload::user_info(serde_json::json!({"position": 1.0}));
        playback.base().trigger(Event::TimeUpdated, Some(&info));
    }

    #[test]
    fn test_source_selects_playback_and_default_plugins() {
        let container = Container::new(
            context(Options::new().with(keys::SOURCE_URL, "http://x/video.mp4")),
            Arc::new(Loader::default()),
        );
        assert_eq!(container.playback().plugin_name(), "MediaPlayback");
        assert!(container.has_plugin("poster"));
        assert_eq!(container.duration(), 0.0);
        assert!(!container.is_playing());
    }

    #[test]
    fn test_playback_events_are_forwarded() {
        let container = Container::new(context(Options::new()), Arc::new(Loader::default()));
        let listener = BaseObject::new(container.base().bus().clone());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        for event in [ContainerEvent::Play, ContainerEvent::Ended, ContainerEvent::TimeUpdated] {
            let log = log.clone();
            listener.listen_to(&*container, event, move |_| {
                log.lock().unwrap().push(event.to_string());
                Ok(())
            });
        }

        let playback = container.playback();
        playback.base().trigger(Event::Playing, None);
        playback.base().trigger(Event::DidComplete, None);
        report_time(&playback);
        assert_eq!(*log.lock().unwrap(), vec!["play", "ended", "timeUpdated"]);
    }

    #[test]
    fn test_load_rebinds_plugins_and_silences_old_playback() {
        let container = Container::new(
            context(Options::new().with(keys::SOURCE_URL, "http://x/video.mp4")),
            Arc::new(Loader::default()),
        );
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        container
            .add_plugin(Watcher::new(container.base().bus().clone(), log.clone()))
            .unwrap();

        let forwarded = Arc::new(Mutex::new(0));
        let forwarded_clone = forwarded.clone();
        let observer = BaseObject::new(container.base().bus().clone());
        observer.listen_to(&*container, ContainerEvent::TimeUpdated, move |_| {
            *forwarded_clone.lock().unwrap() += 1;
            Ok(())
        });
        let changed = Arc::new(Mutex::new(0));
        let changed_clone = changed.clone();
        observer.listen_to(&*container, InternalEvent::DidChangePlayback, move |_| {
            *changed_clone.lock().unwrap() += 1;
            Ok(())
        });

        let old = media(&container);
        report_time(&old);
        container.load("http://x/live.m3u8", None);
        let new = media(&container);

        report_time(&old);
        assert_eq!(container.base().bus().emitter_binding_count(old.object_id()), 0);
        report_time(&new);

        assert_eq!(*log.lock().unwrap(), vec!["MediaPlayback", "AdaptiveMediaPlayback"]);
        assert_eq!(*forwarded.lock().unwrap(), 2);
        assert_eq!(*changed.lock().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_plugin_is_rejected() {
        let container = Container::new(context(Options::new()), Arc::new(Loader::default()));
        let bus = container.base().bus().clone();
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        container.add_plugin(Watcher::new(bus.clone(), log.clone())).unwrap();
        let result = container.add_plugin(Watcher::new(bus, log));
        assert_eq!(result, Err(PluginError::AlreadyExists("watcher".into())));

        assert!(container.remove_plugin("watcher").is_ok());
        assert!(!container.has_plugin("watcher"));
    }

    #[test]
    fn test_media_control_flag_emits_events() {
        let container = Container::new(context(Options::new()), Arc::new(Loader::default()));
        let listener = BaseObject::new(container.base().bus().clone());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        for event in [ContainerEvent::MediaControlEnabled, ContainerEvent::MediaControlDisabled] {
            let log = log.clone();
            listener.listen_to(&*container, event, move |_| {
                log.lock().unwrap().push(event.to_string());
                Ok(())
            });
        }

        container.set_media_control_enabled(true);
        assert!(container.media_control_enabled());
        container.set_media_control_enabled(false);
        assert_eq!(*log.lock().unwrap(), vec!["mediaControlEnabled", "mediaControlDisabled"]);
    }

    #[test]
    fn test_suspend_and_resume() {
        let container = Container::new(
            context(Options::new().with(keys::SOURCE_URL, "http://x/video.mp4")),
            Arc::new(Loader::default()),
        );
        container.resume();
        assert!(!container.is_playing());

        container.play();
        container.suspend();
        assert!(container.is_paused());
        container.resume();
        assert!(container.is_playing());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let container = Container::new(context(Options::new()), Arc::new(Loader::default()));
        let bus = container.base().bus().clone();
        container.destroy();
        container.destroy();
        assert!(container.is_destroyed());
        assert!(container.plugins().is_empty());
        assert_eq!(bus.listener_binding_count(container.object_id()), 0);
    }

    #[test]
    fn test_load_after_destroy_keeps_dead_playback() {
        let container = Container::new(
            context(Options::new().with(keys::SOURCE_URL, "http://x/video.mp4")),
            Arc::new(Loader::default()),
        );
        let bus = container.base().bus().clone();
        let old = container.playback();
        container.destroy();

        container.load("http://x/live.m3u8", None);
        assert_eq!(container.playback().object_id(), old.object_id());
        assert_eq!(bus.listener_binding_count(container.object_id()), 0);
    }
}
