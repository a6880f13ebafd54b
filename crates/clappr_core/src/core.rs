//! Core: top-level coordinator of one player
//!
//! The core owns the active container, the core plugins, the media control
//! and the fullscreen coordinator. Swapping the active container moves the
//! media control over and rebinds every core plugin; nothing stays bound to
//! the previous container.

use crate::app_state::{AppState, AppStateDelegate, AppStateManager};
use crate::container::Container;
use crate::context::PluginContext;
use crate::environment::Environment;
use crate::error::{CoreError, PluginError};
use crate::fullscreen::{FullscreenCoordinator, FullscreenPresenter};
use crate::loader::Loader;
use crate::media_control::MediaControl;
use crate::options::Options;
use crate::playback::{MediaTransport, Playback};
use crate::plugin::{CorePlugin, NamedPlugin, Plugin, PluginRegistry};
use crate::poster::ImageLoader;
use crate::view::View;
use crate::Result;
use arc_swap::ArcSwapOption;
use clappr_events::{BaseObject, CoreEvent, EventEmitter, InternalEvent, MediaControlEvent};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

pub struct Core {
    base: BaseObject,
    weak_self: Weak<Core>,
    context: Arc<PluginContext>,
    loader: Arc<Loader>,
    active_container: ArcSwapOption<Container>,
    plugins: PluginRegistry<dyn CorePlugin>,
    media_control: Arc<MediaControl>,
    fullscreen: Arc<FullscreenCoordinator>,
    view: Arc<View>,
    parent: Mutex<Weak<View>>,
    app_state: Mutex<Option<AppStateManager>>,
    rendered: AtomicBool,
    destroyed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Core {
    pub fn new(options: Options, loader: Loader, environment: Environment) -> Arc<Self> {
        let bus = environment.bus.clone();
        let mut context = PluginContext::new(bus.clone(), options);
        context.add_provider::<Arc<dyn ImageLoader>>(environment.image_loader.clone());
        if let Some(transport) = &environment.media_transport {
            context.add_provider::<Arc<dyn MediaTransport>>(transport.clone());
        }
        let context = Arc::new(context);
        let loader = Arc::new(loader);

        let (media_control, by_app) = {
            let options = context.options().unboxed();
            let media_control = match options.media_control() {
                Some(media_control) if Arc::ptr_eq(media_control.base().bus(), &bus) => media_control,
                Some(_) => {
                    warn!("⚠️ Provided media control uses another event bus, building a default one");
                    MediaControl::new(bus.clone())
                }
                None => MediaControl::new(bus.clone()),
            };
            (media_control, options.fullscreen_controlled_by_app())
        };
        let fullscreen = FullscreenCoordinator::new(bus.clone(), by_app);
        let container = Container::new(context.clone(), loader.clone());

        let core = Arc::new_cyclic(|weak_self| Self {
            base: BaseObject::new(bus),
            weak_self: weak_self.clone(),
            context,
            loader,
            active_container: ArcSwapOption::empty(),
            plugins: PluginRegistry::new(),
            media_control,
            fullscreen,
            view: View::new("core"),
            parent: Mutex::new(Weak::new()),
            app_state: Mutex::new(None),
            rendered: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        });

        core.bind_fullscreen();
        if let Err(e) = core.set_active_container(container) {
            warn!("⚠️ Failed to activate the initial container: {}", e);
        }
        for plugin in core.loader.create_core_plugins(&core.context) {
            if let Err(e) = core.add_plugin(plugin) {
                warn!("⚠️ Skipping core plugin: {}", e);
            }
        }

        if let Some(notifier) = environment.app_state {
            let delegate: Weak<dyn AppStateDelegate> = core.weak_self.clone();
            let manager = AppStateManager::new(notifier, delegate);
            manager.start_monitoring();
            *lock(&core.app_state) = Some(manager);
        }

        info!("🚀 Core {} created", core.object_id());
        core
    }

    fn bind_fullscreen(&self) {
        let transitions = [
            (InternalEvent::DidEnterFullscreen, CoreEvent::EnterFullscreen, true),
            (InternalEvent::DidExitFullscreen, CoreEvent::ExitFullscreen, false),
        ];
        for (from, to, fullscreen) in transitions {
            let core = self.weak_self.clone();
            self.base.listen_to(&*self.fullscreen, from, move |_| {
                if let Some(core) = core.upgrade() {
                    core.media_control.set_fullscreen(fullscreen);
                    core.base.trigger(to, None);
                }
                Ok(())
            });
        }

        // The media control never sees fullscreen when the app owns it, so
        // its button toggles the last request instead.
        let requests = [
            (MediaControlEvent::FullscreenEnter, true),
            (MediaControlEvent::FullscreenExit, false),
        ];
        for (event, fullscreen) in requests {
            let core = self.weak_self.clone();
            self.base.listen_to(&*self.media_control, event, move |_| {
                if let Some(core) = core.upgrade() {
                    let target = if core.fullscreen.is_controlled_by_app() {
                        !core.fullscreen.is_requested()
                    } else {
                        fullscreen
                    };
                    core.set_fullscreen(target);
                }
                Ok(())
            });
        }
    }

    pub fn context(&self) -> &Arc<PluginContext> {
        &self.context
    }

    pub fn options(&self) -> &Options {
        self.context.options()
    }

    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    pub fn view(&self) -> &Arc<View> {
        &self.view
    }

    pub fn active_container(&self) -> Option<Arc<Container>> {
        self.active_container.load_full()
    }

    pub fn active_playback(&self) -> Option<Arc<dyn Playback>> {
        self.active_container().map(|container| container.playback())
    }

    pub fn containers(&self) -> Vec<Arc<Container>> {
        self.active_container().into_iter().collect()
    }

    pub fn media_control(&self) -> &Arc<MediaControl> {
        &self.media_control
    }

    pub fn fullscreen_coordinator(&self) -> &Arc<FullscreenCoordinator> {
        &self.fullscreen
    }

    /// Make `container` the active one.
    ///
    /// Core plugins drop their bindings on the previous container before
    /// being bound to the new one and the media control follows. Once the
    /// core has been rendered the new container is rendered too, after
    /// `didChangeActiveContainer`. The previous container is destroyed last.
    pub fn set_active_container(&self, container: Arc<Container>) -> Result<()> {
        if self.is_destroyed() {
            return Err(CoreError::Destroyed);
        }
        let previous = self.active_container.swap(Some(container.clone()));
        if let Some(previous) = &previous {
            if Arc::ptr_eq(previous, &container) {
                return Ok(());
            }
            for plugin in self.plugins.all() {
                plugin.base().stop_listening_to(previous.object_id());
            }
            if let Err(e) = previous.remove_plugin(MediaControl::NAME) {
                debug!("Previous container had no media control: {}", e);
            }
        }

        if let Err(e) = container.add_plugin(self.media_control.clone()) {
            warn!("⚠️ Media control not attached to container {}: {}", container.object_id(), e);
        }
        for plugin in self.plugins.all() {
            plugin.bind_container(&container);
        }
        self.base.trigger(InternalEvent::DidChangeActiveContainer, None);

        if self.rendered.load(Ordering::Acquire) {
            self.view.add_subview(container.view());
            container.render();
        }
        if let Some(previous) = previous {
            previous.destroy();
        }
        debug!("📦 Active container is now {}", container.object_id());
        Ok(())
    }

    /// Register a core plugin and bind it to the active container
    pub fn add_plugin(&self, plugin: Arc<dyn CorePlugin>) -> std::result::Result<(), PluginError> {
        self.plugins.add(plugin.clone())?;
        if let Some(core) = self.weak_self.upgrade() {
            plugin.bind_core(&core);
        }
        if let Some(container) = self.active_container() {
            plugin.bind_container(&container);
        }
        Ok(())
    }

    pub fn remove_plugin(&self, name: &str) -> std::result::Result<Arc<dyn CorePlugin>, PluginError> {
        let plugin = self.plugins.remove(name)?;
        plugin.destroy();
        if let Some(view) = plugin.view() {
            view.remove_from_superview();
        }
        Ok(plugin)
    }

    pub fn plugin(&self, name: &str) -> Option<Arc<dyn CorePlugin>> {
        self.plugins.get(name)
    }

    pub fn plugins(&self) -> Vec<Arc<dyn CorePlugin>> {
        self.plugins.all()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains(name)
    }

    pub fn has_plugin_of<T: NamedPlugin>(&self) -> bool {
        self.plugins.contains_type::<T>()
    }

    /// Set the host view the player lives in and the fullscreen presenter
    pub fn attach(&self, parent: &Arc<View>, presenter: Arc<dyn FullscreenPresenter>) {
        *lock(&self.parent) = Arc::downgrade(parent);
        self.fullscreen.attach(self.view.clone(), presenter);
    }

    /// Insert the player into its host view and render every component.
    /// Enters fullscreen right away when the options ask for it.
    pub fn render(&self) {
        self.rendered.store(true, Ordering::Release);
        let parent = lock(&self.parent).upgrade();
        if let Some(parent) = &parent {
            parent.add_subview(&self.view);
        }
        if let Some(container) = self.active_container() {
            self.view.add_subview(container.view());
            container.render();
        }
        for plugin in self.plugins.all() {
            if let Some(view) = plugin.view() {
                self.view.add_subview(view);
            }
            plugin.render();
        }

        let options = self.options().unboxed();
        if parent.is_some() && options.fullscreen() && !options.fullscreen_controlled_by_app() {
            self.fullscreen.set_fullscreen(true);
        }
        info!("🎬 Core {} rendered", self.object_id());
    }

    pub fn load(&self, source: &str, mime_type: Option<&str>) {
        match self.active_container() {
            Some(container) => container.load(source, mime_type),
            None => warn!("⚠️ Cannot load {} without an active container", source),
        }
    }

    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.fullscreen.set_fullscreen(fullscreen);
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_fullscreen()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(manager) = lock(&self.app_state).take() {
            manager.stop_monitoring();
        }
        for plugin in self.plugins.drain() {
            plugin.destroy();
        }
        if let Some(container) = self.active_container.swap(None) {
            container.destroy();
        }
        self.base.stop_listening();
        self.base.bus().remove_emitter(self.object_id());
        self.view.remove_from_superview();
        info!("🛑 Core {} destroyed", self.object_id());
    }
}

impl EventEmitter for Core {
    fn base(&self) -> &BaseObject {
        &self.base
    }
}

impl AppStateDelegate for Core {
    fn did_change(&self, state: AppState) {
        let Some(container) = self.active_container() else {
            return;
        };
        match state {
            AppState::Background => container.suspend(),
            AppState::Active => container.resume(),
        }
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("id", &self.object_id())
            .field("active_container", &self.active_container())
            .field("plugins", &self.plugins)
            .field("fullscreen", &self.fullscreen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::ManualAppStateNotifier;
    use crate::fullscreen::ImmediatePresenter;
    use crate::media_control::PlaybackControlState;
    use crate::options::keys;
    use crate::plugin::PluginKind;
    use clappr_events::payload::user_info;
    use clappr_events::{ContainerEvent, Event};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    macro_rules! fake_core_plugin {
        ($name:ident, $plugin_name:literal) => {
            struct $name {
                base: BaseObject,
                containers: AtomicUsize,
                plays: Arc<AtomicUsize>,
            }

            impl $name {
                fn new(core: &Core) -> Arc<Self> {
                    Arc::new(Self {
                        base: BaseObject::new(core.base().bus().clone()),
                        containers: AtomicUsize::new(0),
                        plays: Arc::new(AtomicUsize::new(0)),
                    })
                }
            }

            impl NamedPlugin for $name {
                const NAME: &'static str = $plugin_name;
            }

            impl EventEmitter for $name {
                fn base(&self) -> &BaseObject {
                    &self.base
                }
            }

            impl Plugin for $name {
                fn plugin_name(&self) -> &str {
                    Self::NAME
                }

                fn kind(&self) -> PluginKind {
                    PluginKind::Core
                }
            }

            impl CorePlugin for $name {
                fn bind_container(&self, container: &Arc<Container>) {
                    self.containers.fetch_add(1, Ordering::SeqCst);
                    let plays = self.plays.clone();
                    self.base.listen_to(&**container, ContainerEvent::Play, move |_| {
                        plays.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    });
                }
            }
        };
    }

    fake_core_plugin!(FakeCorePlugin, "FakeCorePlugin");
    fake_core_plugin!(AnotherFakeCorePlugin, "AnotherFakeCorePlugin");

    fn core(options: Options) -> Arc<Core> {
        Core::new(options, Loader::default(), Environment::default())
    }

    fn mp4() -> Options {
        Options::new().with(keys::SOURCE_URL, "http://clappr.io/video.mp4")
    }

    fn attach(core: &Core) -> (Arc<View>, Arc<ImmediatePresenter>) {
        let parent = View::new("host");
        let presenter = Arc::new(ImmediatePresenter::new());
        core.attach(&parent, presenter.clone());
        (parent, presenter)
    }

    fn record(core: &Core) -> (BaseObject, Arc<Mutex<Vec<String>>>) {
        let listener = BaseObject::new(core.base().bus().clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        for &event in InternalEvent::ALL {
            let log = log.clone();
            listener.listen_to(&**core.fullscreen_coordinator(), event, move |_| {
                log.lock().unwrap().push(event.to_string());
                Ok(())
            });
        }
        for &event in CoreEvent::ALL {
            let log = log.clone();
            listener.listen_to(core, event, move |_| {
                log.lock().unwrap().push(event.to_string());
                Ok(())
            });
        }
        (listener, log)
    }

    #[test]
    fn test_core_plugins_registry() {
        let core = core(Options::new());
        assert!(core.active_container().is_some());
        assert!(!core.containers().is_empty());
        assert!(core.plugins().is_empty());

        core.add_plugin(FakeCorePlugin::new(&core)).unwrap();
        assert!(core.has_plugin(FakeCorePlugin::NAME));
        assert!(core.has_plugin_of::<FakeCorePlugin>());

        core.add_plugin(AnotherFakeCorePlugin::new(&core)).unwrap();
        assert_eq!(core.plugins().len(), 2);

        let duplicate = core.add_plugin(FakeCorePlugin::new(&core));
        assert_eq!(
            duplicate,
            Err(PluginError::AlreadyExists("FakeCorePlugin".into()))
        );
        assert_eq!(core.plugins().len(), 2);

        assert!(core.remove_plugin(FakeCorePlugin::NAME).is_ok());
        assert!(matches!(
            core.remove_plugin(FakeCorePlugin::NAME),
            Err(PluginError::NotFound(_))
        ));
    }

    #[test]
    fn test_media_control_is_attached_to_active_container() {
        let core = core(mp4());
        let container = core.active_container().unwrap();
        assert!(container.has_plugin_of::<MediaControl>());
        assert!(container.has_plugin("poster"));
        assert_eq!(
            core.media_control().container().unwrap().object_id(),
            container.object_id()
        );
    }

    #[test]
    fn test_load_rebinds_media_control() {
        let core = core(mp4());
        let old = core.active_playback().unwrap();
        core.load("http://clappr.io/other.m3u8", None);
        let new = core.active_playback().unwrap();
        assert_eq!(new.plugin_name(), "AdaptiveMediaPlayback");

        let info = user_info(json!({"position": 78.0}));
        old.base().trigger(Event::TimeUpdated, Some(&info));
        assert_eq!(core.media_control().current_time_label(), "00:00");

        new.base().trigger(Event::TimeUpdated, Some(&info));
        assert_eq!(core.media_control().current_time_label(), "01:18");
    }

    #[test]
    fn test_set_active_container_moves_plugins_over() {
        let core = core(mp4());
        let plugin = FakeCorePlugin::new(&core);
        core.add_plugin(plugin.clone()).unwrap();
        let old = core.active_container().unwrap();

        let changed = Arc::new(AtomicUsize::new(0));
        let changed_clone = changed.clone();
        let listener = BaseObject::new(core.base().bus().clone());
        listener.listen_to(&*core, InternalEvent::DidChangeActiveContainer, move |_| {
            changed_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let new = Container::new(core.context().clone(), core.loader().clone());
        core.set_active_container(new.clone()).unwrap();

        assert!(old.is_destroyed());
        assert!(!old.has_plugin_of::<MediaControl>());
        assert!(new.has_plugin_of::<MediaControl>());
        assert_eq!(changed.load(Ordering::SeqCst), 1);
        assert_eq!(plugin.containers.load(Ordering::SeqCst), 2);

        old.base().trigger(ContainerEvent::Play, None);
        assert_eq!(plugin.plays.load(Ordering::SeqCst), 0);
        new.base().trigger(ContainerEvent::Play, None);
        assert_eq!(plugin.plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_container_set_after_render_is_rendered() {
        let core = core(mp4());
        let (_parent, _presenter) = attach(&core);
        core.render();
        let old = core.active_container().unwrap();

        let new = Container::new(core.context().clone(), core.loader().clone());
        core.set_active_container(new.clone()).unwrap();
        assert!(core.view().contains(new.view()));
        assert!(!core.view().contains(old.view()));

        new.play();
        assert!(new.is_playing());
        assert_eq!(
            core.media_control().playback_control_state(),
            PlaybackControlState::Playing
        );
    }

    #[test]
    fn test_default_fullscreen_moves_view_to_surface() {
        let core = core(Options::new());
        let (parent, presenter) = attach(&core);
        core.render();
        assert!(parent.contains(core.view()));
        let (_listener, log) = record(&core);

        core.set_fullscreen(true);
        assert!(core.is_fullscreen());
        assert!(core.media_control().fullscreen());
        assert!(presenter.surface().contains(core.view()));
        assert!(!parent.contains(core.view()));

        core.set_fullscreen(false);
        assert!(!core.is_fullscreen());
        assert!(!core.media_control().fullscreen());
        assert!(parent.contains(core.view()));

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "willEnterFullscreen",
                "enterFullscreen",
                "didEnterFullscreen",
                "willExitFullscreen",
                "exitFullscreen",
                "didExitFullscreen"
            ]
        );
    }

    #[test]
    fn test_app_delegated_fullscreen_only_announces() {
        let core = core(Options::new().with(keys::FULLSCREEN_BY_APP, true));
        let (parent, _presenter) = attach(&core);
        core.render();
        let (_listener, log) = record(&core);

        core.set_fullscreen(true);
        assert!(!core.is_fullscreen());
        assert!(!core.media_control().fullscreen());
        assert!(parent.contains(core.view()));
        assert_eq!(*log.lock().unwrap(), vec!["willEnterFullscreen"]);
    }

    #[test]
    fn test_app_delegated_button_alternates_requests() {
        let core = core(Options::new().with(keys::FULLSCREEN_BY_APP, true));
        let _host = attach(&core);
        core.render();
        let (_listener, log) = record(&core);

        core.media_control().toggle_fullscreen();
        core.media_control().toggle_fullscreen();
        core.media_control().toggle_fullscreen();
        assert!(!core.media_control().fullscreen());
        assert!(!core.is_fullscreen());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["willEnterFullscreen", "willExitFullscreen", "willEnterFullscreen"]
        );
    }

    #[test]
    fn test_fullscreen_option_enters_at_render() {
        let core = core(Options::new().with(keys::FULLSCREEN, true));
        let (_parent, presenter) = attach(&core);
        assert!(!core.is_fullscreen());

        core.render();
        assert!(core.is_fullscreen());
        assert!(presenter.surface().contains(core.view()));
    }

    #[test]
    fn test_fullscreen_option_stays_embedded_when_app_delegated() {
        let core = core(
            Options::new()
                .with(keys::FULLSCREEN, true)
                .with(keys::FULLSCREEN_BY_APP, true),
        );
        let (parent, presenter) = attach(&core);
        let (_listener, log) = record(&core);

        core.render();
        assert!(parent.contains(core.view()));
        assert!(!presenter.surface().contains(core.view()));
        assert!(!core.is_fullscreen());
        assert!(!core.media_control().fullscreen());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_media_control_button_requests_fullscreen() {
        let core = core(Options::new());
        let _host = attach(&core);
        core.render();

        core.media_control().toggle_fullscreen();
        assert!(core.is_fullscreen());
        core.media_control().toggle_fullscreen();
        assert!(!core.is_fullscreen());
    }

    #[test]
    fn test_media_control_toggle_drives_container() {
        let core = core(mp4());
        core.render();
        let media_control = core.media_control();

        media_control.toggle_playback();
        assert!(core.active_container().unwrap().is_playing());
        media_control.toggle_playback();
        assert!(core.active_container().unwrap().is_paused());
    }

    #[test]
    fn test_background_pauses_and_resumes() {
        let notifier = Arc::new(ManualAppStateNotifier::new());
        let core = Core::new(
            mp4(),
            Loader::default(),
            Environment::new().with_app_state(notifier.clone()),
        );
        core.render();
        let container = core.active_container().unwrap();
        container.play();

        notifier.notify(AppState::Background);
        assert!(container.is_paused());
        notifier.notify(AppState::Active);
        assert!(container.is_playing());

        core.destroy();
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let core = core(mp4());
        core.add_plugin(FakeCorePlugin::new(&core)).unwrap();
        let bus = core.base().bus().clone();
        let container = core.active_container().unwrap();

        core.destroy();
        core.destroy();
        assert!(core.is_destroyed());
        assert!(container.is_destroyed());
        assert!(core.active_container().is_none());
        assert!(core.plugins().is_empty());
        assert_eq!(bus.binding_count(), 0);

        let replacement = Container::new(core.context().clone(), core.loader().clone());
        assert!(matches!(
            core.set_active_container(replacement),
            Err(CoreError::Destroyed)
        ));
    }
}
