//! The embeddable player

use clappr_core::{
    keys, Container, Core, Environment, FullscreenPresenter, Loader, MediaOption, NamedPlugin, Options,
    Playback, PluginFactory, PosterPlugin, View,
};
use clappr_events::{
    BaseObject, ContainerEvent, CoreEvent, Event, EventBus, EventEmitter, InternalEvent, ObjectId,
    SubscriptionId, UserInfo,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Container events re-emitted by the player, with their player names
const CONTAINER_EVENTS: [(ContainerEvent, Event); 8] = [
    (ContainerEvent::Play, Event::Playing),
    (ContainerEvent::Pause, Event::DidPause),
    (ContainerEvent::Stop, Event::DidStop),
    (ContainerEvent::Ended, Event::DidComplete),
    (ContainerEvent::Ready, Event::Ready),
    (ContainerEvent::Error, Event::Error),
    (ContainerEvent::Stalled, Event::Stalled),
    (ContainerEvent::TimeUpdated, Event::TimeUpdated),
];

/// Playback events the player re-emits unchanged
const PLAYBACK_EVENTS: [Event; 4] = [
    Event::BufferUpdate,
    Event::DidSeek,
    Event::DidSelectSubtitle,
    Event::DidSelectAudio,
];

const POSTER_EVENTS: [Event; 2] = [Event::WillUpdatePoster, Event::DidUpdatePoster];

/// Wire `relay` so that the events of the current component graph are
/// re-emitted on `player`. Runs again whenever the active container or its
/// playback changes; previous relay bindings are dropped first.
fn bind_relay(bus: &Arc<EventBus>, relay: ObjectId, player: ObjectId, core: &Arc<Core>) {
    bus.stop_listening(relay);

    let forward = |emitter: ObjectId, from: &str, to: Event| {
        let bus_ref = Arc::downgrade(bus);
        bus.listen_to(relay, emitter, from, move |info| {
            if let Some(bus) = bus_ref.upgrade() {
                bus.trigger(player, to.as_str(), info);
            }
            Ok(())
        });
    };
    let rebind_on = |emitter: ObjectId, event: InternalEvent| {
        let bus_ref = Arc::downgrade(bus);
        let core_ref = Arc::downgrade(core);
        bus.listen_to(relay, emitter, event.as_str(), move |_| {
            if let (Some(bus), Some(core)) = (bus_ref.upgrade(), core_ref.upgrade()) {
                debug!("🔁 Rebinding player events after {}", event);
                bind_relay(&bus, relay, player, &core);
            }
            Ok(())
        });
    };

    forward(core.object_id(), CoreEvent::EnterFullscreen.as_str(), Event::RequestFullscreen);
    forward(core.object_id(), CoreEvent::ExitFullscreen.as_str(), Event::ExitFullscreen);
    let coordinator = core.fullscreen_coordinator();
    if coordinator.is_controlled_by_app() {
        let id = coordinator.object_id();
        forward(id, InternalEvent::WillEnterFullscreen.as_str(), Event::RequestFullscreen);
        forward(id, InternalEvent::WillExitFullscreen.as_str(), Event::ExitFullscreen);
    }

    if let Some(container) = core.active_container() {
        for (from, to) in CONTAINER_EVENTS {
            forward(container.object_id(), from.as_str(), to);
        }
        let playback = container.playback();
        for event in PLAYBACK_EVENTS {
            forward(playback.object_id(), event.as_str(), event);
        }
        if let Some(poster) = container.plugin(PosterPlugin::NAME) {
            for event in POSTER_EVENTS {
                forward(poster.object_id(), event.as_str(), event);
            }
        }
        rebind_on(container.object_id(), InternalEvent::DidChangePlayback);
    }
    rebind_on(core.object_id(), InternalEvent::DidChangeActiveContainer);
}

/// A media player: one [`Core`] plus the player-level event surface.
///
/// Player events (`playing`, `didPause`, `ready`, `error`, ...) are
/// re-emitted here from whichever container and playback are active, so
/// subscriptions made with [`on`](Self::on) survive `load` and container
/// changes.
pub struct Player {
    base: BaseObject,
    relay: BaseObject,
    core: Arc<Core>,
}

impl Player {
    pub fn new(options: Options, external_plugins: Vec<PluginFactory>) -> Self {
        Self::with_environment(options, external_plugins, Environment::default())
    }

    pub fn with_environment(
        options: Options,
        external_plugins: Vec<PluginFactory>,
        environment: Environment,
    ) -> Self {
        let bus = environment.bus.clone();
        let core = Core::new(options, Loader::new(external_plugins), environment);
        let player = Self {
            base: BaseObject::new(bus.clone()),
            relay: BaseObject::new(bus.clone()),
            core,
        };
        bind_relay(&bus, player.relay.id(), player.base.id(), &player.core);
        info!("🎥 Player {} ready", player.base.id());
        player
    }

    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    fn container(&self) -> Option<Arc<Container>> {
        self.core.active_container()
    }

    fn playback(&self) -> Option<Arc<dyn Playback>> {
        self.core.active_playback()
    }

    /// Put the player in `parent` and render it
    pub fn attach_to(&self, parent: &Arc<View>, presenter: Arc<dyn FullscreenPresenter>) {
        self.core.attach(parent, presenter);
        self.core.render();
    }

    /// Load a new source into the active container and start playing it
    pub fn load(&self, source: &str, mime_type: Option<&str>) {
        self.core.load(source, mime_type);
        self.play();
    }

    /// Start playback. Playbacks only emit once the player has been
    /// attached with [`attach_to`](Self::attach_to), so events for a play
    /// issued earlier are not delivered.
    pub fn play(&self) {
        if let Some(container) = self.container() {
            container.play();
        }
    }

    pub fn pause(&self) {
        if let Some(container) = self.container() {
            container.pause();
        }
    }

    pub fn stop(&self) {
        if let Some(container) = self.container() {
            container.stop();
        }
    }

    pub fn seek(&self, position: f64) {
        if let Some(container) = self.container() {
            container.seek(position);
        }
    }

    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.core.set_fullscreen(fullscreen);
    }

    /// Ask the poster to show another image
    pub fn update_poster(&self, url: &str) {
        if let Some(container) = self.container() {
            let mut info = UserInfo::new();
            info.insert(keys::POSTER_URL.to_string(), url.into());
            container.base().trigger(Event::RequestPosterUpdate, Some(&info));
        }
    }

    /// Subscribe to a player event
    pub fn on<F>(&self, event: impl AsRef<str>, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&UserInfo>) -> clappr_events::Result<()> + Send + Sync + 'static,
    {
        self.base.on(event, callback)
    }

    pub fn off(&self, subscription: SubscriptionId) -> bool {
        self.base.off(subscription)
    }

    pub fn is_playing(&self) -> bool {
        self.container().is_some_and(|c| c.is_playing())
    }

    pub fn is_paused(&self) -> bool {
        self.container().is_some_and(|c| c.is_paused())
    }

    pub fn is_buffering(&self) -> bool {
        self.container().is_some_and(|c| c.is_buffering())
    }

    pub fn duration(&self) -> f64 {
        self.container().map_or(0.0, |c| c.duration())
    }

    pub fn position(&self) -> f64 {
        self.container().map_or(0.0, |c| c.position())
    }

    pub fn is_fullscreen(&self) -> bool {
        self.core.is_fullscreen()
    }

    pub fn subtitles(&self) -> Vec<MediaOption> {
        self.container().map(|c| c.subtitles()).unwrap_or_default()
    }

    pub fn audio_sources(&self) -> Vec<MediaOption> {
        self.container().map(|c| c.audio_sources()).unwrap_or_default()
    }

    pub fn selected_subtitle(&self) -> Option<MediaOption> {
        self.playback().and_then(|p| p.selected_subtitle())
    }

    /// Select a subtitle by name or language; `None` turns subtitles off
    pub fn set_selected_subtitle(&self, selector: Option<&str>) {
        if let Some(playback) = self.playback() {
            playback.set_selected_subtitle(selector);
        }
    }

    pub fn selected_audio_source(&self) -> Option<MediaOption> {
        self.playback().and_then(|p| p.selected_audio_source())
    }

    pub fn set_selected_audio_source(&self, selector: Option<&str>) {
        if let Some(playback) = self.playback() {
            playback.set_selected_audio_source(selector);
        }
    }

    pub fn destroy(&self) {
        if self.core.is_destroyed() {
            return;
        }
        self.relay.stop_listening();
        self.core.destroy();
        info!("🛑 Player {} destroyed", self.base.id());
    }
}

impl EventEmitter for Player {
    fn base(&self) -> &BaseObject {
        &self.base
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.base.id())
            .field("core", &self.core)
            .finish()
    }
}
