//! Media control plugin and the playback-control state machine
//!
//! The control button toggles between three states:
//!
//! | current           | playback type | action              | next    |
//! |-------------------|---------------|---------------------|---------|
//! | Paused or Stopped | any           | `container.play()`  | Playing |
//! | Playing           | vod/unknown   | `container.pause()` | Paused  |
//! | Playing           | live          | `container.pause()` | Stopped |
//!
//! Entering `Playing` emits `playing`, entering `Paused` or `Stopped` emits
//! `notPlaying`. Transport events coming from the container keep the state in
//! sync when playback is driven from elsewhere.

use crate::container::Container;
use crate::playback::Playback;
use crate::plugin::{ContainerPlugin, NamedPlugin, Plugin, PluginKind};
use crate::view::View;
use clappr_events::{payload, BaseObject, ContainerEvent, Event, EventBus, EventEmitter, MediaControlEvent};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackControlState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Render seconds as `MM:SS`, or `HH:MM:SS` from one hour on
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[derive(Debug)]
struct ControlState {
    playback_control_state: PlaybackControlState,
    controls_hidden: bool,
    fullscreen: bool,
    fullscreen_button_hidden: bool,
    labels_hidden: bool,
    current_time: String,
    duration: String,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            playback_control_state: PlaybackControlState::default(),
            controls_hidden: true,
            fullscreen: false,
            fullscreen_button_hidden: false,
            labels_hidden: false,
            current_time: format_time(0.0),
            duration: format_time(0.0),
        }
    }
}

pub struct MediaControl {
    base: BaseObject,
    weak_self: Weak<MediaControl>,
    view: Arc<View>,
    container: Mutex<Weak<Container>>,
    state: Mutex<ControlState>,
}

impl NamedPlugin for MediaControl {
    const NAME: &'static str = "MediaControl";
}

impl MediaControl {
    pub fn new(bus: Arc<EventBus>) -> Arc<Self> {
        let view = View::new(Self::NAME);
        view.set_hidden(true);
        Arc::new_cyclic(|weak_self| Self {
            base: BaseObject::new(bus),
            weak_self: weak_self.clone(),
            view,
            container: Mutex::new(Weak::new()),
            state: Mutex::new(ControlState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn container(&self) -> Option<Arc<Container>> {
        self.container
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
    }

    /// Bind to `container` and to its current playback without registering as
    /// one of its plugins. Plugins added through
    /// [`Container::add_plugin`] are set up automatically.
    pub fn setup(&self, container: &Arc<Container>) {
        ContainerPlugin::bind_container(self, container);
        self.bind_playback(&container.playback());
    }

    pub fn playback_control_state(&self) -> PlaybackControlState {
        self.state().playback_control_state
    }

    /// Force the state without emitting anything
    pub fn set_playback_control_state(&self, state: PlaybackControlState) {
        self.state().playback_control_state = state;
    }

    /// Activation of the play/pause button
    pub fn toggle_playback(&self) {
        let Some(container) = self.container() else {
            warn!("⚠️ Media control toggled without a container");
            return;
        };
        match self.playback_control_state() {
            PlaybackControlState::Paused | PlaybackControlState::Stopped => {
                container.play();
                self.transition_to(PlaybackControlState::Playing);
            }
            PlaybackControlState::Playing => {
                let next = paused_state_for(&container);
                container.pause();
                self.transition_to(next);
            }
        }
    }

    fn transition_to(&self, next: PlaybackControlState) {
        {
            let mut state = self.state();
            if state.playback_control_state == next {
                return;
            }
            debug!("🎛️ Playback control {:?} -> {:?}", state.playback_control_state, next);
            state.playback_control_state = next;
        }
        let event = match next {
            PlaybackControlState::Playing => MediaControlEvent::Playing,
            PlaybackControlState::Paused | PlaybackControlState::Stopped => MediaControlEvent::NotPlaying,
        };
        self.base.trigger(event, None);
    }

    pub fn controls_hidden(&self) -> bool {
        self.state().controls_hidden
    }

    /// Show the controls. Does nothing while the container disables media control.
    pub fn show(&self) {
        if !self.container().is_some_and(|c| c.media_control_enabled()) {
            return;
        }
        self.state().controls_hidden = false;
        self.view.set_hidden(false);
        self.base.trigger(MediaControlEvent::Show, None);
    }

    pub fn hide(&self) {
        self.state().controls_hidden = true;
        self.view.set_hidden(true);
        self.base.trigger(MediaControlEvent::Hide, None);
    }

    pub fn fullscreen(&self) -> bool {
        self.state().fullscreen
    }

    /// Reflect the actual fullscreen state; the core keeps this in sync.
    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.state().fullscreen = fullscreen;
    }

    pub fn fullscreen_button_hidden(&self) -> bool {
        self.state().fullscreen_button_hidden
    }

    /// Activation of the fullscreen button: asks for the opposite of the current state
    pub fn toggle_fullscreen(&self) {
        let (hidden, fullscreen) = {
            let state = self.state();
            (state.fullscreen_button_hidden, state.fullscreen)
        };
        if hidden {
            return;
        }
        let event = if fullscreen {
            MediaControlEvent::FullscreenExit
        } else {
            MediaControlEvent::FullscreenEnter
        };
        self.base.trigger(event, None);
    }

    pub fn labels_hidden(&self) -> bool {
        self.state().labels_hidden
    }

    pub fn current_time_label(&self) -> String {
        self.state().current_time.clone()
    }

    pub fn duration_label(&self) -> String {
        self.state().duration.clone()
    }

    fn on_container<F>(&self, container: &Container, event: ContainerEvent, action: F)
    where
        F: Fn(&MediaControl, &Container) + Send + Sync + 'static,
    {
        let media_control = self.weak_self.clone();
        let weak_container = container.weak();
        self.base.listen_to(container, event, move |_| {
            if let (Some(media_control), Some(container)) = (media_control.upgrade(), weak_container.upgrade()) {
                action(&media_control, &container);
            }
            Ok(())
        });
    }
}

fn paused_state_for(container: &Container) -> PlaybackControlState {
    if container.playback_type().is_live() {
        PlaybackControlState::Stopped
    } else {
        PlaybackControlState::Paused
    }
}

impl EventEmitter for MediaControl {
    fn base(&self) -> &BaseObject {
        &self.base
    }
}

impl Plugin for MediaControl {
    fn plugin_name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::UiContainer
    }

    fn view(&self) -> Option<&Arc<View>> {
        Some(&self.view)
    }
}

impl ContainerPlugin for MediaControl {
    fn bind_container(&self, container: &Arc<Container>) {
        self.base.stop_listening();
        *self.container.lock().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(container);
        self.state().fullscreen_button_hidden = container.options().unboxed().fullscreen_disabled();

        self.on_container(container, ContainerEvent::Play, |mc, _| {
            mc.transition_to(PlaybackControlState::Playing)
        });
        self.on_container(container, ContainerEvent::Pause, |mc, container| {
            mc.transition_to(paused_state_for(container))
        });
        self.on_container(container, ContainerEvent::Stop, |mc, _| {
            mc.transition_to(PlaybackControlState::Stopped)
        });
        self.on_container(container, ContainerEvent::Ended, |mc, _| {
            mc.transition_to(PlaybackControlState::Stopped)
        });
        self.on_container(container, ContainerEvent::Ready, |mc, container| {
            mc.state().labels_hidden = container.playback_type().is_live();
        });
        self.on_container(container, ContainerEvent::MediaControlEnabled, |mc, _| mc.show());
        self.on_container(container, ContainerEvent::MediaControlDisabled, |mc, _| mc.hide());
    }

    fn bind_playback(&self, playback: &Arc<dyn Playback>) {
        let media_control = self.weak_self.clone();
        self.base.listen_to(&**playback, Event::TimeUpdated, move |info| {
            let position = payload::number(info, "position")?;
            if let Some(media_control) = media_control.upgrade() {
                media_control.state().current_time = format_time(position);
            }
            Ok(())
        });

        let media_control = self.weak_self.clone();
        let weak_playback = Arc::downgrade(playback);
        self.base.listen_to(&**playback, Event::Ready, move |_| {
            if let (Some(media_control), Some(playback)) = (media_control.upgrade(), weak_playback.upgrade()) {
                media_control.state().duration = format_time(playback.duration());
            }
            Ok(())
        });
    }
}

impl fmt::Debug for MediaControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaControl")
            .field("id", &self.object_id())
            .field("state", &*self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{keys, Options};
    use crate::playback::PlaybackType;
    use clappr_events::payload::user_info;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StubPlayback {
        base: BaseObject,
        playing: AtomicBool,
        live: AtomicBool,
    }

    impl StubPlayback {
        fn new(bus: Arc<EventBus>) -> Arc<Self> {
            Arc::new(Self {
                base: BaseObject::new(bus),
                playing: AtomicBool::new(false),
                live: AtomicBool::new(false),
            })
        }

        fn set_live(&self, live: bool) {
            self.live.store(live, Ordering::SeqCst);
        }
    }

    impl EventEmitter for StubPlayback {
        fn base(&self) -> &BaseObject {
            &self.base
        }
    }

    impl Playback for StubPlayback {
        fn plugin_name(&self) -> &str {
            "Playback"
        }

        fn source(&self) -> Option<String> {
            Some("http://globo.com/video.mp4".into())
        }

        fn playback_type(&self) -> PlaybackType {
            if self.live.load(Ordering::SeqCst) {
                PlaybackType::Live
            } else {
                PlaybackType::Vod
            }
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }

        fn duration(&self) -> f64 {
            30.0
        }

        fn play(&self) {
            self.playing.store(true, Ordering::SeqCst);
        }

        fn pause(&self) {
            self.playing.store(false, Ordering::SeqCst);
        }
    }

    struct Fixture {
        playback: Arc<StubPlayback>,
        container: Arc<Container>,
        media_control: Arc<MediaControl>,
    }

    fn fixture(options: Options) -> Fixture {
        let bus = EventBus::shared();
        let playback = StubPlayback::new(bus.clone());
        let container = Container::with_playback(playback.clone(), options);
        let media_control = MediaControl::new(bus);
        media_control.setup(&container);
        Fixture {
            playback,
            container,
            media_control,
        }
    }

    fn counter(media_control: &MediaControl, event: MediaControlEvent) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        media_control.base().on(event, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        count
    }

    #[test]
    fn test_setup_keeps_container_reference() {
        let f = fixture(Options::new());
        let container = f.media_control.container().unwrap();
        assert_eq!(container.object_id(), f.container.object_id());
        assert_eq!(f.media_control.playback_control_state(), PlaybackControlState::Stopped);
    }

    #[test]
    fn test_visibility_follows_media_control_flag() {
        let f = fixture(Options::new());
        assert!(f.media_control.controls_hidden());

        f.media_control.show();
        assert!(f.media_control.controls_hidden());

        f.container.set_media_control_enabled(true);
        assert!(!f.media_control.controls_hidden());
        assert!(!f.media_control.view().unwrap().is_hidden());

        f.media_control.hide();
        assert!(f.media_control.controls_hidden());
        f.media_control.show();
        assert!(!f.media_control.controls_hidden());

        f.container.set_media_control_enabled(false);
        assert!(f.media_control.controls_hidden());
    }

    #[test]
    fn test_toggle_plays_when_paused_or_stopped() {
        for initial in [PlaybackControlState::Paused, PlaybackControlState::Stopped] {
            let f = fixture(Options::new());
            let playing = counter(&f.media_control, MediaControlEvent::Playing);
            f.media_control.set_playback_control_state(initial);

            f.media_control.toggle_playback();
            assert!(f.container.is_playing());
            assert_eq!(f.media_control.playback_control_state(), PlaybackControlState::Playing);
            assert_eq!(playing.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_toggle_pauses_vod() {
        let f = fixture(Options::new());
        f.media_control.set_playback_control_state(PlaybackControlState::Playing);
        let not_playing = counter(&f.media_control, MediaControlEvent::NotPlaying);

        f.media_control.toggle_playback();
        assert!(!f.container.is_playing());
        assert_eq!(f.media_control.playback_control_state(), PlaybackControlState::Paused);
        assert_eq!(not_playing.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_toggle_stops_live() {
        let f = fixture(Options::new());
        f.media_control.set_playback_control_state(PlaybackControlState::Playing);
        f.playback.set_live(true);
        f.container.base().trigger(ContainerEvent::Ready, None);
        let not_playing = counter(&f.media_control, MediaControlEvent::NotPlaying);

        f.media_control.toggle_playback();
        assert!(!f.container.is_playing());
        assert_eq!(f.media_control.playback_control_state(), PlaybackControlState::Stopped);
        assert_eq!(not_playing.load(Ordering::SeqCst), 1);
        assert!(f.media_control.labels_hidden());
    }

    #[test]
    fn test_toggle_sequence_reads_type_at_toggle_time() {
        let f = fixture(Options::new());
        let playing = counter(&f.media_control, MediaControlEvent::Playing);
        let not_playing = counter(&f.media_control, MediaControlEvent::NotPlaying);

        f.media_control.toggle_playback();
        assert_eq!(f.media_control.playback_control_state(), PlaybackControlState::Playing);
        f.media_control.toggle_playback();
        assert_eq!(f.media_control.playback_control_state(), PlaybackControlState::Paused);
        f.media_control.toggle_playback();
        f.playback.set_live(true);
        f.media_control.toggle_playback();
        assert_eq!(f.media_control.playback_control_state(), PlaybackControlState::Stopped);

        assert_eq!(playing.load(Ordering::SeqCst), 2);
        assert_eq!(not_playing.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_time_labels() {
        let f = fixture(Options::new());
        assert_eq!(f.media_control.current_time_label(), "00:00");
        assert_eq!(f.media_control.duration_label(), "00:00");

        let info = user_info(json!({"position": 78.0}));
        f.playback.base().trigger(Event::TimeUpdated, Some(&info));
        assert_eq!(f.media_control.current_time_label(), "01:18");

        f.playback.base().trigger(Event::Ready, None);
        assert_eq!(f.media_control.duration_label(), "00:30");
    }

    #[test]
    fn test_ended_forces_stopped() {
        let f = fixture(Options::new());
        f.media_control.set_playback_control_state(PlaybackControlState::Playing);
        f.container.base().trigger(ContainerEvent::Ended, None);
        assert_eq!(f.media_control.playback_control_state(), PlaybackControlState::Stopped);
    }

    #[test]
    fn test_fullscreen_button() {
        let f = fixture(Options::new());
        assert!(!f.media_control.fullscreen_button_hidden());
        let enter = counter(&f.media_control, MediaControlEvent::FullscreenEnter);
        let exit = counter(&f.media_control, MediaControlEvent::FullscreenExit);

        f.media_control.toggle_fullscreen();
        f.media_control.set_fullscreen(true);
        f.media_control.toggle_fullscreen();
        assert_eq!(enter.load(Ordering::SeqCst), 1);
        assert_eq!(exit.load(Ordering::SeqCst), 1);

        let disabled = fixture(Options::new().with(keys::FULLSCREEN_DISABLED, true));
        assert!(disabled.media_control.fullscreen_button_hidden());
        let enter = counter(&disabled.media_control, MediaControlEvent::FullscreenEnter);
        disabled.media_control.toggle_fullscreen();
        assert_eq!(enter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(59.9), "00:59");
        assert_eq!(format_time(3599.0), "59:59");
        assert_eq!(format_time(3600.0), "01:00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
        assert_eq!(format_time(-4.0), "00:00");
    }
}
