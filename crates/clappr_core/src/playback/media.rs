//! Platform media playback
//!
//! `MediaPlayback` keeps the transport state the rest of the player reads and
//! turns it into events. Decoding and rendering happen behind a
//! [`MediaTransport`]; whatever drives the platform player reports back
//! through the `report_*` methods.

use super::{MediaOption, Playback, PlaybackFactory, PlaybackType};
use crate::context::PluginContext;
use clappr_events::{payload, BaseObject, Event, EventEmitter, UserInfo};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use url::Url;

/// The source families a media playback is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaProfile {
    /// Plain files: mp4, m4v, mov, mp3
    Progressive,
    /// HLS manifests
    Adaptive,
}

impl MediaProfile {
    pub fn playback_name(self) -> &'static str {
        match self {
            MediaProfile::Progressive => "MediaPlayback",
            MediaProfile::Adaptive => "AdaptiveMediaPlayback",
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaProfile::Progressive => &["mp4", "m4v", "mov", "mp3"],
            MediaProfile::Adaptive => &["m3u8"],
        }
    }

    fn mime_types(self) -> &'static [&'static str] {
        match self {
            MediaProfile::Progressive => &["video/mp4", "video/x-m4v", "video/quicktime", "audio/mpeg", "audio/mp3"],
            MediaProfile::Adaptive => &[
                "application/x-mpegurl",
                "application/vnd.apple.mpegurl",
                "audio/mpegurl",
                "audio/x-mpegurl",
            ],
        }
    }

    /// Match on the MIME type first, then on the extension of the URL path
    pub fn can_play(self, source: &str, mime_type: Option<&str>) -> bool {
        if let Some(mime_type) = mime_type {
            let mime_type = mime_type.trim().to_ascii_lowercase();
            if self.mime_types().contains(&mime_type.as_str()) {
                return true;
            }
        }
        source_extension(source).is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }
}

fn source_extension(source: &str) -> Option<String> {
    let path = match Url::parse(source) {
        Ok(url) => url.path().to_string(),
        Err(_) => source.split(['?', '#']).next().unwrap_or(source).to_string(),
    };
    let file = path.rsplit('/').next()?;
    let (_, extension) = file.rsplit_once('.')?;
    Some(extension.to_ascii_lowercase())
}

/// The platform side of a media playback
pub trait MediaTransport: Send + Sync {
    fn open(&self, _source: &str, _mime_type: Option<&str>) {}
    fn play(&self) {}
    fn pause(&self) {}
    fn stop(&self) {}
    fn seek(&self, _position: f64) {}
    fn select_subtitle(&self, _option: Option<&MediaOption>) {}
    fn select_audio_source(&self, _option: Option<&MediaOption>) {}
}

/// Transport that does nothing, used when the host registered none
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl MediaTransport for NullTransport {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportState {
    Idle,
    Playing,
    Paused,
    Stopped,
    Buffering,
}

#[derive(Debug)]
struct MediaState {
    transport: TransportState,
    playback_type: PlaybackType,
    duration: f64,
    position: f64,
    subtitles: Vec<MediaOption>,
    audio_sources: Vec<MediaOption>,
    selected_subtitle: Option<MediaOption>,
    selected_audio_source: Option<MediaOption>,
}

#[derive(Debug, Clone, Copy)]
enum Track {
    Subtitle,
    Audio,
}

/// Playback backed by the platform media player
pub struct MediaPlayback {
    base: BaseObject,
    profile: MediaProfile,
    source: Option<String>,
    mime_type: Option<String>,
    start_at: f64,
    default_subtitle: Option<String>,
    default_audio_source: Option<String>,
    transport: Arc<dyn MediaTransport>,
    active: AtomicBool,
    state: Mutex<MediaState>,
}

impl MediaPlayback {
    pub fn new(
        context: &PluginContext,
        profile: MediaProfile,
        source: Option<&str>,
        mime_type: Option<&str>,
    ) -> Self {
        let options = context.options().unboxed();
        let transport = context
            .get_provider::<Arc<dyn MediaTransport>>()
            .cloned()
            .unwrap_or_else(|| Arc::new(NullTransport));

        Self {
            base: BaseObject::new(context.bus().clone()),
            profile,
            source: source.map(str::to_string),
            mime_type: mime_type.map(str::to_string),
            start_at: options.start_at(),
            default_subtitle: options.default_subtitle().map(str::to_string),
            default_audio_source: options.default_audio_source().map(str::to_string),
            transport,
            active: AtomicBool::new(false),
            state: Mutex::new(MediaState {
                transport: TransportState::Idle,
                playback_type: PlaybackType::Unknown,
                duration: 0.0,
                position: 0.0,
                subtitles: Vec::new(),
                audio_sources: Vec::new(),
                selected_subtitle: None,
                selected_audio_source: None,
            }),
        }
    }

    pub fn profile(&self) -> MediaProfile {
        self.profile
    }

    fn state(&self) -> MutexGuard<'_, MediaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: Event, info: Option<&UserInfo>) {
        if !self.active.load(Ordering::Acquire) {
            debug!("Dropping {} from inactive playback {}", event, self.object_id());
            return;
        }
        self.base.trigger(event, info);
    }

    /// The media is loaded and its properties are known
    pub fn report_ready(
        &self,
        duration: f64,
        playback_type: PlaybackType,
        subtitles: Vec<MediaOption>,
        audio_sources: Vec<MediaOption>,
    ) {
        {
            let mut state = self.state();
            state.duration = duration.max(0.0);
            state.playback_type = playback_type;
            state.subtitles = subtitles;
            state.audio_sources = audio_sources;
        }

        if let Some(selector) = self.default_subtitle.as_deref() {
            self.select(Track::Subtitle, Some(selector));
        }
        if let Some(selector) = self.default_audio_source.as_deref() {
            self.select(Track::Audio, Some(selector));
        }
        if self.start_at > 0.0 && !playback_type.is_live() {
            self.seek(self.start_at);
        }

        let info = payload::user_info(json!({
            "duration": duration,
            "playbackType": playback_type,
        }));
        self.emit(Event::Ready, Some(&info));
    }

    pub fn report_time(&self, position: f64) {
        let duration = {
            let mut state = self.state();
            state.position = position;
            state.duration
        };
        let info = payload::user_info(json!({"position": position, "duration": duration}));
        self.emit(Event::TimeUpdated, Some(&info));
    }

    pub fn report_buffer(&self, end_position: f64) {
        let duration = self.state().duration;
        let info = payload::user_info(json!({
            "start_position": 0.0,
            "end_position": end_position,
            "duration": duration,
        }));
        self.emit(Event::BufferUpdate, Some(&info));
    }

    pub fn report_stalled(&self) {
        {
            let mut state = self.state();
            if state.transport == TransportState::Playing {
                state.transport = TransportState::Buffering;
            }
        }
        self.emit(Event::Stalled, None);
    }

    /// Playback resumed on its own, typically after a stall
    pub fn report_playing(&self) {
        {
            let mut state = self.state();
            if state.transport == TransportState::Playing {
                return;
            }
            state.transport = TransportState::Playing;
        }
        self.emit(Event::Playing, None);
    }

    pub fn report_ended(&self) {
        {
            let mut state = self.state();
            state.transport = TransportState::Idle;
            state.position = state.duration;
        }
        self.emit(Event::DidComplete, None);
    }

    pub fn report_error(&self, message: &str, code: i64) {
        warn!("⚠️ Playback {} failed: {} ({})", self.profile.playback_name(), message, code);
        self.state().transport = TransportState::Idle;
        let info = payload::user_info(json!({"message": message, "code": code}));
        self.emit(Event::Error, Some(&info));
    }

    fn select(&self, track: Track, selector: Option<&str>) {
        let selected = {
            let mut state = self.state();
            let candidates = match track {
                Track::Subtitle => &state.subtitles,
                Track::Audio => &state.audio_sources,
            };
            let option = selector.and_then(|s| candidates.iter().find(|o| o.matches(s)).cloned());
            if let (Some(selector), None) = (selector, &option) {
                warn!("No {:?} track matches {}", track, selector);
                return;
            }
            match track {
                Track::Subtitle => state.selected_subtitle = option.clone(),
                Track::Audio => state.selected_audio_source = option.clone(),
            }
            option
        };

        let event = match track {
            Track::Subtitle => {
                self.transport.select_subtitle(selected.as_ref());
                Event::DidSelectSubtitle
            }
            Track::Audio => {
                self.transport.select_audio_source(selected.as_ref());
                Event::DidSelectAudio
            }
        };
        let option = serde_json::to_value(&selected).unwrap_or_default();
        let info = payload::user_info(json!({"mediaOption": option}));
        self.emit(event, Some(&info));
    }
}

impl EventEmitter for MediaPlayback {
    fn base(&self) -> &BaseObject {
        &self.base
    }
}

impl Playback for MediaPlayback {
    fn plugin_name(&self) -> &str {
        self.profile.playback_name()
    }

    fn source(&self) -> Option<String> {
        self.source.clone()
    }

    fn playback_type(&self) -> PlaybackType {
        self.state().playback_type
    }

    fn is_playing(&self) -> bool {
        self.state().transport == TransportState::Playing
    }

    fn is_paused(&self) -> bool {
        self.state().transport == TransportState::Paused
    }

    fn is_buffering(&self) -> bool {
        self.state().transport == TransportState::Buffering
    }

    fn duration(&self) -> f64 {
        self.state().duration
    }

    fn position(&self) -> f64 {
        self.state().position
    }

    fn subtitles(&self) -> Vec<MediaOption> {
        self.state().subtitles.clone()
    }

    fn audio_sources(&self) -> Vec<MediaOption> {
        self.state().audio_sources.clone()
    }

    fn selected_subtitle(&self) -> Option<MediaOption> {
        self.state().selected_subtitle.clone()
    }

    fn set_selected_subtitle(&self, selector: Option<&str>) {
        self.select(Track::Subtitle, selector);
    }

    fn selected_audio_source(&self) -> Option<MediaOption> {
        self.state().selected_audio_source.clone()
    }

    fn set_selected_audio_source(&self, selector: Option<&str>) {
        self.select(Track::Audio, selector);
    }

    fn play(&self) {
        {
            let mut state = self.state();
            if state.transport == TransportState::Playing {
                return;
            }
            state.transport = TransportState::Playing;
        }
        self.transport.play();
        self.emit(Event::Playing, None);
    }

    fn pause(&self) {
        {
            let mut state = self.state();
            if !matches!(state.transport, TransportState::Playing | TransportState::Buffering) {
                return;
            }
            state.transport = TransportState::Paused;
        }
        self.transport.pause();
        self.emit(Event::DidPause, None);
    }

    fn stop(&self) {
        {
            let mut state = self.state();
            if state.transport == TransportState::Stopped {
                return;
            }
            state.transport = TransportState::Stopped;
            state.position = 0.0;
        }
        self.transport.stop();
        self.emit(Event::DidStop, None);
    }

    fn seek(&self, position: f64) {
        let position = {
            let mut state = self.state();
            let mut target = position.max(0.0);
            if state.duration > 0.0 && !state.playback_type.is_live() {
                target = target.min(state.duration);
            }
            state.position = target;
            target
        };
        self.transport.seek(position);
        let info = payload::user_info(json!({"position": position}));
        self.emit(Event::DidSeek, Some(&info));
    }

    fn activate(&self) {
        if self.active.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.source.as_deref() {
            Some(source) => {
                debug!("▶️ Opening {} with {}", source, self.profile.playback_name());
                self.transport.open(source, self.mime_type.as_deref());
            }
            None => debug!("{} activated without a source", self.profile.playback_name()),
        }
    }
}

impl std::fmt::Debug for MediaPlayback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlayback")
            .field("profile", &self.profile)
            .field("source", &self.source)
            .field("state", &*self.state())
            .finish()
    }
}

/// Factory registered once per [`MediaProfile`]
#[derive(Debug, Clone, Copy)]
pub struct MediaPlaybackFactory {
    profile: MediaProfile,
}

impl MediaPlaybackFactory {
    pub fn new(profile: MediaProfile) -> Self {
        Self { profile }
    }

    pub fn progressive() -> Self {
        Self::new(MediaProfile::Progressive)
    }

    pub fn adaptive() -> Self {
        Self::new(MediaProfile::Adaptive)
    }
}

impl PlaybackFactory for MediaPlaybackFactory {
    fn name(&self) -> &str {
        self.profile.playback_name()
    }

    fn can_play(&self, source: &str, mime_type: Option<&str>) -> bool {
        self.profile.can_play(source, mime_type)
    }

    fn create(
        &self,
        context: &PluginContext,
        source: Option<&str>,
        mime_type: Option<&str>,
    ) -> Arc<dyn Playback> {
        Arc::new(MediaPlayback::new(context, self.profile, source, mime_type))
    }
}
