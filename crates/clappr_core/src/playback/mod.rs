//! Playback abstraction and the built-in implementations

mod media;
mod no_op;

pub use media::{MediaPlayback, MediaPlaybackFactory, MediaProfile, MediaTransport, NullTransport};
pub use no_op::{NoOpPlayback, NoOpPlaybackFactory};

use crate::context::PluginContext;
use clappr_events::EventEmitter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Nature of the media being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackType {
    Vod,
    Live,
    #[default]
    Unknown,
}

impl PlaybackType {
    pub fn is_live(self) -> bool {
        matches!(self, PlaybackType::Live)
    }
}

impl fmt::Display for PlaybackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackType::Vod => "vod",
            PlaybackType::Live => "live",
            PlaybackType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Selectable subtitle or audio track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaOption {
    pub name: String,
    pub language: Option<String>,
}

impl MediaOption {
    pub fn new(name: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            name: name.into(),
            language: language.map(str::to_string),
        }
    }

    /// Whether `selector` designates this track, by name or by language
    pub fn matches(&self, selector: &str) -> bool {
        self.name == selector || self.language.as_deref() == Some(selector)
    }
}

/// A single media source and its transport.
///
/// Playbacks report everything through their own events
/// ([`Event`](clappr_events::Event) names); the container they are loaded in
/// forwards the subset its listeners care about. A playback must not emit
/// anything before [`activate`](Self::activate) is called.
pub trait Playback: EventEmitter + Send + Sync + 'static {
    fn plugin_name(&self) -> &str;

    fn source(&self) -> Option<String>;

    fn playback_type(&self) -> PlaybackType {
        PlaybackType::Unknown
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn is_buffering(&self) -> bool {
        false
    }

    fn duration(&self) -> f64 {
        0.0
    }

    fn position(&self) -> f64 {
        0.0
    }

    fn subtitles(&self) -> Vec<MediaOption> {
        Vec::new()
    }

    fn audio_sources(&self) -> Vec<MediaOption> {
        Vec::new()
    }

    fn selected_subtitle(&self) -> Option<MediaOption> {
        None
    }

    fn set_selected_subtitle(&self, _selector: Option<&str>) {}

    fn selected_audio_source(&self) -> Option<MediaOption> {
        None
    }

    fn set_selected_audio_source(&self, _selector: Option<&str>) {}

    fn play(&self) {}

    fn pause(&self) {}

    fn stop(&self) {}

    fn seek(&self, _position: f64) {}

    /// The playback is installed and every listener is bound
    fn activate(&self) {}

    /// Tear down both sides of every binding involving this playback
    fn destroy(&self) {
        let base = self.base();
        base.stop_listening();
        base.bus().remove_emitter(base.id());
    }
}

/// Builds playbacks for the sources it recognizes
pub trait PlaybackFactory: Send + Sync {
    fn name(&self) -> &str;

    fn can_play(&self, source: &str, mime_type: Option<&str>) -> bool;

    fn create(
        &self,
        context: &PluginContext,
        source: Option<&str>,
        mime_type: Option<&str>,
    ) -> Arc<dyn Playback>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_option_matching() {
        let option = MediaOption::new("Português", Some("pt"));
        assert!(option.matches("pt"));
        assert!(option.matches("Português"));
        assert!(!option.matches("en"));
        assert!(!MediaOption::new("Off", None).matches("pt"));
    }

    #[test]
    fn test_playback_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlaybackType::Live).unwrap(), "\"live\"");
        assert_eq!(PlaybackType::Vod.to_string(), "vod");
        assert!(PlaybackType::Live.is_live());
        assert!(!PlaybackType::Unknown.is_live());
    }
}
