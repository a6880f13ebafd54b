//! Player options bag and its typed, defaulted view
//!
//! The bag is deliberately untyped: hosts hand over whatever they have, and
//! [`OptionsUnboxer`] reads it back with a default for every recognized key.
//! A value of the wrong type is treated exactly like a missing one.

use crate::media_control::MediaControl;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Recognized option keys
pub mod keys {
    /// Media source URL (`String`)
    pub const SOURCE_URL: &str = "sourceUrl";
    /// Poster artwork URL (`String`)
    pub const POSTER_URL: &str = "posterUrl";
    /// Pre-built [`MediaControl`](crate::MediaControl) replacing the default one
    pub const MEDIA_CONTROL: &str = "mediaControl";
    /// Start in fullscreen (`bool`)
    pub const FULLSCREEN: &str = "fullscreen";
    /// Hide the fullscreen button (`bool`)
    pub const FULLSCREEN_DISABLED: &str = "fullscreenDisabled";
    /// The host application performs fullscreen transitions (`bool`)
    pub const FULLSCREEN_BY_APP: &str = "fullscreenByApp";
    /// Initial position in seconds (number)
    pub const START_AT: &str = "startAt";
    /// Start playing once attached (`bool`)
    pub const AUTOPLAY: &str = "autoplay";
    /// Message shown when no playback can handle the source (`String`)
    pub const PLAYBACK_NOT_SUPPORTED_MESSAGE: &str = "playbackNotSupportedMessage";
    /// Media MIME type (`String`)
    pub const MIME_TYPE: &str = "mimeType";
    /// Subtitle track selected once the media is ready (`String`)
    pub const DEFAULT_SUBTITLE: &str = "defaultSubtitle";
    /// Audio track selected once the media is ready (`String`)
    pub const DEFAULT_AUDIO_SOURCE: &str = "defaultAudioSource";
}

/// Default not-supported message
pub const DEFAULT_PLAYBACK_NOT_SUPPORTED_MESSAGE: &str = "Unable to play this media";

/// A single value of the options bag
#[derive(Clone)]
pub enum OptionValue {
    /// Any plain value
    Json(Value),
    /// A media control instance
    MediaControl(Arc<MediaControl>),
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Json(value) => f.debug_tuple("Json").field(value).finish(),
            OptionValue::MediaControl(_) => f.write_str("MediaControl(..)"),
        }
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        OptionValue::Json(value)
    }
}

impl From<Arc<MediaControl>> for OptionValue {
    fn from(media_control: Arc<MediaControl>) -> Self {
        OptionValue::MediaControl(media_control)
    }
}

/// String-keyed bag of heterogeneous option values
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: HashMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a plain value
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values
            .insert(key.to_string(), OptionValue::Json(value.into()));
        self
    }

    /// Builder-style insertion of a media control
    pub fn with_media_control(mut self, media_control: Arc<MediaControl>) -> Self {
        self.values.insert(
            keys::MEDIA_CONTROL.to_string(),
            OptionValue::MediaControl(media_control),
        );
        self
    }

    /// Build a bag from a JSON object. Non-object values give an empty bag.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from(map),
            _ => Self::default(),
        }
    }

    /// Parse a bag from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(value))
    }

    pub fn insert(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Plain value stored under `key`, if any
    pub fn json(&self, key: &str) -> Option<&Value> {
        match self.values.get(key) {
            Some(OptionValue::Json(value)) => Some(value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Typed view over this bag
    pub fn unboxed(&self) -> OptionsUnboxer<'_> {
        OptionsUnboxer::new(self)
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            values: map
                .into_iter()
                .map(|(key, value)| (key, OptionValue::Json(value)))
                .collect(),
        }
    }
}

/// Typed, defaulted, read-only view over an [`Options`] bag.
#[derive(Debug, Clone, Copy)]
pub struct OptionsUnboxer<'a> {
    options: &'a Options,
}

impl<'a> OptionsUnboxer<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    fn bool(&self, key: &str) -> bool {
        self.options
            .json(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn string(&self, key: &str) -> Option<&'a str> {
        self.options.json(key).and_then(Value::as_str)
    }

    pub fn source_url(&self) -> Option<&'a str> {
        self.string(keys::SOURCE_URL)
    }

    pub fn poster_url(&self) -> Option<&'a str> {
        self.string(keys::POSTER_URL)
    }

    pub fn mime_type(&self) -> Option<&'a str> {
        self.string(keys::MIME_TYPE)
    }

    pub fn media_control(&self) -> Option<Arc<MediaControl>> {
        match self.options.get(keys::MEDIA_CONTROL) {
            Some(OptionValue::MediaControl(media_control)) => Some(media_control.clone()),
            _ => None,
        }
    }

    pub fn fullscreen(&self) -> bool {
        self.bool(keys::FULLSCREEN)
    }

    pub fn fullscreen_disabled(&self) -> bool {
        self.bool(keys::FULLSCREEN_DISABLED)
    }

    pub fn fullscreen_controlled_by_app(&self) -> bool {
        self.bool(keys::FULLSCREEN_BY_APP)
    }

    /// Start position in seconds. Negative or non-finite values read as 0.
    pub fn start_at(&self) -> f64 {
        self.options
            .json(keys::START_AT)
            .and_then(Value::as_f64)
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .unwrap_or(0.0)
    }

    pub fn autoplay(&self) -> bool {
        self.bool(keys::AUTOPLAY)
    }

    pub fn playback_not_supported_message(&self) -> &'a str {
        self.string(keys::PLAYBACK_NOT_SUPPORTED_MESSAGE)
            .unwrap_or(DEFAULT_PLAYBACK_NOT_SUPPORTED_MESSAGE)
    }

    pub fn default_subtitle(&self) -> Option<&'a str> {
        self.string(keys::DEFAULT_SUBTITLE)
    }

    pub fn default_audio_source(&self) -> Option<&'a str> {
        self.string(keys::DEFAULT_AUDIO_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_empty_bag() {
        let options = Options::new();
        let unboxer = options.unboxed();

        assert!(!unboxer.fullscreen());
        assert!(!unboxer.fullscreen_controlled_by_app());
        assert!(!unboxer.fullscreen_disabled());
        assert!(!unboxer.autoplay());
        assert_eq!(unboxer.start_at(), 0.0);
        assert_eq!(unboxer.source_url(), None);
        assert_eq!(unboxer.poster_url(), None);
        assert_eq!(unboxer.mime_type(), None);
        assert_eq!(unboxer.default_subtitle(), None);
        assert_eq!(unboxer.default_audio_source(), None);
        assert!(unboxer.media_control().is_none());
        assert_eq!(
            unboxer.playback_not_supported_message(),
            DEFAULT_PLAYBACK_NOT_SUPPORTED_MESSAGE
        );
    }

    #[test]
    fn test_set_values_are_read_back() {
        let options = Options::new()
            .with(keys::FULLSCREEN, true)
            .with(keys::FULLSCREEN_BY_APP, true)
            .with(keys::START_AT, 12.5)
            .with(keys::SOURCE_URL, "http://x/video.mp4")
            .with(keys::PLAYBACK_NOT_SUPPORTED_MESSAGE, "nope")
            .with(keys::DEFAULT_SUBTITLE, "pt");
        let unboxer = options.unboxed();

        assert!(unboxer.fullscreen());
        assert!(unboxer.fullscreen_controlled_by_app());
        assert_eq!(unboxer.start_at(), 12.5);
        assert_eq!(unboxer.source_url(), Some("http://x/video.mp4"));
        assert_eq!(unboxer.playback_not_supported_message(), "nope");
        assert_eq!(unboxer.default_subtitle(), Some("pt"));
    }

    #[test]
    fn test_wrong_types_fall_back_to_defaults() {
        let options = Options::from_json(json!({
            "fullscreen": "yes",
            "autoplay": 1,
            "startAt": "ten",
            "sourceUrl": 42,
            "mediaControl": "custom",
        }));
        let unboxer = options.unboxed();

        assert!(!unboxer.fullscreen());
        assert!(!unboxer.autoplay());
        assert_eq!(unboxer.start_at(), 0.0);
        assert_eq!(unboxer.source_url(), None);
        assert!(unboxer.media_control().is_none());
    }

    #[test]
    fn test_negative_start_at_is_ignored() {
        let options = Options::new().with(keys::START_AT, -3.0);
        assert_eq!(options.unboxed().start_at(), 0.0);
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let options = Options::from_json_str(r#"{"SomeOption": true}"#).unwrap();
        assert_eq!(options.json("SomeOption"), Some(&json!(true)));
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_invalid_json_text_is_an_error() {
        assert!(Options::from_json_str("{not json").is_err());
        assert!(Options::from_json(json!([1, 2])).is_empty());
    }
}
