//! Placeholder for sources nothing else can play

use super::{Playback, PlaybackFactory};
use crate::context::PluginContext;
use clappr_events::{payload, BaseObject, Event, EventEmitter};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Plays nothing. Once activated with a source it reports an `error`
/// carrying the configured not-supported message.
pub struct NoOpPlayback {
    base: BaseObject,
    source: Option<String>,
    message: String,
    activated: AtomicBool,
}

impl NoOpPlayback {
    pub const NAME: &'static str = "NoOp";

    pub fn new(context: &PluginContext, source: Option<&str>) -> Self {
        Self {
            base: BaseObject::new(context.bus().clone()),
            source: source.map(str::to_string),
            message: context
                .options()
                .unboxed()
                .playback_not_supported_message()
                .to_string(),
            activated: AtomicBool::new(false),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl EventEmitter for NoOpPlayback {
    fn base(&self) -> &BaseObject {
        &self.base
    }
}

impl Playback for NoOpPlayback {
    fn plugin_name(&self) -> &str {
        Self::NAME
    }

    fn source(&self) -> Option<String> {
        self.source.clone()
    }

    fn activate(&self) {
        if self.activated.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(source) = self.source.as_deref() {
            warn!("⚠️ No playback can play {}", source);
            let info = payload::user_info(json!({"message": self.message, "code": 0}));
            self.base.trigger(Event::Error, Some(&info));
        }
    }
}

/// Factory for [`NoOpPlayback`], the loader's fallback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpPlaybackFactory;

impl PlaybackFactory for NoOpPlaybackFactory {
    fn name(&self) -> &str {
        NoOpPlayback::NAME
    }

    fn can_play(&self, _source: &str, _mime_type: Option<&str>) -> bool {
        true
    }

    fn create(
        &self,
        context: &PluginContext,
        source: Option<&str>,
        _mime_type: Option<&str>,
    ) -> Arc<dyn Playback> {
        Arc::new(NoOpPlayback::new(context, source))
    }
}
