//! Host collaborators a core is built with

use crate::app_state::AppStateNotifier;
use crate::playback::MediaTransport;
use crate::poster::{ImageLoader, NullImageLoader};
use clappr_events::EventBus;
use std::fmt;
use std::sync::Arc;

/// Everything the core needs from the host besides the options.
///
/// The default environment has a fresh bus, an image loader that fails every
/// fetch, no media transport and no application state notifications.
#[derive(Clone)]
pub struct Environment {
    pub bus: Arc<EventBus>,
    pub image_loader: Arc<dyn ImageLoader>,
    pub media_transport: Option<Arc<dyn MediaTransport>>,
    pub app_state: Option<Arc<dyn AppStateNotifier>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            bus: EventBus::shared(),
            image_loader: Arc::new(NullImageLoader),
            media_transport: None,
            app_state: None,
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_image_loader(mut self, image_loader: Arc<dyn ImageLoader>) -> Self {
        self.image_loader = image_loader;
        self
    }

    pub fn with_media_transport(mut self, transport: Arc<dyn MediaTransport>) -> Self {
        self.media_transport = Some(transport);
        self
    }

    pub fn with_app_state(mut self, notifier: Arc<dyn AppStateNotifier>) -> Self {
        self.app_state = Some(notifier);
        self
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("media_transport", &self.media_transport.is_some())
            .field("app_state", &self.app_state.is_some())
            .finish_non_exhaustive()
    }
}
