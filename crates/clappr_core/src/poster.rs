//! Poster plugin
//!
//! Shows artwork over the container until playback starts, and again when it
//! completes. Images are fetched through the host's [`ImageLoader`].

use crate::container::Container;
use crate::context::PluginContext;
use crate::options::keys;
use crate::playback::{NoOpPlayback, Playback};
use crate::plugin::{ContainerPlugin, NamedPlugin, Plugin, PluginKind};
use crate::view::View;
use clappr_events::{payload, BaseObject, Event, EventEmitter, UserInfo};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterImage {
    pub url: Url,
    pub data: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageLoadError {
    #[error("No image loader available for {0}")]
    Unavailable(Url),
    #[error("Failed to load {url}: {reason}")]
    Failed { url: Url, reason: String },
}

pub type ImageCompletion = Box<dyn FnOnce(Result<PosterImage, ImageLoadError>) + Send>;

/// Host-side image fetching
pub trait ImageLoader: Send + Sync {
    fn fetch(&self, url: &Url, completion: ImageCompletion);
}

/// Loader used when the host provides none; every fetch fails
#[derive(Debug, Default, Clone, Copy)]
pub struct NullImageLoader;

impl ImageLoader for NullImageLoader {
    fn fetch(&self, url: &Url, completion: ImageCompletion) {
        completion(Err(ImageLoadError::Unavailable(url.clone())));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct PosterPlugin {
    base: BaseObject,
    weak_self: Weak<PosterPlugin>,
    view: Arc<View>,
    play_button_hidden: AtomicBool,
    image: Mutex<Option<PosterImage>>,
    image_loader: Arc<dyn ImageLoader>,
    container: Mutex<Weak<Container>>,
}

impl NamedPlugin for PosterPlugin {
    const NAME: &'static str = "poster";
}

impl PosterPlugin {
    pub fn new(context: &PluginContext) -> Arc<Self> {
        let image_loader = context
            .get_provider::<Arc<dyn ImageLoader>>()
            .cloned()
            .unwrap_or_else(|| Arc::new(NullImageLoader));
        Arc::new_cyclic(|weak_self| Self {
            base: BaseObject::new(context.bus().clone()),
            weak_self: weak_self.clone(),
            view: View::new(Self::NAME),
            play_button_hidden: AtomicBool::new(false),
            image: Mutex::new(None),
            image_loader,
            container: Mutex::new(Weak::new()),
        })
    }

    fn container(&self) -> Option<Arc<Container>> {
        lock(&self.container).upgrade()
    }

    pub fn image(&self) -> Option<PosterImage> {
        lock(&self.image).clone()
    }

    pub fn is_hidden(&self) -> bool {
        self.view.is_hidden()
    }

    pub fn play_button_hidden(&self) -> bool {
        self.play_button_hidden.load(Ordering::Acquire)
    }

    /// Activation of the play button
    pub fn play_touched(&self) {
        if let Some(container) = self.container() {
            container.seek(0.0);
            container.play();
        }
    }

    fn set_poster_image(&self, url: &str) {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(e) => {
                warn!("⚠️ Invalid poster URL {}: {}", url, e);
                return;
            }
        };
        let poster = self.weak_self.clone();
        self.image_loader.fetch(
            &url,
            Box::new(move |result| match result {
                Ok(image) => {
                    if let Some(poster) = poster.upgrade() {
                        debug!("🖼️ Poster loaded from {}", image.url);
                        *lock(&poster.image) = Some(image);
                    }
                }
                Err(e) => warn!("⚠️ {}", e),
            }),
        );
    }

    fn update_poster(&self, info: Option<&UserInfo>) -> clappr_events::Result<()> {
        info!("🖼️ Updating poster");
        let url = match payload::string(info, keys::POSTER_URL) {
            Ok(url) => url.to_string(),
            Err(_) => {
                warn!("⚠️ Unable to update poster, no url was found");
                return Ok(());
            }
        };
        self.base.trigger(Event::WillUpdatePoster, None);
        self.set_poster_image(&url);
        self.base.trigger(Event::DidUpdatePoster, None);
        Ok(())
    }

    fn playback_started(&self) {
        self.view.set_hidden(true);
        if let Some(container) = self.container() {
            container.set_media_control_enabled(true);
        }
    }

    fn playback_ended(&self) {
        if let Some(container) = self.container() {
            container.set_media_control_enabled(false);
        }
        self.play_button_hidden.store(false, Ordering::Release);
        self.view.set_hidden(false);
    }

    fn on_playback<F>(&self, playback: &Arc<dyn Playback>, event: Event, action: F)
    where
        F: Fn(&PosterPlugin) + Send + Sync + 'static,
    {
        let poster = self.weak_self.clone();
        self.base.listen_to(&**playback, event, move |_| {
            if let Some(poster) = poster.upgrade() {
                action(&poster);
            }
            Ok(())
        });
    }
}

impl EventEmitter for PosterPlugin {
    fn base(&self) -> &BaseObject {
        &self.base
    }
}

impl Plugin for PosterPlugin {
    fn plugin_name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> PluginKind {
        PluginKind::UiContainer
    }

    fn view(&self) -> Option<&Arc<View>> {
        Some(&self.view)
    }

    fn render(&self) {
        let Some(container) = self.container() else {
            return;
        };
        match container.options().unboxed().poster_url() {
            Some(url) => self.set_poster_image(url),
            None => {
                self.view.set_hidden(true);
                container.set_media_control_enabled(false);
            }
        }
    }
}

impl ContainerPlugin for PosterPlugin {
    fn bind_container(&self, container: &Arc<Container>) {
        self.base.stop_listening();
        *lock(&self.container) = Arc::downgrade(container);

        let poster = self.weak_self.clone();
        self.base
            .listen_to(&**container, Event::RequestPosterUpdate, move |info| match poster.upgrade() {
                Some(poster) => poster.update_poster(info),
                None => Ok(()),
            });
    }

    fn bind_playback(&self, playback: &Arc<dyn Playback>) {
        self.on_playback(playback, Event::Playing, PosterPlugin::playback_started);
        self.on_playback(playback, Event::Stalled, |poster| {
            poster.play_button_hidden.store(true, Ordering::Release)
        });
        self.on_playback(playback, Event::DidComplete, PosterPlugin::playback_ended);

        let is_no_op = playback.plugin_name() == NoOpPlayback::NAME;
        self.on_playback(playback, Event::Ready, move |poster| {
            if is_no_op {
                poster.view.set_hidden(true);
            }
        });
    }
}

impl fmt::Debug for PosterPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosterPlugin")
            .field("id", &self.object_id())
            .field("hidden", &self.is_hidden())
            .field("play_button_hidden", &self.play_button_hidden())
            .finish()
    }
}
