//! # Clappr Core
//!
//! Composition graph and state machines of the Clappr player.
//!
//! ## Architecture
//!
//! - **Core**: owns the active container, the core plugins, the media control
//!   and the fullscreen coordinator
//! - **Container**: owns the active playback and the container plugins, and
//!   re-emits playback events under container names
//! - **Playback**: a media source's runtime state and transport controls,
//!   picked by the [`Loader`] from the registered factories
//! - **Plugins**: optional behavior attached to a core or a container,
//!   identified by name and kept in a [`PluginRegistry`]
//!
//! Every component embeds a [`clappr_events::BaseObject`] and talks to the
//! others over one shared [`clappr_events::EventBus`]. Parents own children;
//! callbacks only ever hold weak references back.
//!
//! ## Usage
//!
//! ```rust
//! use clappr_core::{keys, Core, Environment, Loader, Options, Playback};
//!
//! let options = Options::new().with(keys::SOURCE_URL, "http://clappr.io/video.mp4");
//! let core = Core::new(options, Loader::default(), Environment::default());
//!
//! let playback = core.active_playback().unwrap();
//! assert_eq!(playback.plugin_name(), "MediaPlayback");
//! ```

pub mod app_state;
pub mod container;
pub mod context;
pub mod core;
pub mod environment;
pub mod error;
pub mod fullscreen;
pub mod loader;
pub mod media_control;
pub mod options;
pub mod playback;
pub mod plugin;
pub mod poster;
pub mod view;

pub use self::core::Core;
pub use app_state::{
    AppState, AppStateDelegate, AppStateManager, AppStateNotifier, ManualAppStateNotifier,
    SubscriptionToken,
};
pub use container::Container;
pub use context::PluginContext;
pub use environment::Environment;
pub use error::{CoreError, PluginError};
pub use fullscreen::{
    Completion, FullscreenCoordinator, FullscreenPresenter, FullscreenState, ImmediatePresenter,
};
pub use loader::{Loader, PluginFactory, SimplePluginFactory};
pub use media_control::{MediaControl, PlaybackControlState};
pub use options::{keys, OptionValue, Options, OptionsUnboxer};
pub use playback::{
    MediaOption, MediaPlayback, MediaPlaybackFactory, MediaProfile, MediaTransport, NoOpPlayback,
    NoOpPlaybackFactory, NullTransport, Playback, PlaybackFactory, PlaybackType,
};
pub use plugin::{ContainerPlugin, CorePlugin, NamedPlugin, Plugin, PluginKind, PluginRegistry};
pub use poster::{ImageCompletion, ImageLoadError, ImageLoader, NullImageLoader, PosterImage, PosterPlugin};
pub use view::View;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
