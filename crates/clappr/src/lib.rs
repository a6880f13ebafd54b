//! # Clappr
//!
//! Embeddable media player built on [`clappr_core`] and [`clappr_events`].
//!
//! A [`Player`] owns one core and re-emits the events of whatever container
//! and playback are active under player event names, so host code subscribes
//! once and keeps its subscriptions across `load` calls.
//!
//! ```rust
//! use clappr::{Event, ImmediatePresenter, Options, Player, View, keys};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let player = Player::new(
//!     Options::new().with(keys::SOURCE_URL, "http://clappr.io/video.mp4"),
//!     Vec::new(),
//! );
//!
//! let plays = Arc::new(AtomicUsize::new(0));
//! let counter = plays.clone();
//! player.on(Event::Playing, move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! player.attach_to(&View::new("host"), Arc::new(ImmediatePresenter::new()));
//! player.play();
//! assert_eq!(plays.load(Ordering::SeqCst), 1);
//! ```
//!
//! Hosts that configure the player from a file use [`PlayerConfig`] and
//! [`setup_logging`].

pub mod config;
pub mod logging;
pub mod player;

pub use config::{ConfigError, LoggingSettings, PlayerConfig};
pub use logging::setup_logging;
pub use player::Player;

pub use clappr_core::{
    keys, Core, Environment, FullscreenPresenter, ImmediatePresenter, Loader, Options, Playback,
    PluginFactory, SimplePluginFactory, View,
};
pub use clappr_events::{Event, EventBus, EventEmitter, UserInfo};
