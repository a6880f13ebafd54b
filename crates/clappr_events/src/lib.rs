//! # Clappr Events
//!
//! The publish/subscribe primitive the rest of the player is built on.
//!
//! ## Key Features
//!
//! - **Per-object events**: every observable object owns an [`ObjectId`] and
//!   fires events by name on the shared [`EventBus`]
//! - **Revocable bindings**: bindings are owned by the bus and refer to both
//!   sides by id only; either side can drop all of its bindings at once
//! - **Deterministic dispatch**: callbacks for one `(emitter, event)` pair
//!   run in registration order, against a snapshot taken when dispatch starts
//! - **Reentrancy**: callbacks may subscribe, unsubscribe and trigger while a
//!   dispatch is running
//! - **Isolation**: a failing or panicking callback is logged and does not
//!   prevent the remaining callbacks from running
//!
//! ## Usage
//!
//! ```rust
//! use clappr_events::{BaseObject, EventBus, Event, payload};
//! use serde_json::json;
//!
//! let bus = EventBus::shared();
//! let playback = BaseObject::new(bus.clone());
//! let media_control = BaseObject::new(bus.clone());
//!
//! media_control.listen_to(&playback, Event::TimeUpdated, |info| {
//!     let position = payload::number(info, "position")?;
//!     println!("position: {position}");
//!     Ok(())
//! });
//!
//! let info = payload::user_info(json!({"position": 78.0}));
//! playback.trigger(Event::TimeUpdated, Some(&info));
//!
//! // Dropping the listener removes its bindings from the bus.
//! drop(media_control);
//! assert_eq!(bus.binding_count(), 0);
//! ```

pub mod bus;
pub mod error;
pub mod events;
pub mod ids;
pub mod macros;
pub mod object;
pub mod payload;

pub use bus::{Binding, EventBus, EventCallback, EventStats, UserInfo};
pub use error::EventError;
pub use events::{ContainerEvent, CoreEvent, Event, InternalEvent, MediaControlEvent};
pub use ids::{BindingId, ObjectId, SubscriptionId};
pub use object::{BaseObject, EventEmitter};

/// Result type returned by event callbacks
pub type Result<T> = std::result::Result<T, EventError>;
