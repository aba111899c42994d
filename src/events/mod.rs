//! Runtime events: types and broadcast bus.
//!
//! The event **data model** and the **bus** used to publish/subscribe to
//! runtime events emitted by the supervisor and the session actors.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! Publishers: `Supervisor`, `SessionActor`. Consumer: the supervisor's
//! listener task, which fans events out to the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
