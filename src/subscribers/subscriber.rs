//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging event handlers into the
//! runtime (logging, metrics, alerting).
//!
//! Each subscriber gets:
//! - a **dedicated worker task** (runs independently),
//! - a **per-subscriber bounded queue** (capacity via
//!   [`Subscribe::queue_capacity`]),
//! - **panic isolation** (panics are caught and logged, other subscribers
//!   are unaffected).
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event for this subscriber only.
//! - Events are processed sequentially (FIFO) per subscriber.
//! - Subscribers never block publishers or each other.

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, never in publisher context.
    /// Events are delivered in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Subscriber name used in drop/panic diagnostics.
    ///
    /// Prefer short names ("log", "alive", "metrics"). The default uses
    /// `type_name`, which is verbose — override it.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to ≥ 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
