//! # Structured log subscriber.
//!
//! [`LogWriter`] turns runtime events into `tracing` records, one line per
//! transition or failure, with stable field names. This is the operator's
//! main window into an unattended deployment.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Emits every runtime event as a structured log record.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let camera = e.camera.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::SessionStarting => {
                info!(camera, "session starting");
            }
            EventKind::StateChanged => {
                let from = e.from.map(|s| s.as_label()).unwrap_or("?");
                let to = e.to.map(|s| s.as_label()).unwrap_or("?");
                debug!(camera, from, to, "state changed");
            }
            EventKind::ResolveFailed => {
                warn!(
                    camera,
                    attempt = e.attempt,
                    reason = e.reason.as_deref(),
                    "live acquisition failed"
                );
            }
            EventKind::LaunchFailed => {
                warn!(
                    camera,
                    attempt = e.attempt,
                    reason = e.reason.as_deref(),
                    "transcoder launch failed"
                );
            }
            EventKind::LiveStarted => {
                info!(camera, pid = e.pid, "live stream up");
            }
            EventKind::PlaceholderStarted => {
                info!(camera, pid = e.pid, "placeholder stream up");
            }
            EventKind::ProcessExited => match e.exit_code {
                Some(0) => info!(camera, kind = e.reason.as_deref(), "transcoder exited cleanly"),
                code => warn!(
                    camera,
                    kind = e.reason.as_deref(),
                    exit_code = code,
                    "transcoder exited"
                ),
            },
            EventKind::StallDetected => {
                warn!(camera, idle_ms = e.idle_ms, "no transcoder output; restarting");
            }
            EventKind::BackoffScheduled => {
                info!(
                    camera,
                    delay_ms = e.delay_ms,
                    attempt = e.attempt,
                    reason = e.reason.as_deref(),
                    "retry scheduled"
                );
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested");
            }
            EventKind::SessionStopped => {
                info!(camera, "session stopped");
            }
            EventKind::SessionDead => {
                error!(camera, reason = e.reason.as_deref(), "session terminated fatally");
            }
            EventKind::AllStoppedWithin => {
                info!("all sessions stopped within grace");
            }
            EventKind::GraceExceeded => {
                error!("grace period exceeded");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
