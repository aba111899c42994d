//! # Stateful subscriber tracking running sessions.
//!
//! [`AliveTracker`] maintains an in-memory set of camera names whose
//! sessions are currently running, by listening to session lifecycle
//! events. The supervisor reads a snapshot during shutdown to name the
//! sessions that did not stop within the grace period.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Tracks which camera sessions are currently alive.
#[derive(Default)]
pub struct AliveTracker {
    inner: RwLock<HashSet<String>>,
}

impl AliveTracker {
    /// Creates a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of currently running camera names.
    pub fn snapshot(&self) -> Vec<String> {
        let g = self.inner.read().unwrap_or_else(|e| e.into_inner());
        g.iter().cloned().collect()
    }
}

#[async_trait]
impl Subscribe for AliveTracker {
    async fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::SessionStarting => {
                if let Some(camera) = &event.camera {
                    let mut g = self.inner.write().unwrap_or_else(|e| e.into_inner());
                    g.insert(camera.to_string());
                }
            }
            EventKind::SessionStopped | EventKind::SessionDead => {
                if let Some(camera) = &event.camera {
                    let mut g = self.inner.write().unwrap_or_else(|e| e.into_inner());
                    g.remove(camera.as_ref());
                }
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "alive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_session_lifecycle() {
        let tracker = AliveTracker::new();

        tracker
            .on_event(&Event::now(EventKind::SessionStarting).with_camera("porch"))
            .await;
        tracker
            .on_event(&Event::now(EventKind::SessionStarting).with_camera("garage"))
            .await;
        let mut snap = tracker.snapshot();
        snap.sort();
        assert_eq!(snap, vec!["garage".to_string(), "porch".to_string()]);

        tracker
            .on_event(&Event::now(EventKind::SessionStopped).with_camera("porch"))
            .await;
        assert_eq!(tracker.snapshot(), vec!["garage".to_string()]);

        tracker
            .on_event(&Event::now(EventKind::SessionDead).with_camera("garage"))
            .await;
        assert!(tracker.snapshot().is_empty());
    }
}
