//! # Output activity probe.
//!
//! [`ActivityProbe`] records the instant the transcoder last produced
//! output. The stderr drain touches it on every line; the
//! [`Watchdog`](crate::watchdog::Watchdog) reads its age to catch processes
//! that are alive but stuck.
//!
//! Uses [`tokio::time::Instant`] so paused-clock tests see consistent ages.

use std::sync::{Arc, Mutex};

use tokio::time::{Duration, Instant};

/// Shared last-output timestamp for one supervised process.
///
/// Cloneable; all clones share the same inner timestamp.
#[derive(Clone, Debug)]
pub struct ActivityProbe {
    last: Arc<Mutex<Instant>>,
}

impl ActivityProbe {
    /// Creates a probe whose last-output instant is "now".
    pub fn new() -> Self {
        Self {
            last: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Records output activity at the current instant.
    pub fn touch(&self) {
        let mut g = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *g = Instant::now();
    }

    /// Time elapsed since the last recorded output.
    pub fn age(&self) -> Duration {
        let g = self.last.lock().unwrap_or_else(|e| e.into_inner());
        g.elapsed()
    }
}

impl Default for ActivityProbe {
    fn default() -> Self {
        Self::new()
    }
}
