//! # Watchdog: output staleness detection.
//!
//! A process can be alive yet stuck — a network stall mid-stream leaves
//! ffmpeg running while nothing reaches the sink. Plain exit detection
//! misses that, so the session additionally polls the process's
//! [`ActivityProbe`] on a fixed period and treats an age beyond the
//! threshold as a stall.
//!
//! The watchdog itself is just the two durations and the comparison; the
//! session owns the timer so that staleness checks stay inside its
//! single-writer loop.

use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};

use crate::process::ActivityProbe;

/// Staleness detector parameters.
#[derive(Clone, Copy, Debug)]
pub struct Watchdog {
    /// Poll period.
    pub period: Duration,
    /// Maximum tolerated output silence while a process claims to run.
    pub threshold: Duration,
}

impl Watchdog {
    /// Builds the poll timer. The first tick fires one period from now, not
    /// immediately.
    pub fn timer(&self) -> Interval {
        let mut interval = time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Returns the observed idle duration when the probe is stale.
    pub fn staleness(&self, probe: &ActivityProbe) -> Option<Duration> {
        let age = probe.age();
        (age > self.threshold).then_some(age)
    }
}

impl Default for Watchdog {
    /// `period = 5s`, `threshold = 30s`.
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            threshold: Duration::from_secs(30),
        }
    }
}
