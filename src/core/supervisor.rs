//! # Supervisor: runs camera sessions, fans out events, shuts down cleanly.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], and the
//! shutdown grace window. It spawns one independent task per
//! [`SessionActor`], handles OS termination signals, and enforces the grace
//! period when stopping.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<SessionActor>  ──►  Supervisor::run(sessions)
//!
//! Spawn:
//!   session[0] .. session[N-1]
//!       └──► child CancellationToken = runtime_token.child_token()
//!            set.spawn(session.run(child))
//!
//! Event flow:
//!   SessionActor ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!
//! Shutdown path:
//!   SIGINT/SIGTERM/SIGQUIT
//!       └─► Bus.publish(ShutdownRequested)
//!       └─► runtime_token.cancel() → propagates to sessions
//!       └─► wait up to `grace`:
//!              ├─ all joined  → AllStoppedWithin
//!              └─ timeout     → GraceExceeded (AliveTracker names the stuck)
//! ```
//!
//! A session that terminates fatally takes only itself down; the remaining
//! cameras keep streaming. Once no session remains, `run` returns the first
//! fatal error so the process exits nonzero.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::session::SessionActor;
use crate::core::shutdown;
use crate::error::{RuntimeError, SessionError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{AliveTracker, Subscribe, SubscriberSet};

type SessionOutcome = (String, Result<(), SessionError>);

/// Coordinates camera sessions, event delivery, and graceful shutdown.
pub struct Supervisor {
    grace: std::time::Duration,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    /// Same instance as the one inside `subs`; used for the final snapshot.
    alive: Arc<AliveTracker>,
}

impl Supervisor {
    /// Creates a supervisor with the given subscribers.
    ///
    /// `alive` must be the same instance as the one included in
    /// `subscribers` (it is added if absent).
    pub fn new(
        cfg: &Config,
        mut subscribers: Vec<Arc<dyn Subscribe>>,
        alive: Arc<AliveTracker>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity);

        let has_alive = subscribers
            .iter()
            .any(|s| std::ptr::eq::<dyn Subscribe>(&**s as _, &*alive as &dyn Subscribe));
        if !has_alive {
            subscribers.push(alive.clone());
        }

        Self {
            grace: cfg.grace,
            bus,
            subs: Arc::new(SubscriberSet::new(subscribers)),
            alive,
        }
    }

    /// Handle to the event bus, for wiring sessions.
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Runs the provided sessions until either every session has terminated
    /// on its own, or a termination signal arrives and a graceful shutdown
    /// completes (possibly with `GraceExceeded`).
    pub async fn run(&self, sessions: Vec<SessionActor>) -> Result<(), RuntimeError> {
        let token = CancellationToken::new();
        self.subscriber_listener();

        let mut set: JoinSet<SessionOutcome> = JoinSet::new();
        for session in sessions {
            let child = token.child_token();
            let camera = session.camera().to_string();
            set.spawn(async move { (camera, session.run(child).await) });
        }

        let fatals = self.drive(&mut set, &token).await?;
        match fatals.into_iter().next() {
            Some((camera, error)) => Err(RuntimeError::SessionFailed {
                camera,
                error: error.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                set.emit(&ev);
            }
        });
    }

    /// Joins sessions as they finish; on a termination signal, cancels the
    /// runtime and waits out the grace period.
    async fn drive(
        &self,
        set: &mut JoinSet<SessionOutcome>,
        token: &CancellationToken,
    ) -> Result<Vec<(String, SessionError)>, RuntimeError> {
        let mut fatals = Vec::new();
        loop {
            tokio::select! {
                _ = shutdown::wait_for_shutdown_signal() => {
                    self.bus.publish(Event::now(EventKind::ShutdownRequested));
                    token.cancel();
                    self.wait_all_with_grace(set, &mut fatals).await?;
                    return Ok(fatals);
                }
                next = set.join_next() => match next {
                    Some(Ok((camera, result))) => {
                        if let Err(e) = result {
                            fatals.push((camera, e));
                        }
                    }
                    Some(Err(join_err)) => {
                        tracing::error!("session task aborted: {join_err}");
                    }
                    None => return Ok(fatals),
                }
            }
        }
    }

    /// Waits for every session to finish within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns the stuck-session
    /// list from the [`AliveTracker`].
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<SessionOutcome>,
        fatals: &mut Vec<(String, SessionError)>,
    ) -> Result<(), RuntimeError> {
        let done = async {
            while let Some(next) = set.join_next().await {
                if let Ok((camera, Err(e))) = next {
                    fatals.push((camera, e));
                }
            }
        };

        match time::timeout(self.grace, done).await {
            Ok(()) => {
                self.bus.publish(Event::now(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::now(EventKind::GraceExceeded));
                let stuck = self.alive.snapshot();
                Err(RuntimeError::GraceExceeded {
                    grace: self.grace,
                    stuck,
                })
            }
        }
    }
}
