//! # SessionActor: per-camera streaming session orchestrator.
//!
//! Owns the full lifecycle of one camera's republishing pipeline:
//! acquire a live locator, drive the transcoder, detect death and stalls,
//! fall back to the placeholder clip, retry with backoff, shut down
//! gracefully.
//!
//! ## Event flow
//! ```text
//! Init ─► Resolving ─ok─► launch live ─► StreamingLive
//!            │fail                          │ exit/stall
//!            ▼                              ▼
//!   BackoffScheduled            Resolving (immediate) or Backoff
//!   launch placeholder ─► StreamingPlaceholder
//!            │ retry timer: stop placeholder ─► Resolving
//!            │ placeholder exit/stall: restart placeholder
//!            ▼
//!     (any state) cancellation ─► ShuttingDown ─► Stopped
//! ```
//!
//! ## Rules
//! - The actor is the **single writer** of its own state; resolver results,
//!   process exits, watchdog ticks, retry timers and cancellation all arrive
//!   at the `select!` points of this loop, strictly sequentially.
//! - At most one transcoder process is attached at any instant; the previous
//!   one is fully stopped and reaped before the next is launched.
//! - Transient failures never escape: everything is absorbed, evented, and
//!   retried. Only fatal configuration errors return from [`SessionActor::run`].
//! - A minimum dwell time in the streaming states damps flapping cameras;
//!   repeated live failures inside a short window route through `Backoff`
//!   instead of hot-looping.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::state::SessionState;
use crate::error::SessionError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::process::{Exit, ProcessError, ProcessHandle, Transcoder};
use crate::source::{ResolveError, Resolver, SourceKind, StreamSource};
use crate::watchdog::Watchdog;

/// A nonzero exit faster than this implicates local configuration (sink,
/// transcoder install) rather than the camera or the network.
const QUICK_EXIT: Duration = Duration::from_secs(2);

/// Per-session tunables, derived from the global config.
#[derive(Clone, Debug)]
pub struct SessionParams {
    /// Output sink target handed to the transcoder.
    pub sink: String,
    /// Local clip looped while no live feed is available.
    pub placeholder: PathBuf,
    /// Upper bound on one live-acquisition call.
    pub acquire_timeout: Duration,
    /// Graceful-stop window for the transcoder process.
    pub grace: Duration,
    /// Minimum time in a streaming state before a failure-driven transition.
    pub min_dwell: Duration,
    /// Retry delay policy for failed acquisitions.
    pub backoff: BackoffPolicy,
    /// Output staleness detection.
    pub watchdog: Watchdog,
    /// Window within which live failures count as consecutive.
    pub live_fail_window: Duration,
    /// Consecutive live failures that route through `Backoff`.
    pub live_fail_limit: u32,
    /// Consecutive launch failures that escalate to a fatal error.
    pub launch_fail_limit: u32,
}

/// What ended one pass through a streaming state.
enum StreamVerdict {
    Cancelled,
    Exited(Exit),
    Stalled(Duration),
    RetryDue,
}

/// Orchestrates one camera's streaming session.
pub struct SessionActor {
    camera: Arc<str>,
    params: SessionParams,
    resolver: Arc<dyn Resolver>,
    transcoder: Arc<dyn Transcoder>,
    bus: Bus,

    state: SessionState,
    /// Consecutive failed live acquisitions; resets on live stream start.
    attempt: u32,
    last_transition: Instant,
    process: Option<Box<dyn ProcessHandle>>,
    /// Delay to wait out in the `Backoff` state.
    backoff_delay: Duration,
    /// When to stop the placeholder and retry live acquisition.
    retry_at: Option<Instant>,
    live_failures: u32,
    last_live_failure: Option<Instant>,
    launch_failures: u32,
}

impl SessionActor {
    /// Creates a session for one camera. Nothing runs until [`run`](Self::run).
    pub fn new(
        camera: impl Into<Arc<str>>,
        params: SessionParams,
        resolver: Arc<dyn Resolver>,
        transcoder: Arc<dyn Transcoder>,
        bus: Bus,
    ) -> Self {
        Self {
            camera: camera.into(),
            params,
            resolver,
            transcoder,
            bus,
            state: SessionState::Init,
            attempt: 0,
            last_transition: Instant::now(),
            process: None,
            backoff_delay: Duration::ZERO,
            retry_at: None,
            live_failures: 0,
            last_live_failure: None,
            launch_failures: 0,
        }
    }

    /// The camera this session belongs to.
    pub fn camera(&self) -> &str {
        &self.camera
    }

    /// Runs the session until cancellation or a fatal error.
    ///
    /// Returns `Err` only for fatal configuration failures; every transient
    /// failure is handled internally.
    pub async fn run(mut self, token: CancellationToken) -> Result<(), SessionError> {
        self.bus
            .publish(Event::now(EventKind::SessionStarting).with_camera(self.camera.clone()));

        let result = self.drive(&token).await;

        self.stop_process().await;
        self.transition(SessionState::Stopped);
        match &result {
            Ok(()) => self
                .bus
                .publish(Event::now(EventKind::SessionStopped).with_camera(self.camera.clone())),
            Err(e) => self.bus.publish(
                Event::now(EventKind::SessionDead)
                    .with_camera(self.camera.clone())
                    .with_reason(e.to_string()),
            ),
        }
        result
    }

    async fn drive(&mut self, token: &CancellationToken) -> Result<(), SessionError> {
        loop {
            if token.is_cancelled() {
                self.transition(SessionState::ShuttingDown);
            }
            match self.state {
                SessionState::Init => self.transition(SessionState::Resolving),
                SessionState::Resolving => self.resolve_and_start(token).await?,
                SessionState::StreamingLive | SessionState::StreamingPlaceholder => {
                    self.stream(token).await?
                }
                SessionState::Backoff => self.backoff_wait(token).await,
                SessionState::ShuttingDown | SessionState::Stopped => return Ok(()),
            }
        }
    }

    /// One pass through `Resolving`: ask the cloud for a live source and
    /// either start streaming it or fall back to the placeholder.
    async fn resolve_and_start(&mut self, token: &CancellationToken) -> Result<(), SessionError> {
        let mut expired_retries = 0u32;
        loop {
            let outcome = tokio::select! {
                // Abandon, don't await, the in-flight call on shutdown.
                _ = token.cancelled() => {
                    self.transition(SessionState::ShuttingDown);
                    return Ok(());
                }
                res = time::timeout(
                    self.params.acquire_timeout,
                    self.resolver.resolve_live(&self.camera),
                ) => match res {
                    Ok(inner) => inner,
                    Err(_elapsed) => Err(ResolveError::Timeout {
                        timeout: self.params.acquire_timeout,
                    }),
                },
            };

            match outcome {
                Ok(source) if source.is_expired() => {
                    // The locator aged out in transit; never hand it over.
                    expired_retries += 1;
                    if expired_retries <= 1 {
                        continue;
                    }
                    let err = ResolveError::Unknown {
                        error: "live locator expired on arrival".into(),
                    };
                    self.publish_resolve_failed(&err);
                    return self.fall_back(None, err.as_label()).await;
                }
                Ok(source) => {
                    return if self.launch(source).await? {
                        self.attempt = 0;
                        self.retry_at = None;
                        self.bus.publish(
                            Event::now(EventKind::LiveStarted)
                                .with_camera(self.camera.clone())
                                .with_pid(self.current_pid()),
                        );
                        self.transition(SessionState::StreamingLive);
                        Ok(())
                    } else {
                        self.fall_back(None, "launch_failure").await
                    };
                }
                Err(err) => {
                    self.publish_resolve_failed(&err);
                    let hint = err.retry_after();
                    return self.fall_back(hint, err.as_label()).await;
                }
            }
        }
    }

    /// One pass through a streaming state: wait for whichever comes first of
    /// process exit, staleness, the live-retry timer, or cancellation.
    async fn stream(&mut self, token: &CancellationToken) -> Result<(), SessionError> {
        let watchdog = self.params.watchdog;
        let has_retry = self.state == SessionState::StreamingPlaceholder && self.retry_at.is_some();
        let retry_at = self.retry_at.unwrap_or_else(far_future);

        let Some(handle) = self.process.as_mut() else {
            self.transition(SessionState::Resolving);
            return Ok(());
        };
        let probe = handle.probe();
        let mut ticker = watchdog.timer();
        let retry_sleep = time::sleep_until(retry_at);
        tokio::pin!(retry_sleep);

        let verdict = loop {
            tokio::select! {
                _ = token.cancelled() => break StreamVerdict::Cancelled,
                exit = handle.wait() => break StreamVerdict::Exited(exit),
                _ = &mut retry_sleep, if has_retry => break StreamVerdict::RetryDue,
                _ = ticker.tick() => {
                    if let Some(idle) = watchdog.staleness(&probe) {
                        break StreamVerdict::Stalled(idle);
                    }
                }
            }
        };

        match verdict {
            StreamVerdict::Cancelled => {
                self.transition(SessionState::ShuttingDown);
                Ok(())
            }
            StreamVerdict::Exited(exit) => self.on_process_exit(exit, token).await,
            StreamVerdict::Stalled(idle) => self.on_stall(idle, token).await,
            StreamVerdict::RetryDue => {
                self.retry_at = None;
                self.stop_process().await;
                self.transition(SessionState::Resolving);
                Ok(())
            }
        }
    }

    /// The active process died on its own.
    async fn on_process_exit(
        &mut self,
        exit: Exit,
        token: &CancellationToken,
    ) -> Result<(), SessionError> {
        let Some(process) = self.process.take() else {
            return Ok(());
        };
        let kind = process.kind();
        let ran_for = process.started_at().elapsed();
        // Already dead; stop() here only reaps and tears the reader down.
        let _ = process.stop(Duration::ZERO).await;
        self.publish_exit(kind, &exit);

        if ran_for >= QUICK_EXIT {
            self.launch_failures = 0;
        }

        match kind {
            SourceKind::Live => self.after_live_failure(token).await,
            SourceKind::Placeholder => {
                if !exit.is_clean() && ran_for < QUICK_EXIT {
                    self.launch_failures += 1;
                    if self.launch_failures >= self.params.launch_fail_limit {
                        return Err(SessionError::SinkBroken {
                            attempts: self.launch_failures,
                            error: format!("placeholder exited {exit:?} after {ran_for:?}"),
                        });
                    }
                }
                if self.dwell(token).await {
                    return Ok(());
                }
                self.restart_placeholder().await
            }
        }
    }

    /// The watchdog saw no output beyond the threshold.
    async fn on_stall(
        &mut self,
        idle: Duration,
        token: &CancellationToken,
    ) -> Result<(), SessionError> {
        self.bus.publish(
            Event::now(EventKind::StallDetected)
                .with_camera(self.camera.clone())
                .with_idle(idle),
        );
        let was = self.state;
        self.stop_process().await;
        match was {
            SessionState::StreamingLive => self.after_live_failure(token).await,
            _ => {
                if self.dwell(token).await {
                    return Ok(());
                }
                self.restart_placeholder().await
            }
        }
    }

    /// Routes a live failure: immediate re-resolution for an isolated
    /// glitch, backoff when the camera flaps.
    async fn after_live_failure(&mut self, token: &CancellationToken) -> Result<(), SessionError> {
        self.note_live_failure();
        if self.dwell(token).await {
            return Ok(());
        }
        if self.live_failures >= self.params.live_fail_limit {
            let delay = self.params.backoff.next(self.attempt);
            self.attempt += 1;
            self.backoff_delay = delay;
            self.retry_at = None;
            self.bus.publish(
                Event::now(EventKind::BackoffScheduled)
                    .with_camera(self.camera.clone())
                    .with_delay(delay)
                    .with_attempt(self.attempt)
                    .with_reason("live_flapping"),
            );
            self.transition(SessionState::Backoff);
        } else {
            self.transition(SessionState::Resolving);
        }
        Ok(())
    }

    fn note_live_failure(&mut self) {
        let now = Instant::now();
        match self.last_live_failure {
            Some(prev) if now.duration_since(prev) <= self.params.live_fail_window => {
                self.live_failures += 1;
            }
            _ => self.live_failures = 1,
        }
        self.last_live_failure = Some(now);
    }

    /// Schedules the next acquisition and keeps the sink fed with the
    /// placeholder in the meantime.
    async fn fall_back(
        &mut self,
        retry_after: Option<Duration>,
        reason: &str,
    ) -> Result<(), SessionError> {
        let delay = self.params.backoff.next_after(self.attempt, retry_after);
        self.attempt += 1;
        self.backoff_delay = delay;
        self.bus.publish(
            Event::now(EventKind::BackoffScheduled)
                .with_camera(self.camera.clone())
                .with_delay(delay)
                .with_attempt(self.attempt)
                .with_reason(reason.to_string()),
        );

        let placeholder = StreamSource::placeholder(&self.params.placeholder);
        if self.launch(placeholder).await? {
            self.retry_at = Some(Instant::now() + delay);
            self.bus.publish(
                Event::now(EventKind::PlaceholderStarted)
                    .with_camera(self.camera.clone())
                    .with_pid(self.current_pid()),
            );
            self.transition(SessionState::StreamingPlaceholder);
        } else {
            self.retry_at = None;
            self.transition(SessionState::Backoff);
        }
        Ok(())
    }

    /// Brings the placeholder back after its process died or stalled,
    /// preserving the scheduled live retry.
    async fn restart_placeholder(&mut self) -> Result<(), SessionError> {
        let placeholder = StreamSource::placeholder(&self.params.placeholder);
        if self.launch(placeholder).await? {
            self.bus.publish(
                Event::now(EventKind::PlaceholderStarted)
                    .with_camera(self.camera.clone())
                    .with_pid(self.current_pid()),
            );
            self.last_transition = Instant::now();
        } else {
            self.retry_at = None;
            self.transition(SessionState::Backoff);
        }
        Ok(())
    }

    /// Launches the transcoder for `source`. `Ok(false)` means the launch
    /// failed but stays under the fatal ceiling.
    async fn launch(&mut self, source: StreamSource) -> Result<bool, SessionError> {
        debug_assert!(self.process.is_none(), "one transcoder per session");
        match self
            .transcoder
            .start(&self.camera, &source, &self.params.sink)
            .await
        {
            Ok(handle) => {
                self.process = Some(handle);
                Ok(true)
            }
            Err(ProcessError::Spawn(e)) => {
                self.launch_failures += 1;
                self.bus.publish(
                    Event::now(EventKind::LaunchFailed)
                        .with_camera(self.camera.clone())
                        .with_attempt(self.launch_failures)
                        .with_reason(e.to_string()),
                );
                if self.launch_failures >= self.params.launch_fail_limit {
                    Err(SessionError::LaunchExhausted {
                        attempts: self.launch_failures,
                        error: e.to_string(),
                    })
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Waits out the backoff delay, then resolves again.
    async fn backoff_wait(&mut self, token: &CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => self.transition(SessionState::ShuttingDown),
            _ = time::sleep(self.backoff_delay) => self.transition(SessionState::Resolving),
        }
    }

    /// Enforces the minimum dwell time since the last transition.
    /// Returns `true` when cancelled while waiting.
    async fn dwell(&mut self, token: &CancellationToken) -> bool {
        let since = self.last_transition.elapsed();
        if since >= self.params.min_dwell {
            return false;
        }
        tokio::select! {
            _ = token.cancelled() => {
                self.transition(SessionState::ShuttingDown);
                true
            }
            _ = time::sleep(self.params.min_dwell - since) => false,
        }
    }

    /// Stops and reaps the attached process, if any.
    async fn stop_process(&mut self) {
        if let Some(process) = self.process.take() {
            let kind = process.kind();
            let exit = process.stop(self.params.grace).await;
            self.publish_exit(kind, &exit);
        }
    }

    fn current_pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid())
    }

    fn publish_exit(&self, kind: SourceKind, exit: &Exit) {
        self.bus.publish(
            Event::now(EventKind::ProcessExited)
                .with_camera(self.camera.clone())
                .with_exit_code(exit.code())
                .with_reason(kind.as_label()),
        );
    }

    fn publish_resolve_failed(&self, err: &ResolveError) {
        self.bus.publish(
            Event::now(EventKind::ResolveFailed)
                .with_camera(self.camera.clone())
                .with_attempt(self.attempt + 1)
                .with_reason(format!("{}: {err}", err.as_label())),
        );
    }

    fn transition(&mut self, to: SessionState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        self.last_transition = Instant::now();
        self.bus.publish(
            Event::now(EventKind::StateChanged)
                .with_camera(self.camera.clone())
                .with_transition(from, to),
        );
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::JitterPolicy;
    use crate::process::ActivityProbe;

    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::broadcast;

    // --- scripted resolver ---------------------------------------------

    enum OnEmpty {
        Offline,
        Pending,
    }

    struct ScriptResolver {
        script: Mutex<VecDeque<Result<StreamSource, ResolveError>>>,
        on_empty: OnEmpty,
        calls: AtomicU32,
    }

    impl ScriptResolver {
        fn new(
            script: Vec<Result<StreamSource, ResolveError>>,
            on_empty: OnEmpty,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                on_empty,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Resolver for ScriptResolver {
        async fn resolve_live(&self, _camera: &str) -> Result<StreamSource, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(res) => res,
                None => match self.on_empty {
                    OnEmpty::Offline => Err(ResolveError::CameraOffline),
                    OnEmpty::Pending => std::future::pending().await,
                },
            }
        }
    }

    fn live_ok() -> Result<StreamSource, ResolveError> {
        Ok(StreamSource::live("rtsps://cloud/feed", None))
    }

    // --- fake transcoder -----------------------------------------------

    #[derive(Clone, Copy)]
    enum Plan {
        /// Process starts and exits with the given status after the delay.
        ExitAfter(Duration, Exit),
        /// Process starts and runs until stopped; its probe is never fed.
        RunSilent,
        /// Spawn fails outright.
        SpawnError,
    }

    struct FakeTranscoder {
        plan: Mutex<VecDeque<Plan>>,
        on_empty: Plan,
        active: Arc<AtomicU32>,
        overlaps: Arc<AtomicU32>,
        starts: Mutex<Vec<SourceKind>>,
    }

    impl FakeTranscoder {
        fn new(plan: Vec<Plan>, on_empty: Plan) -> Arc<Self> {
            Arc::new(Self {
                plan: Mutex::new(plan.into()),
                on_empty,
                active: Arc::new(AtomicU32::new(0)),
                overlaps: Arc::new(AtomicU32::new(0)),
                starts: Mutex::new(Vec::new()),
            })
        }

        fn started_kinds(&self) -> Vec<SourceKind> {
            self.starts.lock().unwrap().clone()
        }

        fn overlaps(&self) -> u32 {
            self.overlaps.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn start(
            &self,
            _camera: &str,
            source: &StreamSource,
            _sink: &str,
        ) -> Result<Box<dyn ProcessHandle>, ProcessError> {
            let plan = self
                .plan
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.on_empty);
            if matches!(plan, Plan::SpawnError) {
                return Err(ProcessError::Spawn(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "No such file or directory",
                )));
            }

            // Two live writers on one sink is the invariant under test.
            if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            self.starts.lock().unwrap().push(source.kind);

            let exit_after = match plan {
                Plan::ExitAfter(delay, exit) => Some((delay, exit)),
                _ => None,
            };
            Ok(Box::new(FakeProcess {
                kind: source.kind,
                probe: ActivityProbe::new(),
                started_at: Instant::now(),
                exit_after,
                active: self.active.clone(),
            }))
        }
    }

    struct FakeProcess {
        kind: SourceKind,
        probe: ActivityProbe,
        started_at: Instant,
        exit_after: Option<(Duration, Exit)>,
        active: Arc<AtomicU32>,
    }

    impl Drop for FakeProcess {
        fn drop(&mut self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ProcessHandle for FakeProcess {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn pid(&self) -> Option<u32> {
            Some(4242)
        }

        fn started_at(&self) -> Instant {
            self.started_at
        }

        fn probe(&self) -> ActivityProbe {
            self.probe.clone()
        }

        async fn wait(&mut self) -> Exit {
            match self.exit_after {
                Some((delay, exit)) => {
                    time::sleep_until(self.started_at + delay).await;
                    exit
                }
                None => std::future::pending().await,
            }
        }

        async fn stop(self: Box<Self>, _grace: Duration) -> Exit {
            match self.exit_after {
                Some((delay, exit)) if self.started_at.elapsed() >= delay => exit,
                _ => Exit::Signaled,
            }
        }
    }

    // --- harness ---------------------------------------------------------

    fn params() -> SessionParams {
        SessionParams {
            sink: "rtmp://sink/porch".into(),
            placeholder: Path::new("idle.mp4").to_path_buf(),
            acquire_timeout: Duration::from_secs(3600),
            grace: Duration::from_secs(5),
            min_dwell: Duration::from_secs(5),
            backoff: BackoffPolicy {
                first: Duration::from_secs(2),
                max: Duration::from_secs(30),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
            // Far threshold: stalls only fire in tests that want them.
            watchdog: Watchdog {
                period: Duration::from_secs(5),
                threshold: Duration::from_secs(100_000),
            },
            live_fail_window: Duration::from_secs(60),
            live_fail_limit: 3,
            launch_fail_limit: 3,
        }
    }

    struct Harness {
        rx: broadcast::Receiver<Event>,
        token: CancellationToken,
        handle: tokio::task::JoinHandle<Result<(), SessionError>>,
    }

    fn spawn_session(
        params: SessionParams,
        resolver: Arc<ScriptResolver>,
        transcoder: Arc<FakeTranscoder>,
    ) -> Harness {
        let bus = Bus::new(256);
        let rx = bus.subscribe();
        let token = CancellationToken::new();
        let actor = SessionActor::new("porch", params, resolver, transcoder, bus);
        let handle = tokio::spawn(actor.run(token.clone()));
        Harness { rx, token, handle }
    }

    /// Receives events until one of `kind` arrives, returning it plus
    /// everything seen before it.
    async fn collect_until(h: &mut Harness, kind: EventKind) -> (Event, Vec<Event>) {
        let mut seen = Vec::new();
        loop {
            let ev = time::timeout(Duration::from_secs(3600), h.rx.recv())
                .await
                .expect("timed out waiting for event")
                .expect("bus closed");
            if ev.kind == kind {
                return (ev, seen);
            }
            seen.push(ev);
        }
    }

    async fn shutdown(h: Harness) -> Result<(), SessionError> {
        h.token.cancel();
        time::timeout(Duration::from_secs(3600), h.handle)
            .await
            .expect("session did not stop")
            .expect("session panicked")
    }

    fn count(events: &[Event], kind: EventKind) -> usize {
        events.iter().filter(|e| e.kind == kind).count()
    }

    // --- scenarios -------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn live_on_first_resolve() {
        let resolver = ScriptResolver::new(vec![live_ok()], OnEmpty::Pending);
        let transcoder = FakeTranscoder::new(vec![], Plan::RunSilent);
        let mut h = spawn_session(params(), resolver.clone(), transcoder.clone());

        let (_, before) = collect_until(&mut h, EventKind::LiveStarted).await;
        assert_eq!(count(&before, EventKind::BackoffScheduled), 0);
        assert_eq!(resolver.calls(), 1);
        assert_eq!(transcoder.started_kinds(), vec![SourceKind::Live]);

        assert!(shutdown(h).await.is_ok());
        assert_eq!(transcoder.overlaps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_camera_backs_off_exponentially_behind_placeholder() {
        let resolver = ScriptResolver::new(vec![], OnEmpty::Offline);
        let transcoder = FakeTranscoder::new(vec![], Plan::RunSilent);
        let mut h = spawn_session(params(), resolver, transcoder.clone());

        let mut delays = Vec::new();
        let mut placeholders = 0usize;
        let mut live_started = 0usize;
        while delays.len() < 3 {
            let (ev, before) = collect_until(&mut h, EventKind::BackoffScheduled).await;
            delays.push(ev.delay_ms.unwrap());
            placeholders += count(&before, EventKind::PlaceholderStarted);
            live_started += count(&before, EventKind::LiveStarted);
        }

        assert_eq!(delays, vec![2_000, 4_000, 8_000]);
        assert_eq!(live_started, 0);
        // The sink was fed by a placeholder between every retry.
        assert!(placeholders >= 2);

        assert!(shutdown(h).await.is_ok());
        assert_eq!(transcoder.overlaps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_live_exit_re_resolves_without_backoff() {
        let resolver = ScriptResolver::new(vec![live_ok(), live_ok()], OnEmpty::Pending);
        let transcoder = FakeTranscoder::new(
            vec![Plan::ExitAfter(Duration::from_secs(10), Exit::Failed(1))],
            Plan::RunSilent,
        );
        let mut h = spawn_session(params(), resolver.clone(), transcoder.clone());

        collect_until(&mut h, EventKind::LiveStarted).await;
        let (exited, _) = collect_until(&mut h, EventKind::ProcessExited).await;
        assert_eq!(exited.exit_code, Some(1));

        let (_, between) = collect_until(&mut h, EventKind::LiveStarted).await;
        assert_eq!(count(&between, EventKind::BackoffScheduled), 0);
        assert_eq!(resolver.calls(), 2);

        assert!(shutdown(h).await.is_ok());
        assert_eq!(transcoder.overlaps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_live_process_is_restarted_once_per_stall() {
        let mut p = params();
        p.watchdog = Watchdog {
            period: Duration::from_secs(5),
            threshold: Duration::from_secs(10),
        };
        let resolver = ScriptResolver::new(vec![live_ok(), live_ok()], OnEmpty::Pending);
        // Live process runs but never produces output.
        let transcoder = FakeTranscoder::new(vec![], Plan::RunSilent);
        let mut h = spawn_session(p, resolver, transcoder.clone());

        collect_until(&mut h, EventKind::LiveStarted).await;
        let (stall, _) = collect_until(&mut h, EventKind::StallDetected).await;
        assert!(stall.idle_ms.unwrap() >= 10_000);

        let (_, between) = collect_until(&mut h, EventKind::LiveStarted).await;
        assert_eq!(count(&between, EventKind::StallDetected), 0);

        assert!(shutdown(h).await.is_ok());
        assert_eq!(transcoder.overlaps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_with_resolver_in_flight() {
        let resolver = ScriptResolver::new(vec![], OnEmpty::Pending);
        let transcoder = FakeTranscoder::new(vec![], Plan::RunSilent);
        let mut h = spawn_session(params(), resolver, transcoder);

        // Wait until the session is parked inside the resolver call.
        let (ev, _) = collect_until(&mut h, EventKind::StateChanged).await;
        assert_eq!(ev.to, Some(SessionState::Resolving));

        assert!(shutdown(h).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_source_forces_re_resolution() {
        let expired = StreamSource::live(
            "rtsps://cloud/stale",
            Some(std::time::SystemTime::now() - std::time::Duration::from_secs(30)),
        );
        let resolver = ScriptResolver::new(vec![Ok(expired), live_ok()], OnEmpty::Pending);
        let transcoder = FakeTranscoder::new(vec![], Plan::RunSilent);
        let mut h = spawn_session(params(), resolver.clone(), transcoder.clone());

        let (_, before) = collect_until(&mut h, EventKind::LiveStarted).await;
        assert_eq!(resolver.calls(), 2);
        assert_eq!(count(&before, EventKind::BackoffScheduled), 0);
        assert_eq!(transcoder.started_kinds(), vec![SourceKind::Live]);

        assert!(shutdown(h).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_launch_failures_become_fatal() {
        let resolver = ScriptResolver::new(vec![], OnEmpty::Offline);
        let transcoder = FakeTranscoder::new(vec![], Plan::SpawnError);
        let mut h = spawn_session(params(), resolver, transcoder);

        let (dead, before) = collect_until(&mut h, EventKind::SessionDead).await;
        assert!(dead.reason.unwrap().contains("launch failed"));
        assert_eq!(count(&before, EventKind::LaunchFailed), 3);

        let res = time::timeout(Duration::from_secs(3600), h.handle)
            .await
            .expect("session did not terminate")
            .expect("session panicked");
        assert!(matches!(
            res,
            Err(SessionError::LaunchExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn flapping_live_routes_through_backoff() {
        // Every resolve succeeds, but the live process dies quickly each
        // time; the third consecutive failure must back off instead of
        // hot-looping.
        let resolver = ScriptResolver::new(
            vec![live_ok(), live_ok(), live_ok()],
            OnEmpty::Pending,
        );
        let transcoder = FakeTranscoder::new(
            vec![
                Plan::ExitAfter(Duration::from_secs(6), Exit::Failed(1)),
                Plan::ExitAfter(Duration::from_secs(6), Exit::Failed(1)),
                Plan::ExitAfter(Duration::from_secs(6), Exit::Failed(1)),
            ],
            Plan::RunSilent,
        );
        let mut h = spawn_session(params(), resolver, transcoder.clone());

        let (backoff, before) = collect_until(&mut h, EventKind::BackoffScheduled).await;
        assert_eq!(backoff.reason.as_deref(), Some("live_flapping"));
        assert_eq!(count(&before, EventKind::LiveStarted), 3);
        assert_eq!(count(&before, EventKind::ProcessExited), 3);

        assert!(shutdown(h).await.is_ok());
        assert_eq!(transcoder.overlaps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_placeholder_is_restarted() {
        let resolver = ScriptResolver::new(vec![], OnEmpty::Offline);
        // First placeholder survives 10s then dies; the next runs fine.
        let mut p = params();
        p.backoff = BackoffPolicy {
            first: Duration::from_secs(600),
            max: Duration::from_secs(600),
            factor: 1.0,
            jitter: JitterPolicy::None,
        };
        let transcoder = FakeTranscoder::new(
            vec![
                Plan::ExitAfter(Duration::from_secs(10), Exit::Failed(1)),
                Plan::RunSilent,
            ],
            Plan::RunSilent,
        );
        let mut h = spawn_session(p, resolver, transcoder.clone());

        collect_until(&mut h, EventKind::PlaceholderStarted).await;
        collect_until(&mut h, EventKind::ProcessExited).await;
        collect_until(&mut h, EventKind::PlaceholderStarted).await;

        assert!(shutdown(h).await.is_ok());
        assert_eq!(
            transcoder.started_kinds(),
            vec![SourceKind::Placeholder, SourceKind::Placeholder]
        );
        assert_eq!(transcoder.overlaps(), 0);
    }
}
