//! # Runtime configuration.
//!
//! [`Config`] centralizes every tunable the daemon consumes, loaded from
//! `CAMVISOR_*` environment variables (with `.env` support via `dotenvy`
//! in `main`).
//!
//! Required: `CAMVISOR_CAMERAS` (comma-separated ids), `CAMVISOR_API_URL`,
//! `CAMVISOR_API_TOKEN`, `CAMVISOR_SINK`. Everything else has defaults.
//!
//! The sink is a template: `{camera}` is substituted per session, so one
//! daemon can fan N cameras out to N sink targets.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::SessionParams;
use crate::policies::{BackoffPolicy, JitterPolicy};
use crate::watchdog::Watchdog;

/// Configuration loading and validation failures.
///
/// All of these are fatal: the daemon refuses to start rather than run with
/// a sink it cannot feed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// An environment variable failed to parse.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        name: &'static str,
        value: String,
    },

    /// The placeholder clip does not exist or is unreadable.
    #[error("placeholder clip not found: {0}")]
    PlaceholderMissing(PathBuf),

    /// The transcoder executable is not on the PATH.
    #[error("transcoder executable not found: {0}")]
    TranscoderMissing(String),
}

/// Global daemon configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Camera identifiers, one session each.
    pub cameras: Vec<String>,
    /// Base URL of the cloud camera API.
    pub api_url: String,
    /// Bearer token for the cloud camera API.
    pub api_token: String,
    /// Output sink target; `{camera}` is substituted per session.
    pub sink: String,
    /// Local clip looped while no live feed is available.
    pub placeholder: PathBuf,
    /// Transcoder executable name or path.
    pub transcoder: String,
    /// Output-side transcoder arguments (codecs, container).
    pub output_args: Vec<String>,

    /// Upper bound on one live-acquisition call.
    pub acquire_timeout: Duration,
    /// Output silence tolerated before a stall fires.
    pub staleness_threshold: Duration,
    /// Watchdog poll period.
    pub watchdog_period: Duration,
    /// Graceful-stop window (process stop and shutdown alike).
    pub grace: Duration,
    /// Minimum time in a streaming state before a failure-driven transition.
    pub min_dwell: Duration,

    /// Retry backoff policy.
    pub backoff: BackoffPolicy,
    /// Live failures inside this window count as consecutive.
    pub live_fail_window: Duration,
    /// Consecutive live failures that route through backoff.
    pub live_fail_limit: u32,
    /// Consecutive launch failures that become fatal.
    pub launch_fail_limit: u32,

    /// Event bus ring-buffer capacity.
    pub bus_capacity: usize,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let cameras: Vec<String> = required(&get, "CAMVISOR_CAMERAS")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if cameras.is_empty() {
            return Err(ConfigError::Invalid {
                name: "CAMVISOR_CAMERAS",
                value: String::new(),
            });
        }

        Ok(Self {
            cameras,
            api_url: required(&get, "CAMVISOR_API_URL")?,
            api_token: required(&get, "CAMVISOR_API_TOKEN")?,
            sink: required(&get, "CAMVISOR_SINK")?,
            placeholder: PathBuf::from(
                get("CAMVISOR_PLACEHOLDER").unwrap_or_else(|| "idle.mp4".into()),
            ),
            transcoder: get("CAMVISOR_TRANSCODER").unwrap_or_else(|| "ffmpeg".into()),
            output_args: get("CAMVISOR_OUTPUT_ARGS")
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),

            acquire_timeout: secs(&get, "CAMVISOR_ACQUIRE_TIMEOUT_SECS", 15)?,
            staleness_threshold: secs(&get, "CAMVISOR_STALENESS_SECS", 30)?,
            watchdog_period: secs(&get, "CAMVISOR_WATCHDOG_PERIOD_SECS", 5)?,
            grace: secs(&get, "CAMVISOR_GRACE_SECS", 10)?,
            min_dwell: secs(&get, "CAMVISOR_MIN_DWELL_SECS", 5)?,

            backoff: BackoffPolicy {
                first: secs(&get, "CAMVISOR_BACKOFF_FIRST_SECS", 2)?,
                max: secs(&get, "CAMVISOR_BACKOFF_MAX_SECS", 60)?,
                factor: float(&get, "CAMVISOR_BACKOFF_FACTOR", 2.0)?,
                jitter: jitter(&get)?,
            },
            live_fail_window: secs(&get, "CAMVISOR_LIVE_FAIL_WINDOW_SECS", 60)?,
            live_fail_limit: int(&get, "CAMVISOR_LIVE_FAIL_LIMIT", 3)?,
            launch_fail_limit: int(&get, "CAMVISOR_LAUNCH_FAIL_LIMIT", 5)?,

            bus_capacity: int(&get, "CAMVISOR_BUS_CAPACITY", 1024)?,
        })
    }

    /// Rejects configurations that could only fail at stream time: missing
    /// placeholder clip, missing transcoder executable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.placeholder.is_file() {
            return Err(ConfigError::PlaceholderMissing(self.placeholder.clone()));
        }
        which::which(&self.transcoder)
            .map_err(|_| ConfigError::TranscoderMissing(self.transcoder.clone()))?;
        Ok(())
    }

    /// Sink target for one camera.
    pub fn sink_for(&self, camera: &str) -> String {
        self.sink.replace("{camera}", camera)
    }

    /// Session tunables for one camera.
    pub fn session_params(&self, camera: &str) -> SessionParams {
        SessionParams {
            sink: self.sink_for(camera),
            placeholder: self.placeholder.clone(),
            acquire_timeout: self.acquire_timeout,
            grace: self.grace,
            min_dwell: self.min_dwell,
            backoff: self.backoff,
            watchdog: Watchdog {
                period: self.watchdog_period,
                threshold: self.staleness_threshold,
            },
            live_fail_window: self.live_fail_window,
            live_fail_limit: self.live_fail_limit,
            launch_fail_limit: self.launch_fail_limit,
        }
    }
}

fn required(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    match get(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn secs(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match get(name) {
        None => Ok(Duration::from_secs(default)),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

fn float(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: f64,
) -> Result<f64, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

fn int<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

fn jitter(get: &impl Fn(&str) -> Option<String>) -> Result<JitterPolicy, ConfigError> {
    match get("CAMVISOR_JITTER") {
        None => Ok(JitterPolicy::Full),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(JitterPolicy::None),
            "full" => Ok(JitterPolicy::Full),
            "equal" => Ok(JitterPolicy::Equal),
            _ => Err(ConfigError::Invalid {
                name: "CAMVISOR_JITTER",
                value: v,
            }),
        },
    }
}
