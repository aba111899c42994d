//! # Stream source resolution.
//!
//! Defines the [`Resolver`] trait (the contract of the cloud camera client),
//! the [`StreamSource`] value handed to the transcoder, and the typed
//! [`ResolveError`] failure taxonomy the session state machine routes on.
//!
//! A resolver is purely request/response: no caching beyond the source's own
//! `expires_at`, no session affinity, safe to call repeatedly.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use thiserror::Error;

/// What kind of input the transcoder is fed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Real-time feed locator obtained from the camera's cloud session.
    Live,
    /// Static local clip looped to keep the sink non-silent.
    Placeholder,
}

impl SourceKind {
    /// Short stable label (snake_case) for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceKind::Live => "live",
            SourceKind::Placeholder => "placeholder",
        }
    }
}

/// Input description handed to the transcoder.
///
/// Live sources are time-bounded by the cloud API; placeholder sources never
/// expire. An expired live source must never be started — the resolver is
/// re-invoked instead.
#[derive(Clone, Debug)]
pub struct StreamSource {
    pub kind: SourceKind,
    /// URL (live) or local file path (placeholder).
    pub locator: String,
    /// Expiry of a live locator, if the cloud API declared one.
    pub expires_at: Option<SystemTime>,
}

impl StreamSource {
    /// Creates a live source.
    pub fn live(locator: impl Into<String>, expires_at: Option<SystemTime>) -> Self {
        Self {
            kind: SourceKind::Live,
            locator: locator.into(),
            expires_at,
        }
    }

    /// Creates a placeholder source for the given local clip.
    pub fn placeholder(clip: &Path) -> Self {
        Self {
            kind: SourceKind::Placeholder,
            locator: clip.to_string_lossy().into_owned(),
            expires_at: None,
        }
    }

    /// True when the locator's declared expiry has passed.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => SystemTime::now() >= at,
            None => false,
        }
    }
}

/// Resolves a camera identifier to a playable live source.
///
/// Implementations must not block past the configured acquisition timeout;
/// the session additionally wraps every call in `tokio::time::timeout`.
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    async fn resolve_live(&self, camera: &str) -> Result<StreamSource, ResolveError>;
}

/// Shared handle to a resolver.
pub type ResolverRef = Arc<dyn Resolver>;

/// # Live-acquisition failures.
///
/// Every kind except [`ResolveError::AuthExpired`] is plain backoff-worthy.
/// `AuthExpired` retries on the same schedule (the client refreshes
/// credentials on its next call) but is labeled distinctly so operators can
/// tell credential rot from camera outages.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Credentials rejected; the client will re-authenticate upstream.
    #[error("credentials rejected; upstream re-auth required")]
    AuthExpired,

    /// Camera unreachable from the cloud side.
    #[error("camera unreachable")]
    CameraOffline,

    /// Cloud API throttling; may carry a retry-after hint.
    #[error("cloud API throttled")]
    RateLimited {
        /// Server-provided minimum wait, if any.
        retry_after: Option<Duration>,
    },

    /// No answer within the acquisition timeout.
    #[error("no response within {timeout:?}")]
    Timeout {
        /// The acquisition timeout that elapsed.
        timeout: Duration,
    },

    /// Anything else; logged with full detail for operators.
    #[error("resolve failed: {error}")]
    Unknown {
        /// The underlying error message.
        error: String,
    },
}

impl ResolveError {
    /// Short stable label (snake_case) for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolveError::AuthExpired => "auth_expired",
            ResolveError::CameraOffline => "camera_offline",
            ResolveError::RateLimited { .. } => "rate_limited",
            ResolveError::Timeout { .. } => "timeout",
            ResolveError::Unknown { .. } => "unknown",
        }
    }

    /// Server-provided retry-after hint, when present.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ResolveError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
