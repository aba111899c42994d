//! Supervised external transcoding processes.
//!
//! ## Contents
//! - [`Transcoder`] / [`ProcessHandle`] — the launch/monitor/stop contract
//! - [`FfmpegTranscoder`] — the ffmpeg binding
//! - [`ActivityProbe`] — shared last-output timestamp for stall detection
//! - [`Exit`], [`ProcessError`]
//!
//! The process layer only watches process liveness and output activity; it
//! never inspects the media content flowing to the sink.

mod ffmpeg;
mod handle;
mod probe;

pub use ffmpeg::FfmpegTranscoder;
pub use handle::{Exit, ProcessError, ProcessHandle, Transcoder};
pub use probe::ActivityProbe;
