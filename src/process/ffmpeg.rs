//! # ffmpeg-backed transcoder.
//!
//! [`FfmpegTranscoder`] launches `ffmpeg` to re-multiplex a source into the
//! configured sink:
//! - live sources are stream-copied (`-i <url>`);
//! - placeholder clips loop forever at native rate (`-re -stream_loop -1`).
//!
//! stderr is continuously drained: every line touches the process's
//! [`ActivityProbe`] and is logged at debug level. `-progress pipe:2` keeps
//! lines flowing while the pipeline moves, which is what makes stderr
//! activity a usable staleness signal.
//!
//! Stopping writes ffmpeg's interactive quit command (`q`) to its stdin so
//! the muxer can flush, then kills after the grace period.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::process::handle::{Exit, ProcessError, ProcessHandle, Transcoder};
use crate::process::probe::ActivityProbe;
use crate::source::{SourceKind, StreamSource};

/// Launches ffmpeg processes for camera sessions.
pub struct FfmpegTranscoder {
    program: PathBuf,
    output_args: Vec<String>,
}

impl FfmpegTranscoder {
    /// Creates a transcoder invoking the given executable with default
    /// output arguments (stream copy into an MPEG-TS container).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_args: ["-c", "copy", "-f", "mpegts"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replaces the output argument set (codecs, container, bitrates).
    pub fn with_output_args(mut self, args: Vec<String>) -> Self {
        if !args.is_empty() {
            self.output_args = args;
        }
        self
    }

    /// Builds the full argument vector for one invocation.
    fn build_args(&self, source: &StreamSource, sink: &str) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-v".into(),
            "warning".into(),
            "-progress".into(),
            "pipe:2".into(),
        ];

        match source.kind {
            SourceKind::Live => {}
            SourceKind::Placeholder => {
                args.extend(["-re".into(), "-stream_loop".into(), "-1".into()]);
            }
        }
        args.extend(["-i".into(), source.locator.clone()]);
        args.extend(self.output_args.iter().cloned());
        args.push(sink.to_string());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn start(
        &self,
        camera: &str,
        source: &StreamSource,
        sink: &str,
    ) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        let args = self.build_args(source, sink);
        debug!(camera, kind = source.kind.as_label(), "spawning transcoder");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let probe = ActivityProbe::new();
        let stderr_task = child.stderr.take().map(|stderr| {
            let probe = probe.clone();
            let camera = camera.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    probe.touch();
                    debug!(camera = %camera, "transcoder: {line}");
                }
            })
        });

        Ok(Box::new(FfmpegProcess {
            child,
            stdin,
            kind: source.kind,
            started_at: Instant::now(),
            probe,
            stderr_task,
        }))
    }
}

/// One running ffmpeg instance.
struct FfmpegProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    kind: SourceKind,
    started_at: Instant,
    probe: ActivityProbe,
    stderr_task: Option<JoinHandle<()>>,
}

#[async_trait]
impl ProcessHandle for FfmpegProcess {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn started_at(&self) -> Instant {
        self.started_at
    }

    fn probe(&self) -> ActivityProbe {
        self.probe.clone()
    }

    async fn wait(&mut self) -> Exit {
        match self.child.wait().await {
            Ok(status) => Exit::from_status(status),
            Err(_) => Exit::Signaled,
        }
    }

    async fn stop(mut self: Box<Self>, grace: Duration) -> Exit {
        let exit = match self.child.try_wait() {
            Ok(Some(status)) => Exit::from_status(status),
            _ => {
                // Ask ffmpeg to quit and flush; closing stdin afterwards
                // covers builds that only react to EOF.
                if let Some(mut stdin) = self.stdin.take() {
                    let _ = stdin.write_all(b"q\n").await;
                    let _ = stdin.shutdown().await;
                }
                match tokio::time::timeout(grace, self.child.wait()).await {
                    Ok(Ok(status)) => Exit::from_status(status),
                    Ok(Err(_)) => Exit::Signaled,
                    Err(_elapsed) => {
                        let _ = self.child.kill().await;
                        Exit::Signaled
                    }
                }
            }
        };
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn placeholder_args_loop_the_clip() {
        let t = FfmpegTranscoder::new("ffmpeg");
        let src = StreamSource::placeholder(Path::new("idle.mp4"));
        let args = t.build_args(&src, "rtmp://sink/porch");

        let loop_at = args.iter().position(|a| a == "-stream_loop");
        assert!(args.contains(&"-re".to_string()));
        assert_eq!(args[loop_at.unwrap() + 1], "-1");
        let input_at = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[input_at + 1], "idle.mp4");
        assert_eq!(args.last().map(String::as_str), Some("rtmp://sink/porch"));
    }

    #[test]
    fn live_args_feed_the_locator_straight_in() {
        let t = FfmpegTranscoder::new("ffmpeg");
        let src = StreamSource::live("rtsps://cloud/feed", None);
        let args = t.build_args(&src, "rtmp://sink/porch");

        assert!(!args.contains(&"-stream_loop".to_string()));
        let input_at = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[input_at + 1], "rtsps://cloud/feed");
    }

    #[test]
    fn custom_output_args_replace_defaults() {
        let t = FfmpegTranscoder::new("ffmpeg")
            .with_output_args(vec!["-c:v".into(), "copy".into(), "-f".into(), "flv".into()]);
        let src = StreamSource::live("rtsps://cloud/feed", None);
        let args = t.build_args(&src, "rtmp://sink/porch");

        assert!(args.contains(&"flv".to_string()));
        assert!(!args.contains(&"mpegts".to_string()));
    }

    #[test]
    fn progress_reporting_always_on() {
        let t = FfmpegTranscoder::new("ffmpeg");
        let src = StreamSource::live("rtsps://cloud/feed", None);
        let args = t.build_args(&src, "out.ts");
        let p = args.iter().position(|a| a == "-progress").unwrap();
        assert_eq!(args[p + 1], "pipe:2");
    }
}
