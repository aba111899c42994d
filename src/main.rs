//! camvisor daemon binary.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use camvisor::{
    AliveTracker, Config, FfmpegTranscoder, HttpResolver, LogWriter, Resolver, SessionActor,
    Subscribe, Supervisor, Transcoder,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("camvisor=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = Config::from_env()?;
    cfg.validate()?;
    info!(cameras = ?cfg.cameras, sink = %cfg.sink, "starting camvisor");

    let resolver: Arc<dyn Resolver> = Arc::new(HttpResolver::new(
        cfg.api_url.clone(),
        cfg.api_token.clone(),
        cfg.acquire_timeout,
    )?);
    let transcoder: Arc<dyn Transcoder> = Arc::new(
        FfmpegTranscoder::new(&cfg.transcoder).with_output_args(cfg.output_args.clone()),
    );

    let alive = Arc::new(AliveTracker::new());
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter), alive.clone()];
    let supervisor = Supervisor::new(&cfg, subscribers, alive);

    let sessions: Vec<SessionActor> = cfg
        .cameras
        .iter()
        .map(|camera| {
            SessionActor::new(
                camera.as_str(),
                cfg.session_params(camera),
                resolver.clone(),
                transcoder.clone(),
                supervisor.bus(),
            )
        })
        .collect();

    supervisor.run(sessions).await?;
    info!("shutdown complete");
    Ok(())
}
