//! cube_visiond - color cube detection daemon
//!
//! This daemon:
//! 1. Serves the latest detections on `GET /api/detections`
//! 2. Opens the configured camera stream on a background capture thread
//! 3. Detects red/green/blue regions in each frame and publishes them
//! 4. Stops both on Ctrl-C
//!
//! A stream that fails to open stops the capture thread only; the API keeps
//! answering with an empty set.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use cube_vision::{
    api::{ApiConfig, ApiServer},
    config::DaemonConfig,
    CaptureLoop, DetectionStore, StreamSource,
};

const CAPTURE_STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a JSON or TOML config file.
    #[arg(long, env = "CUBE_VISION_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = DaemonConfig::load(args.config.as_deref())?;

    let store = Arc::new(DetectionStore::new());

    let api_config = ApiConfig {
        addr: cfg.api_addr.clone(),
    };
    let api_handle = ApiServer::new(api_config, store.clone()).spawn()?;
    log::info!("detection api listening on {}", api_handle.addr);

    let source = StreamSource::new(cfg.stream.url.clone());
    let capture = CaptureLoop::new(cfg.stream.capture_config(), Box::new(source), store).spawn()?;
    log::info!(
        "cube_visiond running. stream={} frame={}x{} throttle={}ms",
        cfg.stream.url,
        cfg.stream.width,
        cfg.stream.height,
        cfg.stream.throttle.as_millis()
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    log::info!("cube_visiond waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping...");

    let stats = capture.stats();
    if !capture.stop(CAPTURE_STOP_GRACE)? {
        log::warn!("capture loop blocked on a frame read; exiting without waiting");
    }
    api_handle.stop()?;
    log::info!(
        "stopped after {} frames ({} read failures)",
        stats.frames_processed,
        stats.read_failures
    );

    Ok(())
}
