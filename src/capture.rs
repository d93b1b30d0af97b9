//! Background capture loop.
//!
//! One dedicated thread opens the stream, then per iteration:
//! 1. Reads a frame (blocking, no timeout)
//! 2. On failure: waits the retry delay, clears the published set, reads again
//! 3. On success: resizes, runs color detection, publishes the result, waits the throttle delay
//!
//! A failed open ends the loop for good; the API keeps serving whatever was last
//! published. The store lock is only taken for the publish/clear itself.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::detect::detect_colors;
use crate::frame::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::ingest::FrameSource;
use crate::store::DetectionStore;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Pause after each processed frame. Sets the effective sampling rate.
    pub throttle: Duration,
    /// Pause after a failed read before clearing and reading again.
    pub retry_delay: Duration,
    /// How often the loop logs its counters, whether reads succeed or fail.
    pub health_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_width: FRAME_WIDTH,
            frame_height: FRAME_HEIGHT,
            throttle: Duration::from_millis(100),
            retry_delay: Duration::from_millis(100),
            health_interval: HEALTH_LOG_INTERVAL,
        }
    }
}

/// Counters since the loop started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_processed: u64,
    pub read_failures: u64,
    pub health_reports: u64,
}

#[derive(Default)]
struct Counters {
    frames_processed: AtomicU64,
    read_failures: AtomicU64,
    health_reports: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            frames_processed: self.frames_processed.load(Ordering::SeqCst),
            read_failures: self.read_failures.load(Ordering::SeqCst),
            health_reports: self.health_reports.load(Ordering::SeqCst),
        }
    }
}

pub struct CaptureLoop {
    cfg: CaptureConfig,
    source: Box<dyn FrameSource>,
    store: Arc<DetectionStore>,
}

impl CaptureLoop {
    pub fn new(
        cfg: CaptureConfig,
        source: Box<dyn FrameSource>,
        store: Arc<DetectionStore>,
    ) -> Self {
        Self { cfg, source, store }
    }

    /// Start the loop on its own thread.
    pub fn spawn(self) -> Result<CaptureHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let shutdown_thread = shutdown.clone();
        let counters_thread = counters.clone();
        let join = std::thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || self.run(&shutdown_thread, &counters_thread))?;
        Ok(CaptureHandle {
            shutdown,
            counters,
            join: Some(join),
        })
    }

    fn run(mut self, shutdown: &AtomicBool, counters: &Counters) {
        let name = self.source.describe();
        if let Err(err) = self.source.open() {
            log::error!("capture loop: failed to open stream {}: {:#}", name, err);
            return;
        }
        log::info!(
            "capture loop: reading {} at {}x{}",
            name,
            self.cfg.frame_width,
            self.cfg.frame_height
        );

        let mut failing = false;
        let mut last_health_log = Instant::now();
        while !shutdown.load(Ordering::SeqCst) {
            if last_health_log.elapsed() >= self.cfg.health_interval {
                let stats = counters.snapshot();
                log::info!(
                    "capture health: frames={} read_failures={} source={}",
                    stats.frames_processed,
                    stats.read_failures,
                    name
                );
                counters.health_reports.fetch_add(1, Ordering::SeqCst);
                last_health_log = Instant::now();
            }

            match self.source.read_frame() {
                Ok(frame) => {
                    if failing {
                        log::info!("capture loop: frames flowing again from {}", name);
                        failing = false;
                    }
                    let frame = frame.into_resized(self.cfg.frame_width, self.cfg.frame_height);
                    let detections = detect_colors(&frame);
                    log::trace!("capture loop: {} detections", detections.len());
                    self.store.publish(detections);
                    counters.frames_processed.fetch_add(1, Ordering::SeqCst);
                }
                Err(err) => {
                    if failing {
                        log::debug!("capture loop: frame read failed: {:#}", err);
                    } else {
                        log::warn!("capture loop: frame read failed: {:#}", err);
                        failing = true;
                    }
                    std::thread::sleep(self.cfg.retry_delay);
                    self.store.clear();
                    counters.read_failures.fetch_add(1, Ordering::SeqCst);
                    continue;
                }
            }

            std::thread::sleep(self.cfg.throttle);
        }
        log::info!("capture loop: stopped");
    }
}

pub struct CaptureHandle {
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
    join: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn stats(&self) -> CaptureStats {
        self.counters.snapshot()
    }

    /// True once the loop thread has exited (after a failed open or a stop).
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |join| join.is_finished())
    }

    /// Signal the loop to stop and wait up to `grace` for it to exit.
    ///
    /// A loop blocked inside a frame read cannot be interrupted; past `grace` the
    /// thread is left detached and `Ok(false)` is returned.
    pub fn stop(mut self, grace: Duration) -> Result<bool> {
        self.shutdown.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + grace;
        while !self.is_finished() {
            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("capture thread panicked"))?;
        }
        Ok(true)
    }
}
