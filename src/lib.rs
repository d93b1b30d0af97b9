//! Color cube vision service
//!
//! This crate watches a networked camera stream, segments red, green and blue
//! regions with fixed HSV thresholds, and serves the latest detections over HTTP.
//!
//! # Architecture
//!
//! Two components share one value:
//!
//! 1. **Capture loop** (`capture`): a dedicated thread reads frames, resizes them
//!    to 640x480, runs detection and publishes the result.
//! 2. **Detection API** (`api`): answers `GET /api/detections` with the last
//!    published set.
//!
//! The shared value is a `DetectionStore` holding an immutable snapshot. Each publish
//! swaps in a whole new set, so readers always see one frame's complete output.
//! There is no history and no freshness guarantee: if the stream stalls, the API
//! keeps serving the last snapshot.
//!
//! # Module Structure
//!
//! - `frame`: decoded RGB frames and resizing
//! - `ingest`: frame sources (HTTP MJPEG cameras, synthetic `stub://` scenes)
//! - `detect`: HSV thresholding, dilation, border following, detections
//! - `store`: the shared detection snapshot
//! - `capture`: the background loop
//! - `api`: the HTTP endpoint
//! - `config`: daemon configuration (file + env)

pub mod api;
pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod store;

pub use capture::{CaptureConfig, CaptureHandle, CaptureLoop, CaptureStats};
pub use detect::{detect_colors, detect_colors_at, ColorClass, Detection};
pub use frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
pub use ingest::{FrameSource, HttpSource, StreamSource, SyntheticSource};
pub use store::{DetectionStore, Snapshot};
