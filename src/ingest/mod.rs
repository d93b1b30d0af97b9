//! Frame ingestion sources.
//!
//! This module provides the sources the capture loop can read from:
//! - HTTP MJPEG / JPEG snapshot cameras (`http://`, `https://`)
//! - Synthetic scenes (`stub://`) for demos and tests
//!
//! All sources produce decoded `Frame`s at whatever resolution the camera sends;
//! the capture loop owns resizing. Sources do not reconnect: once `open` fails,
//! or the stream ends, every later read fails.

pub mod mjpeg;
pub mod synthetic;

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

use crate::frame::Frame;

pub use mjpeg::{HttpSource, MjpegStream};
pub use synthetic::SyntheticSource;

/// Something the capture loop can pull frames from.
pub trait FrameSource: Send {
    /// Human-readable source identifier for logs.
    fn describe(&self) -> String;

    /// Open the stream. Called once before the first read.
    fn open(&mut self) -> Result<()>;

    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame>;
}

/// Source selected by URL scheme when opened.
pub struct StreamSource {
    url: String,
    backend: Option<StreamBackend>,
}

enum StreamBackend {
    Http(HttpSource),
    Synthetic(SyntheticSource),
}

impl StreamSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backend: None,
        }
    }
}

impl FrameSource for StreamSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn open(&mut self) -> Result<()> {
        let url = Url::parse(&self.url).with_context(|| format!("parse stream url {}", self.url))?;
        let backend = match url.scheme() {
            "http" | "https" => {
                let mut source = HttpSource::new(self.url.clone());
                source.connect()?;
                StreamBackend::Http(source)
            }
            "stub" => {
                let mut source = SyntheticSource::new(self.url.clone());
                source.connect()?;
                StreamBackend::Synthetic(source)
            }
            other => bail!(
                "unsupported stream scheme '{}'; expected http(s) or stub",
                other
            ),
        };
        self.backend = Some(backend);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        match self.backend.as_mut() {
            Some(StreamBackend::Http(source)) => source.next_frame(),
            Some(StreamBackend::Synthetic(source)) => source.next_frame(),
            None => Err(anyhow!("stream {} not opened", self.url)),
        }
    }
}
