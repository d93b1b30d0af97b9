//! Decoded video frames.
//!
//! - `Frame`: owned RGB pixel buffer handed from a frame source to the capture loop.
//!
//! Frames are short-lived: the capture loop resizes, runs detection and drops them
//! within one iteration. Nothing retains a frame across iterations.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Width every frame is resized to before detection.
pub const FRAME_WIDTH: u32 = 640;

/// Height every frame is resized to before detection.
pub const FRAME_HEIGHT: u32 = 480;

// ----------------------------------------------------------------------------
// Frame: owned RGB pixels
// ----------------------------------------------------------------------------

/// One decoded color frame, 8-bit RGB, row-major.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Wrap a packed RGB buffer. Fails when the length does not match the dimensions.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(anyhow!(
                "rgb buffer has {} bytes; expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            ));
        }
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("rgb buffer rejected for {}x{}", width, height))?;
        Ok(Self { image })
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb(rgb)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.image
    }

    /// Paint an axis-aligned rectangle. Parts outside the frame are clipped.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgb: [u8; 3]) {
        let x_end = x.saturating_add(width).min(self.width());
        let y_end = y.saturating_add(height).min(self.height());
        for py in y..y_end {
            for px in x..x_end {
                self.image.put_pixel(px, py, Rgb(rgb));
            }
        }
    }

    /// Resize to `width`x`height` with bilinear filtering.
    ///
    /// Frames already at the target size are returned untouched.
    pub fn into_resized(self, width: u32, height: u32) -> Frame {
        if self.width() == width && self.height() == height {
            return self;
        }
        Frame {
            image: imageops::resize(&self.image, width, height, FilterType::Triangle),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
