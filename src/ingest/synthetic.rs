//! Synthetic frame source (`stub://`) for demos and tests.
//!
//! Produces a dark scene with one red, one green and one blue square sliding
//! across it, so the whole pipeline can run without a camera.

use anyhow::Result;

use crate::frame::Frame;

const SCENE_WIDTH: u32 = 1280;
const SCENE_HEIGHT: u32 = 720;
const SQUARE: u32 = 120;
const BACKGROUND: [u8; 3] = [24, 24, 24];

/// Square colors, each inside exactly one detector band.
const SQUARES: [[u8; 3]; 3] = [[255, 0, 60], [0, 200, 0], [0, 0, 255]];

pub struct SyntheticSource {
    name: String,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame_count: 0,
        }
    }

    /// Synthetic sources are always "connected".
    pub fn connect(&mut self) -> Result<()> {
        log::info!("synthetic source: connected to {}", self.name);
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        let mut frame = Frame::solid(SCENE_WIDTH, SCENE_HEIGHT, BACKGROUND);
        let travel = (SCENE_WIDTH - SQUARE) as u64;
        for (lane, rgb) in SQUARES.iter().enumerate() {
            let offset = (self.frame_count * 8 + lane as u64 * travel / 3) % travel;
            let y = 80 + lane as u32 * (SQUARE + 80);
            frame.fill_rect(offset as u32, y, SQUARE, SQUARE, *rgb);
        }
        self.frame_count += 1;
        Ok(frame)
    }
}
