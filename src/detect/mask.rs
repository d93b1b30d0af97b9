//! Binary masks: thresholding and dilation.

use super::hsv::{HsvImage, HsvRange};

/// Binary mask, one byte per pixel (0 or 1), row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Select pixels whose H, S and V all fall inside `range`.
    pub fn in_range(hsv: &HsvImage, range: HsvRange) -> Self {
        let data = hsv.pixels().map(|p| u8::from(range.contains(p))).collect();
        Self {
            width: hsv.width(),
            height: hsv.height(),
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        let idx = self.index(x, y);
        self.data[idx] = u8::from(on);
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Dilate with a `size`x`size` all-ones kernel, one iteration, anchor at the centre.
    ///
    /// Pixels outside the mask never contribute. A rectangular kernel is separable,
    /// so this runs as a horizontal then a vertical max pass.
    pub fn dilate(&self, size: u32) -> Mask {
        if size <= 1 || self.data.is_empty() {
            return self.clone();
        }
        let width = self.width as usize;
        let height = self.height as usize;
        let before = (size / 2) as usize;
        let after = size as usize - 1 - before;

        let mut horizontal = vec![0u8; self.data.len()];
        for y in 0..height {
            let row = &self.data[y * width..(y + 1) * width];
            for x in 0..width {
                let lo = x.saturating_sub(before);
                let hi = (x + after).min(width - 1);
                horizontal[y * width + x] = u8::from(row[lo..=hi].iter().any(|&v| v != 0));
            }
        }

        let mut data = vec![0u8; self.data.len()];
        for x in 0..width {
            for y in 0..height {
                let lo = y.saturating_sub(before);
                let hi = (y + after).min(height - 1);
                data[y * width + x] = u8::from((lo..=hi).any(|yy| horizontal[yy * width + x] != 0));
            }
        }

        Mask {
            width: self.width,
            height: self.height,
            data,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
