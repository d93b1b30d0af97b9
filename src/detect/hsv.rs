//! RGB to HSV conversion on the OpenCV 8-bit scale.
//!
//! Hue is degrees halved (0..=180), saturation and value are 0..=255.

use crate::frame::Frame;

/// Inclusive lower/upper (hue, saturation, value) bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// HSV pixels of one frame, row-major, three bytes per pixel.
pub struct HsvImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl HsvImage {
    pub fn from_frame(frame: &Frame) -> Self {
        let mut data = Vec::with_capacity(frame.width() as usize * frame.height() as usize * 3);
        for pixel in frame.pixels().pixels() {
            data.extend_from_slice(&rgb_to_hsv(pixel.0));
        }
        Self {
            width: frame.width(),
            height: frame.height(),
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }
}

const HSV_SHIFT: u32 = 12;
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

/// Fixed-point reciprocals scaled by 255 for saturation.
const SDIV_TABLE: [i32; 256] = reciprocal_table(255 << HSV_SHIFT);
/// Fixed-point reciprocals scaled by 30 (180 / 6) for hue.
const HDIV_TABLE: [i32; 256] = reciprocal_table((180 << HSV_SHIFT) / 6);

/// `table[i] = round(numerator / i)`, with `table[0] = 0`.
const fn reciprocal_table(numerator: i32) -> [i32; 256] {
    let mut table = [0; 256];
    let mut i = 1;
    while i < 256 {
        table[i] = (2 * numerator + i as i32) / (2 * i as i32);
        i += 1;
    }
    table
}

/// Convert one RGB pixel.
///
/// Integer arithmetic throughout, so results match OpenCV's 8-bit `BGR2HSV`
/// bit for bit, including how half steps round.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(i32::from);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = (diff * SDIV_TABLE[v as usize] + HSV_ROUND) >> HSV_SHIFT;

    // Sector offsets in units of 60 degrees: red 0, green 2, blue 4.
    let sector = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let h = (sector * HDIV_TABLE[diff as usize] + HSV_ROUND) >> HSV_SHIFT;
    let h = if h < 0 { h + 180 } else { h };

    [h as u8, s as u8, v as u8]
}
