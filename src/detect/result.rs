use std::fmt;

use serde::{Deserialize, Serialize};

use super::hsv::HsvRange;

/// One colored region found in one frame.
///
/// Coordinates are pixels in the resized frame. `id` is `<color>_<epoch millis>`
/// and is not unique for regions found within the same millisecond.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: String,
    pub color: ColorClass,
    pub confidence: f64,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Local wall-clock time, `HH:MM:SS`.
    pub timestamp: String,
}

/// Color classes the detector segments, in detection order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    Red,
    Green,
    Blue,
}

impl ColorClass {
    /// Detection order: all red regions first, then green, then blue.
    pub const ALL: [ColorClass; 3] = [ColorClass::Red, ColorClass::Green, ColorClass::Blue];

    pub fn as_str(self) -> &'static str {
        match self {
            ColorClass::Red => "red",
            ColorClass::Green => "green",
            ColorClass::Blue => "blue",
        }
    }

    /// Inclusive HSV bounds (OpenCV 8-bit scale, hue in 0..=180).
    pub fn bounds(self) -> HsvRange {
        match self {
            ColorClass::Red => HsvRange::new([136, 87, 111], [180, 255, 255]),
            ColorClass::Green => HsvRange::new([25, 52, 72], [102, 255, 255]),
            ColorClass::Blue => HsvRange::new([94, 80, 2], [120, 255, 255]),
        }
    }
}

impl fmt::Display for ColorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_serializes_with_flat_fields() {
        let detection = Detection {
            id: "green_1700000000123".to_string(),
            color: ColorClass::Green,
            confidence: 95.0,
            x: 10,
            y: 20,
            width: 30,
            height: 40,
            timestamp: "12:34:56".to_string(),
        };
        let value = serde_json::to_value(&detection).unwrap();
        assert_eq!(value["color"], "green");
        assert_eq!(value["confidence"], 95.0);
        assert_eq!(value["x"], 10);
        assert_eq!(value["height"], 40);
        assert_eq!(value["timestamp"], "12:34:56");
    }

    #[test]
    fn green_and_blue_bounds_overlap_at_hue_94_to_102() {
        let green = ColorClass::Green.bounds();
        let blue = ColorClass::Blue.bounds();
        assert!(green.contains([98, 200, 200]));
        assert!(blue.contains([98, 200, 200]));
        assert!(!ColorClass::Red.bounds().contains([98, 200, 200]));
    }
}
