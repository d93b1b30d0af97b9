//! Fixed HSV color-threshold detection.
//!
//! For each color class, in the order red, green, blue:
//! threshold the HSV frame, dilate the mask with a 5x5 kernel, follow every border,
//! drop borders enclosing 300 px or less, and report each survivor's bounding box.
//!
//! Detection is stateless. Geometry and labels depend only on the pixels; ids and
//! timestamps come from the clock passed in.

mod contour;
mod hsv;
mod mask;
mod result;

use std::fmt;

use chrono::{DateTime, Local, TimeZone};

use crate::frame::Frame;

pub use contour::{find_contours, Contour, Point, Rect};
pub use hsv::{rgb_to_hsv, HsvImage, HsvRange};
pub use mask::Mask;
pub use result::{ColorClass, Detection};

/// Side of the square all-ones dilation kernel.
pub const DILATION_KERNEL_SIZE: u32 = 5;

/// Contours enclosing this many pixels or fewer are noise.
pub const MIN_CONTOUR_AREA: f64 = 300.0;

/// Reported for every detection; not derived from the image.
pub const DETECTION_CONFIDENCE: f64 = 95.0;

/// Run detection stamped with the current local time.
pub fn detect_colors(frame: &Frame) -> Vec<Detection> {
    detect_colors_at(frame, &Local::now())
}

/// Run detection stamped with `at`.
pub fn detect_colors_at<Tz>(frame: &Frame, at: &DateTime<Tz>) -> Vec<Detection>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let hsv = HsvImage::from_frame(frame);
    let millis = at.timestamp_millis();
    let timestamp = at.format("%H:%M:%S").to_string();

    let mut detections = Vec::new();
    for color in ColorClass::ALL {
        let mask = Mask::in_range(&hsv, color.bounds()).dilate(DILATION_KERNEL_SIZE);
        for contour in find_contours(&mask) {
            if contour.area() <= MIN_CONTOUR_AREA {
                continue;
            }
            let rect = contour.bounding_rect();
            detections.push(Detection {
                id: format!("{}_{}", color, millis),
                color,
                confidence: DETECTION_CONFIDENCE,
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                timestamp: timestamp.clone(),
            });
        }
    }
    detections
}
