// Shirt colour sampling.
//
// A player box is cropped to its torso, grass pixels are masked out in HSV space, and the
// remaining pixels are reduced to one dominant colour with a 2-cluster fit.

use image::RgbImage;
use nalgebra::Vector3;

use crate::{
    bbox::BBox,
    clustering::ColorClustering,
    config::{PitchMask, TorsoRegion},
};

/// RGB colour with channels in 0-255, kept as floats so centroids can sit between pixels.
pub type Color = Vector3<f64>;

pub fn color_from_rgb(rgb: [u8; 3]) -> Color {
    Color::new(rgb[0] as f64, rgb[1] as f64, rgb[2] as f64)
}

/// Rounds and clamps back to displayable RGB.
pub fn color_to_rgb(color: &Color) -> [u8; 3] {
    let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    [channel(color.x), channel(color.y), channel(color.z)]
}

/// Rec. 601 luma, used to order centroids when no reference colours are configured.
pub fn brightness(color: &Color) -> f64 {
    0.299 * color.x + 0.587 * color.y + 0.114 * color.z
}

/// Convert RGB to HSV.
/// Returns (H: 0-360, S: 0-100, V: 0-255).
pub fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let r_n = r / 255.0;
    let g_n = g / 255.0;
    let b_n = b / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    let h = if delta < 1e-9 {
        0.0
    } else if max == r_n {
        60.0 * (((g_n - b_n) / delta).rem_euclid(6.0))
    } else if max == g_n {
        60.0 * (((b_n - r_n) / delta) + 2.0)
    } else {
        60.0 * (((r_n - g_n) / delta) + 4.0)
    };

    let s = if max < 1e-9 { 0.0 } else { (delta / max) * 100.0 };

    (h, s, max * 255.0)
}

impl PitchMask {
    pub fn is_pitch(&self, color: &Color) -> bool {
        let (h, s, v) = rgb_to_hsv(color.x, color.y, color.z);
        (self.hue_min..=self.hue_max).contains(&h)
            && s >= self.saturation_min
            && v >= self.value_min
    }
}

/// Non-grass pixels from the torso part of `bbox`, clipped to the frame.
///
/// Empty when the box is malformed, lies outside the frame, or holds only grass.
pub fn sample_torso_pixels(
    frame: &RgbImage,
    bbox: &BBox,
    torso: &TorsoRegion,
    pitch: &PitchMask,
) -> Vec<Color> {
    if !bbox.is_valid() {
        return Vec::new();
    }

    let (width, height) = frame.dimensions();
    let clip_x = |v: f64| v.floor().clamp(0.0, width as f64) as u32;
    let clip_y = |v: f64| v.floor().clamp(0.0, height as f64) as u32;

    let x_start = clip_x(bbox.x_1 + bbox.width() * torso.x_start);
    let x_end = clip_x(bbox.x_1 + bbox.width() * torso.x_end);
    let y_start = clip_y(bbox.y_1 + bbox.height() * torso.y_start);
    let y_end = clip_y(bbox.y_1 + bbox.height() * torso.y_end);

    let mut pixels = Vec::new();
    for y in y_start..y_end {
        for x in x_start..x_end {
            let color = color_from_rgb(frame.get_pixel(x, y).0);
            if !pitch.is_pitch(&color) {
                pixels.push(color);
            }
        }
    }

    pixels
}

/// Centroid of the larger of two clusters over the torso pixels.
///
/// A crop whose pixels are all the same colour yields that colour without fitting.
pub fn dominant_color<C: ColorClustering + ?Sized>(
    frame: &RgbImage,
    bbox: &BBox,
    torso: &TorsoRegion,
    pitch: &PitchMask,
    clustering: &C,
) -> Option<Color> {
    let pixels = sample_torso_pixels(frame, bbox, torso, pitch);
    let first = *pixels.first()?;
    if pixels.iter().all(|pixel| *pixel == first) {
        return Some(first);
    }

    let fit = clustering.fit(&pixels).ok()?;
    Some(fit.centroids[fit.largest_cluster()])
}
