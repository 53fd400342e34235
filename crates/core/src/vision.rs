//! Pixel-level helpers shared by the detector, the nameplate oracle and
//! death detection. Everything works on plain `image` buffers.

use image::{GrayImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::types::Rect;

/// Hue in degrees [0, 360), saturation and value in [0, 1].
pub fn hsv(p: &Rgb<u8>) -> (f32, f32, f32) {
    let r = p[0] as f32 / 255.0;
    let g = p[1] as f32 / 255.0;
    let b = p[2] as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let sat = if max <= f32::EPSILON { 0.0 } else { delta / max };
    (hue, sat, max)
}

/// An HSV box. A hue range with `hue_min > hue_max` wraps through 0 (reds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBand {
    pub hue_min: f32,
    pub hue_max: f32,
    pub sat_min: f32,
    pub sat_max: f32,
    pub val_min: f32,
    pub val_max: f32,
}

impl ColorBand {
    pub const fn hue(hue_min: f32, hue_max: f32, sat_min: f32, val_min: f32) -> Self {
        Self { hue_min, hue_max, sat_min, sat_max: 1.0, val_min, val_max: 1.0 }
    }

    pub fn contains(&self, p: &Rgb<u8>) -> bool {
        let (h, s, v) = hsv(p);
        let hue_ok = if self.hue_min <= self.hue_max {
            h >= self.hue_min && h <= self.hue_max
        } else {
            h >= self.hue_min || h <= self.hue_max
        };
        hue_ok && s >= self.sat_min && s <= self.sat_max && v >= self.val_min && v <= self.val_max
    }

    pub fn count(&self, img: &RgbImage) -> u32 {
        img.pixels().filter(|p| self.contains(p)).count() as u32
    }
}

pub fn grayscale(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Row-major boolean mask
pub struct Mask {
    pub width: usize,
    pub height: usize,
    bits: Vec<bool>,
}

impl Mask {
    pub fn threshold(gray: &GrayImage, level: u8) -> Self {
        Self {
            width: gray.width() as usize,
            height: gray.height() as usize,
            bits: gray.pixels().map(|p| p[0] >= level).collect(),
        }
    }

    /// Horizontal morphological closing with a `1 x width` kernel.
    /// Out-of-frame pixels are ignored, so shapes touching the border keep their size.
    pub fn close_horizontal(&self, width: usize) -> Self {
        if width <= 1 {
            return Self { width: self.width, height: self.height, bits: self.bits.clone() };
        }
        let before = (width - 1) / 2;
        let after = width - 1 - before;
        let dilated = self.sweep(before, after, true);
        // erosion uses the reflected kernel
        dilated.sweep(after, before, false)
    }

    /// `any == true`: dilate, `any == false`: erode.
    fn sweep(&self, left: usize, right: usize, any: bool) -> Self {
        let mut bits = vec![false; self.bits.len()];
        for y in 0..self.height {
            let row = &self.bits[y * self.width..(y + 1) * self.width];
            for x in 0..self.width {
                let lo = x.saturating_sub(right);
                let hi = (x + left).min(self.width - 1);
                let window = &row[lo..=hi];
                bits[y * self.width + x] = if any {
                    window.iter().any(|b| *b)
                } else {
                    window.iter().all(|b| *b)
                };
            }
        }
        Self { width: self.width, height: self.height, bits }
    }

    /// Bounding boxes of 8-connected components, which are the bounding
    /// boxes of the external contours.
    pub fn component_boxes(&self) -> Vec<Rect> {
        let mut seen = vec![false; self.bits.len()];
        let mut boxes = Vec::new();
        let mut stack = Vec::new();

        for start in 0..self.bits.len() {
            if !self.bits[start] || seen[start] {
                continue;
            }
            seen[start] = true;
            stack.push(start);
            let (mut x0, mut y0) = (usize::MAX, usize::MAX);
            let (mut x1, mut y1) = (0usize, 0usize);

            while let Some(idx) = stack.pop() {
                let (x, y) = (idx % self.width, idx / self.width);
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);

                for ny in y.saturating_sub(1)..=(y + 1).min(self.height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(self.width - 1) {
                        let n = ny * self.width + nx;
                        if self.bits[n] && !seen[n] {
                            seen[n] = true;
                            stack.push(n);
                        }
                    }
                }
            }

            boxes.push(Rect::new(
                x0 as i32,
                y0 as i32,
                (x1 - x0 + 1) as i32,
                (y1 - y0 + 1) as i32,
            ));
        }
        boxes
    }
}
