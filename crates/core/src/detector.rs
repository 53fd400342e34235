use crate::settings::DetectorConfig;
use crate::types::*;
use crate::vision::{self, Mask};

/// Finds floating name labels: bright, wide, short blobs away from the screen-edge UI.
pub struct LabelDetector {
    config: DetectorConfig,
}

impl LabelDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Candidates ordered by ascending distance to the frame center.
    pub fn find(&self, frame: &Frame) -> Vec<Detection> {
        let gray = vision::grayscale(frame.image());
        let screen_center = frame.center();
        let (fw, fh) = (frame.width() as i32, frame.height() as i32);
        let mut detections: Vec<Detection> = Vec::new();

        for &level in &self.config.thresholds {
            let mask = Mask::threshold(&gray, level).close_horizontal(self.config.close_width);
            for rect in mask.component_boxes() {
                if !self.accepts(rect, fw, fh) {
                    continue;
                }
                let center = rect.center();
                let duplicate = detections
                    .iter()
                    .any(|d| d.center.distance(center) < self.config.merge_radius);
                if duplicate {
                    continue;
                }
                detections.push(Detection {
                    region: rect,
                    center,
                    distance_from_center: center.distance(screen_center),
                });
            }
        }

        detections.sort_by(|a, b| a.distance_from_center.total_cmp(&b.distance_from_center));
        detections
    }

    fn accepts(&self, r: Rect, frame_w: i32, frame_h: i32) -> bool {
        let c = &self.config;
        if r.h <= 0 {
            return false;
        }
        if r.w < c.min_width || r.w > c.max_width || r.h < c.min_height || r.h > c.max_height {
            return false;
        }
        let aspect = r.w as f64 / r.h as f64;
        if aspect < c.min_aspect || aspect > c.max_aspect {
            return false;
        }
        r.x >= c.margin_left
            && r.right() <= frame_w - c.margin_right
            && r.y >= c.margin_top
            && r.bottom() <= frame_h - c.margin_bottom
    }
}
