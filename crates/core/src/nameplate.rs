use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use rand::rngs::StdRng;
use rand::Rng;

use crate::logger;
use crate::platform::GameWindow;
use crate::settings::NameplateConfig;
use crate::sleep::{self, Clock};
use crate::types::*;

/// Clicks a candidate and reads the nameplate panel that appears:
/// category from the colored pixels, liveness from the health bar.
pub struct NameplateOracle {
    config: NameplateConfig,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl NameplateOracle {
    pub fn new(config: NameplateConfig, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self { config, clock, rng }
    }

    /// `None` when the panel never showed up before the timeout. A shown panel
    /// without any class color comes back as a pet, which callers must not engage.
    pub fn identify(&mut self, win: &mut dyn GameWindow, click_point: Point) -> Option<NameplateInfo> {
        let target = self.jittered(click_point, win.size());
        win.click(target);
        self.clock.sleep(sleep::jitter(
            Duration::from_millis(self.config.click_settle_ms),
            0.2,
            &mut self.rng,
        ));

        let deadline = self.clock.now() + Duration::from_millis(self.config.timeout_ms);
        loop {
            if let Some(info) = win.capture().and_then(|frame| self.read(&frame)) {
                return Some(info);
            }
            if self.clock.now() >= deadline {
                logger::info_p(
                    "detect",
                    &format!("no nameplate after clicking ({}, {})", target.x, target.y),
                );
                return None;
            }
            self.clock.sleep(Duration::from_millis(self.config.poll_interval_ms));
        }
    }

    /// Reads the nameplate from one frame; `None` while the panel is not shown.
    pub fn read(&self, frame: &Frame) -> Option<NameplateInfo> {
        let panel = frame.crop(self.config.region);
        if self.config.text_band.count(&panel) < self.config.panel_min_text_pixels {
            return None;
        }
        let classification = self.classify(&panel);
        let health_pixels = self.health_pixels(frame);
        Some(NameplateInfo {
            classification,
            is_pet: classification.is_none(),
            is_alive: self.is_alive(health_pixels),
            health_pixels,
        })
    }

    pub fn is_alive(&self, health_pixels: u32) -> bool {
        health_pixels > self.config.alive_threshold
    }

    /// Binary gate on color presence, checked in priority order red > purple > gold.
    pub fn classify(&self, panel: &RgbImage) -> Option<ClassTag> {
        let c = &self.config;
        let red = c.red_band.count(panel);
        let purple = c.purple_band.count(panel);
        let gold = c.gold_band.count(panel);

        if red >= c.red_floor {
            Some(ClassTag::Unique)
        } else if purple >= c.purple_floor {
            Some(ClassTag::Champion)
        } else if gold >= c.gold_floor {
            Some(ClassTag::Giant)
        } else if red + purple + gold >= c.general_floor {
            Some(ClassTag::General)
        } else {
            None
        }
    }

    /// Red pixels in the target health bar
    pub fn health_pixels(&self, frame: &Frame) -> u32 {
        self.config.red_band.count(&frame.crop(self.config.health_region))
    }

    pub fn sample_health(&self, win: &mut dyn GameWindow) -> Option<u32> {
        win.capture().map(|frame| self.health_pixels(&frame))
    }

    fn jittered(&mut self, p: Point, (w, h): (u32, u32)) -> Point {
        let j = self.config.click_jitter.max(0);
        let (dx, dy) = if j == 0 {
            (0, 0)
        } else {
            (self.rng.gen_range(-j..=j), self.rng.gen_range(-j..=j))
        };
        Point::new(
            (p.x + dx).clamp(0, w as i32 - 1),
            (p.y + dy).clamp(0, h as i32 - 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::scripted::ScriptedWindow;
    use crate::sleep::VirtualClock;
    use image::Rgb;
    use rand::SeedableRng;

    const RED: [u8; 3] = [220, 30, 30];
    const PURPLE: [u8; 3] = [150, 40, 200];
    const GOLD: [u8; 3] = [230, 190, 40];
    const WHITE: [u8; 3] = [245, 245, 245];

    fn config() -> NameplateConfig {
        NameplateConfig {
            region: Rect::new(100, 5, 200, 30),
            health_region: Rect::new(100, 45, 200, 10),
            ..NameplateConfig::default()
        }
    }

    fn oracle(clock: Arc<dyn Clock>) -> NameplateOracle {
        NameplateOracle::new(config(), clock, StdRng::seed_from_u64(1))
    }

    fn paint(img: &mut RgbImage, r: Rect, color: [u8; 3]) {
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                img.put_pixel(x as u32, y as u32, Rgb(color));
            }
        }
    }

    /// Nameplate with name text, `bands` colored strips (10x`n` each) and a health bar
    fn plate(bands: &[([u8; 3], i32)], health_w: i32) -> Frame {
        let mut img = RgbImage::new(400, 300);
        paint(&mut img, Rect::new(110, 10, 60, 8), WHITE);
        for (i, (color, n)) in bands.iter().enumerate() {
            paint(&mut img, Rect::new(180 + i as i32 * 30, 10, 10, *n), *color);
        }
        paint(&mut img, Rect::new(100, 45, health_w, 10), RED);
        Frame::new(img)
    }

    #[test]
    fn no_class_color_is_a_pet() {
        let o = oracle(Arc::new(VirtualClock::new()));
        let info = o.read(&plate(&[], 150)).unwrap();
        assert_eq!(info.classification, None);
        assert!(info.is_pet);
    }

    #[test]
    fn red_wins_over_other_bands() {
        let o = oracle(Arc::new(VirtualClock::new()));
        let info = o.read(&plate(&[(GOLD, 20), (PURPLE, 20), (RED, 5)], 150)).unwrap();
        assert_eq!(info.classification, Some(ClassTag::Unique));
        assert!(!info.is_pet);
    }

    #[test]
    fn purple_then_gold_priority() {
        let o = oracle(Arc::new(VirtualClock::new()));
        let champion = o.read(&plate(&[(GOLD, 20), (PURPLE, 20)], 150)).unwrap();
        assert_eq!(champion.classification, Some(ClassTag::Champion));
        let giant = o.read(&plate(&[(GOLD, 20)], 150)).unwrap();
        assert_eq!(giant.classification, Some(ClassTag::Giant));
    }

    #[test]
    fn faint_color_is_general() {
        let o = oracle(Arc::new(VirtualClock::new()));
        // 10 gold pixels: under every band floor, over the general floor
        let info = o.read(&plate(&[(GOLD, 1)], 150)).unwrap();
        assert_eq!(info.classification, Some(ClassTag::General));
    }

    #[test]
    fn liveness_reports_raw_count() {
        let o = oracle(Arc::new(VirtualClock::new()));
        let alive = o.read(&plate(&[(RED, 5)], 150)).unwrap();
        assert!(alive.is_alive);
        assert_eq!(alive.health_pixels, 1500);
        let dead = o.read(&plate(&[(RED, 5)], 2)).unwrap();
        assert!(!dead.is_alive);
        assert_eq!(dead.health_pixels, 20);
    }

    #[test]
    fn hidden_panel_reads_nothing() {
        let o = oracle(Arc::new(VirtualClock::new()));
        assert!(o.read(&Frame::new(RgbImage::new(400, 300))).is_none());
    }

    #[test]
    fn identify_polls_until_panel_appears() {
        let clock = Arc::new(VirtualClock::new());
        let mut o = oracle(clock.clone());
        let mut shown = 0;
        let mut win = ScriptedWindow::new(400, 300, move |_inputs: &[InputEvent]| {
            shown += 1;
            if shown < 3 {
                Some(Frame::new(RgbImage::new(400, 300)))
            } else {
                Some(plate(&[(PURPLE, 20)], 150))
            }
        });
        let inputs = win.inputs();

        let info = o.identify(&mut win, Point::new(200, 150)).unwrap();
        assert_eq!(info.classification, Some(ClassTag::Champion));
        let inputs = inputs.lock().unwrap();
        assert_eq!(inputs.len(), 1);
        let InputEvent::Click(p) = &inputs[0] else { panic!("expected a click") };
        assert!((p.x - 200).abs() <= 5 && (p.y - 150).abs() <= 5);
    }

    #[test]
    fn identify_times_out_to_none() {
        let clock = Arc::new(VirtualClock::new());
        let mut o = oracle(clock.clone());
        let mut win = ScriptedWindow::new(400, 300, |_: &[InputEvent]| None);
        let captures = win.capture_count();

        assert!(o.identify(&mut win, Point::new(10, 10)).is_none());
        assert!(clock.now() >= Duration::from_millis(config().timeout_ms));
        assert!(*captures.lock().unwrap() > 1);
    }

    #[test]
    fn click_is_clamped_to_window() {
        let mut o = oracle(Arc::new(VirtualClock::new()));
        for _ in 0..50 {
            let p = o.jittered(Point::new(0, 299), (400, 300));
            assert!(p.x >= 0 && p.y <= 299);
        }
    }
}
