//! Fixtures for the end-to-end scenarios: a synthetic 800x600 game screen
//! drawn with `image`, a scenario config sized for it, and a rig that wires
//! an `Orchestrator` to a `ScriptedWindow` and a `VirtualClock`.

use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};

use image::{Rgb, RgbImage};

use mobhunt_core::orchestrator::Orchestrator;
use mobhunt_core::platform::scripted::ScriptedWindow;
use mobhunt_core::screenshot::ScreenshotSink;
use mobhunt_core::settings::Config;
use mobhunt_core::sleep::VirtualClock;
use mobhunt_core::types::*;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;

pub const LABEL: [u8; 3] = [240, 240, 240];
pub const TEXT: [u8; 3] = [245, 245, 245];
pub const RED: [u8; 3] = [220, 30, 30];
pub const PURPLE: [u8; 3] = [150, 40, 200];
pub const GOLD: [u8; 3] = [230, 190, 40];

pub const NAMEPLATE: Rect = Rect { x: 300, y: 10, w: 200, h: 40 };
pub const TARGET_HEALTH: Rect = Rect { x: 300, y: 60, w: 200, h: 10 };
pub const PLAYER_HEALTH: Rect = Rect { x: 60, y: 30, w: 220, h: 14 };

/// Defaults, resized for the 800x600 screen. Labels live below y=100 so the
/// nameplate and health bars are never mistaken for labels. No buffs, unpaused.
pub fn scenario_config() -> Config {
    let mut c = Config { rng_seed: Some(42), ..Config::default() };
    c.detector.margin_left = 20;
    c.detector.margin_right = 20;
    c.detector.margin_top = 100;
    c.detector.margin_bottom = 20;
    c.nameplate.region = NAMEPLATE;
    c.nameplate.health_region = TARGET_HEALTH;
    c.death.player_health_region = PLAYER_HEALTH;
    c.buffs.keys.clear();
    c.orchestrator.start_paused = false;
    c
}

pub fn paint(img: &mut RgbImage, r: Rect, color: [u8; 3]) {
    for y in r.y.max(0)..r.bottom().min(img.height() as i32) {
        for x in r.x.max(0)..r.right().min(img.width() as i32) {
            img.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }
}

/// 80x16 floating name label centered on `c`
pub fn label_at(c: Point) -> Rect {
    Rect::new(c.x - 40, c.y - 8, 80, 16)
}

/// Screen with the given labels and a player health bar `player_health` px wide
pub fn screen(labels: &[Point], player_health: i32) -> RgbImage {
    let mut img = RgbImage::new(WIDTH, HEIGHT);
    paint(
        &mut img,
        Rect::new(PLAYER_HEALTH.x, PLAYER_HEALTH.y, player_health, PLAYER_HEALTH.h),
        RED,
    );
    for &c in labels {
        paint(&mut img, label_at(c), LABEL);
    }
    img
}

/// Draws the target panel: name text, one class color strip (or none for a
/// pet) and a target health bar `health_w` px wide.
pub fn draw_nameplate(img: &mut RgbImage, class_color: Option<[u8; 3]>, health_w: i32) {
    paint(img, Rect::new(NAMEPLATE.x + 10, NAMEPLATE.y + 5, 60, 8), TEXT);
    if let Some(color) = class_color {
        paint(img, Rect::new(NAMEPLATE.x + 90, NAMEPLATE.y + 5, 10, 5), color);
    }
    paint(
        img,
        Rect::new(TARGET_HEALTH.x, TARGET_HEALTH.y, health_w.max(0), TARGET_HEALTH.h),
        RED,
    );
}

/// True when a (jittered) click landed on the label centered at `c`
pub fn clicked_near(click: Option<Point>, c: Point) -> bool {
    click.is_some_and(|p| p.distance(c) <= 10.0)
}

/// Records every screenshot request instead of writing files.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<ScreenshotEvent>>>,
}

impl ScreenshotSink for RecordingSink {
    fn save(&mut self, event: ScreenshotEvent, frame: Option<&Frame>) -> anyhow::Result<Option<PathBuf>> {
        self.events.lock().unwrap().push(event);
        Ok(frame.map(|_| PathBuf::from(format!("{}.png", event))))
    }
}

pub struct Rig {
    pub orch: Orchestrator,
    pub clock: Arc<VirtualClock>,
    pub inputs: Arc<Mutex<Vec<InputEvent>>>,
    pub telemetry: Arc<Mutex<Telemetry>>,
    pub shots: Arc<Mutex<Vec<ScreenshotEvent>>>,
    pub cmd_tx: mpsc::Sender<Command>,
}

pub fn rig(config: Config, win: ScriptedWindow) -> Rig {
    let clock = Arc::new(VirtualClock::new());
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let telemetry = Arc::new(Mutex::new(Telemetry::default()));
    let sink = RecordingSink::default();
    let shots = Arc::clone(&sink.events);
    let inputs = win.inputs();
    let orch = Orchestrator::new(
        config,
        Box::new(win),
        clock.clone(),
        Box::new(sink),
        Arc::clone(&telemetry),
        cmd_rx,
    );
    Rig { orch, clock, inputs, telemetry, shots, cmd_tx }
}

impl Rig {
    pub fn inputs(&self) -> Vec<InputEvent> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn telemetry(&self) -> Telemetry {
        self.telemetry.lock().unwrap().clone()
    }
}
