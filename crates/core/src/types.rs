use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Pixel coordinate inside the captured screen region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }
}

/// One captured screen region. Never mutated after capture.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn center(&self) -> Point {
        Point::new(self.width() as i32 / 2, self.height() as i32 / 2)
    }

    /// Copy out `rect`, clipped to the frame. Empty if fully outside.
    pub fn crop(&self, rect: Rect) -> RgbImage {
        let x0 = rect.x.clamp(0, self.width() as i32);
        let y0 = rect.y.clamp(0, self.height() as i32);
        let x1 = rect.right().clamp(x0, self.width() as i32);
        let y1 = rect.bottom().clamp(y0, self.height() as i32);
        image::imageops::crop_imm(
            &self.image,
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        )
        .to_image()
    }
}

/// A floating name label found on screen. Lives for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub region: Rect,
    pub center: Point,
    pub distance_from_center: f64,
}

/// Target category read from the nameplate colors.
/// Declaration order is the tie-break order (General lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassTag {
    General,
    Giant,
    Champion,
    Unique,
}

impl fmt::Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClassTag::General => "general",
            ClassTag::Giant => "giant",
            ClassTag::Champion => "champion",
            ClassTag::Unique => "unique",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameplateInfo {
    pub classification: Option<ClassTag>,
    pub is_pet: bool,
    pub is_alive: bool,
    pub health_pixels: u32,
}

impl NameplateInfo {
    /// Classified and not a pet: safe to engage
    pub fn is_target(&self) -> bool {
        self.classification.is_some() && !self.is_pet
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementOutcome {
    /// Initial health check already read dead; nothing pressed
    TargetDead,
    /// Health fell to the kill threshold, or the rotation finished with damage observed
    Killed { early: bool },
    /// Rotation finished without a meaningful health drop
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementResult {
    pub killed: bool,
    pub health_delta: u32,
    pub skills_pressed: usize,
    pub outcome: EngagementOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
}

/// Every simulated input, as recorded by the scripted backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Press(String),
    KeyDown(String),
    KeyUp(String),
    Click(Point),
    MoveTo(Point),
    MouseDown(MouseButton),
    MouseUp(MouseButton),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotEvent {
    Death,
    Error,
}

impl fmt::Display for ScreenshotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenshotEvent::Death => f.write_str("death"),
            ScreenshotEvent::Error => f.write_str("error"),
        }
    }
}

/// Command from the TUI (toggle listener) to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    ToggleOverlay,
    Quit,
}

/// Run-wide record; each field group is owned by one subsystem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotState {
    pub cycle_count: u64,
    pub paused: bool,
    pub last_kill_time: Duration,
    pub last_action_time: Duration,
    pub consecutive_recoveries: u32,
    pub in_recovery_mode: bool,
    pub target_selected: bool,
    pub last_buff_time: Option<Duration>,
    pub last_death_time: Option<Duration>,
}

/// Snapshot published once per cycle for the TUI
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    pub state: BotState,
    pub overlay_visible: bool,
    pub current_action: String,
    pub detections: Vec<Detection>,
    pub class_counts: BTreeMap<ClassTag, u32>,
    pub pets_skipped: u32,
    pub kills: u32,
    pub deaths: u32,
    pub stuck_recoveries: u32,
    pub skills_used: u64,
    pub skills_saved: u64,
    pub early_stops: u32,
    pub stalls: u32,
    pub errors: u32,
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub target_health_pct: Option<f64>,
    pub next_buff_in: Option<Duration>,
    pub uptime: Duration,
}
