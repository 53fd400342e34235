use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Rect;
use crate::vision::ColorBand;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Everything tunable, fixed at startup. Defaults target a 1920x1080 window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub cache: CacheConfig,
    pub nameplate: NameplateConfig,
    pub combat: CombatConfig,
    pub stuck: StuckConfig,
    pub death: DeathConfig,
    pub buffs: BuffConfig,
    pub orchestrator: OrchestratorConfig,
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Brightness levels, tried from brightest down
    pub thresholds: [u8; 3],
    pub close_width: usize,
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub margin_left: i32,
    pub margin_right: i32,
    pub margin_top: i32,
    pub margin_bottom: i32,
    pub merge_radius: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            thresholds: [220, 190, 160],
            close_width: 7,
            min_width: 30,
            max_width: 260,
            min_height: 8,
            max_height: 40,
            min_aspect: 2.0,
            max_aspect: 16.0,
            margin_left: 120,
            margin_right: 120,
            margin_top: 130,
            margin_bottom: 160,
            merge_radius: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub duration_ms: u64,
    pub radius: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { duration_ms: 10_000, radius: 40.0 }
    }
}

impl CacheConfig {
    pub fn duration(&self) -> Duration {
        ms(self.duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameplateConfig {
    pub region: Rect,
    pub health_region: Rect,
    pub click_jitter: i32,
    pub click_settle_ms: u64,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    /// Name text pixels needed before the panel counts as shown
    pub text_band: ColorBand,
    pub panel_min_text_pixels: u32,
    pub red_band: ColorBand,
    pub purple_band: ColorBand,
    pub gold_band: ColorBand,
    pub red_floor: u32,
    pub purple_floor: u32,
    pub gold_floor: u32,
    pub general_floor: u32,
    pub alive_threshold: u32,
}

impl Default for NameplateConfig {
    fn default() -> Self {
        Self {
            region: Rect::new(780, 45, 315, 60),
            health_region: Rect::new(833, 67, 247, 16),
            click_jitter: 5,
            click_settle_ms: 150,
            poll_interval_ms: 50,
            timeout_ms: 800,
            text_band: ColorBand { hue_min: 0.0, hue_max: 360.0, sat_min: 0.0, sat_max: 0.2, val_min: 0.8, val_max: 1.0 },
            panel_min_text_pixels: 20,
            red_band: ColorBand::hue(345.0, 15.0, 0.5, 0.4),
            purple_band: ColorBand::hue(260.0, 310.0, 0.4, 0.35),
            gold_band: ColorBand::hue(35.0, 60.0, 0.5, 0.5),
            red_floor: 40,
            purple_floor: 40,
            gold_floor: 40,
            general_floor: 8,
            alive_threshold: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub skill_keys: Vec<String>,
    pub animation_delay_ms: u64,
    pub tick_interval_ms: u64,
    pub kill_threshold: u32,
    pub min_abs_decrease: u32,
    pub min_pct_decrease: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            skill_keys: ["1", "2", "3", "1", "4", "5"].iter().map(|s| s.to_string()).collect(),
            animation_delay_ms: 600,
            tick_interval_ms: 1000,
            kill_threshold: 30,
            min_abs_decrease: 40,
            min_pct_decrease: 0.05,
        }
    }
}

impl CombatConfig {
    pub fn animation_delay(&self) -> Duration {
        ms(self.animation_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        ms(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckConfig {
    pub no_target_timeout_ms: u64,
    pub target_stall_timeout_ms: u64,
    pub retry_interval_ms: u64,
    pub min_steps: u32,
    pub max_steps: u32,
    pub rotate_left_key: String,
    pub rotate_right_key: String,
    pub forward_key: String,
    pub jump_key: String,
    pub rotate_min_ms: u64,
    pub rotate_max_ms: u64,
    pub forward_min_ms: u64,
    pub forward_max_ms: u64,
    pub escalation_step: f64,
    pub max_multiplier: f64,
    pub camera_chance: f64,
    pub camera_drag_px: i32,
    pub jump_chance: f64,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            no_target_timeout_ms: 30_000,
            target_stall_timeout_ms: 15_000,
            retry_interval_ms: 8_000,
            min_steps: 2,
            max_steps: 4,
            rotate_left_key: "a".into(),
            rotate_right_key: "d".into(),
            forward_key: "w".into(),
            jump_key: "space".into(),
            rotate_min_ms: 300,
            rotate_max_ms: 1200,
            forward_min_ms: 800,
            forward_max_ms: 1600,
            escalation_step: 0.5,
            max_multiplier: 3.0,
            camera_chance: 0.3,
            camera_drag_px: 200,
            jump_chance: 0.25,
        }
    }
}

impl StuckConfig {
    pub fn no_target_timeout(&self) -> Duration {
        ms(self.no_target_timeout_ms)
    }

    pub fn target_stall_timeout(&self) -> Duration {
        ms(self.target_stall_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        ms(self.retry_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathMode {
    HealthBar,
    Popup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathConfig {
    pub mode: DeathMode,
    pub player_health_region: Rect,
    pub health_band: ColorBand,
    pub min_health_red_pixels: u32,
    pub popup_region: Rect,
    pub gold_border_band: ColorBand,
    pub dark_background_band: ColorBand,
    pub brown_frame_band: ColorBand,
    pub light_text_band: ColorBand,
    pub gold_border_floor: u32,
    pub dark_background_floor: u32,
    pub brown_frame_floor: u32,
    pub light_text_floor: u32,
    pub quorum: u32,
    pub cooldown_ms: u64,
    pub buff_guard_ms: u64,
    pub confirm_delay_ms: u64,
    pub revive_menu_key: String,
    pub resurrect_key: String,
    pub press_delay_ms: u64,
    pub respawn_settle_ms: u64,
}

impl Default for DeathConfig {
    fn default() -> Self {
        Self {
            mode: DeathMode::HealthBar,
            player_health_region: Rect::new(60, 30, 220, 14),
            health_band: ColorBand::hue(345.0, 15.0, 0.5, 0.4),
            min_health_red_pixels: 50,
            popup_region: Rect::new(760, 380, 400, 220),
            gold_border_band: ColorBand::hue(38.0, 55.0, 0.45, 0.6),
            dark_background_band: ColorBand { hue_min: 0.0, hue_max: 360.0, sat_min: 0.0, sat_max: 1.0, val_min: 0.0, val_max: 0.15 },
            brown_frame_band: ColorBand { hue_min: 15.0, hue_max: 35.0, sat_min: 0.4, sat_max: 1.0, val_min: 0.2, val_max: 0.55 },
            light_text_band: ColorBand { hue_min: 0.0, hue_max: 360.0, sat_min: 0.0, sat_max: 0.15, val_min: 0.85, val_max: 1.0 },
            gold_border_floor: 150,
            dark_background_floor: 20_000,
            brown_frame_floor: 400,
            light_text_floor: 120,
            quorum: 3,
            cooldown_ms: 60_000,
            buff_guard_ms: 5_000,
            confirm_delay_ms: 2_000,
            revive_menu_key: "enter".into(),
            resurrect_key: "1".into(),
            press_delay_ms: 800,
            respawn_settle_ms: 5_000,
        }
    }
}

impl DeathConfig {
    pub fn cooldown(&self) -> Duration {
        ms(self.cooldown_ms)
    }

    pub fn buff_guard(&self) -> Duration {
        ms(self.buff_guard_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffConfig {
    pub keys: Vec<String>,
    pub interval_ms: u64,
    pub key_delay_ms: u64,
}

impl Default for BuffConfig {
    fn default() -> Self {
        Self {
            keys: vec!["f1".into(), "f2".into()],
            interval_ms: 300_000,
            key_delay_ms: 1_500,
        }
    }
}

impl BuffConfig {
    pub fn interval(&self) -> Duration {
        ms(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub start_paused: bool,
    pub cycle_delay_ms: u64,
    pub paused_idle_ms: u64,
    pub resume_death_guard_ms: u64,
    /// Cap on nameplate probes (clicks) per cycle; cached labels do not count.
    /// At most one of the probed targets is engaged per cycle.
    pub max_targets_per_cycle: usize,
    /// Warn after this many cycles in a row with nothing detected
    pub empty_cycle_warning: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            start_paused: true,
            max_targets_per_cycle: 3,
            cycle_delay_ms: 80,
            paused_idle_ms: 100,
            resume_death_guard_ms: 3_000,
            empty_cycle_warning: 25,
        }
    }
}

impl OrchestratorConfig {
    pub fn cycle_delay(&self) -> Duration {
        ms(self.cycle_delay_ms)
    }

    pub fn resume_death_guard(&self) -> Duration {
        ms(self.resume_death_guard_ms)
    }
}

fn key_pattern() -> &'static Regex {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    KEY_RE.get_or_init(|| {
        Regex::new(r"^([a-z0-9]|f([1-9]|1[0-2])|space|tab|enter|escape|shift|ctrl|alt|up|down|left|right)$")
            .expect("key pattern is valid")
    })
}

impl Config {
    /// Load from JSON. A missing file writes out the defaults and uses them.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        if !(d.thresholds[0] > d.thresholds[1] && d.thresholds[1] > d.thresholds[2]) {
            bail!("detector.thresholds must be strictly descending, got {:?}", d.thresholds);
        }
        if d.min_width > d.max_width || d.min_height > d.max_height || d.min_aspect > d.max_aspect {
            bail!("detector size/aspect bounds have min above max");
        }
        if d.min_height <= 0 {
            bail!("detector.min_height must be positive");
        }
        if self.cache.duration_ms == 0 || self.cache.radius <= 0.0 {
            bail!("cache.duration_ms and cache.radius must be positive");
        }
        if self.nameplate.timeout_ms == 0 || self.nameplate.poll_interval_ms == 0 {
            bail!("nameplate.timeout_ms and nameplate.poll_interval_ms must be positive");
        }
        if self.combat.skill_keys.is_empty() {
            bail!("combat.skill_keys must not be empty");
        }
        if self.combat.kill_threshold > self.nameplate.alive_threshold {
            bail!("combat.kill_threshold must not exceed nameplate.alive_threshold");
        }
        if self.combat.animation_delay_ms > self.combat.tick_interval_ms {
            bail!("combat.animation_delay_ms exceeds combat.tick_interval_ms");
        }
        let s = &self.stuck;
        if s.min_steps == 0 || s.min_steps > s.max_steps {
            bail!("stuck steps must satisfy 0 < min_steps <= max_steps");
        }
        if s.max_multiplier < 1.0 {
            bail!("stuck.max_multiplier must be at least 1");
        }
        if s.camera_drag_px < 0 {
            bail!("stuck.camera_drag_px must not be negative");
        }
        for (name, p) in [("camera_chance", s.camera_chance), ("jump_chance", s.jump_chance)] {
            if !(0.0..=1.0).contains(&p) {
                bail!("stuck.{} must be within 0..=1, got {}", name, p);
            }
        }
        if s.target_stall_timeout_ms > s.no_target_timeout_ms {
            bail!("stuck.target_stall_timeout_ms should not exceed no_target_timeout_ms");
        }
        if self.death.quorum == 0 || self.death.quorum > 4 {
            bail!("death.quorum must be between 1 and 4");
        }
        if self.orchestrator.max_targets_per_cycle == 0 {
            bail!("orchestrator.max_targets_per_cycle must be at least 1");
        }

        let keys = self
            .combat
            .skill_keys
            .iter()
            .chain(&self.buffs.keys)
            .chain([
                &s.rotate_left_key,
                &s.rotate_right_key,
                &s.forward_key,
                &s.jump_key,
                &self.death.revive_menu_key,
                &self.death.resurrect_key,
            ]);
        for key in keys {
            if !key_pattern().is_match(key) {
                bail!("unknown key name '{}'", key);
            }
        }
        Ok(())
    }
}
