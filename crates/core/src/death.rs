use std::sync::Arc;
use std::time::Duration;

use crate::logger;
use crate::platform::GameWindow;
use crate::settings::{DeathConfig, DeathMode};
use crate::sleep::Clock;
use crate::types::*;

/// Spots the player's death on screen and walks through the revive dialog.
pub struct DeathRecovery {
    config: DeathConfig,
    clock: Arc<dyn Clock>,
    deaths: u32,
    last_death_time: Option<Duration>,
    last_buff_time: Option<Duration>,
}

impl DeathRecovery {
    pub fn new(config: DeathConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock, deaths: 0, last_death_time: None, last_buff_time: None }
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn last_death_time(&self) -> Option<Duration> {
        self.last_death_time
    }

    /// Buff casts can flash colors the popup check would pick up.
    pub fn note_buff(&mut self, now: Duration) {
        self.last_buff_time = Some(now);
    }

    pub fn is_player_dead(&self, frame: &Frame, now: Duration) -> bool {
        if within(self.last_death_time, now, self.config.cooldown())
            || within(self.last_buff_time, now, self.config.buff_guard())
        {
            return false;
        }
        match self.config.mode {
            DeathMode::HealthBar => self.health_bar_empty(frame),
            DeathMode::Popup => self.popup_indicators(frame) >= self.config.quorum,
        }
    }

    fn health_bar_empty(&self, frame: &Frame) -> bool {
        let bar = frame.crop(self.config.player_health_region);
        self.config.health_band.count(&bar) < self.config.min_health_red_pixels
    }

    /// Number of revive-popup indicators over their floors (0..=4)
    pub fn popup_indicators(&self, frame: &Frame) -> u32 {
        let c = &self.config;
        let popup = frame.crop(c.popup_region);
        [
            (&c.gold_border_band, c.gold_border_floor),
            (&c.dark_background_band, c.dark_background_floor),
            (&c.brown_frame_band, c.brown_frame_floor),
            (&c.light_text_band, c.light_text_floor),
        ]
        .iter()
        .filter(|(band, floor)| band.count(&popup) >= *floor)
        .count() as u32
    }

    /// Blocks through the whole revive sequence.
    pub fn handle_death(&mut self, win: &mut dyn GameWindow, now: Duration) {
        self.deaths += 1;
        self.last_death_time = Some(now);
        logger::warn_p("death", &format!("player died (#{}), reviving", self.deaths));

        let c = &self.config;
        let press_delay = Duration::from_millis(c.press_delay_ms);
        self.clock.sleep(Duration::from_millis(c.confirm_delay_ms));
        win.press(&c.revive_menu_key);
        self.clock.sleep(press_delay);
        win.press(&c.resurrect_key);
        self.clock.sleep(press_delay);
        self.clock.sleep(Duration::from_millis(c.respawn_settle_ms));

        logger::info_p("death", "respawned");
    }
}

fn within(since: Option<Duration>, now: Duration, window: Duration) -> bool {
    since.is_some_and(|t| now.saturating_sub(t) < window)
}
