use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;

use crate::logger;
use crate::platform::GameWindow;
use crate::settings::BuffConfig;
use crate::sleep::{self, Clock};

/// Re-casts self buffs on a fixed interval, or right away once forced (after a respawn).
pub struct BuffScheduler {
    config: BuffConfig,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    last_buff: Option<Duration>,
    forced: bool,
}

impl BuffScheduler {
    pub fn new(config: BuffConfig, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self { config, clock, rng, last_buff: None, forced: false }
    }

    pub fn last_buff(&self) -> Option<Duration> {
        self.last_buff
    }

    /// Never buffed yet counts as due.
    pub fn is_due(&self, now: Duration) -> bool {
        if self.config.keys.is_empty() {
            return false;
        }
        self.forced
            || self
                .last_buff
                .map_or(true, |t| now.saturating_sub(t) >= self.config.interval())
    }

    pub fn force(&mut self) {
        self.forced = true;
    }

    pub fn time_to_next(&self, now: Duration) -> Option<Duration> {
        if self.config.keys.is_empty() {
            return None;
        }
        if self.forced {
            return Some(Duration::ZERO);
        }
        Some(match self.last_buff {
            Some(t) => self.config.interval().saturating_sub(now.saturating_sub(t)),
            None => Duration::ZERO,
        })
    }

    /// Presses every buff key, jittered pauses in between. Returns the finish time.
    pub fn run(&mut self, win: &mut dyn GameWindow) -> Duration {
        logger::info_p("buff", &format!("casting {} buff(s)", self.config.keys.len()));
        let delay = Duration::from_millis(self.config.key_delay_ms);
        for key in &self.config.keys {
            win.press(key);
            self.clock.sleep(sleep::jitter(delay, 0.3, &mut self.rng));
        }
        let now = self.clock.now();
        self.last_buff = Some(now);
        self.forced = false;
        now
    }
}
