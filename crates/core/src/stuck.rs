use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;

use crate::logger;
use crate::platform::GameWindow;
use crate::settings::StuckConfig;
use crate::sleep::{self, Clock};
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckReason {
    NoTarget,
    TargetStalled,
    Retry,
}

/// What one recovery attempt did, for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryReport {
    pub attempt: u32,
    pub steps: u32,
    pub multiplier: f64,
    pub forward_total: Duration,
}

/// Notices when the hunt stops making progress and walks the character
/// somewhere else, going farther each time it fails in a row.
pub struct StuckRecovery {
    config: StuckConfig,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    in_recovery_mode: bool,
    consecutive_recoveries: u32,
    total_recoveries: u32,
    last_kill_time: Duration,
    last_action_time: Duration,
    last_recovery_time: Duration,
    target_selected: bool,
}

impl StuckRecovery {
    pub fn new(config: StuckConfig, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        let now = clock.now();
        Self {
            config,
            clock,
            rng,
            in_recovery_mode: false,
            consecutive_recoveries: 0,
            total_recoveries: 0,
            last_kill_time: now,
            last_action_time: now,
            last_recovery_time: now,
            target_selected: false,
        }
    }

    pub fn in_recovery_mode(&self) -> bool {
        self.in_recovery_mode
    }

    pub fn consecutive_recoveries(&self) -> u32 {
        self.consecutive_recoveries
    }

    pub fn total_recoveries(&self) -> u32 {
        self.total_recoveries
    }

    pub fn last_kill_time(&self) -> Duration {
        self.last_kill_time
    }

    pub fn last_action_time(&self) -> Duration {
        self.last_action_time
    }

    pub fn target_selected(&self) -> bool {
        self.target_selected
    }

    /// Checks both stall scenarios; either one latches recovery mode.
    pub fn is_stuck(&mut self, now: Duration) -> Option<StuckReason> {
        if self.in_recovery_mode {
            return (now.saturating_sub(self.last_recovery_time) >= self.config.retry_interval())
                .then_some(StuckReason::Retry);
        }

        let reason = if !self.target_selected
            && now.saturating_sub(self.last_kill_time) >= self.config.no_target_timeout()
        {
            StuckReason::NoTarget
        } else if self.target_selected
            && now.saturating_sub(self.last_action_time) >= self.config.target_stall_timeout()
        {
            StuckReason::TargetStalled
        } else {
            return None;
        };

        self.in_recovery_mode = true;
        logger::warn_p("stuck", &format!("stuck detected: {:?}", reason));
        Some(reason)
    }

    /// A selection flip counts as progress.
    pub fn set_target_status(&mut self, selected: bool, now: Duration) {
        if selected != self.target_selected {
            self.target_selected = selected;
            self.last_action_time = now;
        }
    }

    pub fn on_kill(&mut self, now: Duration) {
        if self.in_recovery_mode {
            logger::info_p(
                "stuck",
                &format!("recovered after {} attempt(s)", self.consecutive_recoveries),
            );
        }
        self.in_recovery_mode = false;
        self.consecutive_recoveries = 0;
        self.last_kill_time = now;
        self.last_action_time = now;
        self.target_selected = false;
    }

    /// Restart both stall timers without touching the recovery counters
    /// (after a pause or a respawn, idle time is not a stall).
    pub fn reset_timers(&mut self, now: Duration) {
        self.last_kill_time = now;
        self.last_action_time = now;
        self.last_recovery_time = now;
    }

    /// One escalating, randomized rotate-and-walk sequence. Blocks until done.
    pub fn recover(&mut self, win: &mut dyn GameWindow) -> RecoveryReport {
        self.consecutive_recoveries += 1;
        self.total_recoveries += 1;
        let attempt = self.consecutive_recoveries;
        let c = self.config.clone();

        let multiplier =
            (1.0 + c.escalation_step * (attempt - 1) as f64).min(c.max_multiplier);
        let steps = self.rng.gen_range(c.min_steps..=c.max_steps);
        let mut forward_total = Duration::ZERO;

        for _ in 0..steps {
            let turn_key = if self.rng.gen_bool(0.5) { &c.rotate_left_key } else { &c.rotate_right_key };
            let turn = sleep::between_ms(c.rotate_min_ms, c.rotate_max_ms, &mut self.rng);
            win.key_down(turn_key);
            self.clock.sleep(turn);
            win.key_up(turn_key);

            if self.rng.gen_bool(c.camera_chance.clamp(0.0, 1.0)) {
                self.swing_camera(win);
            }

            let forward = sleep::between_ms(c.forward_min_ms, c.forward_max_ms, &mut self.rng)
                .mul_f64(multiplier);
            win.key_down(&c.forward_key);
            if self.rng.gen_bool(c.jump_chance.clamp(0.0, 1.0)) {
                win.press(&c.jump_key);
            }
            self.clock.sleep(forward);
            win.key_up(&c.forward_key);
            forward_total += forward;
        }

        self.last_recovery_time = self.clock.now();
        logger::info_p(
            "stuck",
            &format!(
                "recovery #{}: {} step(s), x{:.1}, walked {:.1}s",
                attempt,
                steps,
                multiplier,
                forward_total.as_secs_f64()
            ),
        );
        RecoveryReport { attempt, steps, multiplier, forward_total }
    }

    /// Right-button drag from the window center
    fn swing_camera(&mut self, win: &mut dyn GameWindow) {
        let (w, h) = win.size();
        let center = Point::new(w as i32 / 2, h as i32 / 2);
        let drag = self.config.camera_drag_px;
        let dx = self.rng.gen_range(-drag..=drag);
        let dy = self.rng.gen_range(-drag / 4..=drag / 4);
        win.move_to(center);
        win.mouse_down(MouseButton::Right);
        self.clock.sleep(Duration::from_millis(50));
        win.move_to(Point::new(center.x + dx, center.y + dy));
        self.clock.sleep(Duration::from_millis(50));
        win.mouse_up(MouseButton::Right);
    }
}
