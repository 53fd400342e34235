use std::sync::Arc;

use crate::logger;
use crate::nameplate::NameplateOracle;
use crate::platform::GameWindow;
use crate::settings::CombatConfig;
use crate::sleep::Clock;
use crate::types::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatStats {
    pub engagements: u32,
    pub kills: u32,
    pub early_stops: u32,
    pub stalls: u32,
    pub skills_used: u64,
    pub skills_saved: u64,
}

/// Runs the skill rotation on the selected target while watching its health bar.
pub struct CombatController {
    config: CombatConfig,
    clock: Arc<dyn Clock>,
    stats: CombatStats,
    last_health_pct: Option<f64>,
}

impl CombatController {
    pub fn new(config: CombatConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock, stats: CombatStats::default(), last_health_pct: None }
    }

    pub fn stats(&self) -> CombatStats {
        self.stats
    }

    /// Target health relative to its first sample in the latest engagement
    pub fn last_health_pct(&self) -> Option<f64> {
        self.last_health_pct
    }

    pub fn engage(
        &mut self,
        win: &mut dyn GameWindow,
        oracle: &NameplateOracle,
        target: &NameplateInfo,
    ) -> EngagementResult {
        self.stats.engagements += 1;

        let initial = oracle.sample_health(win).unwrap_or(target.health_pixels);
        self.last_health_pct = Some(100.0);
        if !oracle.is_alive(initial) {
            logger::info_p("combat", "target already dead, skipping");
            return EngagementResult {
                killed: false,
                health_delta: 0,
                skills_pressed: 0,
                outcome: EngagementOutcome::TargetDead,
            };
        }

        let keys = self.config.skill_keys.clone();
        let total = keys.len();
        let rest = self.config.tick_interval().saturating_sub(self.config.animation_delay());
        let (mut max, mut min) = (initial, initial);

        for (i, key) in keys.iter().enumerate() {
            let pressed = i + 1;
            win.press(key);
            self.stats.skills_used += 1;
            self.clock.sleep(self.config.animation_delay());
            self.clock.sleep(rest);

            let Some(health) = oracle.sample_health(win) else { continue };
            max = max.max(health);
            min = min.min(health);
            self.last_health_pct = Some(health as f64 * 100.0 / initial as f64);

            if health <= self.config.kill_threshold {
                let early = pressed < total;
                self.stats.kills += 1;
                if early {
                    self.stats.early_stops += 1;
                    self.stats.skills_saved += (total - pressed) as u64;
                }
                logger::info_p(
                    "combat",
                    &format!("kill after {}/{} skills", pressed, total),
                );
                return EngagementResult {
                    killed: true,
                    health_delta: max - min,
                    skills_pressed: pressed,
                    outcome: EngagementOutcome::Killed { early },
                };
            }
        }

        let delta = max - min;
        let pct = if max == 0 { 0.0 } else { delta as f64 / max as f64 };
        if delta < self.config.min_abs_decrease && pct < self.config.min_pct_decrease {
            self.stats.stalls += 1;
            logger::warn_p(
                "combat",
                &format!("no damage landed (delta {} px, {:.1}%)", delta, pct * 100.0),
            );
            return EngagementResult {
                killed: false,
                health_delta: delta,
                skills_pressed: total,
                outcome: EngagementOutcome::Stalled,
            };
        }

        // rotation done and damage seen: counted as a kill
        self.stats.kills += 1;
        logger::info_p("combat", &format!("rotation complete, health -{} px", delta));
        EngagementResult {
            killed: true,
            health_delta: delta,
            skills_pressed: total,
            outcome: EngagementOutcome::Killed { early: false },
        }
    }
}
