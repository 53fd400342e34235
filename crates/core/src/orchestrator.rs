use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::buffs::BuffScheduler;
use crate::cache::PositionCache;
use crate::combat::CombatController;
use crate::death::DeathRecovery;
use crate::detector::LabelDetector;
use crate::logger;
use crate::nameplate::NameplateOracle;
use crate::platform::GameWindow;
use crate::screenshot::ScreenshotSink;
use crate::settings::Config;
use crate::sleep::Clock;
use crate::stuck::StuckRecovery;
use crate::types::*;

/// What one `tick` ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Quit,
    Paused,
    /// No frame from the window this cycle
    NoFrame,
    Died,
    Hunted { detections: usize, probes: usize, engaged: bool, killed: bool },
}

fn component_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The hunt loop. Owns the window and every subsystem; one cycle at a time.
pub struct Orchestrator {
    config: Config,
    win: Box<dyn GameWindow>,
    clock: Arc<dyn Clock>,
    sink: Box<dyn ScreenshotSink>,
    telemetry: Arc<Mutex<Telemetry>>,
    cmd_rx: mpsc::Receiver<Command>,

    detector: LabelDetector,
    cache: PositionCache,
    oracle: NameplateOracle,
    combat: CombatController,
    stuck: StuckRecovery,
    death: DeathRecovery,
    buffs: BuffScheduler,

    started: Duration,
    paused: bool,
    overlay_visible: bool,
    cycle_count: u64,
    last_resume: Option<Duration>,
    empty_cycles: u32,
    class_counts: BTreeMap<ClassTag, u32>,
    pets_skipped: u32,
    errors: u32,
    detections: Vec<Detection>,
    current_action: String,
    last_frame: Option<Frame>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        win: Box<dyn GameWindow>,
        clock: Arc<dyn Clock>,
        sink: Box<dyn ScreenshotSink>,
        telemetry: Arc<Mutex<Telemetry>>,
        cmd_rx: mpsc::Receiver<Command>,
    ) -> Self {
        let seed = config.rng_seed;
        let started = clock.now();
        let paused = config.orchestrator.start_paused;
        Self {
            detector: LabelDetector::new(config.detector.clone()),
            cache: PositionCache::new(&config.cache),
            oracle: NameplateOracle::new(config.nameplate.clone(), clock.clone(), component_rng(seed, 1)),
            combat: CombatController::new(config.combat.clone(), clock.clone()),
            stuck: StuckRecovery::new(config.stuck.clone(), clock.clone(), component_rng(seed, 2)),
            death: DeathRecovery::new(config.death.clone(), clock.clone()),
            buffs: BuffScheduler::new(config.buffs.clone(), clock.clone(), component_rng(seed, 3)),
            config,
            win,
            clock,
            sink,
            telemetry,
            cmd_rx,
            started,
            paused,
            overlay_visible: false,
            cycle_count: 0,
            last_resume: None,
            empty_cycles: 0,
            class_counts: BTreeMap::new(),
            pets_skipped: 0,
            errors: 0,
            detections: Vec::new(),
            current_action: if paused { "Paused".into() } else { "Starting".into() },
            last_frame: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn bot_state(&self) -> BotState {
        BotState {
            cycle_count: self.cycle_count,
            paused: self.paused,
            last_kill_time: self.stuck.last_kill_time(),
            last_action_time: self.stuck.last_action_time(),
            consecutive_recoveries: self.stuck.consecutive_recoveries(),
            in_recovery_mode: self.stuck.in_recovery_mode(),
            target_selected: self.stuck.target_selected(),
            last_buff_time: self.buffs.last_buff(),
            last_death_time: self.death.last_death_time(),
        }
    }

    /// Loops until `Quit` or the command channel closes. Nothing a tick does
    /// (error or panic) gets past here.
    pub fn run(&mut self) {
        logger::info(if self.paused { "hunt loop ready (paused)" } else { "hunt loop started" });
        loop {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.tick()));
            match outcome {
                Ok(Ok(CycleOutcome::Quit)) => break,
                Ok(Ok(CycleOutcome::Paused)) => continue,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => self.record_error(&format!("{:#}", e)),
                Err(payload) => self.record_error(&format!("panic: {}", panic_message(payload.as_ref()))),
            }
            self.clock.sleep(self.config.orchestrator.cycle_delay());
        }
        self.publish();
        logger::info("hunt loop stopped");
    }

    pub fn tick(&mut self) -> Result<CycleOutcome> {
        if !self.drain_commands() {
            return Ok(CycleOutcome::Quit);
        }

        if self.paused {
            self.current_action = "Paused".into();
            self.publish();
            self.clock.sleep(Duration::from_millis(self.config.orchestrator.paused_idle_ms));
            return Ok(CycleOutcome::Paused);
        }

        self.cycle_count += 1;

        if self.buffs.is_due(self.clock.now()) {
            self.current_action = "Buffing".into();
            self.publish();
            let done = self.buffs.run(self.win.as_mut());
            self.death.note_buff(done);
        }

        let Some(mut frame) = self.win.capture() else {
            self.current_action = "Waiting for frame".into();
            self.publish();
            return Ok(CycleOutcome::NoFrame);
        };
        self.last_frame = Some(frame.clone());

        let now = self.clock.now();
        let guarded = self
            .last_resume
            .is_some_and(|t| now.saturating_sub(t) < self.config.orchestrator.resume_death_guard());
        if !guarded && self.death.is_player_dead(&frame, now) {
            self.current_action = "Reviving".into();
            self.publish();
            self.death.handle_death(self.win.as_mut(), now);
            self.buffs.force();
            self.stuck.reset_timers(self.clock.now());
            self.publish();
            let saved = self
                .sink
                .save(ScreenshotEvent::Death, Some(&frame))
                .context("failed to save death screenshot")?;
            if let Some(path) = saved {
                logger::info_p("death", &format!("screenshot saved to {}", path.display()));
            }
            return Ok(CycleOutcome::Died);
        }

        if self.stuck.is_stuck(self.clock.now()).is_some() {
            self.current_action = "Recovering".into();
            self.publish();
            self.stuck.recover(self.win.as_mut());
            let Some(fresh) = self.win.capture() else {
                self.publish();
                return Ok(CycleOutcome::NoFrame);
            };
            frame = fresh;
            self.last_frame = Some(frame.clone());
        }

        let outcome = self.hunt(&frame);
        self.publish();
        Ok(outcome)
    }

    /// detect, skip cached, probe, engage. At most one engagement per cycle:
    /// after a fight the frame is stale.
    fn hunt(&mut self, frame: &Frame) -> CycleOutcome {
        let detections = self.detector.find(frame);
        self.note_detections(detections.len());
        self.current_action =
            if detections.is_empty() { "Scanning (no labels)".into() } else { "Scanning".into() };

        let mut probes = 0;
        let mut engaged = false;
        let mut killed = false;

        for d in &detections {
            if probes >= self.config.orchestrator.max_targets_per_cycle {
                break;
            }
            if self.cache.is_recently_checked(d.center, self.clock.now()) {
                continue;
            }
            probes += 1;
            self.current_action = "Probing".into();

            let Some(info) = self.oracle.identify(self.win.as_mut(), d.center) else {
                self.stuck.set_target_status(false, self.clock.now());
                continue;
            };
            let Some(tag) = info.classification.filter(|_| info.is_target()) else {
                self.pets_skipped += 1;
                logger::info_p("detect", &format!("skipping pet at ({}, {})", d.center.x, d.center.y));
                continue;
            };
            if !info.is_alive {
                logger::info_p("detect", &format!("{} already dead, skipping", tag));
                self.stuck.set_target_status(false, self.clock.now());
                continue;
            }

            *self.class_counts.entry(tag).or_insert(0) += 1;
            logger::info_p(
                "detect",
                &format!("{} at ({}, {}), health {} px", tag, d.center.x, d.center.y, info.health_pixels),
            );
            self.stuck.set_target_status(true, self.clock.now());
            self.current_action = format!("Fighting {}", tag);
            self.publish();

            let result = self.combat.engage(self.win.as_mut(), &self.oracle, &info);
            engaged = true;
            killed = result.killed;
            // a stall keeps the target selected; re-engaging it is not progress
            match result.outcome {
                EngagementOutcome::Killed { .. } => self.stuck.on_kill(self.clock.now()),
                EngagementOutcome::TargetDead => self.stuck.set_target_status(false, self.clock.now()),
                EngagementOutcome::Stalled => {}
            }
            self.current_action = match result.outcome {
                EngagementOutcome::Killed { .. } => "Returning to scan".into(),
                EngagementOutcome::Stalled => "Target not taking damage".into(),
                EngagementOutcome::TargetDead => "Target already dead".into(),
            };
            break;
        }

        let count = detections.len();
        self.detections = detections;
        CycleOutcome::Hunted { detections: count, probes, engaged, killed }
    }

    fn note_detections(&mut self, count: usize) {
        if count > 0 {
            self.empty_cycles = 0;
            return;
        }
        self.empty_cycles += 1;
        let limit = self.config.orchestrator.empty_cycle_warning;
        if limit > 0 && self.empty_cycles >= limit {
            logger::warn_p("detect", &format!("no labels found for {} cycles", self.empty_cycles));
            self.empty_cycles = 0;
        }
    }

    /// Returns false on Quit or a closed channel.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(Command::TogglePause) => self.toggle_pause(),
                Ok(Command::ToggleOverlay) => {
                    self.overlay_visible = !self.overlay_visible;
                    self.publish();
                }
                Ok(Command::Quit) => {
                    logger::info("shutting down");
                    return false;
                }
                Err(mpsc::TryRecvError::Empty) => return true,
                Err(mpsc::TryRecvError::Disconnected) => {
                    logger::info("command channel closed, shutting down");
                    return false;
                }
            }
        }
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        if self.paused {
            logger::info("paused");
        } else {
            let now = self.clock.now();
            self.last_resume = Some(now);
            self.stuck.reset_timers(now);
            logger::info("resumed");
        }
        self.publish();
    }

    fn record_error(&mut self, msg: &str) {
        self.errors += 1;
        logger::error(&format!("cycle {} failed: {}", self.cycle_count, msg));
        if let Err(e) = self.sink.save(ScreenshotEvent::Error, self.last_frame.as_ref()) {
            logger::warn(&format!("failed to save error screenshot: {:#}", e));
        }
        self.current_action = "Recovering from error".into();
        self.publish();
    }

    fn publish(&self) {
        let now = self.clock.now();
        let stats = self.combat.stats();
        let mut t = self.telemetry.lock().unwrap_or_else(|e| e.into_inner());
        t.state = self.bot_state();
        t.overlay_visible = self.overlay_visible;
        t.current_action = self.current_action.clone();
        t.detections = self.detections.clone();
        t.class_counts = self.class_counts.clone();
        t.pets_skipped = self.pets_skipped;
        t.kills = stats.kills;
        t.deaths = self.death.deaths();
        t.stuck_recoveries = self.stuck.total_recoveries();
        t.skills_used = stats.skills_used;
        t.skills_saved = stats.skills_saved;
        t.early_stops = stats.early_stops;
        t.stalls = stats.stalls;
        t.errors = self.errors;
        t.cache_size = self.cache.len();
        t.cache_hits = self.cache.hits();
        t.cache_misses = self.cache.misses();
        t.target_health_pct = self.combat.last_health_pct();
        t.next_buff_in = self.buffs.time_to_next(now);
        t.uptime = now.saturating_sub(self.started);
    }
}
