//! End-to-end hunt scenarios: the real orchestrator against a scripted
//! screen and a virtual clock.

use std::time::Duration;

use image::RgbImage;
use libtest_mimic::{Arguments, Failed, Trial};

use mobhunt_core::orchestrator::CycleOutcome;
use mobhunt_core::platform::scripted::{last_click, presses_since_last_click, ScriptedWindow};
use mobhunt_core::settings::BuffConfig;
use mobhunt_core::types::*;
use mobhunt_test::*;

fn main() {
    let args = Arguments::from_args();
    let tests = vec![
        Trial::test("unique_killed_then_pet_skipped", unique_killed_then_pet_skipped),
        Trial::test("death_detected_and_buffs_rerun", death_detected_and_buffs_rerun),
        Trial::test("stuck_latches_and_retries_on_cadence", stuck_latches_and_retries_on_cadence),
        Trial::test("resume_guard_delays_death_check", resume_guard_delays_death_check),
        Trial::test("unanswered_probe_is_cached", unanswered_probe_is_cached),
        Trial::test("probes_capped_per_cycle", probes_capped_per_cycle),
        Trial::test("stalled_target_stays_selected", stalled_target_stays_selected),
        Trial::test("stalled_target_triggers_recovery", stalled_target_triggers_recovery),
    ];
    libtest_mimic::run(&args, tests).exit();
}

fn ensure(cond: bool, msg: impl Into<String>) -> Result<(), Failed> {
    if cond {
        return Ok(());
    }
    let msg: String = msg.into();
    Err(msg.into())
}

fn expect_eq<T: PartialEq + std::fmt::Debug>(got: T, want: T, what: &str) -> Result<(), Failed> {
    ensure(got == want, format!("{}: got {:?}, want {:?}", what, got, want))
}

fn clicks(inputs: &[InputEvent]) -> Vec<Point> {
    inputs
        .iter()
        .filter_map(|e| match e {
            InputEvent::Click(p) => Some(*p),
            _ => None,
        })
        .collect()
}

fn count(inputs: &[InputEvent], ev: &InputEvent) -> usize {
    inputs.iter().filter(|e| *e == ev).count()
}

fn healthy_screen() -> ScriptedWindow {
    ScriptedWindow::new(WIDTH, HEIGHT, |_: &[InputEvent]| Some(Frame::new(screen(&[], 150))))
}

/// Nearest label is a unique mob that dies on the 4th of 6 skills; the far
/// one is a pet. The unique gets clicked and fought, then the pet is only probed.
fn unique_killed_then_pet_skipped() -> Result<(), Failed> {
    let config = scenario_config();
    let near = Point::new(450, 300);
    let far = Point::new(100, 300);
    let keys = config.combat.skill_keys.clone();

    let win = ScriptedWindow::new(WIDTH, HEIGHT, move |inputs: &[InputEvent]| {
        let mut img = screen(&[near, far], 150);
        let click = last_click(inputs);
        if clicked_near(click, near) {
            let k = presses_since_last_click(inputs, &keys) as i32;
            draw_nameplate(&mut img, Some(RED), 150 - 40 * k);
        } else if clicked_near(click, far) {
            draw_nameplate(&mut img, None, 150);
        }
        Some(Frame::new(img))
    });
    let mut rig = rig(config, win);

    let first = rig.orch.tick()?;
    expect_eq(
        first,
        CycleOutcome::Hunted { detections: 2, probes: 1, engaged: true, killed: true },
        "first cycle",
    )?;
    let second = rig.orch.tick()?;
    expect_eq(
        second,
        CycleOutcome::Hunted { detections: 2, probes: 1, engaged: false, killed: false },
        "second cycle",
    )?;

    let inputs = rig.inputs();
    expect_eq(inputs.len(), 6, "input count")?;
    let c = clicks(&inputs);
    ensure(clicked_near(c.first().copied(), near), "first click should hit the near label")?;
    ensure(clicked_near(c.get(1).copied(), far), "second click should hit the far label")?;
    let presses: Vec<InputEvent> = inputs[1..5].to_vec();
    expect_eq(
        presses,
        ["1", "2", "3", "1"].iter().map(|k| InputEvent::Press(k.to_string())).collect(),
        "skill presses",
    )?;

    let t = rig.telemetry();
    expect_eq(t.kills, 1, "kills")?;
    expect_eq(t.early_stops, 1, "early stops")?;
    expect_eq(t.skills_used, 4, "skills used")?;
    expect_eq(t.skills_saved, 2, "skills saved")?;
    expect_eq(t.pets_skipped, 1, "pets skipped")?;
    expect_eq(t.class_counts.get(&ClassTag::Unique).copied(), Some(1), "unique count")?;
    expect_eq(t.cache_size, 2, "cache size")?;
    expect_eq(t.target_health_pct, Some(0.0), "target health")?;
    ensure(!t.state.in_recovery_mode, "no stuck recovery expected")
}

/// Player bar down to 5 red pixels: a death, once the post-buff guard has passed.
/// Revive keys are pressed, a screenshot is taken and buffs run again.
fn death_detected_and_buffs_rerun() -> Result<(), Failed> {
    let mut config = scenario_config();
    config.buffs = BuffConfig::default();
    let win = ScriptedWindow::new(WIDTH, HEIGHT, |_: &[InputEvent]| {
        let mut img = screen(&[], 0);
        paint(&mut img, Rect::new(PLAYER_HEALTH.x, PLAYER_HEALTH.y, 5, 1), RED);
        Some(Frame::new(img))
    });
    let mut rig = rig(config, win);

    // buffs go first, and their guard hides the death for now
    let first = rig.orch.tick()?;
    ensure(matches!(first, CycleOutcome::Hunted { .. }), format!("first cycle: {:?}", first))?;
    expect_eq(rig.inputs().len(), 2, "buff presses")?;

    rig.clock.advance(Duration::from_secs(5));
    expect_eq(rig.orch.tick()?, CycleOutcome::Died, "second cycle")?;
    expect_eq(
        rig.inputs()[2..].to_vec(),
        vec![InputEvent::Press("enter".into()), InputEvent::Press("1".into())],
        "revive presses",
    )?;
    expect_eq(rig.shots.lock().unwrap().clone(), vec![ScreenshotEvent::Death], "screenshots")?;

    // forced rebuff; the death cooldown keeps the same screen from re-triggering
    let third = rig.orch.tick()?;
    ensure(matches!(third, CycleOutcome::Hunted { .. }), format!("third cycle: {:?}", third))?;
    let inputs = rig.inputs();
    expect_eq(count(&inputs, &InputEvent::Press("f1".into())), 2, "f1 presses")?;
    expect_eq(count(&inputs, &InputEvent::Press("f2".into())), 2, "f2 presses")?;

    let t = rig.telemetry();
    expect_eq(t.deaths, 1, "deaths")?;
    ensure(t.state.last_death_time.is_some(), "death time recorded")
}

fn stuck_latches_and_retries_on_cadence() -> Result<(), Failed> {
    let mut rig = rig(scenario_config(), healthy_screen());
    let forward = InputEvent::KeyDown("w".into());

    rig.orch.tick()?;
    ensure(rig.inputs().is_empty(), "nothing to do on an empty screen")?;

    rig.clock.advance(Duration::from_secs(30));
    rig.orch.tick()?;
    let after_first = count(&rig.inputs(), &forward);
    ensure(after_first >= 2, "recovery should walk forward at least twice")?;
    let t = rig.telemetry();
    ensure(t.state.in_recovery_mode, "recovery mode latched")?;
    expect_eq(t.state.consecutive_recoveries, 1, "consecutive recoveries")?;

    // still latched, but the retry interval has not passed
    rig.orch.tick()?;
    expect_eq(count(&rig.inputs(), &forward), after_first, "no retry yet")?;
    ensure(rig.telemetry().state.in_recovery_mode, "still latched")?;

    rig.clock.advance(Duration::from_secs(8));
    rig.orch.tick()?;
    ensure(count(&rig.inputs(), &forward) > after_first, "retry should walk again")?;
    let t = rig.telemetry();
    expect_eq(t.state.consecutive_recoveries, 2, "consecutive recoveries")?;
    expect_eq(t.stuck_recoveries, 2, "total recoveries")
}

fn resume_guard_delays_death_check() -> Result<(), Failed> {
    let mut config = scenario_config();
    config.orchestrator.start_paused = true;
    let win = ScriptedWindow::new(WIDTH, HEIGHT, |_: &[InputEvent]| Some(Frame::new(screen(&[], 0))));
    let mut rig = rig(config, win);

    expect_eq(rig.orch.tick()?, CycleOutcome::Paused, "paused at start")?;
    rig.cmd_tx.send(Command::TogglePause)?;
    let resumed = rig.orch.tick()?;
    ensure(matches!(resumed, CycleOutcome::Hunted { .. }), format!("right after resume: {:?}", resumed))?;

    rig.clock.advance(Duration::from_secs(3));
    expect_eq(rig.orch.tick()?, CycleOutcome::Died, "after the guard")
}

fn unanswered_probe_is_cached() -> Result<(), Failed> {
    let target = Point::new(450, 300);
    let win = ScriptedWindow::new(WIDTH, HEIGHT, move |_: &[InputEvent]| {
        Some(Frame::new(screen(&[target], 150)))
    });
    let mut rig = rig(scenario_config(), win);

    let first = rig.orch.tick()?;
    expect_eq(
        first,
        CycleOutcome::Hunted { detections: 1, probes: 1, engaged: false, killed: false },
        "first cycle",
    )?;
    let second = rig.orch.tick()?;
    expect_eq(
        second,
        CycleOutcome::Hunted { detections: 1, probes: 0, engaged: false, killed: false },
        "second cycle",
    )?;
    expect_eq(clicks(&rig.inputs()).len(), 1, "clicks while cached")?;

    rig.clock.advance(Duration::from_secs(10));
    rig.orch.tick()?;
    expect_eq(clicks(&rig.inputs()).len(), 2, "clicks after expiry")?;
    let t = rig.telemetry();
    ensure(t.cache_hits >= 1, "cache hit counted")
}

fn probes_capped_per_cycle() -> Result<(), Failed> {
    let labels = [
        Point::new(150, 300),
        Point::new(300, 300),
        Point::new(450, 300),
        Point::new(600, 300),
    ];
    let win = ScriptedWindow::new(WIDTH, HEIGHT, move |_: &[InputEvent]| {
        Some(Frame::new(screen(&labels, 150)))
    });
    let mut rig = rig(scenario_config(), win);

    let outcome = rig.orch.tick()?;
    expect_eq(
        outcome,
        CycleOutcome::Hunted { detections: 4, probes: 3, engaged: false, killed: false },
        "capped cycle",
    )?;
    expect_eq(clicks(&rig.inputs()).len(), 3, "clicks")?;
    expect_eq(rig.telemetry().detections.len(), 4, "published detections")
}

/// Giant whose health bar never moves
fn unhittable_giant(target: Point) -> ScriptedWindow {
    ScriptedWindow::new(WIDTH, HEIGHT, move |inputs: &[InputEvent]| {
        let mut img: RgbImage = screen(&[target], 150);
        if clicked_near(last_click(inputs), target) {
            draw_nameplate(&mut img, Some(GOLD), 150);
        }
        Some(Frame::new(img))
    })
}

fn stalled_target_stays_selected() -> Result<(), Failed> {
    let mut rig = rig(scenario_config(), unhittable_giant(Point::new(450, 300)));

    let outcome = rig.orch.tick()?;
    expect_eq(
        outcome,
        CycleOutcome::Hunted { detections: 1, probes: 1, engaged: true, killed: false },
        "stalled cycle",
    )?;
    let t = rig.telemetry();
    expect_eq(t.stalls, 1, "stalls")?;
    expect_eq(t.kills, 0, "kills")?;
    expect_eq(t.skills_used, 6, "full rotation")?;
    expect_eq(t.class_counts.get(&ClassTag::Giant).copied(), Some(1), "giant count")?;
    ensure(t.state.target_selected, "target still selected after the stall")
}

/// Only the selected-target timeout can fire here: the no-target one is far away.
fn stalled_target_triggers_recovery() -> Result<(), Failed> {
    let mut config = scenario_config();
    config.stuck.no_target_timeout_ms = 600_000;
    let mut rig = rig(config, unhittable_giant(Point::new(450, 300)));

    rig.orch.tick()?;
    let t = rig.telemetry();
    expect_eq(t.stalls, 1, "stalls after the first fight")?;
    expect_eq(t.stuck_recoveries, 0, "no recovery yet")?;

    rig.clock.advance(Duration::from_secs(15));
    rig.orch.tick()?;
    let t = rig.telemetry();
    expect_eq(t.stuck_recoveries, 1, "recoveries")?;
    ensure(t.state.in_recovery_mode, "recovery mode latched")?;
    expect_eq(t.kills, 0, "kills")?;
    ensure(
        count(&rig.inputs(), &InputEvent::KeyDown("w".into())) >= 2,
        "recovery should walk forward",
    )
}
