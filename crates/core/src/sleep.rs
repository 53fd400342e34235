use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

/// Time source shared by every subsystem. All waiting in the loop goes through here.
pub trait Clock: Send + Sync {
    /// Time since the clock was created.
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, d: Duration) {
        thread::sleep(d);
    }
}

/// Clock that only moves when slept on or advanced. Sleeping returns at once.
#[derive(Default)]
pub struct VirtualClock {
    micros: AtomicU64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.micros.fetch_add(d.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

/// `d` with +/-`fraction` random jitter, never below 10ms.
pub fn jitter(d: Duration, fraction: f64, rng: &mut impl Rng) -> Duration {
    let secs = d.as_secs_f64();
    let spread = secs * fraction;
    if spread <= 0.0 {
        return d;
    }
    let actual = secs + rng.gen_range(-spread..spread);
    Duration::from_secs_f64(actual.max(0.01))
}

/// Uniform duration in `[lo_ms, hi_ms]`.
pub fn between_ms(lo_ms: u64, hi_ms: u64, rng: &mut impl Rng) -> Duration {
    if hi_ms <= lo_ms {
        return Duration::from_millis(lo_ms);
    }
    Duration::from_millis(rng.gen_range(lo_ms..=hi_ms))
}
