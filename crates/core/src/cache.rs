use std::time::Duration;

use crate::settings::CacheConfig;
use crate::types::Point;

#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub position: Point,
    pub timestamp: Duration,
}

/// Memo of recently probed screen positions, matched by proximity rather
/// than exact coordinates, so the same target is not clicked again and
/// again while a different target nearby still gets probed.
pub struct PositionCache {
    duration: Duration,
    radius: f64,
    entries: Vec<CacheEntry>,
    hits: u64,
    misses: u64,
}

impl PositionCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            duration: config.duration(),
            radius: config.radius,
            entries: Vec::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// True when `point` is near a position probed within the decay window.
    /// On a miss, `point` is recorded as probed at `now`.
    pub fn is_recently_checked(&mut self, point: Point, now: Duration) -> bool {
        let duration = self.duration;
        self.entries
            .retain(|e| now.saturating_sub(e.timestamp) < duration);

        if self.entries.iter().any(|e| e.position.distance(point) < self.radius) {
            self.hits += 1;
            return true;
        }
        self.misses += 1;
        self.entries.push(CacheEntry { position: point, timestamp: now });
        false
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
