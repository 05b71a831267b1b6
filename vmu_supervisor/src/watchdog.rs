//! Engine response watchdog.
//!
//! One miss counter per engine. A cycle in which nothing was drained from an
//! engine's response queue is a miss; any response resets the counter. The
//! caller latches `safety` once a counter reaches the limit.

use vmu_common::command::EngineKind;

/// Per-engine consecutive miss counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchdog {
    limit: u32,
    misses: [u32; 2],
}

const fn slot(kind: EngineKind) -> usize {
    match kind {
        EngineKind::Electric => 0,
        EngineKind::Combustion => 1,
    }
}

impl Watchdog {
    pub const fn new(limit: u32) -> Self {
        Self {
            limit,
            misses: [0; 2],
        }
    }

    /// Record how many responses `kind` produced this cycle.
    ///
    /// Returns `true` while the engine is at or past the miss limit.
    pub fn observe(&mut self, kind: EngineKind, responses: usize) -> bool {
        let misses = &mut self.misses[slot(kind)];
        if responses == 0 {
            *misses = misses.saturating_add(1);
        } else {
            *misses = 0;
        }
        *misses >= self.limit
    }

    /// Consecutive misses of `kind`.
    pub fn misses(&self, kind: EngineKind) -> u32 {
        self.misses[slot(kind)]
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trips_on_fifth_consecutive_miss() {
        let mut watchdog = Watchdog::new(5);
        for _ in 0..4 {
            assert!(!watchdog.observe(EngineKind::Electric, 0));
        }
        assert!(watchdog.observe(EngineKind::Electric, 0));
        assert_eq!(watchdog.misses(EngineKind::Electric), 5);
    }

    #[test]
    fn test_response_resets_counter() {
        let mut watchdog = Watchdog::new(5);
        for _ in 0..4 {
            watchdog.observe(EngineKind::Combustion, 0);
        }
        assert!(!watchdog.observe(EngineKind::Combustion, 2));
        assert_eq!(watchdog.misses(EngineKind::Combustion), 0);
        for _ in 0..4 {
            assert!(!watchdog.observe(EngineKind::Combustion, 0));
        }
    }

    #[test]
    fn test_engines_counted_independently() {
        let mut watchdog = Watchdog::new(2);
        watchdog.observe(EngineKind::Electric, 0);
        watchdog.observe(EngineKind::Combustion, 1);
        assert!(watchdog.observe(EngineKind::Electric, 0));
        assert!(!watchdog.observe(EngineKind::Combustion, 0));
        assert_eq!(watchdog.misses(EngineKind::Combustion), 1);
    }
}
