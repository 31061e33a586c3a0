//! Two-timer cycle clock
//!
//! The authority loop waits for the sync interval, syncs, waits for the
//! cleanup interval, cleans up, and repeats. The clock models that as an
//! explicit state machine fed with elapsed time, so tests can step it
//! without sleeping.

use std::time::Duration;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_millis(500);

/// Intervals shorter than this are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    AwaitSync,
    AwaitCleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    Sync,
    Cleanup,
}

#[derive(Debug, Clone)]
pub struct CycleClock {
    sync_interval: Duration,
    cleanup_interval: Duration,
    phase: CyclePhase,
    phase_elapsed: Duration,
    cycles: u64,
    total: Duration,
}

impl CycleClock {
    pub fn new(sync_interval: Duration, cleanup_interval: Duration) -> Self {
        Self {
            sync_interval: sync_interval.max(MIN_INTERVAL),
            cleanup_interval: cleanup_interval.max(MIN_INTERVAL),
            phase: CyclePhase::AwaitSync,
            phase_elapsed: Duration::ZERO,
            cycles: 0,
            total: Duration::ZERO,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Completed sync + cleanup pairs.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn total_time(&self) -> Duration {
        self.total
    }

    fn current_interval(&self) -> Duration {
        match self.phase {
            CyclePhase::AwaitSync => self.sync_interval,
            CyclePhase::AwaitCleanup => self.cleanup_interval,
        }
    }

    /// Time left until the next step fires.
    pub fn remaining(&self) -> Duration {
        self.current_interval().saturating_sub(self.phase_elapsed)
    }

    /// Feed elapsed time; returns every step that came due, in order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<CycleStep> {
        self.total += elapsed;
        let mut budget = self.phase_elapsed + elapsed;
        let mut steps = Vec::new();

        loop {
            let interval = self.current_interval();
            if budget < interval {
                self.phase_elapsed = budget;
                break;
            }
            budget -= interval;
            match self.phase {
                CyclePhase::AwaitSync => {
                    steps.push(CycleStep::Sync);
                    self.phase = CyclePhase::AwaitCleanup;
                }
                CyclePhase::AwaitCleanup => {
                    steps.push(CycleStep::Cleanup);
                    self.phase = CyclePhase::AwaitSync;
                    self.cycles += 1;
                }
            }
        }

        steps
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_INTERVAL, DEFAULT_CLEANUP_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_sync_then_cleanup_then_repeat() {
        let mut clock = CycleClock::new(ms(100), ms(300));
        assert_eq!(clock.remaining(), ms(100));
        assert!(clock.advance(ms(99)).is_empty());
        assert_eq!(clock.advance(ms(1)), vec![CycleStep::Sync]);
        assert_eq!(clock.phase(), CyclePhase::AwaitCleanup);
        assert_eq!(clock.remaining(), ms(300));

        assert!(clock.advance(ms(200)).is_empty());
        assert_eq!(clock.advance(ms(100)), vec![CycleStep::Cleanup]);
        assert_eq!(clock.cycles(), 1);
        assert_eq!(clock.phase(), CyclePhase::AwaitSync);
    }

    #[test]
    fn test_large_step_emits_all_due_steps_in_order() {
        let mut clock = CycleClock::new(ms(10), ms(20));
        let steps = clock.advance(ms(65));
        assert_eq!(
            steps,
            vec![CycleStep::Sync, CycleStep::Cleanup, CycleStep::Sync, CycleStep::Cleanup]
        );
        assert_eq!(clock.cycles(), 2);
        // 60ms consumed, 5ms carried into the next sync wait
        assert_eq!(clock.remaining(), ms(5));
        assert_eq!(clock.total_time(), ms(65));
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let mut clock = CycleClock::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(clock.remaining(), MIN_INTERVAL);
        assert_eq!(clock.advance(MIN_INTERVAL * 2).len(), 2);
    }
}
