//! Settle detection
//!
//! After a page request, the scroll offset is polled on a coarse timer until
//! it is within tolerance of the target or a timeout expires. Focus is then
//! confirmed once, after a short extra delay. A newer request supersedes any
//! watch still in flight.

use crate::consts::*;

/// Timing for settle watches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleTiming {
    pub poll_ms: f64,
    pub timeout_ms: f64,
    pub tolerance: f32,
    pub confirm_delay_ms: f64,
}

impl Default for SettleTiming {
    fn default() -> Self {
        Self {
            poll_ms: SETTLE_POLL_MS,
            timeout_ms: SETTLE_TIMEOUT_MS,
            tolerance: SETTLE_TOLERANCE,
            confirm_delay_ms: SETTLE_CONFIRM_DELAY_MS,
        }
    }
}

/// An in-flight watch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleWatch {
    pub generation: u64,
    pub section: usize,
    pub target_offset: f32,
    pub started_at: f64,
    /// Polling finished; waiting for the confirm delay
    pub confirming: bool,
}

/// Result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePoll {
    /// Still moving; poll again after `poll_ms`
    Pending,
    /// Stop polling; confirm after `confirm_delay_ms`.
    /// `converged` is false when the timeout forced it.
    Settled { converged: bool },
    /// A newer watch replaced this one
    Superseded,
}

#[derive(Debug, Clone, Default)]
pub struct SettleDetector {
    timing: SettleTiming,
    generation: u64,
    active: Option<SettleWatch>,
}

impl SettleDetector {
    pub fn new(timing: SettleTiming) -> Self {
        Self {
            timing,
            generation: 0,
            active: None,
        }
    }

    pub fn timing(&self) -> SettleTiming {
        self.timing
    }

    pub fn active(&self) -> Option<&SettleWatch> {
        self.active.as_ref()
    }

    /// Start watching a new target, cancelling any previous watch
    pub fn begin(&mut self, section: usize, target_offset: f32, now: f64) -> SettleWatch {
        self.generation += 1;
        let watch = SettleWatch {
            generation: self.generation,
            section,
            target_offset,
            started_at: now,
            confirming: false,
        };
        self.active = Some(watch);
        watch
    }

    fn current(&mut self, generation: u64) -> Option<&mut SettleWatch> {
        self.active.as_mut().filter(|w| w.generation == generation)
    }

    /// Poll the watch for `generation` against the eased offset
    pub fn poll(&mut self, generation: u64, current_offset: f32, now: f64) -> SettlePoll {
        let timing = self.timing;
        let Some(watch) = self.current(generation) else {
            return SettlePoll::Superseded;
        };
        if watch.confirming {
            return SettlePoll::Settled { converged: true };
        }

        let converged = (current_offset - watch.target_offset).abs() <= timing.tolerance;
        let timed_out = now - watch.started_at > timing.timeout_ms;
        if converged || timed_out {
            watch.confirming = true;
            SettlePoll::Settled { converged }
        } else {
            SettlePoll::Pending
        }
    }

    /// Finish the watch for `generation`, returning the section to focus.
    /// Superseded or unfinished watches yield nothing.
    pub fn confirm(&mut self, generation: u64) -> Option<usize> {
        let watch = self.current(generation)?;
        if !watch.confirming {
            return None;
        }
        let section = watch.section;
        self.active = None;
        Some(section)
    }

    /// Point the watch in flight at a new offset for the same section,
    /// e.g. after a resize re-snapped the target. The timeout keeps running.
    pub fn retarget(&mut self, target_offset: f32) {
        if let Some(watch) = self.active.as_mut() {
            watch.target_offset = target_offset;
        }
    }

    /// Drop any watch in flight
    pub fn cancel(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converged_poll_settles() {
        let mut settle = SettleDetector::new(SettleTiming::default());
        let watch = settle.begin(2, 1600.0, 0.0);

        assert_eq!(settle.poll(watch.generation, 0.0, 60.0), SettlePoll::Pending);
        assert_eq!(
            settle.poll(watch.generation, 1595.0, 120.0),
            SettlePoll::Settled { converged: true }
        );
        assert_eq!(settle.confirm(watch.generation), Some(2));
        assert!(settle.active().is_none());
    }

    #[test]
    fn test_timeout_forces_settle() {
        let mut settle = SettleDetector::new(SettleTiming::default());
        let watch = settle.begin(1, 800.0, 0.0);

        assert_eq!(settle.poll(watch.generation, 0.0, 1380.0), SettlePoll::Pending);
        assert_eq!(
            settle.poll(watch.generation, 0.0, 1440.0),
            SettlePoll::Settled { converged: false }
        );
        assert_eq!(settle.confirm(watch.generation), Some(1));
    }

    #[test]
    fn test_confirm_requires_settle() {
        let mut settle = SettleDetector::new(SettleTiming::default());
        let watch = settle.begin(1, 800.0, 0.0);
        assert_eq!(settle.confirm(watch.generation), None);
        assert!(settle.active().is_some());
    }

    #[test]
    fn test_retarget_moves_tolerance_window() {
        let mut settle = SettleDetector::new(SettleTiming::default());
        let watch = settle.begin(2, 1600.0, 0.0);
        settle.retarget(1200.0);

        assert_eq!(settle.poll(watch.generation, 1600.0, 60.0), SettlePoll::Pending);
        assert_eq!(
            settle.poll(watch.generation, 1198.0, 120.0),
            SettlePoll::Settled { converged: true }
        );
        assert_eq!(settle.confirm(watch.generation), Some(2));
    }

    #[test]
    fn test_newer_watch_supersedes() {
        let mut settle = SettleDetector::new(SettleTiming::default());
        let old = settle.begin(1, 800.0, 0.0);
        let new = settle.begin(2, 1600.0, 30.0);

        assert_eq!(settle.poll(old.generation, 800.0, 60.0), SettlePoll::Superseded);
        assert_eq!(settle.confirm(old.generation), None);
        assert_eq!(settle.poll(new.generation, 1600.0, 90.0), SettlePoll::Settled { converged: true });
        assert_eq!(settle.confirm(new.generation), Some(2));
    }
}
