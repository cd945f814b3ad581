//! Frame scheduling and cooperative timers
//!
//! Nothing here owns a clock. The host passes `now` (milliseconds) in and
//! gets decisions back, so the same code runs under `requestAnimationFrame`
//! and in plain tests.

use std::collections::BinaryHeap;
use std::cmp::{Ordering, Reverse};

use crate::consts::MAX_FRAME_DT_MS;
use crate::error::FieldError;

/// Outcome of polling the frame scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameDecision {
    /// Too soon since the last accepted frame
    Skip,
    /// Do the frame work. `dt` is in seconds and already clamped.
    Accept { dt: f32 },
    /// Torn down; the host should stop rescheduling
    Stopped,
}

/// Capped-rate frame gate
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval_ms: f64,
    last_accepted: f64,
    running: bool,
}

impl FrameScheduler {
    pub fn new(cap_hz: f32, start_ms: f64) -> Self {
        Self {
            interval_ms: 1000.0 / cap_hz.max(1.0) as f64,
            last_accepted: start_ms,
            running: true,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Decide whether the frame at `now` does any work
    pub fn poll(&mut self, now: f64) -> FrameDecision {
        if !self.running {
            return FrameDecision::Stopped;
        }
        let elapsed = now - self.last_accepted;
        if elapsed < self.interval_ms {
            return FrameDecision::Skip;
        }
        self.last_accepted = now;
        FrameDecision::Accept {
            dt: (elapsed.min(MAX_FRAME_DT_MS) * 0.001) as f32,
        }
    }

    /// Restart the cadence, e.g. after a grid rebuild
    pub fn reset(&mut self, now: f64) {
        self.last_accepted = now;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Debug)]
struct Entry<T> {
    due: f64,
    seq: u64,
    task: T,
}

impl<T> Entry<T> {
    fn key(&self) -> (f64, u64) {
        (self.due, self.seq)
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a_due, a_seq) = self.key();
        let (b_due, b_seq) = other.key();
        a_due.total_cmp(&b_due).then(a_seq.cmp(&b_seq))
    }
}

/// Deferred tasks keyed by due time
#[derive(Debug)]
pub struct Timers<T> {
    queue: BinaryHeap<Reverse<Entry<T>>>,
    next_seq: u64,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: f64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry { due, seq, task }));
    }

    /// Remove and return every task due at or before `now`, earliest first.
    /// Equal due times keep scheduling order.
    pub fn drain_due(&mut self, now: f64) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.queue.peek() {
            if entry.due > now {
                break;
            }
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Result of one attempt under a [`RetryPolicy`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attempt {
    Ready,
    /// Not ready yet; try again as `next_attempt` after `delay_ms`
    Retry { next_attempt: u32, delay_ms: f64 },
}

/// Bounded retry with a fixed backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: f64,
}

impl RetryPolicy {
    /// Evaluate attempt number `attempt` (1-based)
    pub fn attempt(&self, attempt: u32, ready: bool) -> Result<Attempt, FieldError> {
        if ready {
            return Ok(Attempt::Ready);
        }
        if attempt >= self.max_attempts {
            return Err(FieldError::RetryExhausted { attempts: attempt });
        }
        Ok(Attempt::Retry {
            next_attempt: attempt + 1,
            delay_ms: self.backoff_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_cap_skips_early_frames() {
        let mut frames = FrameScheduler::new(40.0, 0.0);
        assert_eq!(frames.poll(16.0), FrameDecision::Skip);
        assert_eq!(frames.poll(24.9), FrameDecision::Skip);
        assert_eq!(frames.poll(25.0), FrameDecision::Accept { dt: 0.025 });
        // Interval counts from the last accepted frame
        assert_eq!(frames.poll(41.0), FrameDecision::Skip);
        assert!(matches!(frames.poll(50.0), FrameDecision::Accept { .. }));
    }

    #[test]
    fn test_dt_is_clamped_after_stall() {
        let mut frames = FrameScheduler::new(40.0, 0.0);
        assert_eq!(frames.poll(5000.0), FrameDecision::Accept { dt: 0.04 });
    }

    #[test]
    fn test_accepted_frames_never_closer_than_interval() {
        let mut frames = FrameScheduler::new(40.0, 0.0);
        let mut last = 0.0;
        let mut now = 0.0;
        while now < 1000.0 {
            now += 16.7;
            if let FrameDecision::Accept { dt } = frames.poll(now) {
                assert!(now - last >= 25.0);
                assert!(dt <= 0.04);
                last = now;
            }
        }
    }

    #[test]
    fn test_stopped_scheduler() {
        let mut frames = FrameScheduler::new(40.0, 0.0);
        frames.stop();
        assert!(!frames.is_running());
        assert_eq!(frames.poll(100.0), FrameDecision::Stopped);
    }

    #[test]
    fn test_timers_drain_in_due_order() {
        let mut timers = Timers::new();
        timers.schedule(120.0, "c");
        timers.schedule(60.0, "a");
        timers.schedule(60.0, "b");
        timers.schedule(500.0, "late");

        assert!(timers.drain_due(59.0).is_empty());
        assert_eq!(timers.drain_due(200.0), vec!["a", "b", "c"]);
        assert_eq!(timers.len(), 1);
        timers.clear();
        assert!(timers.is_empty());
    }

    #[test]
    fn test_retry_policy_exhausts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff_ms: 120.0,
        };
        assert_eq!(
            policy.attempt(1, false).unwrap(),
            Attempt::Retry {
                next_attempt: 2,
                delay_ms: 120.0
            }
        );
        assert_eq!(policy.attempt(2, true).unwrap(), Attempt::Ready);
        assert!(matches!(
            policy.attempt(3, false),
            Err(FieldError::RetryExhausted { attempts: 3 })
        ));
    }
}
