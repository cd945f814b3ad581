//! Scroll paging
//!
//! Turns wheel gestures and explicit page requests into a page-snapped
//! target offset and eases the visible offset toward it every frame.

use serde::{Deserialize, Serialize};

use super::falloff::lerp;
use crate::consts::*;

/// Signed page distance beyond which section skew stops growing
pub const MAX_SECTION_SKEW: f32 = 2.0;

/// Scroll state owned by the controller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrollState {
    /// Always a whole number of sections
    pub target_offset: f32,
    pub current_offset: f32,
    /// `round(current_offset / section_height)`, refreshed every frame
    pub current_section: usize,
    /// Only changed by page requests and settle confirmation
    pub focused_section: usize,
    /// Wheel input is being dropped by the debounce lock
    pub paging_locked: bool,
}

/// A resolved paging intent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTarget {
    pub index: usize,
    pub offset: f32,
}

/// Wheel delta accumulator with a debounce lock
#[derive(Debug, Clone)]
pub struct WheelAccumulator {
    accumulated: f32,
    threshold: f32,
    lock_ms: f64,
    locked_until: Option<f64>,
}

impl WheelAccumulator {
    pub fn new(threshold: f32, lock_ms: f64) -> Self {
        Self {
            accumulated: 0.0,
            threshold,
            lock_ms,
            locked_until: None,
        }
    }

    pub fn is_locked(&self, now: f64) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Feed a raw wheel delta. Returns the page direction once the
    /// accumulated magnitude crosses the threshold; input is dropped
    /// while locked.
    pub fn feed(&mut self, delta: f32, now: f64) -> Option<i64> {
        if self.is_locked(now) {
            return None;
        }
        self.accumulated += delta;
        if self.accumulated.abs() <= self.threshold {
            return None;
        }

        let direction = if self.accumulated > 0.0 { 1 } else { -1 };
        self.accumulated = 0.0;
        self.locked_until = Some(now + self.lock_ms);
        Some(direction)
    }
}

/// Per-section visual transform derived from its distance to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionTransform {
    pub index: usize,
    /// Signed distance in pages (positive: section is above the viewport)
    pub offset: f32,
    pub translate_y: f32,
    pub rotate_deg: f32,
    pub scale: f32,
    pub opacity: f32,
    /// Focused sections get the lifted treatment
    pub elevated: bool,
}

impl SectionTransform {
    fn new(index: usize, offset: f32, elevated: bool) -> Self {
        let skew = offset.clamp(-MAX_SECTION_SKEW, MAX_SECTION_SKEW);
        let abs = offset.abs();
        Self {
            index,
            offset,
            translate_y: skew * 8.0,
            rotate_deg: skew * 1.2,
            scale: 1.0 - (abs * 0.05).min(0.05),
            opacity: 1.0 - (abs * 0.9).min(0.9),
            elevated,
        }
    }
}

/// Page-snapped scroll controller
#[derive(Debug, Clone)]
pub struct PageController {
    state: ScrollState,
    section_count: usize,
    section_height: f32,
    easing: f32,
    wheel: WheelAccumulator,
}

impl PageController {
    pub fn new(section_count: usize, section_height: f32) -> Self {
        Self::with_tuning(
            section_count,
            section_height,
            PAGE_EASING,
            WheelAccumulator::new(WHEEL_THRESHOLD, WHEEL_LOCK_MS),
        )
    }

    pub fn with_tuning(
        section_count: usize,
        section_height: f32,
        easing: f32,
        wheel: WheelAccumulator,
    ) -> Self {
        Self {
            state: ScrollState::default(),
            section_count: section_count.max(1),
            section_height: section_height.max(0.0),
            easing: easing.clamp(0.0, 1.0),
            wheel,
        }
    }

    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    pub fn section_count(&self) -> usize {
        self.section_count
    }

    pub fn section_height(&self) -> f32 {
        self.section_height
    }

    pub fn target_offset(&self) -> f32 {
        self.state.target_offset
    }

    pub fn current_offset(&self) -> f32 {
        self.state.current_offset
    }

    pub fn current_section(&self) -> usize {
        self.state.current_section
    }

    pub fn focused_section(&self) -> usize {
        self.state.focused_section
    }

    /// Page the target offset currently points at
    pub fn target_index(&self) -> usize {
        if self.section_height <= 0.0 {
            return 0;
        }
        (self.state.target_offset / self.section_height).round() as usize
    }

    pub fn is_locked(&self, now: f64) -> bool {
        self.wheel.is_locked(now)
    }

    fn clamp_index(&self, index: i64) -> usize {
        index.clamp(0, self.section_count as i64 - 1) as usize
    }

    /// Retarget to a page and mark it focused immediately
    pub fn request(&mut self, index: i64) -> PageTarget {
        let index = self.clamp_index(index);
        let offset = index as f32 * self.section_height;
        self.state.target_offset = offset;
        self.state.focused_section = index;
        PageTarget { index, offset }
    }

    /// Move `direction` pages from the current target
    pub fn step_by(&mut self, direction: i64) -> PageTarget {
        self.request(self.target_index() as i64 + direction)
    }

    /// Feed a wheel delta; returns the new target when a page step fires
    pub fn wheel(&mut self, delta: f32, now: f64) -> Option<PageTarget> {
        let paged = self.wheel.feed(delta, now).map(|direction| self.step_by(direction));
        self.sync_lock(now);
        paged
    }

    /// Refresh `paging_locked` in the exposed state from the clock
    pub fn sync_lock(&mut self, now: f64) {
        self.state.paging_locked = self.wheel.is_locked(now);
    }

    /// Re-confirm focus after the scroll settled. Returns true if it changed.
    pub fn confirm_focus(&mut self, index: usize) -> bool {
        let index = self.clamp_index(index as i64);
        let changed = self.state.focused_section != index;
        self.state.focused_section = index;
        changed
    }

    /// One easing frame toward the target
    pub fn ease(&mut self) {
        self.state.current_offset = lerp(self.state.current_offset, self.state.target_offset, self.easing);
        self.state.current_section = if self.section_height > 0.0 {
            let idx = (self.state.current_offset / self.section_height).round().max(0.0) as usize;
            idx.min(self.section_count - 1)
        } else {
            0
        };
    }

    /// Sections are one viewport tall; keep the target page across resizes
    pub fn resize(&mut self, section_height: f32) {
        let section_height = section_height.max(0.0);
        let index = self.target_index();
        if self.section_height > 0.0 {
            self.state.current_offset *= section_height / self.section_height;
        }
        self.section_height = section_height;
        self.state.target_offset = index as f32 * section_height;
    }

    /// Transforms for every section at the current offset
    pub fn section_transforms(&self) -> Vec<SectionTransform> {
        (0..self.section_count)
            .map(|i| {
                let offset = if self.section_height > 0.0 {
                    (self.state.current_offset - i as f32 * self.section_height) / self.section_height
                } else {
                    0.0
                };
                SectionTransform::new(i, offset, i == self.state.focused_section)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_request_clamps_low() {
        let mut pager = PageController::new(3, 800.0);
        let target = pager.request(-1);
        assert_eq!(target.index, 0);
        assert_eq!(pager.target_offset(), 0.0);
    }

    #[test]
    fn test_request_clamps_high() {
        let mut pager = PageController::new(3, 800.0);
        let target = pager.request(7);
        assert_eq!(target.index, 2);
        assert_eq!(pager.target_offset(), 1600.0);
        assert_eq!(pager.focused_section(), 2);
    }

    #[test]
    fn test_request_focuses_before_easing() {
        let mut pager = PageController::new(3, 800.0);
        pager.request(2);
        assert_eq!(pager.focused_section(), 2);
        assert_eq!(pager.current_section(), 0);
        assert_eq!(pager.current_offset(), 0.0);
    }

    #[test]
    fn test_easing_converges_without_overshoot() {
        let mut pager = PageController::new(3, 800.0);
        pager.request(1);
        let mut last_gap = 800.0;
        for _ in 0..60 {
            pager.ease();
            let gap = (pager.current_offset() - 800.0).abs();
            assert!(gap < last_gap);
            assert!(pager.current_offset() <= 800.0);
            last_gap = gap;
        }
        assert!(last_gap < SETTLE_TOLERANCE);
        assert_eq!(pager.current_section(), 1);
    }

    #[test]
    fn test_easing_does_not_change_focus() {
        let mut pager = PageController::new(3, 800.0);
        pager.request(2);
        pager.confirm_focus(0);
        for _ in 0..100 {
            pager.ease();
        }
        assert_eq!(pager.current_section(), 2);
        assert_eq!(pager.focused_section(), 0);
    }

    #[test]
    fn test_wheel_debounce_single_step() {
        let mut pager = PageController::new(5, 800.0);
        let first = pager.wheel(120.0, 0.0);
        assert_eq!(first.map(|t| t.index), Some(1));

        // Second gesture lands inside the lock window
        assert!(pager.is_locked(200.0));
        assert_eq!(pager.wheel(120.0, 200.0), None);
        assert_eq!(pager.target_index(), 1);

        // After the lock it pages again
        let later = pager.wheel(120.0, 500.0);
        assert_eq!(later.map(|t| t.index), Some(2));
    }

    #[test]
    fn test_state_reports_paging_lock() {
        let mut pager = PageController::new(5, 800.0);
        assert!(!pager.state().paging_locked);

        pager.wheel(120.0, 0.0);
        assert!(pager.state().paging_locked);

        pager.sync_lock(200.0);
        assert!(pager.state().paging_locked);
        pager.sync_lock(500.0);
        assert!(!pager.state().paging_locked);
    }

    #[test]
    fn test_wheel_accumulates_small_deltas() {
        let mut pager = PageController::new(5, 800.0);
        assert_eq!(pager.wheel(40.0, 0.0), None);
        assert_eq!(pager.wheel(40.0, 10.0), None);
        let step = pager.wheel(40.0, 20.0);
        assert_eq!(step.map(|t| t.index), Some(1));
    }

    #[test]
    fn test_wheel_up_at_first_page_stays() {
        let mut pager = PageController::new(5, 800.0);
        let step = pager.wheel(-200.0, 0.0);
        assert_eq!(step, Some(PageTarget { index: 0, offset: 0.0 }));
    }

    #[test]
    fn test_resize_keeps_target_page() {
        let mut pager = PageController::new(4, 800.0);
        pager.request(2);
        for _ in 0..200 {
            pager.ease();
        }
        pager.resize(600.0);
        assert_eq!(pager.target_offset(), 1200.0);
        assert!((pager.current_offset() - 1200.0).abs() < 1.0);
    }

    #[test]
    fn test_section_transforms() {
        let mut pager = PageController::new(4, 800.0);
        pager.request(0);
        let transforms = pager.section_transforms();
        assert_eq!(transforms.len(), 4);

        let focused = transforms[0];
        assert!(focused.elevated);
        assert_eq!(focused.scale, 1.0);
        assert_eq!(focused.opacity, 1.0);

        let next = transforms[1];
        assert_eq!(next.offset, -1.0);
        assert!((next.opacity - 0.1).abs() < 1e-6);
        assert!((next.scale - 0.95).abs() < 1e-6);

        // Skew saturates for far sections
        let far = transforms[3];
        assert_eq!(far.translate_y, -MAX_SECTION_SKEW * 8.0);
        assert!((far.rotate_deg + MAX_SECTION_SKEW * 1.2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_target_is_page_snapped(
            count in 1usize..12,
            height in 1.0f32..2000.0,
            requests in proptest::collection::vec(-20i64..20, 1..16),
        ) {
            let mut pager = PageController::new(count, height);
            for index in requests {
                pager.request(index);
                let max = (count - 1) as f32 * height;
                let target = pager.target_offset();
                prop_assert!(target >= 0.0 && target <= max);
                prop_assert_eq!(target, pager.target_index() as f32 * height);
            }
        }

        #[test]
        fn prop_easing_never_overshoots(height in 100.0f32..2000.0, frames in 1usize..80) {
            let mut pager = PageController::new(2, height);
            pager.request(1);
            let mut last_gap = height;
            for _ in 0..frames {
                pager.ease();
                let gap = height - pager.current_offset();
                prop_assert!(gap >= 0.0);
                prop_assert!(gap <= last_gap);
                last_gap = gap;
            }
        }
    }
}
