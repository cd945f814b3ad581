//! Engine: owns every component and routes host events to them
//!
//! The host calls [`Engine::tick`] once per display frame with its clock
//! and forwards pointer, wheel, resize and paging input as it arrives.
//! Side effects the presentational layer cares about come back as
//! [`EngineEvent`]s.

use glam::Vec2;

use crate::consts::*;
use crate::error::FieldError;
use crate::renderer::{DrawList, build_frame};
use crate::scheduler::{Attempt, FrameDecision, FrameScheduler, RetryPolicy, Timers};
use crate::settings::{QualityPreset, Settings};
use crate::sim::{
    Burst, FieldClock, ImpactOutcome, PageController, PageTarget, SectionTransform, SettleDetector,
    SettlePoll, TileField, apply_impact,
};

/// Where an impact originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactSource {
    /// Empty background
    Field,
    /// An interactive control overlaid on the field; never strikes tiles
    Control,
}

/// Notifications for the presentational layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The focused section index changed
    FocusChanged { section: usize },
    /// Move keyboard focus to the first control of `section`
    FocusFirstControl { section: usize },
    /// Scrolling stopped (or timed out) on `section`
    Settled { section: usize, converged: bool },
    BurstFired { attempts: u32 },
    BurstAbandoned { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Task {
    SettlePoll { generation: u64 },
    SettleConfirm { generation: u64 },
    BurstAttempt { attempt: u32 },
    BurstImpact { point: Vec2 },
}

/// Result of one [`Engine::tick`]
#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    /// The frame scheduler let the tile step run this frame
    pub accepted: bool,
    /// False once torn down; the host should stop scheduling frames
    pub running: bool,
    /// Commands to present, when anything visible changed
    pub draw: Option<DrawList>,
}

pub struct Engine {
    settings: Settings,
    field: TileField,
    pager: PageController,
    settle: SettleDetector,
    confetti: Burst,
    frames: FrameScheduler,
    timers: Timers<Task>,
    retry: RetryPolicy,
    events: Vec<EngineEvent>,
    started_at: f64,
    surface_attached: bool,
    confetti_drawn: bool,
    torn_down: bool,
}

impl Engine {
    pub fn new(
        settings: Settings,
        seed: u64,
        width: f32,
        height: f32,
        section_count: usize,
        now: f64,
    ) -> Self {
        let field = TileField::new(width, height, settings.tile_budget(), seed);
        let pager = PageController::with_tuning(section_count, height, settings.easing, settings.wheel());
        let settle = SettleDetector::new(settings.settle_timing());
        let frames = FrameScheduler::new(settings.frame_cap(), now);
        let retry = settings.burst_retry();

        log::info!(
            "Engine started: {}x{} viewport, {} sections, {} tiles, seed {}",
            width,
            height,
            pager.section_count(),
            field.tiles().len(),
            seed
        );

        Self {
            settings,
            field,
            pager,
            settle,
            confetti: Burst::new(seed.wrapping_add(1)),
            frames,
            timers: Timers::new(),
            retry,
            events: Vec::new(),
            started_at: now,
            surface_attached: false,
            confetti_drawn: false,
            torn_down: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn field(&self) -> &TileField {
        &self.field
    }

    pub fn pager(&self) -> &PageController {
        &self.pager
    }

    pub fn current_section(&self) -> usize {
        self.pager.current_section()
    }

    pub fn focused_section(&self) -> usize {
        self.pager.focused_section()
    }

    pub fn section_transforms(&self) -> Vec<SectionTransform> {
        self.pager.section_transforms()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_running(&self) -> bool {
        !self.torn_down
    }

    /// Impacts only land once a surface is attached to a non-empty viewport
    pub fn is_ready(&self) -> bool {
        let (w, h) = self.field.viewport();
        self.surface_attached && !self.torn_down && w > 0.0 && h > 0.0
    }

    /// Take every event raised since the last call
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn attach_surface(&mut self) {
        if !self.surface_attached {
            log::info!("Raster surface attached");
        }
        self.surface_attached = true;
    }

    /// Drop back to a static background; paging keeps working
    pub fn detach_surface(&mut self) {
        if self.surface_attached {
            log::warn!("Raster surface detached");
        }
        self.surface_attached = false;
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.field.set_pointer(Vec2::new(x, y));
    }

    /// Strike the field at a viewport point
    pub fn impact(&mut self, x: f32, y: f32, source: ImpactSource) -> Result<ImpactOutcome, FieldError> {
        if source == ImpactSource::Control {
            return Ok(ImpactOutcome::default());
        }
        self.impact_at(Vec2::new(x, y))
    }

    fn impact_at(&mut self, point: Vec2) -> Result<ImpactOutcome, FieldError> {
        if !self.is_ready() {
            return Err(FieldError::SurfaceNotReady);
        }
        let outcome = apply_impact(&mut self.field, point);
        if let Some(index) = outcome.detached {
            log::debug!("Tile {} detached by impact at ({}, {})", index, point.x, point.y);
        }
        Ok(outcome)
    }

    /// Rebuild the grid for a new viewport. In-flight tile animation is discarded.
    pub fn resize(&mut self, width: f32, height: f32, now: f64) {
        self.field.rebuild(width, height);
        self.pager.resize(height);
        self.settle.retarget(self.pager.target_offset());
        self.frames.reset(now);
        if self.confetti.is_active() {
            self.confetti.clear();
            self.confetti_drawn = true;
        }
        log::info!("Resized to {}x{}", width, height);
    }

    /// Switch quality preset: the grid is rebuilt with the new budget and the
    /// frame cap restarts. The choice is persisted.
    pub fn set_quality(&mut self, preset: QualityPreset, now: f64) {
        self.settings.apply_preset(preset);
        self.field.set_budget(self.settings.tile_budget());
        let running = self.frames.is_running();
        self.frames = FrameScheduler::new(self.settings.frame_cap(), now);
        if !running {
            self.frames.stop();
        }
        log::info!(
            "Quality set to {}: {} tiles, {} Hz",
            preset.as_str(),
            self.field.tiles().len(),
            self.settings.frame_cap()
        );
    }

    /// Feed a wheel delta. Returns the new target when it paged.
    pub fn wheel(&mut self, delta_y: f32, now: f64) -> Option<PageTarget> {
        if self.torn_down {
            return None;
        }
        let focused = self.pager.focused_section();
        let target = self.pager.wheel(delta_y, now)?;
        self.begin_transition(target, focused, false, now);
        Some(target)
    }

    /// Page to `index` (clamped). `burst` asks for a few synthetic impacts
    /// near the viewport center once the surface is ready.
    pub fn request_page(&mut self, index: i64, burst: bool, now: f64) -> PageTarget {
        let focused = self.pager.focused_section();
        let target = self.pager.request(index);
        if !self.torn_down {
            self.begin_transition(target, focused, burst, now);
        }
        target
    }

    /// Page relative to the current target
    pub fn step_page(&mut self, direction: i64, burst: bool, now: f64) -> PageTarget {
        self.request_page(self.pager.target_index() as i64 + direction, burst, now)
    }

    fn begin_transition(&mut self, target: PageTarget, previous_focus: usize, burst: bool, now: f64) {
        log::debug!("Paging to section {} (offset {})", target.index, target.offset);
        if target.index != previous_focus {
            self.events.push(EngineEvent::FocusChanged {
                section: target.index,
            });
        }

        let watch = self.settle.begin(target.index, target.offset, now);
        let timing = self.settle.timing();
        self.timers.schedule(
            now + timing.poll_ms,
            Task::SettlePoll {
                generation: watch.generation,
            },
        );

        if burst && self.settings.effective_burst_feedback() {
            self.try_burst(1, now);
        }
    }

    fn try_burst(&mut self, attempt: u32, now: f64) {
        match self.retry.attempt(attempt, self.is_ready()) {
            Ok(Attempt::Ready) => {
                let (w, h) = self.field.viewport();
                let center = Vec2::new(w / 2.0, h / 2.0);
                let spread = Vec2::new(BURST_SPREAD.0, BURST_SPREAD.1);
                for j in 0..BURST_IMPACTS {
                    let point = center + (j as f32 - 1.5) * spread;
                    self.timers
                        .schedule(now + j as f64 * BURST_STAGGER_MS, Task::BurstImpact { point });
                }
                log::debug!("Impact burst fired after {} attempt(s)", attempt);
                self.events.push(EngineEvent::BurstFired { attempts: attempt });
            }
            Ok(Attempt::Retry {
                next_attempt,
                delay_ms,
            }) => {
                self.timers.schedule(
                    now + delay_ms,
                    Task::BurstAttempt {
                        attempt: next_attempt,
                    },
                );
            }
            Err(e) => {
                log::warn!("Impact burst abandoned: {}", e);
                self.events.push(EngineEvent::BurstAbandoned { attempts: attempt });
            }
        }
    }

    fn run_task(&mut self, task: Task, now: f64) {
        match task {
            Task::SettlePoll { generation } => {
                match self.settle.poll(generation, self.pager.current_offset(), now) {
                    SettlePoll::Pending => {
                        let due = now + self.settle.timing().poll_ms;
                        self.timers.schedule(due, Task::SettlePoll { generation });
                    }
                    SettlePoll::Settled { converged } => {
                        if let Some(watch) = self.settle.active() {
                            let section = watch.section;
                            if converged {
                                log::debug!("Section {} settled", section);
                            } else {
                                log::info!("Section {} settle timed out, forcing focus", section);
                            }
                            self.events.push(EngineEvent::Settled { section, converged });
                        }
                        let due = now + self.settle.timing().confirm_delay_ms;
                        self.timers.schedule(due, Task::SettleConfirm { generation });
                    }
                    SettlePoll::Superseded => {}
                }
            }
            Task::SettleConfirm { generation } => {
                if let Some(section) = self.settle.confirm(generation) {
                    if self.pager.confirm_focus(section) {
                        self.events.push(EngineEvent::FocusChanged { section });
                    }
                    self.events.push(EngineEvent::FocusFirstControl { section });
                }
            }
            Task::BurstAttempt { attempt } => self.try_burst(attempt, now),
            Task::BurstImpact { point } => {
                if let Err(e) = self.impact_at(point) {
                    log::warn!("Burst impact dropped: {}", e);
                }
            }
        }
    }

    /// Start the confetti burst
    pub fn celebrate(&mut self) {
        if !self.settings.effective_celebration() || self.torn_down {
            return;
        }
        let (w, h) = self.field.viewport();
        self.confetti.trigger(w, h);
    }

    /// Advance one display frame
    pub fn tick(&mut self, now: f64) -> FrameOutput {
        if self.torn_down {
            return FrameOutput::default();
        }

        for task in self.timers.drain_due(now) {
            self.run_task(task, now);
        }

        self.pager.sync_lock(now);
        self.pager.ease();

        let accepted = match self.frames.poll(now) {
            FrameDecision::Accept { dt } => {
                let clock = FieldClock {
                    time: (now / 1000.0) as f32,
                    elapsed: ((now - self.started_at) / 1000.0) as f32,
                    dt,
                };
                self.field.step(&clock);
                true
            }
            FrameDecision::Skip => false,
            FrameDecision::Stopped => return FrameOutput::default(),
        };

        // Confetti runs at display rate, independent of the tile cap
        let confetti_live = self.confetti.is_active() && self.confetti.step();
        let redraw = accepted || confetti_live || self.confetti_drawn;
        self.confetti_drawn = confetti_live;

        let draw = (redraw && self.is_ready()).then(|| build_frame(&self.field, &self.confetti));

        FrameOutput {
            accepted,
            running: true,
            draw,
        }
    }

    /// Stop everything. Later ticks return an idle, non-running output.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.frames.stop();
        self.timers.clear();
        self.settle.cancel();
        self.confetti.clear();
        self.surface_attached = false;
        self.torn_down = true;
        log::info!("Engine torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: f64 = 16.0;

    fn engine(sections: usize) -> Engine {
        let mut engine = Engine::new(Settings::default(), 7, 1280.0, 800.0, sections, 0.0);
        engine.attach_surface();
        engine
    }

    /// Tick at display rate from `from` until `until`, collecting events
    fn run(engine: &mut Engine, from: f64, until: f64) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let mut now = from;
        while now <= until {
            engine.tick(now);
            events.extend(engine.drain_events());
            now += FRAME_MS;
        }
        events
    }

    #[test]
    fn test_request_page_focuses_then_confirms() {
        let mut engine = engine(3);
        let target = engine.request_page(2, false, 0.0);
        assert_eq!(target.offset, 1600.0);
        assert_eq!(engine.focused_section(), 2);
        assert_eq!(engine.drain_events(), vec![EngineEvent::FocusChanged { section: 2 }]);

        let events = run(&mut engine, FRAME_MS, 2000.0);
        assert!(events.contains(&EngineEvent::Settled {
            section: 2,
            converged: true
        }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, EngineEvent::FocusFirstControl { .. }))
                .collect::<Vec<_>>(),
            vec![&EngineEvent::FocusFirstControl { section: 2 }]
        );
        // Confirmation re-asserts the same focus without a change event
        assert!(!events.contains(&EngineEvent::FocusChanged { section: 2 }));
        assert_eq!(engine.focused_section(), 2);
        assert_eq!(engine.current_section(), 2);
        assert_eq!(engine.pending_timers(), 0);
    }

    #[test]
    fn test_newer_request_supersedes_settle() {
        let mut engine = engine(4);
        engine.request_page(2, false, 0.0);
        engine.tick(FRAME_MS);
        engine.request_page(1, false, 2.0 * FRAME_MS);

        let events = run(&mut engine, 3.0 * FRAME_MS, 2500.0);
        let confirmed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::FocusFirstControl { section } => Some(*section),
                _ => None,
            })
            .collect();
        assert_eq!(confirmed, vec![1]);
        assert_eq!(engine.focused_section(), 1);
    }

    #[test]
    fn test_unreachable_target_times_out() {
        let mut engine = engine(3);
        engine.request_page(1, false, 0.0);
        engine.drain_events();
        // First tick lands after the timeout, before any easing has run
        let events = run(&mut engine, 1500.0, 1500.0);
        assert_eq!(
            events,
            vec![EngineEvent::Settled {
                section: 1,
                converged: false
            }]
        );
        let events = run(&mut engine, 1500.0 + FRAME_MS, 1700.0);
        assert_eq!(events, vec![EngineEvent::FocusFirstControl { section: 1 }]);
    }

    #[test]
    fn test_wheel_debounce_pages_once() {
        let mut engine = engine(5);
        assert!(engine.wheel(120.0, 0.0).is_some());
        assert!(engine.wheel(120.0, 100.0).is_none());
        assert_eq!(engine.pager().target_index(), 1);
        assert_eq!(engine.focused_section(), 1);
    }

    #[test]
    fn test_control_impacts_are_ignored() {
        let mut engine = engine(1);
        let center = engine.field().tiles()[20].center();
        let outcome = engine.impact(center.x, center.y, ImpactSource::Control).unwrap();
        assert_eq!(outcome, ImpactOutcome::default());
        assert!(engine.field().tiles().iter().all(|t| t.pop == 0.0 && !t.falling));
    }

    #[test]
    fn test_impact_before_ready_is_an_error() {
        let mut engine = Engine::new(Settings::default(), 7, 1280.0, 800.0, 1, 0.0);
        let result = engine.impact(100.0, 100.0, ImpactSource::Field);
        assert!(matches!(result, Err(FieldError::SurfaceNotReady)));
    }

    #[test]
    fn test_far_impact_only_pops() {
        let mut engine = engine(1);
        let (_, h) = engine.field().viewport();
        let layout = engine.field().layout();
        let bottom = layout.rows as f32 * layout.tile_size.y;
        let threshold = engine.field().detach_threshold();
        let y = bottom + threshold - layout.tile_size.y / 2.0 + 1.0;
        assert!(y > h);

        let outcome = engine.impact(640.0, y, ImpactSource::Field).unwrap();
        assert_eq!(outcome.detached, None);
        assert!(outcome.popped > 0);
    }

    #[test]
    fn test_burst_retries_then_abandons() {
        let mut engine = Engine::new(Settings::default(), 7, 1280.0, 800.0, 3, 0.0);
        engine.request_page(1, true, 0.0);
        let events = run(&mut engine, FRAME_MS, 2500.0);

        assert!(events.contains(&EngineEvent::BurstAbandoned {
            attempts: BURST_RETRY_ATTEMPTS
        }));
        assert!(!events.iter().any(|e| matches!(e, EngineEvent::BurstFired { .. })));
        assert!(engine.field().tiles().iter().all(|t| !t.falling));
    }

    #[test]
    fn test_burst_fires_once_surface_attaches() {
        let mut engine = Engine::new(Settings::default(), 7, 1280.0, 800.0, 3, 0.0);
        engine.request_page(1, true, 0.0);
        let mut events = run(&mut engine, FRAME_MS, 300.0);
        engine.attach_surface();
        events.extend(run(&mut engine, 300.0 + FRAME_MS, 700.0));

        let fired = events.iter().find_map(|e| match e {
            EngineEvent::BurstFired { attempts } => Some(*attempts),
            _ => None,
        });
        assert!(fired.is_some_and(|n| n > 1 && n <= BURST_RETRY_ATTEMPTS));
        assert!(engine.field().tiles().iter().any(|t| t.falling));
    }

    #[test]
    fn test_burst_skipped_with_reduced_motion() {
        let settings = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        let mut engine = Engine::new(settings, 7, 1280.0, 800.0, 3, 0.0);
        engine.attach_surface();
        engine.request_page(1, true, 0.0);
        let events = run(&mut engine, FRAME_MS, 600.0);
        assert!(!events.iter().any(|e| matches!(e, EngineEvent::BurstFired { .. })));
    }

    #[test]
    fn test_tick_respects_frame_cap() {
        let mut engine = engine(1);
        assert!(!engine.tick(10.0).accepted);
        let out = engine.tick(25.0);
        assert!(out.accepted);
        assert!(out.draw.is_some());
        let out = engine.tick(40.0);
        assert!(!out.accepted);
        assert!(out.draw.is_none());
    }

    #[test]
    fn test_confetti_redraws_between_capped_frames() {
        let mut engine = engine(1);
        engine.tick(25.0);
        engine.celebrate();
        let out = engine.tick(30.0);
        assert!(!out.accepted);
        assert!(out.draw.is_some());

        // Runs out after its longest life, then one last clearing frame
        let mut now = 30.0;
        let mut last_confetti_frame = 0.0;
        while now < 5000.0 {
            now += 5.0;
            let out = engine.tick(now);
            if !out.accepted && out.draw.is_some() {
                last_confetti_frame = now;
            }
        }
        assert!(last_confetti_frame > 30.0);
        assert!(last_confetti_frame < 5000.0);
    }

    #[test]
    fn test_detached_surface_draws_nothing() {
        let mut engine = engine(1);
        engine.detach_surface();
        let out = engine.tick(100.0);
        assert!(out.accepted);
        assert!(out.draw.is_none());
        assert!(out.running);
    }

    #[test]
    fn test_resize_keeps_page() {
        let mut engine = engine(3);
        engine.request_page(2, false, 0.0);
        engine.resize(800.0, 600.0, 10.0);
        assert_eq!(engine.pager().target_offset(), 1200.0);
        assert_eq!(engine.field().viewport(), (800.0, 600.0));
        assert_eq!(engine.focused_section(), 2);
    }

    #[test]
    fn test_set_quality_rebuilds_with_preset() {
        let mut engine = engine(3);
        // Large enough that the default budget binds
        engine.resize(2560.0, 1440.0, 0.0);
        let before = engine.field().tiles().len();
        engine.set_quality(QualityPreset::Low, 100.0);

        assert_eq!(engine.settings().quality, QualityPreset::Low);
        assert!(engine.field().tiles().len() <= QualityPreset::Low.tile_budget());
        assert!(engine.field().tiles().len() < before);
        assert_eq!(engine.frames.interval_ms(), 1000.0 / 24.0);
        assert!(engine.is_running());
    }

    #[test]
    fn test_resize_mid_transition_still_converges() {
        let mut engine = engine(3);
        engine.request_page(2, false, 0.0);
        engine.resize(1280.0, 600.0, 10.0);

        let events = run(&mut engine, FRAME_MS, 2500.0);
        assert!(events.contains(&EngineEvent::Settled {
            section: 2,
            converged: true
        }));
        assert!(!events.contains(&EngineEvent::Settled {
            section: 2,
            converged: false
        }));
        assert!(events.contains(&EngineEvent::FocusFirstControl { section: 2 }));
        assert!((engine.pager().current_offset() - 1200.0).abs() < SETTLE_TOLERANCE);
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut engine = engine(3);
        engine.request_page(1, true, 0.0);
        engine.celebrate();
        engine.teardown();

        let out = engine.tick(100.0);
        assert!(!out.running);
        assert!(out.draw.is_none());
        assert_eq!(engine.pending_timers(), 0);
        assert!(engine.impact(10.0, 10.0, ImpactSource::Field).is_err());
    }
}
