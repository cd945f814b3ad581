//! Tile field simulation
//!
//! A masonry grid of tiles covering the viewport. Each tile idles with a
//! pointer-driven wobble, lifts when popped by an impact and, once detached,
//! falls under gravity until it leaves the screen.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::falloff::{distance, smoothed_falloff};
use crate::consts::*;
use crate::mix_rgb;
use crate::palette;

/// One brick of the background grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    /// Top-left corner at rest
    pub base: Vec2,
    pub size: Vec2,
    /// Oscillation phase offset (radians)
    pub phase: f32,
    /// Blend ratio between the two palette endpoints
    pub mix: f32,
    pub color: [u8; 3],
    /// Residual rebound from impacts (always >= 0)
    pub lift_velocity: f32,
    /// Transient pop impulse in [0, 1]
    pub pop: f32,
    pub falling: bool,
    pub fall_velocity: f32,
    pub fall_distance: f32,
    pub opacity: f32,
    /// Terminal: excluded from physics and drawing
    pub removed: bool,
}

impl Tile {
    fn new(base: Vec2, size: Vec2, phase: f32, mix: f32) -> Self {
        Self {
            base,
            size,
            phase,
            mix,
            color: mix_rgb(palette::PRIMARY, palette::CYAN, mix),
            lift_velocity: 0.0,
            pop: 0.0,
            falling: false,
            fall_velocity: 0.0,
            fall_distance: 0.0,
            opacity: 1.0,
            removed: false,
        }
    }

    /// Center of the tile at rest
    #[inline]
    pub fn center(&self) -> Vec2 {
        self.base + self.size * 0.5
    }

    /// Eligible for pops (live and still in the field)
    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.removed && !self.falling
    }

    /// Start the one-way fall. Returns false if already falling or removed.
    pub fn detach(&mut self, fall_velocity: f32) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.falling = true;
        self.fall_velocity = fall_velocity;
        self.fall_distance = 0.0;
        true
    }

    /// Apply a pop of normalized strength `norm` (1 at the impact point)
    pub fn apply_pop(&mut self, norm: f32, jitter: f32) {
        if !self.is_idle() {
            return;
        }
        self.pop = self.pop.max(0.45 * norm + 0.02).min(1.0);
        self.lift_velocity += 6.0 * norm + jitter;
    }

    /// Integrate the fall. Returns true once the tile has been removed.
    fn advance_fall(&mut self, dt: f32, viewport_h: f32) -> bool {
        self.fall_velocity += FALL_GRAVITY * dt;
        self.fall_distance += self.fall_velocity * dt;
        let fade = (1.0 - self.fall_distance / (viewport_h * FALL_FADE_SPAN)).max(0.0);
        self.opacity = self.opacity.min(fade);

        if self.fall_distance > viewport_h + FALL_REMOVE_MARGIN {
            self.opacity = 0.0;
            self.removed = true;
        }
        self.removed
    }

    /// Rotation of a falling tile, growing with fall progress
    pub fn fall_rotation(&self, viewport_h: f32) -> f32 {
        if !self.falling || viewport_h <= 0.0 {
            return 0.0;
        }
        self.phase.fract() * (self.fall_distance / (viewport_h / 3.0)) * 0.4
    }
}

/// Grid dimensions for a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cols: usize,
    pub rows: usize,
    pub tile_size: Vec2,
}

impl GridLayout {
    /// Pick tile size and grid dimensions, growing tiles until the
    /// count fits within `budget`
    pub fn for_viewport(width: f32, height: f32, budget: usize) -> Self {
        let (mut w, mut h) = if width < NARROW_VIEWPORT {
            TILE_SIZE_NARROW
        } else {
            TILE_SIZE_WIDE
        };

        if width <= 0.0 || height <= 0.0 {
            return Self {
                cols: 0,
                rows: 0,
                tile_size: Vec2::new(w, h),
            };
        }

        let budget = budget.max(1);
        let dims = |w: f32, h: f32| ((width / w).ceil() as usize, (height / h).ceil() as usize);
        let (mut cols, mut rows) = dims(w, h);

        // Ceiling rounding can leave the count slightly over after one
        // rescale, so keep growing (by at least a pixel) until it fits.
        while cols * rows > budget {
            let scale = ((cols * rows) as f32 / budget as f32).sqrt();
            w = (w * scale).ceil().max(w + 1.0);
            h = (h * scale).ceil().max(h + 1.0);
            (cols, rows) = dims(w, h);
        }

        Self {
            cols,
            rows,
            tile_size: Vec2::new(w, h),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.cols * self.rows
    }
}

/// Timing for a single field step
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldClock {
    /// Host clock in seconds (drives oscillation and color wobble)
    pub time: f32,
    /// Seconds since the engine started (drives the frequency ramp)
    pub elapsed: f32,
    /// Seconds since the previous accepted frame
    pub dt: f32,
}

impl FieldClock {
    /// Oscillation speed-up, ramping from 1.0 to 1.25 over the first minute
    pub fn speed_factor(&self) -> f32 {
        1.0 + (self.elapsed.max(0.0) / VIBRATE_RAMP_SECS).min(1.0) * VIBRATE_RAMP
    }
}

/// Where and how a live tile is drawn this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePose {
    /// Index into `TileField::tiles`
    pub index: usize,
    /// Top-left corner after oscillation, lift, drift and fall
    pub pos: Vec2,
    pub size: Vec2,
    pub influence: f32,
    pub pop: f32,
    pub lift: f32,
    /// Wobbled color, 0-255 per channel
    pub color: [f32; 3],
    pub alpha: f32,
    /// Radians about the tile center
    pub rotation: f32,
    pub falling: bool,
}

/// Shift a channel by a +-5 wave, keeping it in [6, 255]
#[inline]
fn wobble_channel(base: u8, wave: f32) -> f32 {
    (base as f32 + wave * 5.0).round().clamp(6.0, 255.0)
}

/// The simulated grid of tiles
#[derive(Debug, Clone)]
pub struct TileField {
    width: f32,
    height: f32,
    budget: usize,
    layout: GridLayout,
    tiles: Vec<Tile>,
    poses: Vec<TilePose>,
    pointer: Vec2,
    rng: Pcg32,
}

impl TileField {
    /// Build a field for the given viewport
    pub fn new(width: f32, height: f32, budget: usize, seed: u64) -> Self {
        let mut field = Self {
            width,
            height,
            budget: budget.min(MAX_TILES),
            layout: GridLayout::for_viewport(0.0, 0.0, MAX_TILES),
            tiles: Vec::new(),
            poses: Vec::new(),
            pointer: Vec2::new(width / 2.0, height / 2.0),
            rng: Pcg32::seed_from_u64(seed),
        };
        field.rebuild(width, height);
        field
    }

    /// Change the tile budget and rebuild the grid
    pub fn set_budget(&mut self, budget: usize) {
        self.budget = budget.min(MAX_TILES);
        self.rebuild(self.width, self.height);
    }

    /// Discard every tile and lay out a fresh grid
    pub fn rebuild(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.layout = GridLayout::for_viewport(self.width, self.height, self.budget);

        let GridLayout {
            cols,
            rows,
            tile_size,
        } = self.layout;

        let mut tiles = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            let row_offset = if r % 2 == 1 { tile_size.x / 2.0 } else { 0.0 };
            for c in 0..cols {
                let base = Vec2::new(c as f32 * tile_size.x + row_offset, r as f32 * tile_size.y);
                let mix: f32 = self.rng.random();
                let phase = self.rng.random::<f32>() * std::f32::consts::TAU;
                tiles.push(Tile::new(base, tile_size, phase, mix));
            }
        }

        self.tiles = tiles;
        self.poses = Vec::with_capacity(self.tiles.len());

        log::debug!(
            "Tile grid {}x{} ({} tiles of {}x{}) for {}x{} viewport",
            cols,
            rows,
            self.tiles.len(),
            tile_size.x,
            tile_size.y,
            self.width,
            self.height
        );
    }

    pub fn set_pointer(&mut self, pointer: Vec2) {
        self.pointer = pointer;
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn viewport(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub(crate) fn rng_mut(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    /// Poses produced by the most recent `step`
    pub fn poses(&self) -> &[TilePose] {
        &self.poses
    }

    pub fn live_count(&self) -> usize {
        self.tiles.iter().filter(|t| !t.removed).count()
    }

    pub fn falling_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.falling && !t.removed).count()
    }

    /// Distance at which pointer influence reaches zero
    pub fn influence_radius(&self) -> f32 {
        self.width.max(self.height) * INFLUENCE_SPAN
    }

    /// An impact must land closer than this to a tile center to detach it
    pub fn detach_threshold(&self) -> f32 {
        DETACH_MIN_DISTANCE.max(self.width.min(self.height) * DETACH_VIEWPORT_FRACTION)
    }

    /// Advance every live tile by one frame and record its pose
    pub fn step(&mut self, clock: &FieldClock) {
        let dt = clock.dt;
        let max_d = self.influence_radius();
        let freq = VIBRATE_FREQ * clock.speed_factor();
        let time = clock.time;
        let height = self.height;
        let pointer = self.pointer;

        self.poses.clear();

        for (index, tile) in self.tiles.iter_mut().enumerate() {
            if tile.removed {
                continue;
            }
            if tile.falling && tile.advance_fall(dt, height) {
                continue;
            }

            let influence = smoothed_falloff(distance(tile.center(), pointer), max_d, INFLUENCE_EXPONENT);

            // Pointer proximity keeps damping residual rebound
            tile.lift_velocity = (tile.lift_velocity * LIFT_DECAY - LIFT_DAMPING * dt * influence).max(0.0);
            tile.pop = (tile.pop - POP_DECAY).max(0.0);

            let lift = if tile.falling {
                0.0
            } else {
                (LIFT_FROM_INFLUENCE * influence + LIFT_FROM_POP * tile.pop).min(LIFT_CAP)
            };

            let (vibrate_x, vibrate_y) = if tile.falling {
                (0.0, 0.0)
            } else {
                let amp_x = VIBRATE_AMPLITUDE * (0.6 + 0.6 * tile.mix) * influence * 0.45;
                let amp_y = VIBRATE_AMPLITUDE * 0.45 * (0.5 + 0.5 * tile.mix) * influence;
                (
                    (time * freq + tile.phase).sin() * amp_x,
                    (time * freq * 1.1 + tile.phase).cos() * amp_y,
                )
            };

            let fall = if tile.falling { tile.fall_distance } else { 0.0 };
            let pos = tile.base
                + Vec2::new(
                    vibrate_x,
                    vibrate_y - lift + tile.lift_velocity * dt * DRIFT_SCALE + fall,
                );

            let color = [
                wobble_channel(tile.color[0], (time * 0.6 + tile.phase).sin()),
                wobble_channel(tile.color[1], (time * 0.62 + tile.phase).cos()),
                wobble_channel(tile.color[2], (time * 0.64 + tile.phase).sin()),
            ];

            self.poses.push(TilePose {
                index,
                pos,
                size: tile.size,
                influence,
                pop: tile.pop,
                lift,
                color,
                alpha: tile.opacity * (0.98 - (1.0 - influence) * 0.08),
                rotation: tile.fall_rotation(height),
                falling: tile.falling,
            });
        }
    }
}
