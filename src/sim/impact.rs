//! Impact dispatch
//!
//! An impact detaches the single nearest tile (when close enough) and pops
//! every idle tile within a fixed radius.

use glam::Vec2;
use rand::Rng;

use super::falloff::{distance, linear_falloff};
use super::tile::TileField;
use crate::consts::*;

/// What a single impact did to the field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImpactOutcome {
    /// Index of the tile that started falling, if any
    pub detached: Option<usize>,
    /// Number of tiles whose pop was raised
    pub popped: usize,
}

/// Nearest non-removed tile to `point` and its distance.
/// Ties go to the earliest tile in iteration order.
pub fn nearest_tile(field: &TileField, point: Vec2) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, tile) in field.tiles().iter().enumerate() {
        if tile.removed {
            continue;
        }
        let d = distance(tile.center(), point);
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }
    best
}

/// Apply an impact at `point`
pub fn apply_impact(field: &mut TileField, point: Vec2) -> ImpactOutcome {
    let mut outcome = ImpactOutcome::default();

    let threshold = field.detach_threshold();
    if let Some((index, d)) = nearest_tile(field, point)
        && d < threshold
    {
        let speed = DETACH_FALL_SPEED_MIN + field.rng_mut().random::<f32>() * DETACH_FALL_SPEED_SPREAD;
        if field.tiles_mut()[index].detach(speed) {
            outcome.detached = Some(index);
        }
    }

    for i in 0..field.tiles().len() {
        let tile = &field.tiles()[i];
        if !tile.is_idle() {
            continue;
        }
        let d = distance(tile.center(), point);
        if d >= POP_RADIUS {
            continue;
        }
        let norm = linear_falloff(d, POP_RADIUS);
        let jitter = field.rng_mut().random::<f32>() * 3.0;
        field.tiles_mut()[i].apply_pop(norm, jitter);
        outcome.popped += 1;
    }

    outcome
}
