//! One-shot confetti burst

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::palette;

/// A single confetti piece
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstPiece {
    pub pos: Vec2,
    /// Pixels per frame
    pub vel: Vec2,
    pub size: f32,
    pub color: [u8; 3],
    /// Frames left to live
    pub life: f32,
}

impl BurstPiece {
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Celebration effect, stepped once per display frame until every piece dies
#[derive(Debug, Clone)]
pub struct Burst {
    pieces: Vec<BurstPiece>,
    rng: Pcg32,
}

impl Burst {
    pub fn new(seed: u64) -> Self {
        Self {
            pieces: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Spawn a fresh burst, replacing any still running
    pub fn trigger(&mut self, width: f32, height: f32) {
        let rng = &mut self.rng;
        self.pieces = (0..CONFETTI_PIECES)
            .map(|_| {
                let pos = Vec2::new(
                    width / 2.0 + (rng.random::<f32>() - 0.5) * 300.0,
                    height / 3.0 + (rng.random::<f32>() - 0.5) * 80.0,
                );
                let vel = Vec2::new(
                    (rng.random::<f32>() - 0.5) * 12.0,
                    (rng.random::<f32>() - 1.6) * 10.0,
                );
                let size = rng.random::<f32>() * 6.0 + 2.0;
                let color = palette::CONFETTI[rng.random_range(0..palette::CONFETTI.len())];
                let life = 80.0 + rng.random::<f32>() * 80.0;
                BurstPiece {
                    pos,
                    vel,
                    size,
                    color,
                    life,
                }
            })
            .collect();
        log::debug!("Confetti burst with {} pieces", self.pieces.len());
    }

    pub fn is_active(&self) -> bool {
        self.pieces.iter().any(BurstPiece::is_alive)
    }

    /// Advance one frame. Returns true while any piece is still alive.
    pub fn step(&mut self) -> bool {
        let mut alive = false;
        for piece in self.pieces.iter_mut().filter(|p| p.is_alive()) {
            alive = true;
            piece.vel.y += CONFETTI_GRAVITY;
            piece.pos += piece.vel;
            piece.life -= 1.0;
        }
        if !alive {
            self.pieces.clear();
        }
        alive
    }

    /// Pieces that should be drawn this frame
    pub fn live_pieces(&self) -> impl Iterator<Item = &BurstPiece> {
        self.pieces.iter().filter(|p| p.is_alive())
    }

    pub fn clear(&mut self) {
        self.pieces.clear();
    }
}
