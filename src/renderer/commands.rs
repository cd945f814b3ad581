//! Backend-agnostic draw commands
//!
//! A frame is described as a flat list of commands in pixel coordinates
//! (origin top-left, y down). Surfaces consume the list however they like.

use glam::Vec2;

use crate::palette;
use crate::rgba;
use crate::sim::{Burst, TileField, TilePose};

/// Inset on each side of a tile
pub const TILE_INSET: f32 = 6.0;
pub const TILE_RADIUS: f32 = 6.0;
/// Darkening applied to the first (top-left) gradient stop
pub const GRADIENT_DARKEN: f32 = 16.0;
/// Minimum influence before the highlight band shows
pub const HIGHLIGHT_MIN_INFLUENCE: f32 = 0.06;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Replace every pixel
    Clear { color: [f32; 4] },
    /// Blend a color over the whole surface
    Fill { color: [f32; 4] },
    /// Rounded rectangle with a linear gradient along its diagonal
    RoundRect {
        origin: Vec2,
        size: Vec2,
        radius: f32,
        from: [f32; 4],
        to: [f32; 4],
        rotation: f32,
        pivot: Vec2,
    },
    Rect {
        origin: Vec2,
        size: Vec2,
        color: [f32; 4],
        rotation: f32,
        pivot: Vec2,
    },
}

/// Draw commands for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub width: f32,
    pub height: f32,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn round_rects(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::RoundRect { .. }))
    }
}

pub fn background() -> [f32; 4] {
    let [r, g, b] = palette::BACKGROUND;
    rgba([r as f32, g as f32, b as f32], 1.0)
}

fn tile_commands(list: &mut DrawList, pose: &TilePose) {
    let origin = pose.pos + Vec2::splat(TILE_INSET);
    let size = (pose.size - Vec2::splat(2.0 * TILE_INSET)).max(Vec2::ZERO);
    let pivot = origin + size / 2.0;

    let [r, g, b] = pose.color;
    let dark = [
        (r - GRADIENT_DARKEN).max(0.0),
        (g - GRADIENT_DARKEN).max(0.0),
        (b - GRADIENT_DARKEN).max(0.0),
    ];
    list.push(DrawCommand::RoundRect {
        origin,
        size,
        radius: TILE_RADIUS,
        // Dark at the top-left, base color at the bottom-right
        from: rgba(dark, pose.alpha),
        to: rgba(pose.color, pose.alpha),
        rotation: pose.rotation,
        pivot,
    });

    if pose.influence > HIGHLIGHT_MIN_INFLUENCE && !pose.falling {
        let band_h = (pose.influence * 3.0).clamp(2.0, 5.0);
        let alpha = 0.02 * pose.influence + 0.02 * pose.pop;
        list.push(DrawCommand::Rect {
            origin: pose.pos + Vec2::new(12.0, 10.0),
            size: Vec2::new((pose.size.x - 24.0).max(0.0), band_h),
            color: [1.0, 1.0, 1.0, alpha],
            rotation: 0.0,
            pivot,
        });
    }
}

/// Build a complete frame from the latest tile poses and any live confetti
pub fn build_frame(field: &TileField, burst: &Burst) -> DrawList {
    let (width, height) = field.viewport();
    let mut list = DrawList::new(width, height);

    list.push(DrawCommand::Clear { color: background() });
    list.push(DrawCommand::Fill {
        color: palette::OVERLAY,
    });

    for pose in field.poses() {
        tile_commands(&mut list, pose);
    }

    for piece in burst.live_pieces() {
        let size = Vec2::new(piece.size, piece.size * 0.6);
        let [r, g, b] = piece.color;
        list.push(DrawCommand::Rect {
            origin: piece.pos - size / 2.0,
            size,
            color: rgba([r as f32, g as f32, b as f32], 1.0),
            rotation: 0.0,
            pivot: piece.pos,
        });
    }

    list
}
