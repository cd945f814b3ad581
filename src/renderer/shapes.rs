//! Shape generation for 2D primitives
//!
//! Everything is emitted as a triangle list in pixel space.

use glam::Vec2;
use std::f32::consts::FRAC_PI_2;

use super::commands::{DrawCommand, DrawList};
use super::vertex::Vertex;

/// Segments per rounded corner
const CORNER_SEGMENTS: u32 = 4;

#[inline]
fn rotate_about(p: Vec2, pivot: Vec2, rotation: f32) -> Vec2 {
    if rotation == 0.0 {
        return p;
    }
    pivot + Vec2::from_angle(rotation).rotate(p - pivot)
}

#[inline]
fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Two triangles covering an axis-aligned rectangle, then rotated
pub fn rect(origin: Vec2, size: Vec2, color: [f32; 4], rotation: f32, pivot: Vec2) -> Vec<Vertex> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return Vec::new();
    }
    let corners = [
        origin,
        origin + Vec2::new(size.x, 0.0),
        origin + size,
        origin + Vec2::new(0.0, size.y),
    ]
    .map(|p| Vertex::at(rotate_about(p, pivot, rotation), color));

    vec![corners[0], corners[1], corners[2], corners[0], corners[2], corners[3]]
}

/// Outline of a rounded rectangle, clockwise from the top-left arc
fn round_rect_outline(origin: Vec2, size: Vec2, radius: f32) -> Vec<Vec2> {
    let r = radius.min(size.x / 2.0).min(size.y / 2.0).max(0.0);
    // Arc centers with their start angles (y down, so angles run clockwise on screen)
    let arcs = [
        (origin + Vec2::new(r, r), 2.0 * FRAC_PI_2),
        (origin + Vec2::new(size.x - r, r), 3.0 * FRAC_PI_2),
        (origin + Vec2::new(size.x - r, size.y - r), 0.0),
        (origin + Vec2::new(r, size.y - r), FRAC_PI_2),
    ];

    let mut outline = Vec::with_capacity(arcs.len() * (CORNER_SEGMENTS as usize + 1));
    for (center, start) in arcs {
        for i in 0..=CORNER_SEGMENTS {
            let theta = start + FRAC_PI_2 * i as f32 / CORNER_SEGMENTS as f32;
            outline.push(center + Vec2::new(theta.cos(), theta.sin()) * r);
        }
    }
    outline
}

/// Filled rounded rectangle with a linear gradient from the top-left
/// corner (`from`) to the bottom-right corner (`to`)
pub fn round_rect(
    origin: Vec2,
    size: Vec2,
    radius: f32,
    from: [f32; 4],
    to: [f32; 4],
    rotation: f32,
    pivot: Vec2,
) -> Vec<Vertex> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return Vec::new();
    }

    let diag_sq = size.length_squared();
    let shade = |p: Vec2| {
        let t = ((p - origin).dot(size) / diag_sq).clamp(0.0, 1.0);
        Vertex::at(rotate_about(p, pivot, rotation), lerp_color(from, to, t))
    };

    let outline = round_rect_outline(origin, size, radius);
    let center = shade(origin + size / 2.0);

    let mut vertices = Vec::with_capacity(outline.len() * 3);
    for (i, &p1) in outline.iter().enumerate() {
        let p2 = outline[(i + 1) % outline.len()];
        vertices.push(center);
        vertices.push(shade(p1));
        vertices.push(shade(p2));
    }
    vertices
}

/// Triangles for a full frame, plus the clear color if the list starts with one
#[derive(Debug, Clone, Default)]
pub struct Tessellation {
    pub clear: Option<[f32; 4]>,
    pub vertices: Vec<Vertex>,
}

pub fn tessellate(list: &DrawList) -> Tessellation {
    let mut out = Tessellation::default();
    let screen = Vec2::new(list.width, list.height);

    for command in &list.commands {
        match *command {
            DrawCommand::Clear { color } => {
                // A clear wipes anything emitted before it
                out.clear = Some(color);
                out.vertices.clear();
            }
            DrawCommand::Fill { color } => {
                out.vertices.extend(rect(Vec2::ZERO, screen, color, 0.0, Vec2::ZERO));
            }
            DrawCommand::RoundRect {
                origin,
                size,
                radius,
                from,
                to,
                rotation,
                pivot,
            } => {
                out.vertices
                    .extend(round_rect(origin, size, radius, from, to, rotation, pivot));
            }
            DrawCommand::Rect {
                origin,
                size,
                color,
                rotation,
                pivot,
            } => {
                out.vertices.extend(rect(origin, size, color, rotation, pivot));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

    fn bounds(vertices: &[Vertex]) -> (Vec2, Vec2) {
        vertices.iter().fold(
            (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
            |(lo, hi), v| {
                let p = Vec2::from(v.position);
                (lo.min(p), hi.max(p))
            },
        )
    }

    #[test]
    fn test_rect_covers_bounds() {
        let vertices = rect(Vec2::new(10.0, 20.0), Vec2::new(30.0, 40.0), RED, 0.0, Vec2::ZERO);
        assert_eq!(vertices.len(), 6);
        let (lo, hi) = bounds(&vertices);
        assert_eq!(lo, Vec2::new(10.0, 20.0));
        assert_eq!(hi, Vec2::new(40.0, 60.0));
    }

    #[test]
    fn test_round_rect_stays_inside_bounds() {
        let origin = Vec2::new(3.0, 3.0);
        let size = Vec2::new(90.0, 38.0);
        let vertices = round_rect(origin, size, 6.0, RED, BLUE, 0.0, origin + size / 2.0);
        assert_eq!(vertices.len() % 3, 0);
        let (lo, hi) = bounds(&vertices);
        assert!(lo.x >= origin.x - 1e-3 && lo.y >= origin.y - 1e-3);
        assert!(hi.x <= origin.x + size.x + 1e-3 && hi.y <= origin.y + size.y + 1e-3);
    }

    #[test]
    fn test_round_rect_gradient_runs_along_diagonal() {
        let origin = Vec2::ZERO;
        let size = Vec2::new(100.0, 50.0);
        let vertices = round_rect(origin, size, 0.0, RED, BLUE, 0.0, size / 2.0);
        // Fan center sits halfway along the gradient
        let center = vertices[0];
        assert_eq!(center.position, [50.0, 25.0]);
        assert!((center.color[0] - 0.5).abs() < 1e-5);
        assert!((center.color[2] - 0.5).abs() < 1e-5);

        let top_left = vertices.iter().find(|v| v.position == [0.0, 0.0]).unwrap();
        assert_eq!(top_left.color, RED);
    }

    #[test]
    fn test_rotation_about_pivot() {
        let pivot = Vec2::new(50.0, 50.0);
        let vertices = rect(Vec2::new(40.0, 40.0), Vec2::new(20.0, 20.0), RED, FRAC_PI_2, pivot);
        let (lo, hi) = bounds(&vertices);
        // A square rotated a quarter turn about its center keeps its bounds
        assert!((lo - Vec2::new(40.0, 40.0)).abs().max_element() < 1e-4);
        assert!((hi - Vec2::new(60.0, 60.0)).abs().max_element() < 1e-4);
    }

    #[test]
    fn test_tessellate_clear_and_fill() {
        let mut list = DrawList::new(200.0, 100.0);
        list.push(DrawCommand::Clear { color: BLUE });
        list.push(DrawCommand::Fill { color: RED });
        let out = tessellate(&list);
        assert_eq!(out.clear, Some(BLUE));
        assert_eq!(out.vertices.len(), 6);
        let (lo, hi) = bounds(&out.vertices);
        assert_eq!(lo, Vec2::ZERO);
        assert_eq!(hi, Vec2::new(200.0, 100.0));
    }

    #[test]
    fn test_degenerate_shapes_emit_nothing() {
        assert!(rect(Vec2::ZERO, Vec2::new(0.0, 5.0), RED, 0.0, Vec2::ZERO).is_empty());
        assert!(round_rect(Vec2::ZERO, Vec2::new(5.0, -1.0), 2.0, RED, BLUE, 0.0, Vec2::ZERO).is_empty());
    }
}
