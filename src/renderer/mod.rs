//! Rendering module
//!
//! The engine produces a [`DrawList`] per frame; a [`RasterSurface`] turns
//! it into pixels. The wgpu surface tessellates to triangles, the recording
//! surface keeps lists around for tests and headless runs.

pub mod commands;
pub mod pipeline;
pub mod shapes;
pub mod vertex;

pub use commands::{DrawCommand, DrawList, build_frame};
pub use pipeline::RenderState;
pub use vertex::Vertex;

use crate::error::FieldError;

/// Something a frame can be drawn onto
pub trait RasterSurface {
    /// Resize the backing store (physical pixels)
    fn resize(&mut self, width: u32, height: u32);

    /// Draw one frame
    fn present(&mut self, list: &DrawList) -> Result<(), FieldError>;
}

/// In-memory surface that keeps the most recent frames
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub size: (u32, u32),
    pub frames: Vec<DrawList>,
    /// Frames kept; older ones are dropped. Zero keeps everything.
    pub keep: usize,
    pub presented: usize,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            keep: 8,
            ..Default::default()
        }
    }

    pub fn last(&self) -> Option<&DrawList> {
        self.frames.last()
    }
}

impl RasterSurface for RecordingSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn present(&mut self, list: &DrawList) -> Result<(), FieldError> {
        self.presented += 1;
        self.frames.push(list.clone());
        if self.keep > 0 && self.frames.len() > self.keep {
            let excess = self.frames.len() - self.keep;
            self.frames.drain(..excess);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_surface_keeps_recent_frames() {
        let mut surface = RecordingSurface::new(100, 100);
        surface.keep = 2;
        for i in 0..5 {
            surface.present(&DrawList::new(i as f32, 1.0)).unwrap();
        }
        assert_eq!(surface.presented, 5);
        assert_eq!(surface.frames.len(), 2);
        assert_eq!(surface.last().map(|l| l.width), Some(4.0));
    }
}
