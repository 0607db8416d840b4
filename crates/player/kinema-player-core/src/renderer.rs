//! Rasterizer contract.

use serde::{Deserialize, Serialize};

use crate::animation::Animation;

/// Region of the target surface the frame is painted into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// External 2D backend. Owns its pixel buffer; the player only asks it to paint.
pub trait Rasterizer {
    fn render(
        &mut self,
        animation: &Animation,
        frame: f32,
        viewport: Viewport,
    ) -> std::result::Result<(), String>;

    /// Pixels of the last paint, ARGB.
    fn buffer(&self) -> &[u32];
}

/// Rasterizer that paints nothing. Counts calls; useful for headless hosts and tests.
#[derive(Debug, Default)]
pub struct NullRasterizer {
    buffer: Vec<u32>,
    frames: Vec<f32>,
}

impl NullRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames painted so far, in order.
    pub fn rendered_frames(&self) -> &[f32] {
        &self.frames
    }
}

impl Rasterizer for NullRasterizer {
    fn render(
        &mut self,
        _animation: &Animation,
        frame: f32,
        viewport: Viewport,
    ) -> std::result::Result<(), String> {
        let len = viewport.width as usize * viewport.height as usize;
        if self.buffer.len() != len {
            self.buffer = vec![0; len];
        }
        self.frames.push(frame);
        Ok(())
    }

    fn buffer(&self) -> &[u32] {
        &self.buffer
    }
}
