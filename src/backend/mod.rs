//! Rendering backends.
//!
//! A backend receives clip-space draw commands and owns a color + depth target. Both backends
//! store premultiplied color internally and hand back straight-alpha RGBA8 from
//! [`RenderBackend::read_pixels`]. Fragment colors arrive with straight alpha; the blend
//! equations below are the ones the GPU blend states encode.

use crate::batch::DrawCommand;
use crate::error::Result;
use crate::style::BlendMode;

pub mod software;
pub mod gpu;

pub use self::software::SoftwareBackend;
pub use self::gpu::WgpuBackend;

/// What a backend can do beyond the common drawing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub max_texture_size: u32,
    pub custom_shaders: bool,
    pub max_samples: u32,
}

pub trait RenderBackend {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    fn size(&self) -> (u32, u32);

    /// Reallocates the target. Contents are undefined until the next clear.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    fn begin_frame(&mut self) -> Result<()>;

    /// Draws the commands in order. Every command is attempted; the first resource error is
    /// returned after the rest were drawn.
    fn submit(&mut self, commands: Vec<DrawCommand>) -> Result<()>;

    fn end_frame(&mut self) -> Result<()>;

    /// Straight-alpha RGBA8 rows, top row first.
    fn read_pixels(&mut self) -> Result<Vec<u8>>;

    /// A new, independent target of the same kind. GPU backends share their device.
    fn create_offscreen(&self, width: u32, height: u32) -> Result<Box<dyn RenderBackend>>;
}

/// Blends a straight-alpha source over a premultiplied destination.
pub(crate) fn blend(mode: BlendMode, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let a = src[3];
    let out = match mode {
        BlendMode::Blend => [
            src[0] * a + dst[0] * (1.0 - a),
            src[1] * a + dst[1] * (1.0 - a),
            src[2] * a + dst[2] * (1.0 - a),
            a + dst[3] * (1.0 - a),
        ],
        BlendMode::Add => [
            src[0] * a + dst[0],
            src[1] * a + dst[1],
            src[2] * a + dst[2],
            a + dst[3],
        ],
        BlendMode::Subtract => [
            dst[0] - src[0] * a,
            dst[1] - src[1] * a,
            dst[2] - src[2] * a,
            dst[3],
        ],
        BlendMode::Multiply => [
            src[0] * dst[0] + dst[0] * (1.0 - a),
            src[1] * dst[1] + dst[1] * (1.0 - a),
            src[2] * dst[2] + dst[2] * (1.0 - a),
            a + dst[3] * (1.0 - a),
        ],
        BlendMode::Replace => [src[0] * a, src[1] * a, src[2] * a, a],
    };
    out.map(|c| c.clamp(0.0, 1.0))
}

/// Converts premultiplied RGBA8 to straight alpha in place.
pub(crate) fn unpremultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = px[3];
        if a == 0 {
            px[..3].fill(0);
        } else if a < 255 {
            for c in &mut px[..3] {
                *c = ((*c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const HALF_BLUE: [f32; 4] = [0.0, 0.0, 1.0, 0.5];

    #[test]
    fn blend_over_opaque_destination() {
        let out = blend(BlendMode::Blend, HALF_BLUE, RED);
        assert_eq!(out, [0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn add_and_subtract_saturate() {
        let white = [1.0; 4];
        assert_eq!(blend(BlendMode::Add, RED, white), [1.0; 4]);
        assert_eq!(blend(BlendMode::Subtract, white, RED), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn multiply_with_opaque_source() {
        let gray = [0.5, 0.5, 0.5, 1.0];
        assert_eq!(blend(BlendMode::Multiply, gray, RED), [0.5, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn replace_ignores_the_destination() {
        assert_eq!(blend(BlendMode::Replace, HALF_BLUE, RED), [0.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn unpremultiply_restores_straight_alpha() {
        let mut px = [64, 0, 0, 128, 10, 20, 30, 0, 1, 2, 3, 255];
        unpremultiply(&mut px);
        assert_eq!(px, [128, 0, 0, 128, 0, 0, 0, 0, 1, 2, 3, 255]);
    }
}
