//! The render context.
//!
//! A [`Surface`] owns one backend target plus all drawing state: the matrix stack, the style,
//! the camera, lights and the shape being recorded. Every drawing call takes `&mut Surface`;
//! there is no global "current surface".
//!
//! ```
//! use easel::{Color, Surface, SurfaceConfig};
//!
//! let mut surface = Surface::new_software(SurfaceConfig::new(16, 16));
//! surface
//!     .draw(|s| {
//!         s.background(Color::BLACK)?;
//!         s.no_stroke();
//!         s.fill(Color::rgb(255, 0, 0));
//!         s.rect(4.0, 4.0, 8.0, 8.0)
//!     })
//!     .unwrap();
//! assert_eq!(surface.get_pixel(8, 8).unwrap(), Color::rgb(255, 0, 0));
//! assert_eq!(surface.get_pixel(0, 0).unwrap(), Color::BLACK);
//! ```

mod construction;
mod emission;
mod pixels;
mod primitives;
mod recording;
mod scope;
mod state;

use crate::backend::RenderBackend;
use crate::batch::DrawList;
use crate::cache::GeometryCache;
use crate::config::SurfaceConfig;
use crate::error::{RenderError, Result};
use crate::lighting::Lights;
use crate::matrix::MatrixStack;
use crate::projection::ViewState;
use crate::shader::FragmentShader;
use crate::shape::ShapeRecorder;
use crate::style::StyleState;
use crate::tessellation::Tessellator;
use crate::texture::Image;

pub use self::scope::DrawScope;

/// Lifecycle of a surface: `Created -> Drawing -> Idle -> Drawing ... -> Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceState {
    Created,
    Drawing,
    Idle,
    Destroyed,
}

pub struct Surface {
    config: SurfaceConfig,
    backend: Box<dyn RenderBackend>,
    state: SurfaceState,

    matrices: MatrixStack,
    styles: StyleState,
    view: ViewState,
    /// Set until the default camera has been applied for the current size.
    view_stale: bool,
    lights: Lights,
    shader: Option<FragmentShader>,

    recorder: ShapeRecorder,
    tessellator: Tessellator,
    geometry_cache: GeometryCache,
    draw_list: DrawList,

    /// Handle given out by `as_image`, rewritten at every `end_draw`.
    snapshot: Option<Image>,
    /// Last readback of the target. Dropped whenever the target can change.
    readback: Option<Vec<u8>>,
    frame_count: u64,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("backend", &self.backend.name())
            .field("size", &self.size())
            .field("state", &self.state)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

impl Surface {
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Number of completed `begin_draw`/`end_draw` pairs.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Starts a frame. Valid from `Created` and `Idle`.
    pub fn begin_draw(&mut self) -> Result<()> {
        match self.state {
            SurfaceState::Created | SurfaceState::Idle => {}
            actual => {
                return Err(RenderError::SurfaceState {
                    operation: "begin_draw",
                    expected: SurfaceState::Idle,
                    actual,
                })
            }
        }
        self.readback = None;
        self.backend.begin_frame()?;

        self.matrices.clear();
        self.lights.clear();
        self.recorder.discard();
        self.draw_list.clear();
        if self.view_stale {
            let (width, height) = self.size();
            self.view = ViewState::new(width, height, self.config.is_3d());
            self.view_stale = false;
        }
        self.state = SurfaceState::Drawing;
        Ok(())
    }

    /// Finishes the frame: pending geometry is drawn, the backend presents and the surface
    /// becomes `Idle`. The transition happens even when drawing fails; the first error is
    /// returned afterwards.
    pub fn end_draw(&mut self) -> Result<()> {
        self.require_drawing("end_draw")?;

        if self.recorder.discard() {
            tracing::warn!("end_draw with an open shape, the shape was discarded");
        }
        let leaked = self.matrices.clear();
        if leaked > 0 {
            tracing::warn!("{} push_matrix calls without a matching pop_matrix", leaked);
        }

        let flushed = self.submit_pending();
        self.readback = None;
        let presented = self.backend.end_frame();
        let snapshot = self.refresh_snapshot();

        self.state = SurfaceState::Idle;
        self.frame_count += 1;
        flushed.and(presented).and(snapshot)
    }

    /// Runs `f` between `begin_draw` and `end_draw`. `end_draw` runs on every exit path; an
    /// error from `f` takes precedence over one from `end_draw`.
    pub fn draw<R>(&mut self, f: impl FnOnce(&mut Surface) -> Result<R>) -> Result<R> {
        let mut scope = self.begin_scope()?;
        let result = f(&mut *scope);
        let ended = scope.finish();
        let value = result?;
        ended?;
        Ok(value)
    }

    /// `begin_draw` returning a guard that calls `end_draw` when dropped.
    pub fn begin_scope(&mut self) -> Result<DrawScope<'_>> {
        self.begin_draw()?;
        Ok(DrawScope::new(self))
    }

    /// Releases the surface. Any frame in progress is abandoned without drawing.
    pub fn dispose(&mut self) -> Result<()> {
        if self.state == SurfaceState::Destroyed {
            return Err(RenderError::SurfaceState {
                operation: "dispose",
                expected: SurfaceState::Idle,
                actual: SurfaceState::Destroyed,
            });
        }
        if self.recorder.discard() {
            tracing::debug!("dispose discarded an open shape");
        }
        self.draw_list.clear();
        self.matrices.clear();
        self.snapshot = None;
        self.readback = None;
        self.state = SurfaceState::Destroyed;
        Ok(())
    }

    /// Dispatches the geometry recorded so far without ending the frame.
    pub fn flush(&mut self) -> Result<()> {
        self.require_drawing("flush")?;
        self.submit_pending()
    }

    fn submit_pending(&mut self) -> Result<()> {
        if self.draw_list.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            "flushing {} commands, {} vertices to the {} backend",
            self.draw_list.len(),
            self.draw_list.vertex_count(),
            self.backend.name()
        );
        let commands = self.draw_list.take();
        self.readback = None;
        self.backend.submit(commands)
    }

    fn require_drawing(&self, operation: &'static str) -> Result<()> {
        if self.state == SurfaceState::Drawing {
            return Ok(());
        }
        Err(RenderError::SurfaceState {
            operation,
            expected: SurfaceState::Drawing,
            actual: self.state,
        })
    }

    fn require_alive(&self, operation: &'static str) -> Result<()> {
        if self.state != SurfaceState::Destroyed {
            return Ok(());
        }
        Err(RenderError::SurfaceState {
            operation,
            expected: SurfaceState::Idle,
            actual: SurfaceState::Destroyed,
        })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        if self.state == SurfaceState::Drawing {
            tracing::warn!("surface dropped in the middle of a frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::shape::{EndShape, ShapeMode};

    fn surface() -> Surface {
        Surface::new_software(SurfaceConfig::new(8, 8))
    }

    #[test]
    fn lifecycle_transitions() {
        let mut s = surface();
        assert_eq!(s.state(), SurfaceState::Created);
        assert!(matches!(
            s.end_draw(),
            Err(RenderError::SurfaceState {
                actual: SurfaceState::Created,
                ..
            })
        ));
        s.begin_draw().unwrap();
        assert_eq!(s.state(), SurfaceState::Drawing);
        assert!(s.begin_draw().is_err());
        s.end_draw().unwrap();
        assert_eq!(s.state(), SurfaceState::Idle);
        assert_eq!(s.frame_count(), 1);

        s.dispose().unwrap();
        assert_eq!(s.state(), SurfaceState::Destroyed);
        assert!(s.begin_draw().is_err());
        assert!(s.dispose().is_err());
    }

    #[test]
    fn drawing_outside_a_frame_is_rejected() {
        let mut s = surface();
        assert!(matches!(
            s.rect(0.0, 0.0, 4.0, 4.0),
            Err(RenderError::SurfaceState {
                operation: "rect",
                ..
            })
        ));
        assert!(s.background(Color::WHITE).is_err());
        assert!(s.begin_shape(ShapeMode::Polygon).is_err());
    }

    #[test]
    fn end_draw_discards_open_shapes_and_leaked_pushes() {
        let mut s = surface();
        s.begin_draw().unwrap();
        s.push_matrix().unwrap();
        s.translate(3.0, 0.0);
        s.begin_shape(ShapeMode::Triangles).unwrap();
        s.vertex(0.0, 0.0).unwrap();
        s.end_draw().unwrap();

        s.begin_draw().unwrap();
        assert_eq!(s.matrix_depth(), 0);
        assert_eq!(*s.current_matrix(), crate::matrix::Matrix::identity());
        // the recorder is free again
        s.begin_shape(ShapeMode::Points).unwrap();
        s.vertex(1.0, 1.0).unwrap();
        s.end_shape(EndShape::Open).unwrap();
        s.end_draw().unwrap();
    }

    #[test]
    fn draw_ends_the_frame_on_error() {
        let mut s = surface();
        let result = s.draw(|s| s.pop_matrix());
        assert!(matches!(result, Err(RenderError::UnbalancedStack)));
        assert_eq!(s.state(), SurfaceState::Idle);
    }

    #[test]
    fn scope_guard_ends_the_frame_when_dropped() {
        let mut s = surface();
        {
            let mut scope = s.begin_scope().unwrap();
            scope.background(Color::WHITE).unwrap();
        }
        assert_eq!(s.state(), SurfaceState::Idle);
        assert_eq!(s.get_pixel(3, 3).unwrap(), Color::WHITE);
    }
}
