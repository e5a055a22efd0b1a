use std::ops::{Deref, DerefMut};

use super::*;

/// A frame in progress. Derefs to the [`Surface`]; dropping the guard ends the frame, also
/// while unwinding from a panic. Errors from that implicit `end_draw` are logged; call
/// [`DrawScope::finish`] to receive them.
pub struct DrawScope<'a> {
    surface: &'a mut Surface,
    finished: bool,
}

impl<'a> DrawScope<'a> {
    pub(super) fn new(surface: &'a mut Surface) -> Self {
        Self {
            surface,
            finished: false,
        }
    }

    /// Ends the frame and returns the result of `end_draw`.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.surface.end_draw()
    }
}

impl Deref for DrawScope<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for DrawScope<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for DrawScope<'_> {
    fn drop(&mut self) {
        if self.finished || self.surface.state() != SurfaceState::Drawing {
            return;
        }
        if let Err(e) = self.surface.end_draw() {
            tracing::warn!("end_draw failed while dropping a draw scope: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_inside_a_scope_still_end_the_frame() {
        let mut surface = Surface::new_software(SurfaceConfig::new(2, 2));
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = surface.begin_scope().unwrap();
            panic!("drawing code failed");
        }));
        assert!(outcome.is_err());
        assert_eq!(surface.state(), SurfaceState::Idle);
    }

    #[test]
    fn finish_reports_end_draw() {
        let mut surface = Surface::new_software(SurfaceConfig::new(2, 2));
        let scope = surface.begin_scope().unwrap();
        scope.finish().unwrap();
        assert_eq!(surface.frame_count(), 1);
    }
}
