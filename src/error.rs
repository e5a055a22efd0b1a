use thiserror::Error;

use crate::shape::ShapeMode;
use crate::surface::SurfaceState;

/// Errors returned by drawing, lifecycle and resource operations.
///
/// Protocol violations (`UnbalancedStack`, `NestedShape`, `UnmatchedEndShape`,
/// `UnbalancedContour`, `InvalidVertexCount`, `SurfaceState`) leave the surface exactly as
/// it was before the failing call. Resource errors (`ResourceUpload`) are reported and the
/// surface keeps working; nothing in this crate retries.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pop called without a matching push")]
    UnbalancedStack,

    #[error("matrix stack depth limit of {limit} exceeded")]
    StackDepthExceeded { limit: usize },

    #[error("begin_shape called while another shape is still open")]
    NestedShape,

    #[error("{operation} called without an open begin_shape")]
    UnmatchedEndShape { operation: &'static str },

    #[error("{operation} called out of order: {reason}")]
    UnbalancedContour {
        operation: &'static str,
        reason: &'static str,
    },

    #[error("{mode:?} shape needs {requirement}, got {count} vertices")]
    InvalidVertexCount {
        mode: ShapeMode,
        count: usize,
        requirement: &'static str,
    },

    #[error("{operation} requires a surface in the {expected:?} state, but it is {actual:?}")]
    SurfaceState {
        operation: &'static str,
        expected: SurfaceState,
        actual: SurfaceState,
    },

    #[error("failed to upload {resource}: {reason}")]
    ResourceUpload { resource: String, reason: String },

    #[error("{capability} is not supported by the {backend} backend")]
    UnsupportedCapability {
        capability: &'static str,
        backend: &'static str,
    },

    #[error("no suitable graphics device: {0}")]
    DeviceUnavailable(String),

    #[error("presentation failed: {0}")]
    Presentation(#[from] wgpu::SurfaceError),
}

impl RenderError {
    /// True for errors caused by calling the drawing API out of order.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            RenderError::UnbalancedStack
                | RenderError::StackDepthExceeded { .. }
                | RenderError::NestedShape
                | RenderError::UnmatchedEndShape { .. }
                | RenderError::UnbalancedContour { .. }
                | RenderError::InvalidVertexCount { .. }
                | RenderError::SurfaceState { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
