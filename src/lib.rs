//! easel is an immediate-mode 2D/3D drawing core.
//!
//! Sketch code talks to a [`Surface`]: it sets styles and transforms, records shapes with
//! `begin_shape`/`vertex`/`end_shape` or the convenience primitives, and the surface turns
//! them into clip-space draw batches for a [`RenderBackend`]. Two backends ship with the
//! crate: a CPU rasterizer ([`SoftwareBackend`]) and a wgpu renderer ([`WgpuBackend`]).
//!
//! ```
//! use easel::{Color, EndShape, ShapeMode, Surface, SurfaceConfig};
//!
//! let mut surface = Surface::new_software(SurfaceConfig::new(32, 32));
//! surface.draw(|s| {
//!     s.background(Color::WHITE)?;
//!     s.fill(Color::rgb(0, 0, 255));
//!     s.begin_shape(ShapeMode::Triangles)?;
//!     s.vertex(0.0, 0.0)?;
//!     s.vertex(32.0, 0.0)?;
//!     s.vertex(0.0, 32.0)?;
//!     s.end_shape(EndShape::Close)
//! })?;
//! # Ok::<(), easel::RenderError>(())
//! ```

pub use wgpu;

mod backend;
mod batch;
mod cache;
mod color;
mod config;
mod error;
mod lighting;
mod matrix;
mod primitives;
mod projection;
mod shader;
mod shape;
mod sketch;
mod style;
mod surface;
mod tessellation;
mod texture;
mod util;
mod vertex;

pub use backend::gpu::GpuContext;
pub use backend::{Capabilities, RenderBackend, SoftwareBackend, WgpuBackend};
pub use batch::{DrawBatch, DrawCommand, DrawList, Topology};
pub use color::{Color, ColorArg, ColorMode, ColorSpace};
pub use config::{BackendKind, RenderMode, SurfaceConfig};
pub use error::{RenderError, Result};
pub use lighting::{Falloff, Light, MAX_LIGHTS};
pub use matrix::{Matrix, MatrixStack, DEFAULT_MAX_DEPTH};
pub use primitives::{ellipse_segments, ArcMode};
pub use projection::{look_at, CameraDefaults, ViewState};
pub use shader::FragmentShader;
pub use shape::{EndShape, Shape, ShapeMode, ShapeRecorder};
pub use sketch::{run_frames, FrameClock, FrameLoop, FrameState, InputSnapshot, Sketch};
pub use style::{
    BlendMode, Detail, ShapeAnchor, StrokeCap, StrokeJoin, Style, TextureMode, TextureWrap,
};
pub use surface::{DrawScope, Surface, SurfaceState};
pub use tessellation::{point_segments, Geometry, Tessellator};
pub use texture::Image;
pub use vertex::{GpuVertex, MeshVertex, Vertex};
