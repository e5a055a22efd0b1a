//! The immediate-mode shape recorder.
//!
//! Vertices are collected between [`ShapeRecorder::begin`] and [`ShapeRecorder::end`] and
//! returned as a [`Shape`]: an ordered vertex list tagged with a [`ShapeMode`], carrying the
//! style and model transform that were current when the shape was opened.
//!
//! # Examples
//!
//! ```rust
//! use easel::{EndShape, Matrix, ShapeMode, ShapeRecorder, Style};
//!
//! let style = Style::default();
//! let identity = Matrix::identity();
//! let mut recorder = ShapeRecorder::default();
//!
//! recorder.begin(ShapeMode::Triangles, style, identity).unwrap();
//! recorder.vertex([0.0, 0.0, 0.0], None, &identity, &style).unwrap();
//! recorder.vertex([10.0, 0.0, 0.0], None, &identity, &style).unwrap();
//! recorder.vertex([0.0, 10.0, 0.0], None, &identity, &style).unwrap();
//! let shape = recorder.end(EndShape::Open).unwrap();
//!
//! assert_eq!(shape.vertices.len(), 3);
//! assert!(!recorder.is_open());
//! ```

use std::ops::Range;

use smallvec::SmallVec;

use crate::error::{RenderError, Result};
use crate::matrix::Matrix;
use crate::style::{Style, TextureMode};
use crate::texture::Image;
use crate::util::transform_point4;
use crate::vertex::Vertex;

/// Primitive interpretation of a recorded vertex list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    #[default]
    Polygon,
}

impl ShapeMode {
    /// Checks a vertex count against the mode. On failure returns a description of what the
    /// mode needs.
    pub fn validate(self, count: usize) -> std::result::Result<(), &'static str> {
        let ok = match self {
            ShapeMode::Points | ShapeMode::Polygon => count >= 1,
            ShapeMode::Lines => count >= 2 && count % 2 == 0,
            ShapeMode::LineStrip => count >= 2,
            ShapeMode::Triangles => count >= 3 && count % 3 == 0,
            ShapeMode::TriangleStrip | ShapeMode::TriangleFan => count >= 3,
            ShapeMode::Quads => count >= 4 && count % 4 == 0,
            ShapeMode::QuadStrip => count >= 4 && count % 2 == 0,
        };
        if ok {
            return Ok(());
        }
        Err(match self {
            ShapeMode::Points | ShapeMode::Polygon => "at least 1 vertex",
            ShapeMode::Lines => "a positive multiple of 2 vertices",
            ShapeMode::LineStrip => "at least 2 vertices",
            ShapeMode::Triangles => "a positive multiple of 3 vertices",
            ShapeMode::TriangleStrip | ShapeMode::TriangleFan => "at least 3 vertices",
            ShapeMode::Quads => "a positive multiple of 4 vertices",
            ShapeMode::QuadStrip => "an even count of at least 4 vertices",
        })
    }
}

/// Whether a polygon outline is closed back to its first vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndShape {
    #[default]
    Open,
    Close,
}

/// A finished shape, ready for tessellation.
#[derive(Debug, Clone)]
pub struct Shape {
    pub mode: ShapeMode,
    pub vertices: Vec<Vertex>,
    pub style: Style,
    /// Model transform captured at `begin_shape`. Vertices are expressed in this frame.
    pub transform: Matrix,
    pub texture: Option<Image>,
    pub close: bool,
    /// First vertex index of each contour (hole) recorded after the outer outline.
    pub contours: SmallVec<[usize; 2]>,
}

impl Shape {
    pub fn new(mode: ShapeMode, style: Style, transform: Matrix) -> Self {
        Self {
            mode,
            vertices: Vec::new(),
            style,
            transform,
            texture: None,
            close: false,
            contours: SmallVec::new(),
        }
    }

    pub fn closed(mut self) -> Self {
        self.close = true;
        self
    }

    pub fn with_texture(mut self, texture: Option<Image>) -> Self {
        self.texture = texture;
        self
    }

    /// Vertex ranges of the outer outline followed by each contour. Empty ranges are skipped.
    pub fn rings(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let ends = self
            .contours
            .iter()
            .copied()
            .chain(std::iter::once(self.vertices.len()));
        std::iter::once(0)
            .chain(self.contours.iter().copied())
            .zip(ends)
            .map(|(start, end)| start..end)
            .filter(|ring| !ring.is_empty())
    }

    /// True when `ring` was recorded between `begin_contour` and `end_contour`.
    pub fn is_contour(&self, ring: &Range<usize>) -> bool {
        self.contours.contains(&ring.start)
    }

    /// True when every vertex lies in one plane of constant z in the shape's frame.
    pub fn is_flat(&self) -> bool {
        let Some(first) = self.vertices.first() else {
            return true;
        };
        let z = first.position[2];
        self.vertices
            .iter()
            .all(|v| (v.position[2] - z).abs() <= 1e-4)
    }
}

#[derive(Debug, Default)]
pub struct ShapeRecorder {
    open: Option<Shape>,
    inverse_transform: Option<Matrix>,
    normal: Option<[f32; 3]>,
    curve_points: SmallVec<[[f32; 3]; 4]>,
    contour_open: bool,
}

impl ShapeRecorder {
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn mode(&self) -> Option<ShapeMode> {
        self.open.as_ref().map(|shape| shape.mode)
    }

    pub fn vertex_count(&self) -> usize {
        self.open.as_ref().map_or(0, |shape| shape.vertices.len())
    }

    pub fn begin(&mut self, mode: ShapeMode, style: Style, transform: Matrix) -> Result<()> {
        if self.open.is_some() {
            return Err(RenderError::NestedShape);
        }
        self.open = Some(Shape::new(mode, style, transform));
        self.inverse_transform = None;
        self.normal = None;
        self.curve_points.clear();
        self.contour_open = false;
        Ok(())
    }

    /// Starts a hole in the open polygon. Vertices up to [`ShapeRecorder::end_contour`] form a
    /// closed outline that is cut out of the fill with the even-odd rule.
    pub fn begin_contour(&mut self) -> Result<()> {
        let operation = "begin_contour";
        let already_open = self.contour_open;
        let shape = self.open_shape(operation)?;
        if shape.mode != ShapeMode::Polygon {
            return Err(RenderError::UnbalancedContour {
                operation,
                reason: "contours are only recorded in Polygon shapes",
            });
        }
        if already_open {
            return Err(RenderError::UnbalancedContour {
                operation,
                reason: "a contour is already open",
            });
        }
        let start = shape.vertices.len();
        shape.contours.push(start);
        self.contour_open = true;
        self.curve_points.clear();
        Ok(())
    }

    pub fn end_contour(&mut self) -> Result<()> {
        self.open_shape("end_contour")?;
        if !self.contour_open {
            return Err(RenderError::UnbalancedContour {
                operation: "end_contour",
                reason: "no contour is open",
            });
        }
        self.contour_open = false;
        self.curve_points.clear();
        Ok(())
    }

    /// Binds a texture to the open shape.
    pub fn texture(&mut self, image: &Image) -> Result<()> {
        let shape = self.open_shape("texture")?;
        shape.texture = Some(image.clone());
        Ok(())
    }

    /// Sets the normal carried by subsequent vertices.
    pub fn normal(&mut self, normal: [f32; 3]) {
        self.normal = Some(normal);
    }

    /// Appends a vertex. `current` is the model transform at the time of the call; when it
    /// differs from the transform captured at `begin`, the position is re-expressed in the
    /// shape's frame.
    pub fn vertex(
        &mut self,
        position: [f32; 3],
        uv: Option<[f32; 2]>,
        current: &Matrix,
        style: &Style,
    ) -> Result<()> {
        self.open_shape("vertex")?;
        self.curve_points.clear();
        self.push_vertex(position, uv, current, style);
        Ok(())
    }

    /// Cubic Bezier segment from the last vertex, expanded to `style.detail.bezier` points.
    pub fn bezier_vertex(
        &mut self,
        c1: [f32; 3],
        c2: [f32; 3],
        end: [f32; 3],
        current: &Matrix,
        style: &Style,
    ) -> Result<()> {
        let start = self.last_local_position("bezier_vertex", current)?;
        self.curve_points.clear();
        let detail = style.detail.bezier.max(1);
        for i in 1..=detail {
            let t = i as f32 / detail as f32;
            let p = cubic_bezier(start, c1, c2, end, t);
            self.push_vertex(p, None, current, style);
        }
        Ok(())
    }

    /// Quadratic Bezier segment from the last vertex.
    pub fn quadratic_vertex(
        &mut self,
        control: [f32; 3],
        end: [f32; 3],
        current: &Matrix,
        style: &Style,
    ) -> Result<()> {
        let start = self.last_local_position("quadratic_vertex", current)?;
        // Degree elevation to a cubic.
        let c1 = lerp3(start, control, 2.0 / 3.0);
        let c2 = lerp3(end, control, 2.0 / 3.0);
        self.bezier_vertex(c1, c2, end, current, style)
    }

    /// Catmull-Rom control point. Once four points are known, every new point emits the
    /// segment between the second and third most recent points.
    pub fn curve_vertex(&mut self, position: [f32; 3], current: &Matrix, style: &Style) -> Result<()> {
        self.open_shape("curve_vertex")?;
        self.curve_points.push(position);
        let n = self.curve_points.len();
        if n < 4 {
            return Ok(());
        }
        let pts = [
            self.curve_points[n - 4],
            self.curve_points[n - 3],
            self.curve_points[n - 2],
            self.curve_points[n - 1],
        ];
        let detail = style.detail.curve.max(1);
        let first = if n == 4 { 0 } else { 1 };
        for i in first..=detail {
            let t = i as f32 / detail as f32;
            let p = catmull_rom(pts, style.curve_tightness, t);
            self.push_vertex(p, None, current, style);
        }
        // Only the last three points are needed for the next segment.
        if n > 4 {
            self.curve_points.remove(0);
        }
        Ok(())
    }

    /// Closes the open shape. The recorder is cleared even when the shape is rejected.
    pub fn end(&mut self, end: EndShape) -> Result<Shape> {
        let mut shape = self.open.take().ok_or(RenderError::UnmatchedEndShape {
            operation: "end_shape",
        })?;
        self.inverse_transform = None;
        self.normal = None;
        self.curve_points.clear();
        if std::mem::take(&mut self.contour_open) {
            return Err(RenderError::UnbalancedContour {
                operation: "end_shape",
                reason: "a contour is still open",
            });
        }

        shape
            .mode
            .validate(shape.vertices.len())
            .map_err(|requirement| RenderError::InvalidVertexCount {
                mode: shape.mode,
                count: shape.vertices.len(),
                requirement,
            })?;
        shape.close = end == EndShape::Close;
        Ok(shape)
    }

    /// Drops an open shape, returning whether there was one.
    pub fn discard(&mut self) -> bool {
        self.inverse_transform = None;
        self.curve_points.clear();
        self.contour_open = false;
        self.open.take().is_some()
    }

    fn open_shape(&mut self, operation: &'static str) -> Result<&mut Shape> {
        self.open
            .as_mut()
            .ok_or(RenderError::UnmatchedEndShape { operation })
    }

    fn last_local_position(&mut self, operation: &'static str, current: &Matrix) -> Result<[f32; 3]> {
        let shape = self.open_shape(operation)?;
        let mode = shape.mode;
        let last = shape
            .vertices
            .last()
            .map(|v| v.position)
            .ok_or(RenderError::InvalidVertexCount {
                mode,
                count: 0,
                requirement: "a vertex before any curve segment",
            })?;
        // Control points arrive in the current frame; bring the start point there too.
        let shape_transform = shape.transform;
        if shape_transform == *current {
            return Ok(last);
        }
        let to_current = current
            .inverse()
            .map(|inv| shape_transform.then(&inv))
            .unwrap_or_else(Matrix::identity);
        Ok(project(&to_current, last))
    }

    fn push_vertex(
        &mut self,
        position: [f32; 3],
        uv: Option<[f32; 2]>,
        current: &Matrix,
        style: &Style,
    ) {
        let normal = self.normal;
        let Some(shape) = self.open.as_mut() else {
            return;
        };

        let position = if shape.transform == *current {
            position
        } else {
            let inverse = *self
                .inverse_transform
                .get_or_insert_with(|| shape.transform.inverse().unwrap_or_else(Matrix::identity));
            project(&current.then(&inverse), position)
        };

        let uv = uv.map(|[u, v]| match (style.texture_mode, &shape.texture) {
            (TextureMode::Image, Some(image)) => [
                u / image.width().max(1) as f32,
                v / image.height().max(1) as f32,
            ],
            _ => [u, v],
        });

        let mut vertex = Vertex::new(position, style.fill, style.stroke).with_normal(normal);
        vertex.uv = uv;
        shape.vertices.push(vertex);
    }
}

fn project(m: &Matrix, p: [f32; 3]) -> [f32; 3] {
    let q = transform_point4(m, p[0], p[1], p[2]);
    let w = if q[3].abs() < 1e-6 { 1.0 } else { q[3] };
    [q[0] / w, q[1] / w, q[2] / w]
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

pub(crate) fn cubic_bezier(p0: [f32; 3], p1: [f32; 3], p2: [f32; 3], p3: [f32; 3], t: f32) -> [f32; 3] {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    [
        b0 * p0[0] + b1 * p1[0] + b2 * p2[0] + b3 * p3[0],
        b0 * p0[1] + b1 * p1[1] + b2 * p2[1] + b3 * p3[1],
        b0 * p0[2] + b1 * p1[2] + b2 * p2[2] + b3 * p3[2],
    ]
}

/// Cardinal spline through `p[1]..p[2]`; tightness 0 is Catmull-Rom.
pub(crate) fn catmull_rom(p: [[f32; 3]; 4], tightness: f32, t: f32) -> [f32; 3] {
    let s = tightness;
    let basis = [
        [(s - 1.0) / 2.0, (s + 3.0) / 2.0, (-3.0 - s) / 2.0, (1.0 - s) / 2.0],
        [1.0 - s, (-5.0 - s) / 2.0, s + 2.0, (s - 1.0) / 2.0],
        [(s - 1.0) / 2.0, 0.0, (1.0 - s) / 2.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
    ];
    let powers = [t * t * t, t * t, t, 1.0];
    let mut weights = [0.0f32; 4];
    for (row, power) in basis.iter().zip(powers) {
        for (w, b) in weights.iter_mut().zip(row) {
            *w += power * b;
        }
    }
    let mut out = [0.0f32; 3];
    for (w, point) in weights.iter().zip(p.iter()) {
        for axis in 0..3 {
            out[axis] += w * point[axis];
        }
    }
    out
}
