//! Converts recorded shapes into triangle, line and point lists in the shape's local frame.
//!
//! Flat polygons and flat strokes go through lyon; anything that leaves its plane falls back
//! to fan triangulation for fills and hairlines for strokes.

use lyon::lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, LineCap, LineJoin,
    StrokeOptions, StrokeTessellator, StrokeVertex, VertexBuffers,
};
use lyon::math::point;
use lyon::path::Path;
use smallvec::SmallVec;
use std::ops::Range;

use crate::color::Color;
use crate::shape::{Shape, ShapeMode};
use crate::style::{StrokeCap, StrokeJoin, Style};
use crate::vertex::{MeshVertex, Vertex};

const TOLERANCE: f32 = 0.05;

/// Smallest segment count used for round points.
pub const MIN_POINT_SEGMENTS: u32 = 6;

/// Tessellated output of one shape. All lists are flat (no index buffers).
#[derive(Debug, Default, Clone)]
pub struct Geometry {
    /// Filled triangles, textured when the shape has a texture.
    pub triangles: Vec<MeshVertex>,
    /// Stroke outlines expanded to triangles.
    pub stroke_triangles: Vec<MeshVertex>,
    /// Hairline segments, two vertices each.
    pub lines: Vec<MeshVertex>,
    pub points: Vec<MeshVertex>,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
            && self.stroke_triangles.is_empty()
            && self.lines.is_empty()
            && self.points.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.triangles.len() + self.stroke_triangles.len() + self.lines.len() + self.points.len()
    }
}

/// Segment count for round points of the given stroke weight.
pub fn point_segments(weight: f32) -> u32 {
    ((std::f32::consts::TAU * weight / 20.0) as u32).max(MIN_POINT_SEGMENTS)
}

/// Owns lyon's tessellators so their internal allocations are reused across shapes.
pub struct Tessellator {
    fill: FillTessellator,
    stroke: StrokeTessellator,
    buffers: VertexBuffers<[f32; 2], u32>,
}

impl Default for Tessellator {
    fn default() -> Self {
        Self::new()
    }
}

impl Tessellator {
    pub fn new() -> Self {
        Self {
            fill: FillTessellator::new(),
            stroke: StrokeTessellator::new(),
            buffers: VertexBuffers::new(),
        }
    }

    pub fn tessellate(&mut self, shape: &Shape) -> Geometry {
        let mut geometry = Geometry::default();
        if shape.vertices.is_empty() {
            return geometry;
        }
        if shape.style.fill_enabled || shape.texture.is_some() {
            self.fill_shape(shape, &mut geometry);
        }
        if shape.style.stroke_color().is_some() {
            self.stroke_shape(shape, &mut geometry);
        }
        geometry
    }

    fn fill_shape(&mut self, shape: &Shape, out: &mut Geometry) {
        let v = &shape.vertices;
        let textured = shape.texture.is_some();
        let tint = shape.style.texture_modulation();
        let emit = |out: &mut Geometry, i: usize| {
            out.triangles.push(fill_vertex(&v[i], textured, tint));
        };
        match shape.mode {
            ShapeMode::Points | ShapeMode::Lines | ShapeMode::LineStrip => {}
            ShapeMode::Triangles => {
                for i in 0..v.len() / 3 * 3 {
                    emit(out, i);
                }
            }
            ShapeMode::TriangleStrip => {
                for i in 0..v.len().saturating_sub(2) {
                    for j in [i, i + 1, i + 2] {
                        emit(out, j);
                    }
                }
            }
            ShapeMode::TriangleFan => {
                for i in 1..v.len().saturating_sub(1) {
                    for j in [0, i, i + 1] {
                        emit(out, j);
                    }
                }
            }
            ShapeMode::Quads => {
                for q in 0..v.len() / 4 {
                    let b = q * 4;
                    for j in [b, b + 1, b + 2, b, b + 2, b + 3] {
                        emit(out, j);
                    }
                }
            }
            ShapeMode::QuadStrip => {
                for q in 0..(v.len().saturating_sub(2)) / 2 {
                    let b = q * 2;
                    for j in [b, b + 1, b + 3, b, b + 3, b + 2] {
                        emit(out, j);
                    }
                }
            }
            ShapeMode::Polygon => {
                let rings: SmallVec<[Range<usize>; 2]> =
                    shape.rings().filter(|ring| ring.len() >= 3).collect();
                let Some(outer) = rings.first().cloned() else {
                    return;
                };
                if shape.is_flat() && self.fill_polygon(v, &rings, textured, tint, out) {
                    return;
                }
                // Off-plane polygons are fanned; holes are dropped.
                for i in outer.start + 1..outer.end - 1 {
                    for j in [outer.start, i, i + 1] {
                        emit(out, j);
                    }
                }
            }
        }
    }

    /// Even-odd fill of a flat polygon, one closed sub-path per ring so contours become holes.
    /// Returns false if lyon rejected the outline.
    fn fill_polygon(
        &mut self,
        v: &[Vertex],
        rings: &[Range<usize>],
        textured: bool,
        tint: Color,
        out: &mut Geometry,
    ) -> bool {
        let z = v[0].position[2];
        let mut builder = Path::builder();
        for ring in rings {
            let ring = &v[ring.clone()];
            builder.begin(point(ring[0].position[0], ring[0].position[1]));
            for vertex in &ring[1..] {
                builder.line_to(point(vertex.position[0], vertex.position[1]));
            }
            builder.end(true);
        }
        let path = builder.build();

        self.buffers.vertices.clear();
        self.buffers.indices.clear();
        let options = FillOptions::default()
            .with_fill_rule(FillRule::EvenOdd)
            .with_tolerance(TOLERANCE);
        let result = self.fill.tessellate_path(
            &path,
            &options,
            &mut BuffersBuilder::new(&mut self.buffers, |vertex: FillVertex| {
                vertex.position().to_array()
            }),
        );
        if let Err(error) = result {
            tracing::warn!("polygon fill tessellation failed: {:?}", error);
            return false;
        }

        let outline = Outline::with_rings(v, rings);
        for &index in &self.buffers.indices {
            let [x, y] = self.buffers.vertices[index as usize];
            let (a, b, t) = outline.closest_edge(x, y);
            let source = lerp_vertex(&v[a], &v[b], t);
            let mut mesh = fill_vertex(&source, textured, tint);
            mesh.position = [x, y, z];
            out.triangles.push(mesh);
        }
        true
    }

    fn stroke_shape(&mut self, shape: &Shape, out: &mut Geometry) {
        let v = &shape.vertices;
        let style = &shape.style;

        if shape.mode == ShapeMode::Points {
            for vertex in v {
                self.emit_point(vertex, style, out);
            }
            return;
        }

        let runs = outline_runs(shape);
        let flat = shape.is_flat();
        for run in &runs {
            if run.indices.len() < 2 {
                continue;
            }
            if !flat || !self.stroke_run(v, &run.indices, run.closed, style, out) {
                push_hairlines(v, &run.indices, run.closed, out);
            }
        }
    }

    fn emit_point(&mut self, vertex: &Vertex, style: &Style, out: &mut Geometry) {
        let weight = style.stroke_weight;
        let mesh = |position: [f32; 3]| MeshVertex {
            position,
            color: vertex.stroke,
            uv: [0.0, 0.0],
            normal: None,
        };
        if weight <= 1.0 {
            out.points.push(mesh(vertex.position));
            return;
        }
        let r = weight / 2.0;
        let [cx, cy, cz] = vertex.position;
        let corners: Vec<[f32; 3]> = match style.stroke_cap {
            StrokeCap::Round => {
                let segments = point_segments(weight);
                (0..segments)
                    .map(|i| {
                        let angle = std::f32::consts::TAU * i as f32 / segments as f32;
                        [cx + r * angle.cos(), cy + r * angle.sin(), cz]
                    })
                    .collect()
            }
            StrokeCap::Square | StrokeCap::Project => vec![
                [cx - r, cy - r, cz],
                [cx + r, cy - r, cz],
                [cx + r, cy + r, cz],
                [cx - r, cy + r, cz],
            ],
        };
        for i in 0..corners.len() {
            out.stroke_triangles.push(mesh(vertex.position));
            out.stroke_triangles.push(mesh(corners[i]));
            out.stroke_triangles.push(mesh(corners[(i + 1) % corners.len()]));
        }
    }

    fn stroke_run(
        &mut self,
        v: &[Vertex],
        indices: &[usize],
        closed: bool,
        style: &Style,
        out: &mut Geometry,
    ) -> bool {
        let z = v[indices[0]].position[2];
        let mut builder = Path::builder();
        builder.begin(point(v[indices[0]].position[0], v[indices[0]].position[1]));
        for &i in &indices[1..] {
            builder.line_to(point(v[i].position[0], v[i].position[1]));
        }
        builder.end(closed);
        let path = builder.build();

        let options = StrokeOptions::default()
            .with_line_width(style.stroke_weight)
            .with_tolerance(TOLERANCE)
            .with_line_cap(match style.stroke_cap {
                StrokeCap::Round => LineCap::Round,
                StrokeCap::Square => LineCap::Butt,
                StrokeCap::Project => LineCap::Square,
            })
            .with_line_join(match style.stroke_join {
                StrokeJoin::Miter => LineJoin::Miter,
                StrokeJoin::Bevel => LineJoin::Bevel,
                StrokeJoin::Round => LineJoin::Round,
            });

        self.buffers.vertices.clear();
        self.buffers.indices.clear();
        let result = self.stroke.tessellate_path(
            &path,
            &options,
            &mut BuffersBuilder::new(&mut self.buffers, |vertex: StrokeVertex| {
                vertex.position().to_array()
            }),
        );
        if let Err(error) = result {
            tracing::warn!("stroke tessellation failed: {:?}", error);
            return false;
        }

        let run: SmallVec<[Vertex; 8]> = indices.iter().map(|&i| v[i]).collect();
        let outline = Outline::new(&run, closed);
        for &index in &self.buffers.indices {
            let [x, y] = self.buffers.vertices[index as usize];
            let (a, b, t) = outline.closest_edge(x, y);
            out.stroke_triangles.push(MeshVertex {
                position: [x, y, z],
                color: run[a].stroke.lerp(run[b].stroke, t),
                uv: [0.0, 0.0],
                normal: None,
            });
        }
        true
    }
}

fn fill_vertex(v: &Vertex, textured: bool, tint: Color) -> MeshVertex {
    MeshVertex {
        position: v.position,
        color: if textured { tint } else { v.fill },
        uv: v.uv.unwrap_or([0.0, 0.0]),
        normal: v.normal,
    }
}

fn lerp_vertex(a: &Vertex, b: &Vertex, t: f32) -> Vertex {
    let mix = |x: f32, y: f32| x + (y - x) * t;
    Vertex {
        position: [
            mix(a.position[0], b.position[0]),
            mix(a.position[1], b.position[1]),
            mix(a.position[2], b.position[2]),
        ],
        uv: match (a.uv, b.uv) {
            (Some(p), Some(q)) => Some([mix(p[0], q[0]), mix(p[1], q[1])]),
            (uv, None) | (None, uv) => uv,
        },
        fill: a.fill.lerp(b.fill, t),
        stroke: a.stroke.lerp(b.stroke, t),
        normal: if t < 0.5 { a.normal } else { b.normal },
    }
}

/// Polyline used to recover per-vertex attributes for positions produced by lyon, which only
/// ever emits points on the input edges or offsets from them.
struct Outline<'a> {
    vertices: &'a [Vertex],
    rings: SmallVec<[Range<usize>; 2]>,
    closed: bool,
}

impl<'a> Outline<'a> {
    fn new(vertices: &'a [Vertex], closed: bool) -> Self {
        let rings = std::iter::once(0..vertices.len()).collect();
        Self {
            vertices,
            rings,
            closed,
        }
    }

    /// Several closed outlines over one vertex list.
    fn with_rings(vertices: &'a [Vertex], rings: &[Range<usize>]) -> Self {
        Self {
            vertices,
            rings: rings.iter().cloned().collect(),
            closed: true,
        }
    }

    /// Returns `(start, end, t)` of the edge closest to `(x, y)`.
    fn closest_edge(&self, x: f32, y: f32) -> (usize, usize, f32) {
        if self.vertices.len() == 1 {
            return (0, 0, 0.0);
        }
        let mut best = (0, 1, 0.0, f32::INFINITY);
        for ring in &self.rings {
            let n = ring.len();
            let edges = if self.closed { n } else { n.saturating_sub(1) };
            for k in 0..edges {
                let (a, b) = (ring.start + k, ring.start + (k + 1) % n);
                let p = self.vertices[a].position;
                let q = self.vertices[b].position;
                let (dx, dy) = (q[0] - p[0], q[1] - p[1]);
                let len2 = dx * dx + dy * dy;
                let t = if len2 <= f32::EPSILON {
                    0.0
                } else {
                    (((x - p[0]) * dx + (y - p[1]) * dy) / len2).clamp(0.0, 1.0)
                };
                let (ex, ey) = (p[0] + dx * t - x, p[1] + dy * t - y);
                let d = ex * ex + ey * ey;
                if d < best.3 {
                    best = (a, b, t, d);
                }
            }
        }
        (best.0, best.1, best.2)
    }
}

struct Run {
    indices: SmallVec<[usize; 8]>,
    closed: bool,
}

/// Splits a shape into the polylines its stroke follows.
fn outline_runs(shape: &Shape) -> Vec<Run> {
    let n = shape.vertices.len();
    let run = |indices: &[usize], closed: bool| Run {
        indices: indices.iter().copied().collect(),
        closed,
    };
    match shape.mode {
        ShapeMode::Points => Vec::new(),
        ShapeMode::Lines => (0..n / 2).map(|i| run(&[2 * i, 2 * i + 1], false)).collect(),
        ShapeMode::LineStrip => vec![Run {
            indices: (0..n).collect(),
            closed: shape.close,
        }],
        ShapeMode::Triangles => (0..n / 3)
            .map(|i| run(&[3 * i, 3 * i + 1, 3 * i + 2], true))
            .collect(),
        ShapeMode::TriangleStrip => (0..n.saturating_sub(2))
            .map(|i| run(&[i, i + 1, i + 2], true))
            .collect(),
        ShapeMode::TriangleFan => (1..n.saturating_sub(1))
            .map(|i| run(&[0, i, i + 1], true))
            .collect(),
        ShapeMode::Quads => (0..n / 4)
            .map(|i| run(&[4 * i, 4 * i + 1, 4 * i + 2, 4 * i + 3], true))
            .collect(),
        ShapeMode::QuadStrip => (0..n.saturating_sub(2) / 2)
            .map(|i| {
                let b = 2 * i;
                run(&[b, b + 1, b + 3, b + 2], true)
            })
            .collect(),
        ShapeMode::Polygon => shape
            .rings()
            .map(|ring| Run {
                closed: ring.len() > 2 && (shape.close || shape.is_contour(&ring)),
                indices: ring.collect(),
            })
            .collect(),
    }
}

fn push_hairlines(v: &[Vertex], indices: &[usize], closed: bool, out: &mut Geometry) {
    let line_vertex = |i: usize| MeshVertex {
        position: v[i].position,
        color: v[i].stroke,
        uv: [0.0, 0.0],
        normal: None,
    };
    for pair in indices.windows(2) {
        out.lines.push(line_vertex(pair[0]));
        out.lines.push(line_vertex(pair[1]));
    }
    if closed && indices.len() > 2 {
        out.lines.push(line_vertex(indices[indices.len() - 1]));
        out.lines.push(line_vertex(indices[0]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    fn shape(mode: ShapeMode, points: &[[f32; 3]], style: Style) -> Shape {
        let mut shape = Shape::new(mode, style, Matrix::identity());
        shape.vertices = points
            .iter()
            .map(|&p| Vertex::new(p, style.fill, style.stroke))
            .collect();
        shape
    }

    fn fill_only() -> Style {
        Style {
            stroke_enabled: false,
            ..Style::default()
        }
    }

    fn signed_area(triangles: &[MeshVertex]) -> f32 {
        triangles
            .chunks(3)
            .map(|t| {
                let (a, b, c) = (t[0].position, t[1].position, t[2].position);
                ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() / 2.0
            })
            .sum()
    }

    #[test]
    fn square_polygon_covers_its_area() {
        let square = shape(
            ShapeMode::Polygon,
            &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 10.0, 0.0], [0.0, 10.0, 0.0]],
            fill_only(),
        )
        .closed();
        let geometry = Tessellator::new().tessellate(&square);
        assert_eq!(geometry.triangles.len() % 3, 0);
        assert!((signed_area(&geometry.triangles) - 100.0).abs() < 1e-3);
        assert!(geometry.stroke_triangles.is_empty());
    }

    #[test]
    fn concave_polygon_is_not_fanned() {
        // an arrow head whose fan from vertex 0 would overlap itself
        let arrow = shape(
            ShapeMode::Polygon,
            &[
                [0.0, 0.0, 0.0],
                [10.0, 5.0, 0.0],
                [0.0, 10.0, 0.0],
                [4.0, 5.0, 0.0],
            ],
            fill_only(),
        );
        let geometry = Tessellator::new().tessellate(&arrow);
        assert!((signed_area(&geometry.triangles) - 30.0).abs() < 1e-3);
    }

    fn square_with_hole(style: Style) -> Shape {
        let mut square = shape(
            ShapeMode::Polygon,
            &[
                [0.0, 0.0, 0.0],
                [10.0, 0.0, 0.0],
                [10.0, 10.0, 0.0],
                [0.0, 10.0, 0.0],
                [3.0, 3.0, 0.0],
                [3.0, 7.0, 0.0],
                [7.0, 7.0, 0.0],
                [7.0, 3.0, 0.0],
            ],
            style,
        )
        .closed();
        square.contours.push(4);
        square
    }

    #[test]
    fn contours_cut_holes_in_the_fill() {
        let geometry = Tessellator::new().tessellate(&square_with_hole(fill_only()));
        assert!((signed_area(&geometry.triangles) - 84.0).abs() < 1e-3);
    }

    #[test]
    fn contours_are_stroked_as_closed_outlines() {
        let style = Style {
            fill_enabled: false,
            stroke_weight: 1.0,
            ..Style::default()
        };
        let mut square = square_with_hole(style);
        // an open outer outline still closes its holes
        square.close = false;
        let runs = outline_runs(&square);
        assert_eq!(runs.len(), 2);
        assert!(!runs[0].closed);
        assert!(runs[1].closed);
        assert_eq!(runs[1].indices.as_slice(), &[4, 5, 6, 7]);
        assert!(!Tessellator::new().tessellate(&square).stroke_triangles.is_empty());
    }

    #[test]
    fn quads_and_strips_expand_to_triangles() {
        let pts = [
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
        ];
        let mut t = Tessellator::new();
        let strip = t.tessellate(&shape(ShapeMode::QuadStrip, &pts, fill_only()));
        assert_eq!(strip.triangles.len(), 12);
        let tri_strip = t.tessellate(&shape(ShapeMode::TriangleStrip, &pts, fill_only()));
        assert_eq!(tri_strip.triangles.len(), 12);
        let quads = t.tessellate(&shape(ShapeMode::Quads, &pts[..4], fill_only()));
        assert_eq!(quads.triangles.len(), 6);
    }

    #[test]
    fn non_flat_strokes_become_hairlines() {
        let style = Style {
            fill_enabled: false,
            ..Style::default()
        };
        let tri = shape(
            ShapeMode::Triangles,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 2.0]],
            style,
        );
        let geometry = Tessellator::new().tessellate(&tri);
        assert_eq!(geometry.lines.len(), 6);
        assert!(geometry.triangles.is_empty());
    }

    #[test]
    fn flat_strokes_have_width() {
        let style = Style {
            fill_enabled: false,
            stroke_weight: 4.0,
            ..Style::default()
        };
        let line = shape(ShapeMode::Lines, &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]], style);
        let geometry = Tessellator::new().tessellate(&line);
        assert!(!geometry.stroke_triangles.is_empty());
        let max_y = geometry
            .stroke_triangles
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert!((max_y - 2.0).abs() < 0.1);
    }

    #[test]
    fn thin_points_stay_points() {
        let style = Style::default();
        let points = shape(ShapeMode::Points, &[[1.0, 1.0, 0.0], [2.0, 2.0, 0.0]], style);
        let geometry = Tessellator::new().tessellate(&points);
        assert_eq!(geometry.points.len(), 2);

        let thick = Style {
            stroke_weight: 10.0,
            ..style
        };
        let geometry = Tessellator::new().tessellate(&shape(ShapeMode::Points, &[[0.0; 3]], thick));
        assert_eq!(geometry.stroke_triangles.len(), 3 * point_segments(10.0) as usize);
    }

    #[test]
    fn point_segments_have_a_floor() {
        assert_eq!(point_segments(1.0), MIN_POINT_SEGMENTS);
        assert_eq!(point_segments(100.0), 31);
    }
}
