//! Closed-form tessellation of the convenience primitives.
//!
//! Each function builds one or two [`Shape`]s that go through the same tessellation path as
//! shapes recorded with `begin_shape`. Segment counts depend only on the primitive's size and
//! the detail levels in its [`Style`], so identical calls always produce identical geometry.

use smallvec::{smallvec, SmallVec};

use crate::cache::GeometryCache;
use crate::matrix::Matrix;
use crate::shape::{catmull_rom, cubic_bezier, Shape, ShapeMode};
use crate::style::{ShapeAnchor, Style};
use crate::texture::Image;
use crate::vertex::Vertex;

pub const MIN_ELLIPSE_SEGMENTS: u32 = 6;
pub const MAX_ELLIPSE_SEGMENTS: u32 = 256;

pub type Shapes = SmallVec<[Shape; 2]>;

/// How an arc's fill and outline are closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArcMode {
    /// Pie-shaped fill, open outline.
    #[default]
    Default,
    /// Chord fill, open outline.
    Open,
    /// Fill and outline closed by the chord.
    Chord,
    /// Fill and outline closed through the center.
    Pie,
}

/// Segment count of a full ellipse with the given bounding box.
pub fn ellipse_segments(w: f32, h: f32) -> u32 {
    let n = (std::f32::consts::TAU * w.hypot(h) / 20.0).floor();
    (n.max(0.0) as u32).clamp(MIN_ELLIPSE_SEGMENTS, MAX_ELLIPSE_SEGMENTS)
}

/// Turns `rect_mode`/`ellipse_mode` arguments into a top-left corner and a positive size.
pub fn resolve_anchor(anchor: ShapeAnchor, a: f32, b: f32, c: f32, d: f32) -> (f32, f32, f32, f32) {
    let (x, y, w, h) = match anchor {
        ShapeAnchor::Corner => (a, b, c, d),
        ShapeAnchor::Corners => (a, b, c - a, d - b),
        ShapeAnchor::Center => (a - c / 2.0, b - d / 2.0, c, d),
        ShapeAnchor::Radius => (a - c, b - d, c * 2.0, d * 2.0),
    };
    let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
    let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
    (x, y, w, h)
}

fn vertex(style: &Style, p: [f32; 3]) -> Vertex {
    Vertex::new(p, style.fill, style.stroke)
}

fn shape_from(mode: ShapeMode, style: &Style, transform: Matrix, points: &[[f32; 3]]) -> Shape {
    let mut shape = Shape::new(mode, *style, transform);
    shape.vertices = points.iter().map(|&p| vertex(style, p)).collect();
    shape
}

pub fn point(style: &Style, transform: Matrix, p: [f32; 3]) -> Shape {
    shape_from(ShapeMode::Points, style, transform, &[p])
}

pub fn line(style: &Style, transform: Matrix, a: [f32; 3], b: [f32; 3]) -> Shape {
    shape_from(ShapeMode::Lines, style, transform, &[a, b])
}

pub fn triangle(style: &Style, transform: Matrix, a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> Shape {
    let pts = [[a[0], a[1], 0.0], [b[0], b[1], 0.0], [c[0], c[1], 0.0]];
    shape_from(ShapeMode::Polygon, style, transform, &pts).closed()
}

pub fn quad(
    style: &Style,
    transform: Matrix,
    a: [f32; 2],
    b: [f32; 2],
    c: [f32; 2],
    d: [f32; 2],
) -> Shape {
    let pts = [
        [a[0], a[1], 0.0],
        [b[0], b[1], 0.0],
        [c[0], c[1], 0.0],
        [d[0], d[1], 0.0],
    ];
    shape_from(ShapeMode::Polygon, style, transform, &pts).closed()
}

/// Rectangle in `style.rect_mode` coordinates. `radii` are the top-left, top-right,
/// bottom-right and bottom-left corner radii, each clamped to half the shorter side.
pub fn rect(
    cache: &mut GeometryCache,
    style: &Style,
    transform: Matrix,
    args: [f32; 4],
    radii: [f32; 4],
) -> Shape {
    let (x, y, w, h) = resolve_anchor(style.rect_mode, args[0], args[1], args[2], args[3]);
    let max_r = w.min(h) / 2.0;
    let radii = radii.map(|r| r.clamp(0.0, max_r));
    if radii.iter().all(|&r| r <= 0.0) {
        let pts = [[x, y, 0.0], [x + w, y, 0.0], [x + w, y + h, 0.0], [x, y + h, 0.0]];
        return shape_from(ShapeMode::Polygon, style, transform, &pts).closed();
    }

    // corner centers and the quarter of the unit circle each one sweeps, in screen-down y
    let corners = [
        ([x + radii[0], y + radii[0]], radii[0], 2),
        ([x + w - radii[1], y + radii[1]], radii[1], 3),
        ([x + w - radii[2], y + h - radii[2]], radii[2], 0),
        ([x + radii[3], y + h - radii[3]], radii[3], 1),
    ];
    let mut pts = Vec::new();
    for (center, r, quarter) in corners {
        if r <= 0.0 {
            let corner = [center[0], center[1], 0.0];
            pts.push(corner);
            continue;
        }
        let per_quarter = (ellipse_segments(2.0 * r, 2.0 * r) / 4).max(1);
        let ring = cache.ring(per_quarter * 4);
        let start = quarter * per_quarter;
        for k in 0..=per_quarter {
            let [cx, cy] = ring[((start + k) % (per_quarter * 4)) as usize];
            pts.push([center[0] + cx * r, center[1] + cy * r, 0.0]);
        }
    }
    shape_from(ShapeMode::Polygon, style, transform, &pts).closed()
}

/// Ellipse in `style.ellipse_mode` coordinates.
pub fn ellipse(cache: &mut GeometryCache, style: &Style, transform: Matrix, args: [f32; 4]) -> Shape {
    let (x, y, w, h) = resolve_anchor(style.ellipse_mode, args[0], args[1], args[2], args[3]);
    let (cx, cy, rx, ry) = (x + w / 2.0, y + h / 2.0, w / 2.0, h / 2.0);
    let ring = cache.ring(ellipse_segments(w, h));
    let pts: Vec<[f32; 3]> = ring
        .iter()
        .map(|[c, s]| [cx + c * rx, cy + s * ry, 0.0])
        .collect();
    shape_from(ShapeMode::Polygon, style, transform, &pts).closed()
}

/// Elliptical arc from `start` to `stop` radians (clockwise on screen). Returns no shapes
/// when `stop < start`; spans of a full turn or more draw the whole ellipse.
pub fn arc(
    cache: &mut GeometryCache,
    style: &Style,
    transform: Matrix,
    args: [f32; 4],
    start: f32,
    stop: f32,
    mode: ArcMode,
) -> Shapes {
    use std::f32::consts::TAU;

    if stop < start || (stop - start).is_nan() {
        return Shapes::new();
    }
    if stop - start >= TAU {
        return smallvec![ellipse(cache, style, transform, args)];
    }
    let (x, y, w, h) = resolve_anchor(style.ellipse_mode, args[0], args[1], args[2], args[3]);
    let (cx, cy, rx, ry) = (x + w / 2.0, y + h / 2.0, w / 2.0, h / 2.0);
    let full = ellipse_segments(w, h) as f32;
    let segments = ((full * (stop - start) / TAU).ceil() as u32).max(2);
    let rim: Vec<[f32; 3]> = (0..=segments)
        .map(|i| {
            let a = start + (stop - start) * i as f32 / segments as f32;
            [cx + a.cos() * rx, cy + a.sin() * ry, 0.0]
        })
        .collect();
    let mut pie = Vec::with_capacity(rim.len() + 1);
    pie.push([cx, cy, 0.0]);
    pie.extend_from_slice(&rim);

    let (fill_pts, fill_closed, stroke_pts, stroke_closed) = match mode {
        ArcMode::Default => (&pie, true, &rim, false),
        ArcMode::Open => (&rim, true, &rim, false),
        ArcMode::Chord => (&rim, true, &rim, true),
        ArcMode::Pie => (&pie, true, &pie, true),
    };

    let mut shapes = Shapes::new();
    if std::ptr::eq(fill_pts, stroke_pts) && fill_closed == stroke_closed {
        shapes.push(shape_from(ShapeMode::Polygon, style, transform, fill_pts).closed());
        return shapes;
    }
    if style.fill_enabled {
        let fill_style = Style {
            stroke_enabled: false,
            ..*style
        };
        let mut fill = shape_from(ShapeMode::Polygon, &fill_style, transform, fill_pts);
        fill.close = fill_closed;
        shapes.push(fill);
    }
    if style.stroke_enabled {
        let stroke_style = Style {
            fill_enabled: false,
            ..*style
        };
        let mut outline = shape_from(ShapeMode::Polygon, &stroke_style, transform, stroke_pts);
        outline.close = stroke_closed;
        shapes.push(outline);
    }
    shapes
}

/// Open cubic Bezier curve through `p0` and `p3`.
pub fn bezier(style: &Style, transform: Matrix, p: [[f32; 3]; 4]) -> Shape {
    let detail = style.detail.bezier.max(1);
    let pts: Vec<[f32; 3]> = (0..=detail)
        .map(|i| cubic_bezier(p[0], p[1], p[2], p[3], i as f32 / detail as f32))
        .collect();
    shape_from(ShapeMode::Polygon, style, transform, &pts)
}

/// Open Catmull-Rom segment from `p[1]` to `p[2]`.
pub fn curve(style: &Style, transform: Matrix, p: [[f32; 3]; 4]) -> Shape {
    let detail = style.detail.curve.max(1);
    let pts: Vec<[f32; 3]> = (0..=detail)
        .map(|i| catmull_rom(p, style.curve_tightness, i as f32 / detail as f32))
        .collect();
    shape_from(ShapeMode::Polygon, style, transform, &pts)
}

/// Axis-aligned box centered on the origin.
pub fn cuboid(style: &Style, transform: Matrix, w: f32, h: f32, d: f32) -> Shape {
    let (x, y, z) = (w / 2.0, h / 2.0, d / 2.0);
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0], [[-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]]),
        ([1.0, 0.0, 0.0], [[x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z]]),
        ([0.0, 0.0, -1.0], [[x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]]),
        ([-1.0, 0.0, 0.0], [[-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z]]),
        ([0.0, 1.0, 0.0], [[-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z]]),
        ([0.0, -1.0, 0.0], [[-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z]]),
    ];
    let mut shape = Shape::new(ShapeMode::Quads, *style, transform);
    for (normal, corners) in faces {
        for p in corners {
            shape
                .vertices
                .push(vertex(style, p).with_normal(Some(normal)));
        }
    }
    shape
}

pub fn sphere(cache: &mut GeometryCache, style: &Style, transform: Matrix, r: f32) -> Shape {
    let mesh = cache.sphere(style.detail.sphere_u, style.detail.sphere_v);
    let mut shape = Shape::new(ShapeMode::Triangles, *style, transform);
    shape.vertices = mesh
        .triangles
        .iter()
        .map(|&n| vertex(style, [n[0] * r, n[1] * r, n[2] * r]).with_normal(Some(n)))
        .collect();
    shape
}

/// Textured quad covering `(x, y, w, h)` in `style.rect_mode` coordinates. The image is
/// modulated by the tint and never stroked.
pub fn image(style: &Style, transform: Matrix, image: &Image, args: [f32; 4]) -> Shape {
    let (x, y, w, h) = resolve_anchor(style.rect_mode, args[0], args[1], args[2], args[3]);
    let style = Style {
        stroke_enabled: false,
        fill_enabled: true,
        ..*style
    };
    let corners = [
        ([x, y, 0.0], [0.0, 0.0]),
        ([x + w, y, 0.0], [1.0, 0.0]),
        ([x + w, y + h, 0.0], [1.0, 1.0]),
        ([x, y + h, 0.0], [0.0, 1.0]),
    ];
    let mut shape = Shape::new(ShapeMode::Quads, style, transform).with_texture(Some(image.clone()));
    shape.vertices = corners
        .iter()
        .map(|&(p, uv)| vertex(&style, p).with_uv(uv))
        .collect();
    shape
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipse_detail_is_clamped() {
        assert_eq!(ellipse_segments(0.0, 0.0), MIN_ELLIPSE_SEGMENTS);
        assert_eq!(ellipse_segments(100.0, 0.0), 31);
        assert_eq!(ellipse_segments(10_000.0, 10_000.0), MAX_ELLIPSE_SEGMENTS);
    }

    #[test]
    fn anchors_resolve_to_corner_and_size() {
        assert_eq!(resolve_anchor(ShapeAnchor::Corner, 1.0, 2.0, 3.0, 4.0), (1.0, 2.0, 3.0, 4.0));
        assert_eq!(resolve_anchor(ShapeAnchor::Corners, 4.0, 6.0, 1.0, 2.0), (1.0, 2.0, 3.0, 4.0));
        assert_eq!(resolve_anchor(ShapeAnchor::Center, 10.0, 10.0, 4.0, 2.0), (8.0, 9.0, 4.0, 2.0));
        assert_eq!(resolve_anchor(ShapeAnchor::Radius, 10.0, 10.0, 4.0, 2.0), (6.0, 8.0, 8.0, 4.0));
    }

    #[test]
    fn identical_calls_give_identical_geometry() {
        let mut cache = GeometryCache::default();
        let style = Style::default();
        let a = ellipse(&mut cache, &style, Matrix::identity(), [50.0, 50.0, 80.0, 40.0]);
        let b = ellipse(&mut cache, &style, Matrix::identity(), [50.0, 50.0, 80.0, 40.0]);
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.vertices.len() as u32, ellipse_segments(80.0, 40.0));
    }

    #[test]
    fn default_arc_splits_fill_and_outline() {
        let mut cache = GeometryCache::default();
        let style = Style::default();
        let shapes = arc(
            &mut cache,
            &style,
            Matrix::identity(),
            [0.0, 0.0, 100.0, 100.0],
            0.0,
            std::f32::consts::FRAC_PI_2,
            ArcMode::Default,
        );
        assert_eq!(shapes.len(), 2);
        assert!(!shapes[0].style.stroke_enabled);
        assert_eq!(shapes[0].vertices[0].position, [0.0, 0.0, 0.0]);
        assert!(!shapes[1].close);

        let pie = arc(
            &mut cache,
            &style,
            Matrix::identity(),
            [0.0, 0.0, 100.0, 100.0],
            0.0,
            1.0,
            ArcMode::Pie,
        );
        assert_eq!(pie.len(), 1);
        assert!(arc(
            &mut cache,
            &style,
            Matrix::identity(),
            [0.0, 0.0, 1.0, 1.0],
            1.0,
            0.0,
            ArcMode::Pie
        )
        .is_empty());
    }

    #[test]
    fn rounded_corners_add_vertices() {
        let mut cache = GeometryCache::default();
        let style = Style::default();
        let plain = rect(&mut cache, &style, Matrix::identity(), [0.0, 0.0, 40.0, 20.0], [0.0; 4]);
        assert_eq!(plain.vertices.len(), 4);
        let rounded = rect(&mut cache, &style, Matrix::identity(), [0.0, 0.0, 40.0, 20.0], [5.0; 4]);
        assert!(rounded.vertices.len() > 4);
        for v in &rounded.vertices {
            assert!(v.position[0] >= -1e-4 && v.position[0] <= 40.0 + 1e-4);
            assert!(v.position[1] >= -1e-4 && v.position[1] <= 20.0 + 1e-4);
        }
    }

    #[test]
    fn box_faces_carry_outward_normals() {
        let shape = cuboid(&Style::default(), Matrix::identity(), 2.0, 2.0, 2.0);
        assert_eq!(shape.vertices.len(), 24);
        for v in &shape.vertices {
            let n = v.normal.unwrap();
            let d = v.position[0] * n[0] + v.position[1] * n[1] + v.position[2] * n[2];
            assert!((d - 1.0).abs() < 1e-5);
        }
    }
}
