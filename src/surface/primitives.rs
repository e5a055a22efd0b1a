//! Convenience primitives. Each call builds shapes with the current style and transform and
//! queues them like a recorded shape.

use super::*;
use crate::batch::{DrawBatch, Topology};
use crate::color::{Color, ColorArg};
use crate::primitives::{self as build, ArcMode};
use crate::matrix::Matrix;
use crate::shape::Shape;
use crate::style::{BlendMode, Style, TextureWrap};
use crate::vertex::GpuVertex;

impl Surface {
    fn emit_primitive(
        &mut self,
        operation: &'static str,
        make: impl FnOnce(&mut GeometryCache, &Style, Matrix) -> Shape,
    ) -> Result<()> {
        self.require_drawing(operation)?;
        let shape = make(
            &mut self.geometry_cache,
            self.styles.current(),
            *self.matrices.current(),
        );
        self.emit(shape);
        Ok(())
    }

    /// Clears color and depth. Numeric arguments follow the current color mode.
    pub fn background(&mut self, color: impl Into<ColorArg>) -> Result<()> {
        self.require_drawing("background")?;
        let color = self.styles.resolve(color);
        self.draw_list.clear_to(color);
        Ok(())
    }

    /// Clears to transparent and covers the whole surface with `image`, stretched to fit,
    /// ignoring the current transform, camera and tint.
    pub fn background_image(&mut self, image: &Image) -> Result<()> {
        self.require_drawing("background_image")?;
        self.draw_list.clear_to(Color::TRANSPARENT);

        let corner = |x: f32, y: f32| GpuVertex {
            clip: [x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0],
            color: [1.0; 4],
            tex_coords: [x, y],
        };
        let (tl, tr, br, bl) = (
            corner(0.0, 0.0),
            corner(1.0, 0.0),
            corner(1.0, 1.0),
            corner(0.0, 1.0),
        );
        let mut batch = DrawBatch::new(Topology::Triangles, BlendMode::Replace, false)
            .with_texture(Some((image.clone(), TextureWrap::Clamp)));
        batch.vertices = vec![tl, tr, br, tl, br, bl];
        self.draw_list.push(batch);
        Ok(())
    }

    pub fn point(&mut self, x: f32, y: f32) -> Result<()> {
        self.point3(x, y, 0.0)
    }

    pub fn point3(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.emit_primitive("point", |_, style, tf| build::point(style, tf, [x, y, z]))
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<()> {
        self.line3([x1, y1, 0.0], [x2, y2, 0.0])
    }

    pub fn line3(&mut self, a: [f32; 3], b: [f32; 3]) -> Result<()> {
        self.emit_primitive("line", |_, style, tf| build::line(style, tf, a, b))
    }

    pub fn triangle(&mut self, a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> Result<()> {
        self.emit_primitive("triangle", |_, style, tf| build::triangle(style, tf, a, b, c))
    }

    pub fn quad(&mut self, a: [f32; 2], b: [f32; 2], c: [f32; 2], d: [f32; 2]) -> Result<()> {
        self.emit_primitive("quad", |_, style, tf| build::quad(style, tf, a, b, c, d))
    }

    /// Rectangle interpreted by the current `rect_mode`.
    pub fn rect(&mut self, a: f32, b: f32, c: f32, d: f32) -> Result<()> {
        self.rect_rounded(a, b, c, d, [0.0; 4])
    }

    /// Rectangle with per-corner radii: top-left, top-right, bottom-right, bottom-left.
    pub fn rect_rounded(&mut self, a: f32, b: f32, c: f32, d: f32, radii: [f32; 4]) -> Result<()> {
        self.emit_primitive("rect", |cache, style, tf| {
            build::rect(cache, style, tf, [a, b, c, d], radii)
        })
    }

    pub fn square(&mut self, x: f32, y: f32, size: f32) -> Result<()> {
        self.rect(x, y, size, size)
    }

    /// Ellipse interpreted by the current `ellipse_mode`.
    pub fn ellipse(&mut self, a: f32, b: f32, c: f32, d: f32) -> Result<()> {
        self.emit_primitive("ellipse", |cache, style, tf| {
            build::ellipse(cache, style, tf, [a, b, c, d])
        })
    }

    pub fn circle(&mut self, x: f32, y: f32, diameter: f32) -> Result<()> {
        self.ellipse(x, y, diameter, diameter)
    }

    /// Arc of the ellipse `(a, b, c, d)` from `start` to `stop` radians.
    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &mut self,
        a: f32,
        b: f32,
        c: f32,
        d: f32,
        start: f32,
        stop: f32,
        mode: ArcMode,
    ) -> Result<()> {
        self.require_drawing("arc")?;
        let shapes = build::arc(
            &mut self.geometry_cache,
            self.styles.current(),
            *self.matrices.current(),
            [a, b, c, d],
            start,
            stop,
            mode,
        );
        for shape in shapes {
            self.emit(shape);
        }
        Ok(())
    }

    /// Cubic Bezier from `a` to `b` with control points `c1` and `c2`.
    pub fn bezier(&mut self, a: [f32; 2], c1: [f32; 2], c2: [f32; 2], b: [f32; 2]) -> Result<()> {
        let p = [a, c1, c2, b].map(|[x, y]| [x, y, 0.0]);
        self.emit_primitive("bezier", |_, style, tf| build::bezier(style, tf, p))
    }

    /// Catmull-Rom segment from `b` to `c`, shaped by `a` and `d`.
    pub fn curve(&mut self, a: [f32; 2], b: [f32; 2], c: [f32; 2], d: [f32; 2]) -> Result<()> {
        let p = [a, b, c, d].map(|[x, y]| [x, y, 0.0]);
        self.emit_primitive("curve", |_, style, tf| build::curve(style, tf, p))
    }

    /// Box centered on the origin of the current transform.
    pub fn cuboid(&mut self, width: f32, height: f32, depth: f32) -> Result<()> {
        self.emit_primitive("box", |_, style, tf| {
            build::cuboid(style, tf, width, height, depth)
        })
    }

    pub fn cube(&mut self, size: f32) -> Result<()> {
        self.cuboid(size, size, size)
    }

    pub fn sphere(&mut self, radius: f32) -> Result<()> {
        self.emit_primitive("sphere", |cache, style, tf| {
            build::sphere(cache, style, tf, radius)
        })
    }

    /// Draws `image` at its natural size.
    pub fn image(&mut self, image: &Image, x: f32, y: f32) -> Result<()> {
        let (w, h) = image.size();
        self.image_sized(image, x, y, w as f32, h as f32)
    }

    /// Draws `image` into `(x, y, w, h)`, interpreted by the current `rect_mode`.
    pub fn image_sized(&mut self, image: &Image, x: f32, y: f32, w: f32, h: f32) -> Result<()> {
        self.emit_primitive("image", |_, style, tf| {
            build::image(style, tf, image, [x, y, w, h])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(size: u32, f: impl FnOnce(&mut Surface) -> Result<()>) -> Surface {
        let mut s = Surface::new_software(SurfaceConfig::new(size, size));
        s.draw(f).unwrap();
        s
    }

    #[test]
    fn rect_covers_its_pixels() {
        let s = &mut frame(10, |s| {
            s.background(Color::BLACK)?;
            s.no_stroke();
            s.fill(Color::rgb(0, 255, 0));
            s.rect(2.0, 2.0, 4.0, 4.0)
        });
        assert_eq!(s.get_pixel(3, 3).unwrap(), Color::rgb(0, 255, 0));
        assert_eq!(s.get_pixel(5, 5).unwrap(), Color::rgb(0, 255, 0));
        assert_eq!(s.get_pixel(6, 6).unwrap(), Color::BLACK);
        assert_eq!(s.get_pixel(1, 1).unwrap(), Color::BLACK);
    }

    #[test]
    fn background_numeric_uses_color_mode() {
        let s = &mut frame(4, |s| s.background(128.0));
        assert_eq!(s.get_pixel(0, 0).unwrap(), Color::rgb(128, 128, 128));
    }

    #[test]
    fn image_is_drawn_with_its_pixels() {
        let image = Image::new(2, 2);
        image.set(0, 0, Color::rgb(255, 0, 0));
        image.set(1, 0, Color::rgb(0, 255, 0));
        image.set(0, 1, Color::rgb(0, 0, 255));
        image.set(1, 1, Color::WHITE);
        let s = &mut frame(4, |s| {
            s.background(Color::BLACK)?;
            s.image_sized(&image, 0.0, 0.0, 4.0, 4.0)
        });
        assert_eq!(s.get_pixel(0, 0).unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(s.get_pixel(3, 0).unwrap(), Color::rgb(0, 255, 0));
        assert_eq!(s.get_pixel(0, 3).unwrap(), Color::rgb(0, 0, 255));
        assert_eq!(s.get_pixel(3, 3).unwrap(), Color::WHITE);
    }

    #[test]
    fn background_image_fills_the_surface() {
        let image = Image::new(1, 1);
        image.set(0, 0, Color::rgb(10, 20, 30));
        let s = &mut frame(5, |s| {
            s.translate(100.0, 100.0);
            s.background_image(&image)
        });
        assert_eq!(s.get_pixel(0, 0).unwrap(), Color::rgb(10, 20, 30));
        assert_eq!(s.get_pixel(4, 4).unwrap(), Color::rgb(10, 20, 30));
    }
}
