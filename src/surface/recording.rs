use super::*;
use crate::shape::{EndShape, ShapeMode};

impl Surface {
    /// Opens a shape. Fails with [`RenderError::NestedShape`] while another one is open.
    pub fn begin_shape(&mut self, mode: ShapeMode) -> Result<()> {
        self.require_drawing("begin_shape")?;
        self.recorder
            .begin(mode, *self.styles.current(), *self.matrices.current())
    }

    /// Closes the open shape and queues it for drawing.
    pub fn end_shape(&mut self, end: EndShape) -> Result<()> {
        self.require_drawing("end_shape")?;
        let shape = self.recorder.end(end)?;
        self.emit(shape);
        Ok(())
    }

    /// Starts a hole in the open polygon; see [`crate::ShapeRecorder::begin_contour`].
    pub fn begin_contour(&mut self) -> Result<()> {
        self.require_drawing("begin_contour")?;
        self.recorder.begin_contour()
    }

    pub fn end_contour(&mut self) -> Result<()> {
        self.require_drawing("end_contour")?;
        self.recorder.end_contour()
    }

    pub fn vertex(&mut self, x: f32, y: f32) -> Result<()> {
        self.vertex_with([x, y, 0.0], None, "vertex")
    }

    pub fn vertex3(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.vertex_with([x, y, z], None, "vertex")
    }

    /// Vertex with texture coordinates, interpreted by the current `texture_mode`.
    pub fn vertex_uv(&mut self, x: f32, y: f32, u: f32, v: f32) -> Result<()> {
        self.vertex_with([x, y, 0.0], Some([u, v]), "vertex_uv")
    }

    pub fn vertex3_uv(&mut self, x: f32, y: f32, z: f32, u: f32, v: f32) -> Result<()> {
        self.vertex_with([x, y, z], Some([u, v]), "vertex_uv")
    }

    fn vertex_with(
        &mut self,
        position: [f32; 3],
        uv: Option<[f32; 2]>,
        operation: &'static str,
    ) -> Result<()> {
        self.require_drawing(operation)?;
        self.recorder
            .vertex(position, uv, self.matrices.current(), self.styles.current())
    }

    /// Normal carried by the following vertices; used by lighting.
    pub fn normal(&mut self, nx: f32, ny: f32, nz: f32) {
        self.recorder.normal([nx, ny, nz]);
    }

    /// Texture-maps the open shape with `image`.
    pub fn texture(&mut self, image: &Image) -> Result<()> {
        self.require_drawing("texture")?;
        self.recorder.texture(image)
    }

    pub fn bezier_vertex(&mut self, c1: [f32; 2], c2: [f32; 2], end: [f32; 2]) -> Result<()> {
        self.bezier_vertex3(
            [c1[0], c1[1], 0.0],
            [c2[0], c2[1], 0.0],
            [end[0], end[1], 0.0],
        )
    }

    pub fn bezier_vertex3(&mut self, c1: [f32; 3], c2: [f32; 3], end: [f32; 3]) -> Result<()> {
        self.require_drawing("bezier_vertex")?;
        self.recorder.bezier_vertex(
            c1,
            c2,
            end,
            self.matrices.current(),
            self.styles.current(),
        )
    }

    pub fn quadratic_vertex(&mut self, cx: f32, cy: f32, x: f32, y: f32) -> Result<()> {
        self.require_drawing("quadratic_vertex")?;
        self.recorder.quadratic_vertex(
            [cx, cy, 0.0],
            [x, y, 0.0],
            self.matrices.current(),
            self.styles.current(),
        )
    }

    /// Catmull-Rom control point; see [`crate::ShapeRecorder::curve_vertex`].
    pub fn curve_vertex(&mut self, x: f32, y: f32) -> Result<()> {
        self.curve_vertex3(x, y, 0.0)
    }

    pub fn curve_vertex3(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.require_drawing("curve_vertex")?;
        self.recorder
            .curve_vertex([x, y, z], self.matrices.current(), self.styles.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn drawing() -> Surface {
        let mut s = Surface::new_software(SurfaceConfig::new(10, 10));
        s.begin_draw().unwrap();
        s
    }

    #[test]
    fn vertex_without_begin_shape_records_nothing() {
        let mut s = drawing();
        s.background(Color::BLACK).unwrap();
        assert!(matches!(
            s.vertex(1.0, 1.0),
            Err(RenderError::UnmatchedEndShape {
                operation: "vertex"
            })
        ));
        assert!(matches!(
            s.end_shape(EndShape::Open),
            Err(RenderError::UnmatchedEndShape { .. })
        ));
        s.end_draw().unwrap();
        let pixels = s.load_pixels().unwrap();
        assert!(pixels.chunks(4).all(|p| p == [0, 0, 0, 255]));
    }

    #[test]
    fn nested_begin_shape_keeps_the_open_shape() {
        let mut s = drawing();
        s.begin_shape(ShapeMode::Triangles).unwrap();
        s.vertex(0.0, 0.0).unwrap();
        assert!(matches!(
            s.begin_shape(ShapeMode::Points),
            Err(RenderError::NestedShape)
        ));
        s.vertex(10.0, 0.0).unwrap();
        s.vertex(0.0, 10.0).unwrap();
        s.end_shape(EndShape::Open).unwrap();
        s.end_draw().unwrap();
    }

    #[test]
    fn wrong_vertex_count_is_rejected_and_cleared() {
        let mut s = drawing();
        s.begin_shape(ShapeMode::Triangles).unwrap();
        for i in 0..4 {
            s.vertex(i as f32, 0.0).unwrap();
        }
        assert!(matches!(
            s.end_shape(EndShape::Open),
            Err(RenderError::InvalidVertexCount { count: 4, .. })
        ));
        // the recorder was cleared, a new shape can start
        s.begin_shape(ShapeMode::Triangles).unwrap();
        s.end_draw().unwrap();
    }

    #[test]
    fn contours_punch_holes_through_polygons() {
        let mut s = Surface::new_software(SurfaceConfig::new(20, 20));
        s.begin_draw().unwrap();
        s.background(Color::BLACK).unwrap();
        s.no_stroke();
        s.fill(Color::WHITE);
        s.begin_shape(ShapeMode::Polygon).unwrap();
        for (x, y) in [(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)] {
            s.vertex(x, y).unwrap();
        }
        s.begin_contour().unwrap();
        for (x, y) in [(5.0, 5.0), (5.0, 15.0), (15.0, 15.0), (15.0, 5.0)] {
            s.vertex(x, y).unwrap();
        }
        s.end_contour().unwrap();
        s.end_shape(EndShape::Close).unwrap();
        s.end_draw().unwrap();

        assert_eq!(s.get_pixel(10, 10).unwrap(), Color::BLACK);
        assert_eq!(s.get_pixel(2, 2).unwrap(), Color::WHITE);
        assert_eq!(s.get_pixel(17, 10).unwrap(), Color::WHITE);
    }
}
