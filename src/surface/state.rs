//! Transform, style, camera and lighting calls.

use super::*;
use crate::color::{ColorArg, ColorMode, ColorSpace};
use crate::lighting::{Falloff, Light};
use crate::matrix::Matrix;
use crate::projection;
use crate::style::{BlendMode, ShapeAnchor, StrokeCap, StrokeJoin, Style, TextureMode, TextureWrap};
use crate::util::{normalize3, transform_direction};

// Transforms
impl Surface {
    /// Saves the current transform. Fails with [`RenderError::StackDepthExceeded`] past the
    /// configured depth.
    pub fn push_matrix(&mut self) -> Result<()> {
        self.matrices.push()
    }

    pub fn pop_matrix(&mut self) -> Result<()> {
        self.matrices.pop()
    }

    pub fn matrix_depth(&self) -> usize {
        self.matrices.depth()
    }

    pub fn current_matrix(&self) -> &Matrix {
        self.matrices.current()
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.matrices.translate(dx, dy, 0.0);
    }

    pub fn translate3(&mut self, dx: f32, dy: f32, dz: f32) {
        self.matrices.translate(dx, dy, dz);
    }

    /// Rotation about the z axis.
    pub fn rotate(&mut self, angle: f32) {
        self.matrices.rotate(angle);
    }

    pub fn rotate_x(&mut self, angle: f32) {
        self.matrices.rotate_x(angle);
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.matrices.rotate_y(angle);
    }

    pub fn rotate_z(&mut self, angle: f32) {
        self.matrices.rotate_z(angle);
    }

    pub fn rotate_axis(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        self.matrices.rotate_axis(angle, x, y, z);
    }

    pub fn scale(&mut self, s: f32) {
        self.matrices.scale(s, s, s);
    }

    pub fn scale_xy(&mut self, sx: f32, sy: f32) {
        self.matrices.scale(sx, sy, 1.0);
    }

    pub fn scale3(&mut self, sx: f32, sy: f32, sz: f32) {
        self.matrices.scale(sx, sy, sz);
    }

    pub fn apply_matrix(&mut self, m: &Matrix) {
        self.matrices.apply(m);
    }

    pub fn reset_matrix(&mut self) {
        self.matrices.reset();
    }
}

// Camera and projection
impl Surface {
    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    /// Restores the default camera.
    pub fn camera(&mut self) {
        self.view.reset_camera();
    }

    pub fn camera_look_at(&mut self, eye: [f32; 3], center: [f32; 3], up: [f32; 3]) {
        self.view.view = projection::look_at(eye, center, up);
    }

    /// Pixel-aligned orthographic projection through the default camera.
    pub fn ortho(&mut self) {
        self.view.reset_ortho();
    }

    /// Orthographic projection with explicit bounds: `(left, bottom, -near)` in eye space lands
    /// on the near bottom-left corner of the viewport.
    pub fn ortho_bounds(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) {
        self.view.projection = projection::ortho(left, right, bottom, top, near, far);
    }

    /// Default 60 degree perspective.
    pub fn perspective(&mut self) {
        self.view.reset_perspective();
    }

    pub fn perspective_with(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.view.projection = projection::perspective(fov, aspect, near, far);
    }

    pub fn frustum(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.view.projection = projection::frustum(left, right, bottom, top, near, far);
    }

    /// Window position of a point given in the current model frame: pixels from the top-left
    /// corner and a depth in `0..1`. `None` when the point is at or behind the eye.
    pub fn screen_position(&self, x: f32, y: f32, z: f32) -> Option<[f32; 3]> {
        self.view
            .screen_position(self.matrices.current(), [x, y, z])
    }
}

// Style
impl Surface {
    pub fn style(&self) -> &Style {
        self.styles.current()
    }

    pub fn fill(&mut self, color: impl Into<ColorArg>) {
        self.styles.fill(color);
    }

    pub fn no_fill(&mut self) {
        self.styles.no_fill();
    }

    pub fn stroke(&mut self, color: impl Into<ColorArg>) {
        self.styles.stroke(color);
    }

    pub fn no_stroke(&mut self) {
        self.styles.no_stroke();
    }

    pub fn stroke_weight(&mut self, weight: f32) {
        self.styles.stroke_weight(weight);
    }

    pub fn stroke_cap(&mut self, cap: StrokeCap) {
        self.styles.current_mut().stroke_cap = cap;
    }

    pub fn stroke_join(&mut self, join: StrokeJoin) {
        self.styles.current_mut().stroke_join = join;
    }

    pub fn tint(&mut self, color: impl Into<ColorArg>) {
        self.styles.tint(color);
    }

    pub fn no_tint(&mut self) {
        self.styles.no_tint();
    }

    pub fn blend_mode(&mut self, mode: BlendMode) {
        self.styles.current_mut().blend_mode = mode;
    }

    /// Interpretation of numeric colors passed from now on, with one maximum for every
    /// channel. Colors set earlier keep their value.
    pub fn color_mode(&mut self, mode: ColorMode, max: f32) {
        self.styles.color_mode(ColorSpace::uniform(mode, max));
    }

    pub fn color_mode_with(&mut self, mode: ColorMode, max1: f32, max2: f32, max3: f32, max_alpha: f32) {
        self.styles
            .color_mode(ColorSpace::with_maxes(mode, max1, max2, max3, max_alpha));
    }

    /// Like [`Surface::color_mode_with`], keeping the current alpha maximum.
    pub fn color_mode_channels(&mut self, mode: ColorMode, max1: f32, max2: f32, max3: f32) {
        let space = self
            .styles
            .current()
            .color_space
            .with_channel_maxes(mode, max1, max2, max3);
        self.styles.color_mode(space);
    }

    /// Resolves a numeric color with the current color mode.
    pub fn color(&self, color: impl Into<ColorArg>) -> crate::color::Color {
        self.styles.resolve(color)
    }

    pub fn rect_mode(&mut self, mode: ShapeAnchor) {
        self.styles.current_mut().rect_mode = mode;
    }

    pub fn ellipse_mode(&mut self, mode: ShapeAnchor) {
        self.styles.current_mut().ellipse_mode = mode;
    }

    pub fn texture_mode(&mut self, mode: TextureMode) {
        self.styles.current_mut().texture_mode = mode;
    }

    pub fn texture_wrap(&mut self, wrap: TextureWrap) {
        self.styles.current_mut().texture_wrap = wrap;
    }

    pub fn curve_tightness(&mut self, tightness: f32) {
        self.styles.current_mut().curve_tightness = tightness;
    }

    pub fn bezier_detail(&mut self, segments: u32) {
        self.styles.current_mut().detail.bezier = segments.max(1);
    }

    pub fn curve_detail(&mut self, segments: u32) {
        self.styles.current_mut().detail.curve = segments.max(1);
    }

    /// Sphere resolution in longitude and latitude segments.
    pub fn sphere_detail(&mut self, u: u32, v: u32) {
        let detail = &mut self.styles.current_mut().detail;
        detail.sphere_u = u.max(3);
        detail.sphere_v = v.max(2);
    }

    pub fn push_style(&mut self) {
        self.styles.push();
    }

    pub fn pop_style(&mut self) -> Result<()> {
        self.styles.pop()
    }

    /// Fragment shader used by geometry drawn from now on.
    pub fn shader(&mut self, shader: &FragmentShader) {
        self.shader = Some(shader.clone());
    }

    pub fn reset_shader(&mut self) {
        self.shader = None;
    }
}

// Lights
impl Surface {
    /// Replaces the lights with a half-gray ambient light and a half-gray directional light
    /// shining along -z.
    pub fn lights(&mut self) {
        self.lights.set_defaults();
    }

    pub fn no_lights(&mut self) {
        self.lights.clear();
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn ambient_light(&mut self, color: impl Into<ColorArg>) {
        let color = self.light_color(color);
        self.lights.add(Light::Ambient { color });
    }

    /// `direction` is given in the current model frame.
    pub fn directional_light(&mut self, color: impl Into<ColorArg>, direction: [f32; 3]) {
        let color = self.light_color(color);
        let direction = normalize3(transform_direction(self.matrices.current(), direction));
        self.lights.add(Light::Directional { color, direction });
    }

    /// `position` is given in the current model frame.
    pub fn point_light(&mut self, color: impl Into<ColorArg>, position: [f32; 3]) {
        let color = self.light_color(color);
        let position = self.matrices.transform_point(position[0], position[1], position[2]);
        self.lights.add(Light::Point { color, position });
    }

    /// Cone light at `position` aimed along `direction`, both in the current model frame.
    /// `angle` is the cone's half-angle in radians.
    pub fn spot_light(
        &mut self,
        color: impl Into<ColorArg>,
        position: [f32; 3],
        direction: [f32; 3],
        angle: f32,
        concentration: f32,
    ) {
        let color = self.light_color(color);
        let position = self.matrices.transform_point(position[0], position[1], position[2]);
        let direction = normalize3(transform_direction(self.matrices.current(), direction));
        self.lights.add(Light::Spot {
            color,
            position,
            direction,
            angle,
            concentration,
        });
    }

    /// Distance attenuation for point and spot lights. Reset by `lights` and `no_lights`.
    pub fn light_falloff(&mut self, constant: f32, linear: f32, quadratic: f32) {
        self.lights.set_falloff(Falloff {
            constant,
            linear,
            quadratic,
        });
    }

    fn light_color(&self, color: impl Into<ColorArg>) -> [f32; 3] {
        let [r, g, b, _] = self.styles.resolve(color).normalize();
        [r, g, b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: &Matrix, b: &Matrix) -> bool {
        a.to_array()
            .iter()
            .zip(b.to_array().iter())
            .all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn popped_transforms_do_not_leak() {
        let mut s = Surface::new_software(SurfaceConfig::new(4, 4));
        s.begin_draw().unwrap();
        s.push_matrix().unwrap();
        s.translate(10.0, 0.0);
        s.rotate(FRAC_PI_2);
        s.pop_matrix().unwrap();
        s.translate(5.0, 0.0);

        let mut expected = MatrixStack::default();
        expected.translate(5.0, 0.0, 0.0);
        assert!(close(s.current_matrix(), expected.current()));
        s.end_draw().unwrap();
    }

    #[test]
    fn hsb_fill_is_resolved_once() {
        let mut s = Surface::new_software(SurfaceConfig::new(4, 4));
        s.color_mode_with(ColorMode::Hsb, 360.0, 100.0, 100.0, 255.0);
        s.fill((0.0, 100.0, 100.0));
        assert_eq!(s.style().fill, Color::rgb(255, 0, 0));
        s.color_mode(ColorMode::Rgb, 1.0);
        assert_eq!(s.style().fill, Color::rgb(255, 0, 0));

        s.color_mode_channels(ColorMode::Hsb, 360.0, 100.0, 100.0);
        s.fill((120.0, 100.0, 100.0, 1.0));
        assert_eq!(s.style().fill, Color::rgb(0, 255, 0));
    }

    #[test]
    fn camera_calls_replace_the_previous_view() {
        let mut s = Surface::new_software(SurfaceConfig::new(20, 10));
        let default = *s.view_state();
        s.camera_look_at([0.0, 0.0, 50.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        s.perspective_with(1.0, 2.0, 1.0, 100.0);
        assert_ne!(*s.view_state(), default);
        s.camera();
        s.ortho();
        assert_eq!(*s.view_state(), default);
    }

    #[test]
    fn lights_are_reset_each_frame() {
        let mut s = Surface::new_software(SurfaceConfig::new(4, 4));
        s.begin_draw().unwrap();
        s.lights();
        s.point_light(Color::WHITE, [0.0, 0.0, 10.0]);
        assert_eq!(s.light_count(), 3);
        s.end_draw().unwrap();
        s.begin_draw().unwrap();
        assert_eq!(s.light_count(), 0);
        s.end_draw().unwrap();
    }

    #[test]
    fn spot_lights_follow_the_model_transform() {
        let mut s = Surface::new_software(SurfaceConfig::new(4, 4));
        s.begin_draw().unwrap();
        s.translate(5.0, 0.0);
        s.spot_light(Color::WHITE, [0.0, 0.0, 10.0], [0.0, 0.0, -1.0], 0.5, 2.0);
        s.light_falloff(1.0, 0.5, 0.0);

        let normal = [0.0, 0.0, 1.0];
        let [r, ..] = s.lights.shade(Color::WHITE, [5.0, 0.0, 0.0], normal).normalize();
        assert!((r - 1.0 / 6.0).abs() < 0.01, "got {r}");
        assert_eq!(s.lights.shade(Color::WHITE, [-5.0, 0.0, 0.0], normal), Color::BLACK);
        s.end_draw().unwrap();

        s.begin_draw().unwrap();
        assert_eq!(s.lights.falloff(), Falloff::default());
        s.end_draw().unwrap();
    }
}
