//! Camera and projection matrices.
//!
//! Everything is in row-vector convention like the rest of the crate: a model-space point
//! reaches clip space as `p * model * view * projection`. Clip space uses the GL depth range
//! (`-1..1`); backends remap depth as they need.

use crate::matrix::Matrix;
use crate::util::{normalize3, transform_point4};

/// Field of view of the default camera, 60 degrees.
pub const DEFAULT_FOV: f32 = std::f32::consts::FRAC_PI_3;

/// Parameters of the default camera for a viewport size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraDefaults {
    pub fov: f32,
    pub aspect: f32,
    pub eye: [f32; 3],
    pub center: [f32; 3],
    pub near: f32,
    pub far: f32,
}

impl CameraDefaults {
    /// Eye on the +z axis above the viewport center, at the distance where a 60 degree
    /// frustum shows exactly `height` units at z = 0.
    pub fn for_size(width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let eye_z = (h / 2.0) / (DEFAULT_FOV / 2.0).tan();
        Self {
            fov: DEFAULT_FOV,
            aspect: w / h,
            eye: [w / 2.0, h / 2.0, eye_z],
            center: [w / 2.0, h / 2.0, 0.0],
            near: eye_z / 10.0,
            far: eye_z * 10.0,
        }
    }
}

/// View matrix looking from `eye` towards `center`.
pub fn look_at(eye: [f32; 3], center: [f32; 3], up: [f32; 3]) -> Matrix {
    let z = normalize3([eye[0] - center[0], eye[1] - center[1], eye[2] - center[2]]);
    let x = normalize3(cross(up, z));
    let y = normalize3(cross(z, x));
    let rotation = Matrix::new(
        x[0], y[0], z[0], 0.0, //
        x[1], y[1], z[1], 0.0, //
        x[2], y[2], z[2], 0.0, //
        0.0, 0.0, 0.0, 1.0,
    );
    Matrix::translation(-eye[0], -eye[1], -eye[2]).then(&rotation)
}

/// Perspective frustum. The y axis is flipped so that, seen through the default camera,
/// y grows downwards on screen.
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix {
    let (w, h, d) = (right - left, top - bottom, far - near);
    Matrix::new(
        2.0 * near / w, 0.0, 0.0, 0.0, //
        0.0, -2.0 * near / h, 0.0, 0.0, //
        (right + left) / w, (top + bottom) / h, -(far + near) / d, -1.0, //
        0.0, 0.0, -2.0 * far * near / d, 0.0,
    )
}

pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Matrix {
    let y_max = near * (fov / 2.0).tan();
    let x_max = y_max * aspect;
    frustum(-x_max, x_max, -y_max, y_max, near, far)
}

/// Standard orthographic projection: `(left, bottom, -near)` maps to NDC `(-1, -1, -1)`.
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix {
    let (w, h, d) = (right - left, top - bottom, far - near);
    Matrix::new(
        2.0 / w, 0.0, 0.0, 0.0, //
        0.0, 2.0 / h, 0.0, 0.0, //
        0.0, 0.0, -2.0 / d, 0.0, //
        -(right + left) / w, -(top + bottom) / h, -(far + near) / d, 1.0,
    )
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Projection, camera and viewport of one surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub projection: Matrix,
    pub view: Matrix,
    pub width: u32,
    pub height: u32,
}

impl ViewState {
    /// Default camera with either a perspective or a pixel-aligned orthographic projection.
    pub fn new(width: u32, height: u32, perspective_projection: bool) -> Self {
        let mut state = Self {
            projection: Matrix::identity(),
            view: Matrix::identity(),
            width,
            height,
        };
        state.reset_camera();
        if perspective_projection {
            state.reset_perspective();
        } else {
            state.reset_ortho();
        }
        state
    }

    pub fn defaults(&self) -> CameraDefaults {
        CameraDefaults::for_size(self.width, self.height)
    }

    pub fn reset_camera(&mut self) {
        let d = self.defaults();
        self.view = look_at(d.eye, d.center, [0.0, 1.0, 0.0]);
    }

    pub fn reset_perspective(&mut self) {
        let d = self.defaults();
        self.projection = perspective(d.fov, d.aspect, d.near, d.far);
    }

    /// Orthographic projection that shows the viewport one unit per pixel through the
    /// default camera, with y growing downwards.
    pub fn reset_ortho(&mut self) {
        let d = self.defaults();
        let (hw, hh) = (self.width as f32 / 2.0, self.height as f32 / 2.0);
        self.projection = ortho(-hw, hw, hh, -hh, d.near, d.far);
    }

    /// Model to clip transform for the given model matrix.
    pub fn clip_matrix(&self, model: &Matrix) -> Matrix {
        model.then(&self.view).then(&self.projection)
    }

    /// Window coordinates of a clip-space position: pixels from the top-left corner plus a
    /// depth in `0..1`. Returns `None` for points at or behind the eye.
    pub fn clip_to_window(&self, clip: [f32; 4]) -> Option<[f32; 3]> {
        if clip[3] <= f32::EPSILON {
            return None;
        }
        let ndc = [clip[0] / clip[3], clip[1] / clip[3], clip[2] / clip[3]];
        Some([
            (ndc[0] + 1.0) / 2.0 * self.width as f32,
            (1.0 - ndc[1]) / 2.0 * self.height as f32,
            (ndc[2] + 1.0) / 2.0,
        ])
    }

    pub fn screen_position(&self, model: &Matrix, p: [f32; 3]) -> Option<[f32; 3]> {
        let clip = transform_point4(&self.clip_matrix(model), p[0], p[1], p[2]);
        self.clip_to_window(clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        (0..3).all(|i| (a[i] - b[i]).abs() < 1e-3)
    }

    #[test]
    fn default_perspective_maps_pixels_at_z_zero() {
        let view = ViewState::new(200, 100, true);
        let id = Matrix::identity();
        let origin = view.screen_position(&id, [0.0, 0.0, 0.0]).unwrap();
        assert!(origin[0].abs() < 1e-2 && origin[1].abs() < 1e-2);
        let p = view.screen_position(&id, [150.0, 25.0, 0.0]).unwrap();
        assert!((p[0] - 150.0).abs() < 1e-2 && (p[1] - 25.0).abs() < 1e-2);
    }

    #[test]
    fn default_ortho_maps_pixels() {
        let view = ViewState::new(200, 100, false);
        let p = view
            .screen_position(&Matrix::identity(), [30.0, 70.0, 0.0])
            .unwrap();
        assert!((p[0] - 30.0).abs() < 1e-3 && (p[1] - 70.0).abs() < 1e-3);
    }

    #[test]
    fn ortho_maps_near_bottom_left_to_the_viewport_corner() {
        let mut view = ViewState::new(64, 32, true);
        view.view = look_at([0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]);
        view.projection = ortho(-3.0, 5.0, -2.0, 6.0, 1.0, 9.0);
        let p = view
            .screen_position(&Matrix::identity(), [-3.0, -2.0, -1.0])
            .unwrap();
        assert!(close(p, [0.0, 32.0, 0.0]));
        let q = view
            .screen_position(&Matrix::identity(), [5.0, 6.0, -9.0])
            .unwrap();
        assert!(close(q, [64.0, 0.0, 1.0]));
    }

    #[test]
    fn look_at_along_negative_z_is_identity() {
        let m = look_at([0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]);
        for (a, b) in m.to_array().iter().zip(Matrix::identity().to_array().iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn points_closer_to_the_eye_have_smaller_depth() {
        let view = ViewState::new(100, 100, true);
        let id = Matrix::identity();
        let near = view.screen_position(&id, [50.0, 50.0, 10.0]).unwrap();
        let far = view.screen_position(&id, [50.0, 50.0, -10.0]).unwrap();
        assert!(near[2] < far[2]);
    }

    #[test]
    fn negative_w_is_behind_the_eye() {
        let view = ViewState::new(100, 100, true);
        assert!(view.clip_to_window([0.5, 0.5, 0.5, -2.0]).is_none());
        assert!(view.clip_to_window([0.0, 0.0, 0.0, 0.0]).is_none());
        assert!(view.clip_to_window([0.0, 0.0, 0.0, 1.0]).is_some());
    }
}
