//! The model transform and its save/restore stack.
//!
//! Matrices are `euclid` transforms in row-vector convention (`p' = p * M`). Every operation
//! on the stack is a *local* operation: it is applied to vertices before the transforms that
//! were already on the current matrix, so `translate` followed by `rotate` rotates about the
//! translated origin.

use euclid::default::Transform3D;

use crate::error::{RenderError, Result};
use crate::util::transform_point4;

pub type Matrix = Transform3D<f32>;

/// Default depth limit, matching the classic fixed-size modelview stack.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Rotation by `angle` radians around `axis`. The axis does not need to be normalized; a
/// zero axis yields the identity.
pub fn rotation(angle: f32, axis: [f32; 3]) -> Matrix {
    let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if len <= f32::EPSILON {
        return Matrix::identity();
    }
    let (x, y, z) = (axis[0] / len, axis[1] / len, axis[2] / len);
    let (s, c) = angle.sin_cos();
    let t = 1.0 - c;

    // Rodrigues rotation, written for row vectors.
    Matrix::new(
        t * x * x + c,
        t * x * y + s * z,
        t * x * z - s * y,
        0.0,
        t * x * y - s * z,
        t * y * y + c,
        t * y * z + s * x,
        0.0,
        t * x * z + s * y,
        t * y * z - s * x,
        t * z * z + c,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
    )
}

#[derive(Debug, Clone)]
pub struct MatrixStack {
    current: Matrix,
    saved: Vec<Matrix>,
    max_depth: usize,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl MatrixStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            current: Matrix::identity(),
            saved: Vec::with_capacity(max_depth.min(DEFAULT_MAX_DEPTH)),
            max_depth,
        }
    }

    pub fn current(&self) -> &Matrix {
        &self.current
    }

    /// Number of saved transforms.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn push(&mut self) -> Result<()> {
        if self.saved.len() >= self.max_depth {
            return Err(RenderError::StackDepthExceeded {
                limit: self.max_depth,
            });
        }
        self.saved.push(self.current);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<()> {
        let restored = self.saved.pop().ok_or(RenderError::UnbalancedStack)?;
        self.current = restored;
        Ok(())
    }

    /// Applies `m` before the current transform.
    pub fn apply(&mut self, m: &Matrix) {
        self.current = m.then(&self.current);
    }

    pub fn translate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.apply(&Matrix::translation(dx, dy, dz));
    }

    /// Rotation in the XY plane, the only rotation a 2D sketch needs.
    pub fn rotate(&mut self, angle: f32) {
        self.rotate_z(angle);
    }

    pub fn rotate_x(&mut self, angle: f32) {
        self.apply(&rotation(angle, [1.0, 0.0, 0.0]));
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.apply(&rotation(angle, [0.0, 1.0, 0.0]));
    }

    pub fn rotate_z(&mut self, angle: f32) {
        self.apply(&rotation(angle, [0.0, 0.0, 1.0]));
    }

    pub fn rotate_axis(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        self.apply(&rotation(angle, [x, y, z]));
    }

    pub fn scale(&mut self, sx: f32, sy: f32, sz: f32) {
        self.apply(&Matrix::scale(sx, sy, sz));
    }

    /// Replaces the current transform without touching saved entries.
    pub fn set(&mut self, m: Matrix) {
        self.current = m;
    }

    pub fn reset(&mut self) {
        self.current = Matrix::identity();
    }

    /// Drops every saved transform and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let leaked = self.saved.len();
        self.saved.clear();
        self.current = Matrix::identity();
        leaked
    }

    pub fn transform_point(&self, x: f32, y: f32, z: f32) -> [f32; 3] {
        let p = transform_point4(&self.current, x, y, z);
        let w = if p[3].abs() < 1e-6 { 1.0 } else { p[3] };
        [p[0] / w, p[1] / w, p[2] / w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn assert_matrix_eq(a: &Matrix, b: &Matrix) {
        for (x, y) in a.to_array().iter().zip(b.to_array().iter()) {
            assert!((x - y).abs() < 1e-5, "{:?} != {:?}", a, b);
        }
    }

    fn assert_point_eq(a: [f32; 3], b: [f32; 3]) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-4, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn push_pop_discards_intervening_transforms() {
        let mut stack = MatrixStack::default();
        stack.push().unwrap();
        stack.translate(10.0, 0.0, 0.0);
        stack.rotate(PI / 2.0);
        stack.pop().unwrap();
        stack.translate(5.0, 0.0, 0.0);

        let mut expected = MatrixStack::default();
        expected.translate(5.0, 0.0, 0.0);
        assert_matrix_eq(stack.current(), expected.current());
    }

    #[test]
    fn equal_push_and_pop_counts_restore_the_transform() {
        let mut stack = MatrixStack::default();
        stack.translate(3.0, 4.0, 0.0);
        stack.scale(2.0, 2.0, 1.0);
        let before = *stack.current();

        for i in 0..8 {
            stack.push().unwrap();
            stack.rotate_axis(0.3 * i as f32, 1.0, 1.0, 0.0);
            stack.translate(i as f32, -1.0, 2.0);
        }
        for _ in 0..8 {
            stack.pop().unwrap();
        }
        assert_matrix_eq(stack.current(), &before);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn pop_on_empty_stack_fails_without_changing_state() {
        let mut stack = MatrixStack::default();
        stack.translate(1.0, 2.0, 3.0);
        let before = *stack.current();
        assert!(matches!(stack.pop(), Err(RenderError::UnbalancedStack)));
        assert_matrix_eq(stack.current(), &before);
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut stack = MatrixStack::new(2);
        stack.push().unwrap();
        stack.push().unwrap();
        assert!(matches!(
            stack.push(),
            Err(RenderError::StackDepthExceeded { limit: 2 })
        ));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn operations_are_local() {
        let mut stack = MatrixStack::default();
        stack.translate(10.0, 0.0, 0.0);
        stack.rotate(FRAC_PI_2);
        // rotate about the translated origin: +x becomes +y
        assert_point_eq(stack.transform_point(1.0, 0.0, 0.0), [10.0, 1.0, 0.0]);

        let mut stack = MatrixStack::default();
        stack.rotate(FRAC_PI_2);
        stack.translate(10.0, 0.0, 0.0);
        assert_point_eq(stack.transform_point(0.0, 0.0, 0.0), [0.0, 10.0, 0.0]);
    }

    #[test]
    fn rotations_about_one_axis_add_up() {
        let mut a = MatrixStack::default();
        a.rotate_x(0.4);
        a.rotate_x(0.5);
        let mut b = MatrixStack::default();
        b.rotate_x(0.9);
        assert_matrix_eq(a.current(), b.current());
    }

    #[test]
    fn order_of_different_axes_matters() {
        let mut a = MatrixStack::default();
        a.rotate_x(FRAC_PI_2);
        a.rotate_y(FRAC_PI_2);
        let mut b = MatrixStack::default();
        b.rotate_y(FRAC_PI_2);
        b.rotate_x(FRAC_PI_2);
        let pa = a.transform_point(1.0, 0.0, 0.0);
        let pb = b.transform_point(1.0, 0.0, 0.0);
        assert!((pa[0] - pb[0]).abs() + (pa[1] - pb[1]).abs() + (pa[2] - pb[2]).abs() > 0.5);
    }

    #[test]
    fn clear_reports_leaked_pushes() {
        let mut stack = MatrixStack::default();
        stack.push().unwrap();
        stack.push().unwrap();
        assert_eq!(stack.clear(), 2);
        assert_eq!(stack.depth(), 0);
    }
}
