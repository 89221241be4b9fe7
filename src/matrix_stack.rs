//! Hierarchical transform composition.
//!
//! [`MatrixStack`] keeps a stack of 4×4 matrices in the style of the old
//! fixed-function pipeline. The top of the stack is the cumulative transform;
//! [`push_matrix`](MatrixStack::push_matrix) saves it and
//! [`pop_matrix`](MatrixStack::pop_matrix) restores it, so a parent transform
//! (the camera) is applied once and each child (a world object) is composed
//! on top of it without seeing its siblings.
//!
//! Matrices compose by right-multiplication: after `translate(t)` then
//! `scale(s)` the top is `parent * T * S`, so the scale is applied to the
//! object first.
//!
//! # Example
//!
//! ```
//! use phong_grid::{MatrixStack, Vec3};
//!
//! let mut mv = MatrixStack::new();
//! mv.push_matrix();
//! mv.translate(Vec3::new(2.0, 0.0, 4.0));
//! assert_eq!(mv.top_matrix().w_axis.truncate(), Vec3::new(2.0, 0.0, 4.0));
//! mv.pop_matrix();
//! assert!(mv.is_balanced());
//! ```

use glam::{Mat4, Quat, Vec3};

/// A stack of transform matrices with an identity base.
///
/// The stack is never empty. The base element cannot be popped; doing so is a
/// programming error and panics.
#[derive(Clone, Debug)]
pub struct MatrixStack {
    stack: Vec<Mat4>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self {
            stack: vec![Mat4::IDENTITY],
        }
    }
}

impl MatrixStack {
    /// Create a stack holding only the identity matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate the top matrix and push the copy.
    pub fn push_matrix(&mut self) {
        let top = self.top_matrix();
        self.stack.push(top);
    }

    /// Remove the top matrix, restoring the one beneath it.
    ///
    /// # Panics
    ///
    /// Panics if only the base element is left. An unmatched pop means the
    /// caller's transforms are already corrupt.
    pub fn pop_matrix(&mut self) {
        assert!(
            self.stack.len() > 1,
            "matrix stack underflow: pop_matrix called without a matching push_matrix"
        );
        self.stack.pop();
    }

    /// Right-multiply the top matrix: `top = top * matrix`.
    pub fn mult_matrix(&mut self, matrix: Mat4) {
        let top = self.top_mut();
        *top *= matrix;
    }

    /// Compose a translation onto the top matrix.
    pub fn translate(&mut self, offset: Vec3) {
        self.mult_matrix(Mat4::from_translation(offset));
    }

    /// Compose a (possibly non-uniform) scale onto the top matrix.
    pub fn scale(&mut self, factors: Vec3) {
        self.mult_matrix(Mat4::from_scale(factors));
    }

    /// Compose a rotation of `angle` radians around `axis` onto the top matrix.
    ///
    /// The axis does not need to be normalized. A zero axis leaves the top
    /// unchanged.
    pub fn rotate(&mut self, angle: f32, axis: Vec3) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        self.mult_matrix(Mat4::from_quat(Quat::from_axis_angle(axis, angle)));
    }

    /// The current cumulative transform.
    pub fn top_matrix(&self) -> Mat4 {
        // The base element is never popped.
        self.stack[self.stack.len() - 1]
    }

    /// Number of matrices on the stack, including the base.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True when every push has been matched by a pop.
    pub fn is_balanced(&self) -> bool {
        self.stack.len() == 1
    }

    /// Push the top and return a guard that pops it again when dropped.
    ///
    /// ```
    /// use phong_grid::{MatrixStack, Vec3};
    ///
    /// let mut mv = MatrixStack::new();
    /// {
    ///     let mut object = mv.scoped();
    ///     object.scale(Vec3::splat(2.0));
    /// }
    /// assert!(mv.is_balanced());
    /// ```
    pub fn scoped(&mut self) -> ScopedMatrix<'_> {
        self.push_matrix();
        ScopedMatrix { stack: self }
    }

    fn top_mut(&mut self) -> &mut Mat4 {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }
}

/// A pushed stack level that is popped when the guard goes out of scope.
///
/// Dereferences to the underlying [`MatrixStack`], so every transform
/// operation is available on the guard.
pub struct ScopedMatrix<'a> {
    stack: &'a mut MatrixStack,
}

impl std::ops::Deref for ScopedMatrix<'_> {
    type Target = MatrixStack;

    fn deref(&self) -> &MatrixStack {
        self.stack
    }
}

impl std::ops::DerefMut for ScopedMatrix<'_> {
    fn deref_mut(&mut self) -> &mut MatrixStack {
        self.stack
    }
}

impl Drop for ScopedMatrix<'_> {
    fn drop(&mut self) {
        self.stack.pop_matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn starts_with_identity() {
        let stack = MatrixStack::new();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top_matrix(), Mat4::IDENTITY);
        assert!(stack.is_balanced());
    }

    #[test]
    fn balanced_push_pop_restores_top_and_depth() {
        let mut stack = MatrixStack::new();
        stack.translate(Vec3::new(1.0, 2.0, 3.0));
        let before = stack.top_matrix();

        stack.push_matrix();
        stack.rotate(0.7, Vec3::Y);
        stack.push_matrix();
        stack.scale(Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(stack.depth(), 3);
        stack.pop_matrix();
        stack.push_matrix();
        stack.translate(Vec3::X);
        stack.pop_matrix();
        stack.pop_matrix();

        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top_matrix(), before);
    }

    #[test]
    fn pushed_copy_does_not_touch_the_level_beneath() {
        let mut stack = MatrixStack::new();
        stack.push_matrix();
        stack.translate(Vec3::new(5.0, 0.0, 0.0));
        stack.pop_matrix();
        assert_eq!(stack.top_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn mult_matrix_right_multiplies() {
        let a = Mat4::from_translation(Vec3::new(1.0, -2.0, 0.5));
        let b = Mat4::from_scale(Vec3::new(2.0, 2.0, 0.5));
        let base = Mat4::from_rotation_z(0.3);

        let mut stack = MatrixStack::new();
        stack.mult_matrix(base);
        let prev = stack.top_matrix();
        stack.push_matrix();
        stack.mult_matrix(a);
        stack.mult_matrix(b);

        assert!(approx_eq(stack.top_matrix(), prev * a * b));
        assert!(approx_eq(stack.top_matrix(), prev * (a * b)));
    }

    #[test]
    fn convenience_ops_match_elementary_matrices() {
        let mut stack = MatrixStack::new();
        stack.translate(Vec3::new(1.0, 2.0, 3.0));
        stack.rotate(std::f32::consts::FRAC_PI_2, Vec3::new(0.0, 2.0, 0.0));
        stack.scale(Vec3::new(1.0, 0.5, 2.0));

        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2)
            * Mat4::from_scale(Vec3::new(1.0, 0.5, 2.0));
        assert!(approx_eq(stack.top_matrix(), expected));
    }

    #[test]
    fn rotate_around_zero_axis_is_ignored() {
        let mut stack = MatrixStack::new();
        stack.rotate(1.0, Vec3::ZERO);
        assert_eq!(stack.top_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn scoped_guard_pops_on_drop() {
        let mut stack = MatrixStack::new();
        {
            let mut level = stack.scoped();
            level.translate(Vec3::splat(3.0));
            assert_eq!(level.depth(), 2);
        }
        assert!(stack.is_balanced());
        assert_eq!(stack.top_matrix(), Mat4::IDENTITY);
    }

    #[test]
    #[should_panic(expected = "matrix stack underflow")]
    fn popping_the_base_panics() {
        let mut stack = MatrixStack::new();
        stack.pop_matrix();
    }
}
