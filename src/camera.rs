//! A free-flying yaw/pitch camera driven by pointer and keyboard input.
//!
//! [`Camera`] owns both the projection parameters (field of view, aspect
//! ratio, clip planes) and the view parameters (world position, yaw, pitch).
//! Input handlers mutate it between frames; once per frame it writes its
//! projection and view matrices onto caller-supplied [`MatrixStack`]s.
//!
//! # Conventions
//!
//! - `yaw = 0` looks down `+Z`. Positive yaw turns toward `+X`.
//! - Pitch is bounded to `[-1, 1]` radians, well short of straight up/down,
//!   so the look-at basis never degenerates against the `+Y` up vector.
//! - `move_dir` and `move_side` stay on the horizontal plane; only the view
//!   direction uses pitch.
//! - Projection uses a `[0, 1]` clip depth range, matching wgpu.
//!
//! # Example
//!
//! ```
//! use phong_grid::{Camera, MatrixStack};
//!
//! let mut camera = Camera::new();
//! camera.mouse_clicked(100.0, 100.0, false, false, false);
//! camera.mouse_moved(110.0, 95.0);
//! camera.move_dir(0.1);
//!
//! let mut p = MatrixStack::new();
//! let mut mv = MatrixStack::new();
//! p.push_matrix();
//! camera.apply_projection_matrix(&mut p);
//! mv.push_matrix();
//! camera.apply_view_matrix(&mut mv);
//! ```

use glam::{Mat4, Vec2, Vec3};

use crate::matrix_stack::MatrixStack;

/// Radians of yaw/pitch per pixel of pointer motion.
pub const LOOK_SENSITIVITY: f32 = 0.01;
/// Pitch is clamped to `[-PITCH_LIMIT, PITCH_LIMIT]`.
pub const PITCH_LIMIT: f32 = 1.0;
/// Narrowest vertical field of view, in degrees.
pub const MIN_FOVY_DEGREES: f32 = 4.0;
/// Widest vertical field of view, in degrees.
pub const MAX_FOVY_DEGREES: f32 = 114.0;

/// What a pointer drag does, chosen by the modifiers held at click time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionMode {
    /// Selected by a plain click.
    #[default]
    Rotate,
    /// Selected by shift-click. Adds nothing beyond the look yet.
    Translate,
    /// Selected by ctrl-click. Adds nothing beyond the look yet.
    Scale,
}

impl InteractionMode {
    /// Pick the mode for a click. Shift wins over ctrl.
    pub fn from_modifiers(shift: bool, ctrl: bool) -> Self {
        if shift {
            Self::Translate
        } else if ctrl {
            Self::Scale
        } else {
            Self::Rotate
        }
    }
}

/// Projection and view state of the viewer.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Viewport width / height.
    pub aspect: f32,
    /// Vertical field of view in radians, kept within
    /// [`MIN_FOVY_DEGREES`]..=[`MAX_FOVY_DEGREES`].
    pub fovy: f32,
    /// Near clip distance.
    pub znear: f32,
    /// Far clip distance.
    pub zfar: f32,
    /// Eye position in world space.
    pub world_pos: Vec3,
    /// Horizontal look angle in radians.
    pub yaw: f32,
    /// Vertical look angle in radians, kept within `[-PITCH_LIMIT, PITCH_LIMIT]`.
    pub pitch: f32,
    mouse_prev: Vec2,
    mode: InteractionMode,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            aspect: 1.0,
            fovy: 45.0_f32.to_radians(),
            znear: 0.1,
            zfar: 1000.0,
            world_pos: Vec3::new(1.0, 2.0, 1.0),
            yaw: 0.0,
            pitch: 0.0,
            mouse_prev: Vec2::ZERO,
            mode: InteractionMode::Rotate,
        }
    }
}

impl Camera {
    /// Create a camera at `(1, 2, 1)` looking down `+Z` with a 45° field of view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the eye position.
    pub fn position(mut self, position: impl Into<Vec3>) -> Self {
        self.world_pos = position.into();
        self
    }

    /// Set the initial yaw in radians.
    pub fn yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    /// Set the initial pitch in radians (clamped).
    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self
    }

    /// The mode selected by the most recent click.
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Vertical field of view in degrees.
    pub fn fovy_degrees(&self) -> f32 {
        self.fovy.to_degrees()
    }

    /// Update the aspect ratio from a viewport size. Zero-sized viewports
    /// (a minimized window) are ignored.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Record a click: it becomes the reference point for drag deltas and
    /// selects the interaction mode from the held modifiers.
    pub fn mouse_clicked(&mut self, x: f32, y: f32, shift: bool, ctrl: bool, _alt: bool) {
        self.mouse_prev = Vec2::new(x, y);
        self.mode = InteractionMode::from_modifiers(shift, ctrl);
    }

    /// Apply pointer motion relative to the previous pointer position.
    ///
    /// The previous position is updated on every call, so deltas accumulate
    /// continuously. Gate calls on button state if only click-drags should
    /// turn the camera. Every mode turns the camera.
    pub fn mouse_moved(&mut self, x: f32, y: f32) {
        let current = Vec2::new(x, y);
        let delta = current - self.mouse_prev;

        match self.mode {
            InteractionMode::Rotate | InteractionMode::Translate | InteractionMode::Scale => {
                self.look(delta)
            }
        }

        self.mouse_prev = current;
    }

    fn look(&mut self, delta: Vec2) {
        self.yaw += LOOK_SENSITIVITY * delta.x;
        self.pitch = (self.pitch + LOOK_SENSITIVITY * delta.y).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Horizontal forward direction (ignores pitch).
    pub fn heading(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    /// Move forward (positive) or backward along the horizontal heading.
    pub fn move_dir(&mut self, delta: f32) {
        self.world_pos += delta * self.heading();
    }

    /// Strafe sideways on the horizontal plane.
    pub fn move_side(&mut self, delta: f32) {
        let side = self.heading().cross(Vec3::Y);
        self.world_pos += delta * side;
    }

    /// Widen (positive) or narrow the field of view by `delta` degrees.
    pub fn zoom(&mut self, delta: f32) {
        let degrees = (self.fovy_degrees() + delta).clamp(MIN_FOVY_DEGREES, MAX_FOVY_DEGREES);
        self.fovy = degrees.to_radians();
    }

    /// View direction including pitch.
    ///
    /// Pitch only feeds the y component, so this vector is not unit length
    /// once both angles are non-zero and its elevation is `atan(sin(pitch))`
    /// rather than `pitch`. The look-at normalizes it; the small elevation
    /// error is kept.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), self.pitch.sin(), self.yaw.cos())
    }

    /// Perspective projection for the current parameters.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// World-to-view transform for the current position and orientation.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.world_pos, self.world_pos + self.forward(), Vec3::Y)
    }

    /// Compose the projection onto `p`.
    pub fn apply_projection_matrix(&self, p: &mut MatrixStack) {
        p.mult_matrix(self.projection_matrix());
    }

    /// Compose the view transform onto `mv`.
    pub fn apply_view_matrix(&self, mv: &mut MatrixStack) {
        mv.mult_matrix(self.view_matrix());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn click_selects_mode_with_shift_before_ctrl() {
        let mut camera = Camera::new();
        camera.mouse_clicked(0.0, 0.0, true, true, false);
        assert_eq!(camera.mode(), InteractionMode::Translate);
        camera.mouse_clicked(0.0, 0.0, false, true, true);
        assert_eq!(camera.mode(), InteractionMode::Scale);
        camera.mouse_clicked(0.0, 0.0, false, false, true);
        assert_eq!(camera.mode(), InteractionMode::Rotate);
    }

    #[test]
    fn drag_turns_from_click_position() {
        let mut camera = Camera::new();
        camera.mouse_clicked(200.0, 100.0, false, false, false);
        camera.mouse_moved(210.0, 80.0);
        assert!((camera.yaw - 0.1).abs() < EPS);
        assert!((camera.pitch + 0.2).abs() < EPS);

        // Deltas are relative to the last move, not the click.
        camera.mouse_moved(215.0, 80.0);
        assert!((camera.yaw - 0.15).abs() < EPS);
    }

    #[test]
    fn pitch_clamps_at_limits() {
        let mut camera = Camera::new();
        camera.mouse_clicked(0.0, 0.0, false, false, false);
        for step in 1..=50 {
            camera.mouse_moved(0.0, step as f32 * 1000.0);
        }
        assert_eq!(camera.pitch, 1.0);

        for step in 1..=50 {
            camera.mouse_moved(0.0, -(step as f32) * 1000.0);
        }
        assert_eq!(camera.pitch, -1.0);
    }

    #[test]
    fn every_mode_turns_the_camera() {
        let mut camera = Camera::new();
        camera.mouse_clicked(0.0, 0.0, true, false, false);
        assert_eq!(camera.mode(), InteractionMode::Translate);
        camera.mouse_moved(10.0, 20.0);
        assert!((camera.yaw - 0.1).abs() < EPS);
        assert!((camera.pitch - 0.2).abs() < EPS);

        camera.mouse_clicked(10.0, 20.0, false, true, false);
        assert_eq!(camera.mode(), InteractionMode::Scale);
        camera.mouse_moved(20.0, 20.0);
        assert!((camera.yaw - 0.2).abs() < EPS);

        camera.mouse_clicked(20.0, 20.0, false, false, false);
        camera.mouse_moved(30.0, 20.0);
        assert!((camera.yaw - 0.3).abs() < EPS);
    }

    #[test]
    fn zoom_clamps_field_of_view() {
        let mut camera = Camera::new();
        for _ in 0..5 {
            camera.zoom(1000.0);
        }
        assert!((camera.fovy - 114.0_f32.to_radians()).abs() < EPS);

        for _ in 0..5 {
            camera.zoom(-1000.0);
        }
        assert!((camera.fovy - 4.0_f32.to_radians()).abs() < EPS);
    }

    #[test]
    fn zoom_steps_in_degrees() {
        let mut camera = Camera::new();
        camera.zoom(-1.0);
        assert!((camera.fovy_degrees() - 44.0).abs() < EPS);
    }

    #[test]
    fn movement_stays_on_horizontal_plane() {
        for i in 0..16 {
            let yaw = i as f32 * 0.45 - 3.0;
            let mut camera = Camera::new().yaw(yaw).pitch(0.8);
            let y = camera.world_pos.y;
            camera.move_dir(1.5);
            camera.move_side(-0.7);
            camera.move_dir(-0.3);
            assert!((camera.world_pos.y - y).abs() < EPS, "yaw {yaw}");
        }
    }

    #[test]
    fn move_dir_follows_heading() {
        let mut camera = Camera::new().position(Vec3::ZERO);
        camera.move_dir(2.0);
        assert!(camera.world_pos.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), EPS));
    }

    #[test]
    fn move_side_is_perpendicular_to_heading() {
        let mut camera = Camera::new().position(Vec3::ZERO).yaw(0.6);
        camera.move_side(1.0);
        assert!(camera.world_pos.dot(camera.heading()).abs() < EPS);
        // cross(+Z, +Y) = -X
        let mut camera = Camera::new().position(Vec3::ZERO);
        camera.move_side(1.0);
        assert!(camera.world_pos.abs_diff_eq(Vec3::NEG_X, EPS));
    }

    #[test]
    fn projection_matches_standard_perspective() {
        let camera = Camera::new();
        let mut p = MatrixStack::new();
        p.push_matrix();
        camera.apply_projection_matrix(&mut p);

        let expected = Mat4::perspective_rh(45.0_f32.to_radians(), 1.0, 0.1, 1000.0);
        assert!(p.top_matrix().abs_diff_eq(expected, 1e-6));

        let focal = 1.0 / (22.5_f32.to_radians()).tan();
        assert!((p.top_matrix().x_axis.x - focal).abs() < EPS);
        assert!((p.top_matrix().y_axis.y - focal).abs() < EPS);
    }

    #[test]
    fn view_at_origin_looks_down_positive_z() {
        let camera = Camera::new().position(Vec3::ZERO);
        let mut mv = MatrixStack::new();
        mv.push_matrix();
        camera.apply_view_matrix(&mut mv);

        let expected = Mat4::look_at_rh(Vec3::ZERO, Vec3::Z, Vec3::Y);
        assert!(mv.top_matrix().abs_diff_eq(expected, 1e-6));

        // A point ahead of the eye lands on the view-space -Z axis.
        let ahead = mv.top_matrix().transform_point3(Vec3::new(0.0, 0.0, 3.0));
        assert!(ahead.abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), EPS));
    }

    #[test]
    fn forward_is_not_renormalized() {
        let camera = Camera::new().yaw(0.5).pitch(0.5);
        assert!(camera.forward().length() > 1.0);
        assert!((camera.forward().y - 0.5_f32.sin()).abs() < EPS);
    }

    #[test]
    fn aspect_ignores_empty_viewport() {
        let mut camera = Camera::new();
        camera.set_aspect(640, 480);
        assert!((camera.aspect - 640.0 / 480.0).abs() < EPS);
        camera.set_aspect(640, 0);
        assert!((camera.aspect - 640.0 / 480.0).abs() < EPS);
    }
}
