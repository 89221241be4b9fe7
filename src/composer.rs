//! Per-frame transform composition.
//!
//! Each frame the composer builds two fresh [`MatrixStack`]s, lets the
//! [`Camera`] write the projection and view onto them, then walks the scene:
//! every object gets its own push/pop level on the view stack, so the camera
//! transform is computed once and no object sees a sibling's transform.
//!
//! The result for each object is a [`DrawParams`] handed to a [`DrawSink`].
//! The sink is the only place that touches the GPU; everything here is plain
//! math and can be tested without a device.
//!
//! # Pulse animation
//!
//! [`ObjectRole::Prop`](crate::ObjectRole::Prop) objects breathe with
//! [`pulse_scale`]. The composer scales them uniformly by the pulse and lifts
//! them by `-lowest_y * pulse` so that the bottom of the mesh stays on the
//! floor while it grows.

use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::matrix_stack::MatrixStack;
use crate::mesh::MeshId;
use crate::scene::{Material, Scene, WorldObject};

/// Peak-to-center amplitude of the pulse.
pub const PULSE_AMPLITUDE: f32 = 0.05;
/// Pulses per second.
pub const PULSE_FREQUENCY: f32 = 1.0;

/// Access to the geometry facts the composer needs.
pub trait MeshBounds {
    /// The smallest vertex y coordinate of `mesh`.
    fn lowest_y(&self, mesh: MeshId) -> f32;
}

/// Receiver for composed draws, in scene order.
pub trait DrawSink {
    /// Draw one object.
    fn draw(&mut self, params: &DrawParams);
}

impl DrawSink for Vec<DrawParams> {
    fn draw(&mut self, params: &DrawParams) {
        self.push(*params);
    }
}

/// Everything the shading step needs for one object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawParams {
    /// Camera to clip space.
    pub projection: Mat4,
    /// Object to camera space.
    pub model_view: Mat4,
    /// Inverse-transpose of `model_view`, for normals.
    pub normal: Mat4,
    /// Light position in camera space.
    pub light_pos: Vec3,
    /// Light color.
    pub light_color: Vec3,
    /// Surface coefficients.
    pub material: Material,
    /// Geometry to draw.
    pub mesh: MeshId,
}

/// Uniform scale factor of the pulse animation at `time` seconds.
///
/// Oscillates between 1.0 and 1.1. At `time = 0` it is 1.05.
pub fn pulse_scale(time: f32) -> f32 {
    let phase = std::f32::consts::TAU * PULSE_FREQUENCY * time;
    1.0 + PULSE_AMPLITUDE + PULSE_AMPLITUDE * phase.sin()
}

/// Inverse-transpose of a model-view matrix.
///
/// # Panics
///
/// Panics if `model_view` is singular, since its normals would be undefined.
/// [`WorldObject::scaled`] already refuses zero scale axes; this catches
/// objects whose `scale` field was set directly.
pub fn normal_matrix(model_view: Mat4) -> Mat4 {
    let det = model_view.determinant();
    assert!(
        det != 0.0 && det.is_finite(),
        "normal matrix of a singular model-view (determinant {det})"
    );
    model_view.transpose().inverse()
}

/// Compose one object's transform on top of `mv` and return it.
///
/// Pushes a level, applies translate → rotate → scale, then for pulsing
/// objects the lift and the uniform pulse scale, and pops again. `mv` is left
/// exactly as it was.
pub fn compose_object(
    mv: &mut MatrixStack,
    object: &WorldObject,
    lowest_y: f32,
    pulse: f32,
) -> Mat4 {
    let mut level = mv.scoped();
    level.translate(object.translation);
    if object.rotation != Vec3::ZERO {
        level.rotate(object.rotation.x, Vec3::X);
        level.rotate(object.rotation.y, Vec3::Y);
        level.rotate(object.rotation.z, Vec3::Z);
    }
    level.scale(object.scale);
    if object.role.pulses() {
        level.translate(Vec3::new(0.0, -lowest_y * pulse, 0.0));
        level.scale(Vec3::splat(pulse));
    }
    level.top_matrix()
}

/// Compose every object in `scene` for one frame and hand it to `sink`.
///
/// `time` is the animation clock in seconds; pass `0.0` while animation is
/// paused.
pub fn compose_frame(
    camera: &Camera,
    scene: &Scene,
    meshes: &impl MeshBounds,
    time: f32,
    sink: &mut impl DrawSink,
) {
    let mut p = MatrixStack::new();
    let mut mv = MatrixStack::new();

    p.push_matrix();
    camera.apply_projection_matrix(&mut p);
    mv.push_matrix();
    camera.apply_view_matrix(&mut mv);

    let projection = p.top_matrix();
    let light = scene.light();
    let light_pos = mv.top_matrix().transform_point3(light.position);
    let pulse = pulse_scale(time);

    for object in scene.objects() {
        let lowest_y = if object.role.pulses() {
            meshes.lowest_y(object.mesh)
        } else {
            0.0
        };
        let model_view = compose_object(&mut mv, object, lowest_y, pulse);

        sink.draw(&DrawParams {
            projection,
            model_view,
            normal: normal_matrix(model_view),
            light_pos,
            light_color: light.color,
            material: object.material,
            mesh: object.mesh,
        });
    }

    mv.pop_matrix();
    p.pop_matrix();
    debug_assert!(mv.is_balanced() && p.is_balanced(), "unbalanced frame stacks");
}
