//! # Phong Grid
//!
//! **An interactive 3D viewer for a grid of Blinn-Phong lit, gently pulsing
//! objects.**
//!
//! The core is a small transform pipeline: a [`MatrixStack`] for composing
//! hierarchical transforms, a yaw/pitch [`Camera`] that writes its projection
//! and view onto those stacks, and a composer that walks the [`Scene`] once
//! per frame and produces one [`DrawParams`] per object. Everything up to that
//! point is plain math; only the [`ShadingPass`] touches the GPU.
//!
//! ## Quick Start
//!
//! ```no_run
//! use phong_grid::{AppConfig, run};
//!
//! fn main() -> Result<(), phong_grid::ViewerError> {
//!     run(AppConfig::new().title("Phong Grid").size(800, 600))
//! }
//! ```
//!
//! ## Controls
//!
//! - Mouse motion: turn the camera (or only while dragging, see [`LookGate`])
//! - `w`/`s`: move forward/back, `a`/`d`: strafe
//! - `z`/`Z`: narrow/widen the field of view
//! - `c`: back-face culling, `t`: wireframe, space: pause the pulse
//! - Escape: quit
//!
//! ## Composing without a window
//!
//! ```
//! use phong_grid::{Camera, DrawParams, Light, Material, MeshBounds, MeshId, Scene, Vec3, WorldObject, compose_frame};
//!
//! struct Flat;
//! impl MeshBounds for Flat {
//!     fn lowest_y(&self, _mesh: MeshId) -> f32 {
//!         0.0
//!     }
//! }
//!
//! # fn build(mesh: MeshId) {
//! let mut scene = Scene::new(Light { position: Vec3::splat(10.0), color: Vec3::ONE });
//! scene.push(WorldObject::new(mesh, Material::unlit(Vec3::splat(0.5))).at([2.0, 0.0, 4.0]));
//!
//! let mut draws: Vec<DrawParams> = Vec::new();
//! compose_frame(&Camera::new(), &scene, &Flat, 0.0, &mut draws);
//! assert_eq!(draws.len(), 1);
//! # }
//! ```

mod app;
mod camera;
mod capture;
mod composer;
mod error;
mod gpu;
mod input;
mod matrix_stack;
mod mesh;
mod scene;
mod shading_pass;

pub use app::{AppConfig, CLEAR_COLOR, ViewerContext, run};
pub use camera::{
    Camera, InteractionMode, LOOK_SENSITIVITY, MAX_FOVY_DEGREES, MIN_FOVY_DEGREES, PITCH_LIMIT,
};
pub use capture::{FrameCapture, bgra_to_rgba, padded_bytes_per_row, unpad_rows};
pub use composer::{
    DrawParams, DrawSink, MeshBounds, PULSE_AMPLITUDE, PULSE_FREQUENCY, compose_frame,
    compose_object, normal_matrix, pulse_scale,
};
pub use error::ViewerError;
pub use gpu::GpuContext;
pub use input::{
    Command, Input, InputEvent, LookGate, MOVE_STEP, TOGGLE_ANIMATION, TOGGLE_CULL,
    TOGGLE_WIREFRAME, Toggles, ZOOM_STEP_DEGREES,
};
pub use matrix_stack::{MatrixStack, ScopedMatrix};
pub use mesh::{Mesh, MeshData, MeshId, MeshLibrary, Vertex3d};
pub use scene::{
    GRID_SIZE, GRID_SPACING, Light, Material, ObjectRole, Scene, SceneMeshes, WorldObject,
};
pub use shading_pass::{DEPTH_FORMAT, DrawUniforms, RasterState, ShadingPass, uniform_stride};

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
