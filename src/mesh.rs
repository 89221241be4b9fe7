//! Mesh geometry: procedural generation on the CPU and GPU-resident buffers.
//!
//! - [`Vertex3d`]: position + normal, the layout the Blinn-Phong shader reads
//! - [`MeshData`]: CPU-side vertices and indices, with the built-in shapes
//! - [`Mesh`]: uploaded vertex/index buffers plus the lowest vertex height
//! - [`MeshLibrary`]: owns every [`Mesh`] and hands out [`MeshId`] handles
//!
//! World objects never own geometry. They store a [`MeshId`], so one mesh can
//! back any number of objects.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//!
//! All built-in shapes use counter-clockwise front faces.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::composer::MeshBounds;
use crate::gpu::GpuContext;

/// A vertex with a model-space position and normal.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// Model-space position.
    pub position: [f32; 3],
    /// Unit surface normal.
    pub normal: [f32; 3],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    /// Creates a vertex from a position and normal.
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// Type-safe handle to a mesh stored in a [`MeshLibrary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Geometry waiting to be uploaded.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    /// Vertex positions and normals.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices, three per triangle.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Wraps raw vertices and indices.
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Axis-aligned bounds as `(min, max)`. Empty geometry yields zeros.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.vertices.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }

    /// The smallest vertex y coordinate.
    ///
    /// The pulse animation lifts objects by this amount so they stay resting
    /// on the ground while they grow.
    pub fn lowest_y(&self) -> f32 {
        self.bounds().0.y
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// A unit cube centered at the origin, with flat per-face normals.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let vertices = vec![
            // Front face (Z+)
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0]),
            // Back face (Z-)
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0]),
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0]),
            // Top face (Y+)
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0]),
            // Bottom face (Y-)
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0]),
            // Right face (X+)
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 1.0,  0.0,  0.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 1.0,  0.0,  0.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 1.0,  0.0,  0.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 1.0,  0.0,  0.0]),
            // Left face (X-)
            Vertex3d::new([-0.5, -0.5, -0.5], [-1.0,  0.0,  0.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [-1.0,  0.0,  0.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [-1.0,  0.0,  0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [-1.0,  0.0,  0.0]),
        ];

        #[rustfmt::skip]
        let indices: Vec<u32> = vec![
            0,  1,  2,  2,  3,  0,  // front
            4,  5,  6,  6,  7,  4,  // back
            8,  9,  10, 10, 11, 8,  // top
            12, 13, 14, 14, 15, 12, // bottom
            16, 17, 18, 18, 19, 16, // right
            20, 21, 22, 22, 23, 20, // left
        ];

        Self::new(vertices, indices)
    }

    /// A UV sphere of radius 0.5 centered at the origin.
    ///
    /// `segments` divides the equator, `rings` divides pole to pole.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = TAU * seg as f32 / segments as f32;
                let normal = [ring_radius * theta.cos(), y, ring_radius * theta.sin()];
                let position = [normal[0] * 0.5, normal[1] * 0.5, normal[2] * 0.5];
                vertices.push(Vertex3d::new(position, normal));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;
                indices.extend_from_slice(&[current, current + 1, next]);
                indices.extend_from_slice(&[current + 1, next + 1, next]);
            }
        }

        Self::new(vertices, indices)
    }

    /// A torus lying on the XZ plane, centered at the origin.
    ///
    /// `major` is the distance from the center to the middle of the tube,
    /// `minor` the tube radius. `segments` divides the ring, `sides` the tube.
    pub fn torus(major: f32, minor: f32, segments: u32, sides: u32) -> Self {
        let segments = segments.max(3);
        let sides = sides.max(3);
        let mut vertices = Vec::with_capacity(((segments + 1) * (sides + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * sides * 6) as usize);

        for seg in 0..=segments {
            let u = TAU * seg as f32 / segments as f32;
            let (sin_u, cos_u) = u.sin_cos();
            let center = Vec3::new(major * cos_u, 0.0, major * sin_u);

            for side in 0..=sides {
                let v = TAU * side as f32 / sides as f32;
                let (sin_v, cos_v) = v.sin_cos();
                let normal = Vec3::new(cos_v * cos_u, sin_v, cos_v * sin_u);
                let position = center + minor * normal;
                vertices.push(Vertex3d::new(position.into(), normal.into()));
            }
        }

        for seg in 0..segments {
            for side in 0..sides {
                let a = seg * (sides + 1) + side;
                let b = a + sides + 1;
                let c = a + 1;
                let d = b + 1;
                indices.extend_from_slice(&[a, c, b]);
                indices.extend_from_slice(&[b, c, d]);
            }
        }

        Self::new(vertices, indices)
    }

    /// A capped cylinder of radius 0.5 and height 1, centered at the origin
    /// with its axis along Y.
    pub fn cylinder(segments: u32) -> Self {
        let segments = segments.max(3);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        // Side wall: bottom/top vertex pairs.
        for seg in 0..=segments {
            let theta = TAU * seg as f32 / segments as f32;
            let (sin_t, cos_t) = theta.sin_cos();
            let normal = [cos_t, 0.0, sin_t];
            vertices.push(Vertex3d::new([0.5 * cos_t, -0.5, 0.5 * sin_t], normal));
            vertices.push(Vertex3d::new([0.5 * cos_t, 0.5, 0.5 * sin_t], normal));
        }
        for seg in 0..segments {
            let a = seg * 2;
            let c = a + 1;
            let b = a + 2;
            let d = a + 3;
            indices.extend_from_slice(&[a, c, b]);
            indices.extend_from_slice(&[b, c, d]);
        }

        for (y, normal_y) in [(0.5_f32, 1.0_f32), (-0.5, -1.0)] {
            let center = vertices.len() as u32;
            vertices.push(Vertex3d::new([0.0, y, 0.0], [0.0, normal_y, 0.0]));
            for seg in 0..=segments {
                let theta = TAU * seg as f32 / segments as f32;
                let (sin_t, cos_t) = theta.sin_cos();
                vertices.push(Vertex3d::new(
                    [0.5 * cos_t, y, 0.5 * sin_t],
                    [0.0, normal_y, 0.0],
                ));
            }
            for seg in 0..segments {
                let rim = center + 1 + seg;
                if normal_y > 0.0 {
                    indices.extend_from_slice(&[center, rim + 1, rim]);
                } else {
                    indices.extend_from_slice(&[center, rim, rim + 1]);
                }
            }
        }

        Self::new(vertices, indices)
    }
}

/// GPU-resident geometry.
///
/// Immutable after upload; share it between objects through [`MeshId`].
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
    lowest_y: f32,
}

impl Mesh {
    /// Upload `data` to vertex and index buffers.
    pub fn new(gpu: &GpuContext, data: &MeshData) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
            lowest_y: data.lowest_y(),
        }
    }

    /// The smallest vertex y coordinate of the uploaded geometry.
    pub fn lowest_y(&self) -> f32 {
        self.lowest_y
    }

    /// Bind this mesh's buffers and issue an indexed draw.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Owner of all meshes in the viewer.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    meshes: Vec<Mesh>,
}

impl MeshLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload `data` and return its handle.
    pub fn upload(&mut self, gpu: &GpuContext, data: &MeshData) -> MeshId {
        self.add(Mesh::new(gpu, data))
    }

    /// Take ownership of an uploaded mesh and return its handle.
    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    /// Look up a mesh.
    ///
    /// # Panics
    ///
    /// Panics if `id` came from a different library.
    pub fn get(&self, id: MeshId) -> &Mesh {
        self.meshes.get(id.0).unwrap_or_else(|| {
            panic!(
                "mesh handle {} out of range (library holds {})",
                id.0,
                self.meshes.len()
            )
        })
    }
}

impl MeshBounds for MeshLibrary {
    fn lowest_y(&self, mesh: MeshId) -> f32 {
        self.get(mesh).lowest_y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(data: &MeshData) {
        assert_eq!(data.indices.len() % 3, 0);
        let count = data.vertices.len() as u32;
        assert!(data.indices.iter().all(|&i| i < count));
        for v in &data.vertices {
            let len = Vec3::from(v.normal).length();
            assert!((len - 1.0).abs() < 1e-4, "normal length {len}");
        }
    }

    /// Every triangle's winding should agree with its vertex normals.
    fn assert_outward_winding(data: &MeshData) {
        for tri in data.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| data.vertices[i as usize]);
            let face = (Vec3::from(b.position) - Vec3::from(a.position))
                .cross(Vec3::from(c.position) - Vec3::from(a.position));
            if face.length_squared() < 1e-12 {
                // Degenerate triangle at a pole.
                continue;
            }
            let normal =
                Vec3::from(a.normal) + Vec3::from(b.normal) + Vec3::from(c.normal);
            assert!(face.dot(normal) > 0.0, "inward-facing triangle {tri:?}");
        }
    }

    #[test]
    fn vertex_layout_is_packed() {
        assert_eq!(std::mem::size_of::<Vertex3d>(), 24);
        assert_eq!(Vertex3d::LAYOUT.array_stride, 24);
    }

    #[test]
    fn bounds_and_lowest_y() {
        let data = MeshData::new(
            vec![
                Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
                Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0]),
                Vertex3d::new([-1.0, -1.5, -1.0], [0.0, 1.0, 0.0]),
            ],
            vec![0, 1, 2],
        );
        let (min, max) = data.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.5, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(data.lowest_y(), -1.5);
    }

    #[test]
    fn empty_mesh_rests_at_zero() {
        assert_eq!(MeshData::default().lowest_y(), 0.0);
    }

    #[test]
    fn cube_is_unit_sized() {
        let cube = MeshData::cube();
        assert_valid(&cube);
        assert_outward_winding(&cube);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.lowest_y(), -0.5);
    }

    #[test]
    fn sphere_has_radius_half() {
        let sphere = MeshData::sphere(24, 12);
        assert_valid(&sphere);
        assert_outward_winding(&sphere);
        assert_eq!(sphere.vertices.len(), 25 * 13);
        assert!((sphere.lowest_y() + 0.5).abs() < 1e-5);
    }

    #[test]
    fn torus_rests_on_its_tube() {
        let torus = MeshData::torus(0.4, 0.15, 32, 16);
        assert_valid(&torus);
        assert_outward_winding(&torus);
        assert!((torus.lowest_y() + 0.15).abs() < 1e-5);
        let (min, max) = torus.bounds();
        assert!((max.x - 0.55).abs() < 1e-5);
        assert!((min.z + 0.55).abs() < 1e-4);
    }

    #[test]
    fn cylinder_is_closed() {
        let cylinder = MeshData::cylinder(16);
        assert_valid(&cylinder);
        assert_outward_winding(&cylinder);
        // side + two caps
        assert_eq!(cylinder.triangle_count(), 16 * 2 + 16 * 2);
        assert_eq!(cylinder.lowest_y(), -0.5);
    }

    #[test]
    fn degenerate_tessellation_is_raised() {
        let sphere = MeshData::sphere(0, 0);
        assert_valid(&sphere);
        assert!(sphere.triangle_count() > 0);
    }
}
