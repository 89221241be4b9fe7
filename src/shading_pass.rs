//! Blinn-Phong mesh rendering with depth testing.
//!
//! [`ShadingPass`] turns the [`DrawParams`] produced by the composer into GPU
//! draws. It owns the pipelines, the per-draw uniform buffer and the depth
//! texture.
//!
//! # Uniforms
//!
//! Every draw gets one [`DrawUniforms`] block. All blocks of a frame live in a
//! single uniform buffer, each at a multiple of the device's
//! `min_uniform_buffer_offset_alignment`, and are selected with a dynamic
//! offset. The buffer grows when a frame has more draws than it can hold.
//!
//! # Pipelines
//!
//! Back-face culling and wireframe rasterization are toggled at runtime, so
//! the pass keeps one pipeline per combination. Wireframe pipelines only exist
//! when the device has [`wgpu::Features::POLYGON_MODE_LINE`]; without it a
//! wireframe request falls back to filled triangles.
//!
//! # Usage
//!
//! 1. Call [`ensure_depth_size`](ShadingPass::ensure_depth_size) if the target may have resized
//! 2. Call [`prepare`](ShadingPass::prepare) with the frame's draws before encoding
//! 3. Begin a render pass with [`depth_view`](ShadingPass::depth_view) attached
//! 4. Call [`render`](ShadingPass::render) with the same draws

use std::num::NonZeroU64;

use crate::composer::DrawParams;
use crate::gpu::GpuContext;
use crate::mesh::{MeshLibrary, Vertex3d};

/// Depth buffer format used by the pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Draw slots allocated up front.
const INITIAL_CAPACITY: usize = 128;

/// Per-draw uniform block, laid out to match `DrawUniforms` in
/// `blinn_phong.wgsl`. Each `vec3` is padded to 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    /// Camera to clip space.
    pub projection: [[f32; 4]; 4],
    /// Object to camera space.
    pub model_view: [[f32; 4]; 4],
    /// Inverse-transpose of `model_view`.
    pub normal: [[f32; 4]; 4],
    /// Light position in camera space.
    pub light_pos: [f32; 3],
    _pad0: f32,
    /// Light color.
    pub light_color: [f32; 3],
    _pad1: f32,
    /// Material ambient color.
    pub ambient: [f32; 3],
    _pad2: f32,
    /// Material diffuse reflectance.
    pub diffuse: [f32; 3],
    _pad3: f32,
    /// Material specular reflectance.
    pub specular: [f32; 3],
    /// Specular exponent, packed into the last `vec3`'s padding.
    pub shininess: f32,
}

impl From<&DrawParams> for DrawUniforms {
    fn from(params: &DrawParams) -> Self {
        Self {
            projection: params.projection.to_cols_array_2d(),
            model_view: params.model_view.to_cols_array_2d(),
            normal: params.normal.to_cols_array_2d(),
            light_pos: params.light_pos.to_array(),
            _pad0: 0.0,
            light_color: params.light_color.to_array(),
            _pad1: 0.0,
            ambient: params.material.ambient.to_array(),
            _pad2: 0.0,
            diffuse: params.material.diffuse.to_array(),
            _pad3: 0.0,
            specular: params.material.specular.to_array(),
            shininess: params.material.shininess,
        }
    }
}

/// Distance between consecutive uniform blocks in the buffer.
///
/// Rounds `size` up to the next multiple of `alignment`.
pub fn uniform_stride(size: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

/// Rasterization state chosen per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterState {
    /// Discard triangles facing away from the camera.
    pub cull_back_faces: bool,
    /// Draw triangle edges only.
    pub wireframe: bool,
}

impl RasterState {
    fn index(self) -> usize {
        usize::from(self.cull_back_faces) | (usize::from(self.wireframe) << 1)
    }
}

/// Renders composed draws with the Blinn-Phong shader.
pub struct ShadingPass {
    /// Indexed by [`RasterState::index`]. Wireframe slots are `None` when the
    /// device cannot draw lines.
    pipelines: [Option<wgpu::RenderPipeline>; 4],
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl ShadingPass {
    /// Create the pass for color targets of `format`, with a depth buffer of
    /// `width` x `height`.
    pub fn new(gpu: &GpuContext, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blinn-Phong Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blinn_phong.wgsl").into()),
        });

        let block_size = std::mem::size_of::<DrawUniforms>() as u64;
        let stride = uniform_stride(
            block_size,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniforms Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(block_size),
                },
                count: None,
            }],
        });

        let (uniform_buffer, bind_group) =
            Self::create_uniforms(gpu, &bind_group_layout, stride, INITIAL_CAPACITY);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blinn-Phong Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mut pipelines: [Option<wgpu::RenderPipeline>; 4] = Default::default();
        for wireframe in [false, true] {
            if wireframe && !gpu.supports_wireframe() {
                continue;
            }
            for cull_back_faces in [false, true] {
                let state = RasterState {
                    cull_back_faces,
                    wireframe,
                };
                pipelines[state.index()] = Some(Self::create_pipeline(
                    gpu,
                    &pipeline_layout,
                    &shader,
                    format,
                    state,
                ));
            }
        }

        let depth_view = Self::create_depth_view(gpu, width, height);

        Self {
            pipelines,
            bind_group_layout,
            uniform_buffer,
            bind_group,
            stride,
            capacity: INITIAL_CAPACITY,
            depth_view,
            depth_size: (width, height),
        }
    }

    fn create_pipeline(
        gpu: &GpuContext,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        state: RasterState,
    ) -> wgpu::RenderPipeline {
        gpu.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Blinn-Phong Pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: state.cull_back_faces.then_some(wgpu::Face::Back),
                    front_face: wgpu::FrontFace::Ccw,
                    polygon_mode: if state.wireframe {
                        wgpu::PolygonMode::Line
                    } else {
                        wgpu::PolygonMode::Fill
                    },
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
    }

    fn create_uniforms(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniforms Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });

        (buffer, bind_group)
    }

    fn create_depth_view(gpu: &GpuContext, width: u32, height: u32) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        // The view keeps the texture alive.
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreate the depth buffer if it no longer matches `width` x `height`.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if self.depth_size != (width, height) {
            self.depth_view = Self::create_depth_view(gpu, width, height);
            self.depth_size = (width, height);
        }
    }

    /// The depth attachment to use with [`render`](Self::render).
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// Upload the uniform blocks for `draws`, growing the buffer if needed.
    ///
    /// Must be called before the render pass that draws them is submitted.
    pub fn prepare(&mut self, gpu: &GpuContext, draws: &[DrawParams]) {
        if draws.len() > self.capacity {
            let capacity = draws.len().next_power_of_two();
            log::debug!("growing draw uniform buffer to {capacity} slots");
            let (buffer, bind_group) =
                Self::create_uniforms(gpu, &self.bind_group_layout, self.stride, capacity);
            self.uniform_buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        let stride = self.stride as usize;
        let mut bytes = vec![0u8; stride * draws.len()];
        for (slot, params) in bytes.chunks_exact_mut(stride).zip(draws) {
            let block = DrawUniforms::from(params);
            slot[..std::mem::size_of::<DrawUniforms>()].copy_from_slice(bytemuck::bytes_of(&block));
        }
        if !bytes.is_empty() {
            gpu.queue.write_buffer(&self.uniform_buffer, 0, &bytes);
        }
    }

    /// Draw every entry of `draws` in order.
    ///
    /// `draws` must be the slice last passed to [`prepare`](Self::prepare).
    /// A wireframe request on a device without line support draws filled
    /// triangles.
    pub fn render(
        &self,
        render_pass: &mut wgpu::RenderPass,
        draws: &[DrawParams],
        meshes: &MeshLibrary,
        state: RasterState,
    ) {
        if draws.is_empty() {
            return;
        }

        let pipeline = self.pipelines[state.index()].as_ref().or_else(|| {
            self.pipelines[RasterState {
                wireframe: false,
                ..state
            }
            .index()]
            .as_ref()
        });
        let Some(pipeline) = pipeline else {
            return;
        };
        render_pass.set_pipeline(pipeline);

        debug_assert!(draws.len() <= self.capacity, "render called before prepare");
        for (slot, params) in draws.iter().enumerate() {
            let offset = (slot as u64 * self.stride) as wgpu::DynamicOffset;
            render_pass.set_bind_group(0, &self.bind_group, &[offset]);
            meshes.get(params.mesh).draw(render_pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshId;
    use crate::scene::Material;
    use glam::{Mat4, Vec3};

    #[test]
    fn uniform_block_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 272);
        assert_eq!(std::mem::offset_of!(DrawUniforms, light_pos), 192);
        assert_eq!(std::mem::offset_of!(DrawUniforms, light_color), 208);
        assert_eq!(std::mem::offset_of!(DrawUniforms, ambient), 224);
        assert_eq!(std::mem::offset_of!(DrawUniforms, diffuse), 240);
        assert_eq!(std::mem::offset_of!(DrawUniforms, specular), 256);
        assert_eq!(std::mem::offset_of!(DrawUniforms, shininess), 268);
    }

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(uniform_stride(272, 256), 512);
        assert_eq!(uniform_stride(272, 16), 272);
        assert_eq!(uniform_stride(256, 256), 256);
        assert_eq!(uniform_stride(1, 64), 64);
    }

    #[test]
    fn raster_states_have_distinct_slots() {
        let mut seen = [false; 4];
        for cull_back_faces in [false, true] {
            for wireframe in [false, true] {
                let index = RasterState {
                    cull_back_faces,
                    wireframe,
                }
                .index();
                assert!(!seen[index]);
                seen[index] = true;
            }
        }
        assert_eq!(RasterState::default().index(), 0);
    }

    #[test]
    fn uniforms_copy_draw_params() {
        let params = DrawParams {
            projection: Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0),
            model_view: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            normal: Mat4::IDENTITY,
            light_pos: Vec3::new(4.0, 5.0, 6.0),
            light_color: Vec3::splat(0.8),
            material: Material {
                ambient: Vec3::splat(0.2),
                diffuse: Vec3::new(0.1, 0.2, 0.3),
                specular: Vec3::new(0.4, 0.5, 0.6),
                shininess: 250.0,
            },
            mesh: MeshId(3),
        };
        let block = DrawUniforms::from(&params);
        assert_eq!(block.model_view[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(block.projection, params.projection.to_cols_array_2d());
        assert_eq!(block.light_pos, [4.0, 5.0, 6.0]);
        assert_eq!(block.diffuse, [0.1, 0.2, 0.3]);
        assert_eq!(block.specular, [0.4, 0.5, 0.6]);
        assert_eq!(block.shininess, 250.0);
    }
}
