//! Application framework and main loop.
//!
//! This module ties the viewer together:
//!
//! - [`AppConfig`]: window and startup options, built like the rest of the API
//! - [`ViewerContext`]: camera, scene, toggles and input state, owned in one
//!   place and handed to every event handler and frame
//! - [`run`]: creates the window and GPU, then either drives the interactive
//!   loop or renders a single offscreen frame to a PNG
//!
//! # Frame
//!
//! Every redraw composes the scene with [`compose_frame`], uploads the draw
//! uniforms, clears the target to white and draws all objects with depth
//! testing. Back-face culling and wireframe follow the `c` and `t` toggles.
//!
//! # Example
//!
//! ```no_run
//! use phong_grid::AppConfig;
//!
//! fn main() -> Result<(), phong_grid::ViewerError> {
//!     phong_grid::run(AppConfig::new().title("Grid").size(1024, 768).seed(3))
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::camera::Camera;
use crate::capture::FrameCapture;
use crate::composer::{DrawParams, MeshBounds, compose_frame};
use crate::error::ViewerError;
use crate::gpu::GpuContext;
use crate::input::{
    Command, Input, InputEvent, LookGate, TOGGLE_ANIMATION, TOGGLE_CULL, TOGGLE_WIREFRAME,
    Toggles,
};
use crate::mesh::{MeshData, MeshLibrary};
use crate::scene::{Scene, SceneMeshes};
use crate::shading_pass::{RasterState, ShadingPass};

/// Background color of every frame.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color::WHITE;

/// Window and startup options.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial width in logical pixels; the capture width in offline mode.
    pub width: u32,
    /// Initial height in logical pixels; the capture height in offline mode.
    pub height: u32,
    /// Render one frame offscreen, write it to `output` and exit.
    pub offline: bool,
    /// PNG path written in offline mode.
    pub output: PathBuf,
    /// When pointer motion turns the camera.
    pub look_gate: LookGate,
    /// Seed for the scene's random materials. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Start with the pulse animation running.
    pub animate: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Phong Grid".to_string(),
            width: 640,
            height: 480,
            offline: false,
            output: PathBuf::from("output.png"),
            look_gate: LookGate::Always,
            seed: None,
            animate: true,
        }
    }
}

impl AppConfig {
    /// Default options: a 640x480 interactive window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the window (or capture) size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Render a single frame to `output` instead of opening an interactive
    /// window.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the PNG path used in offline mode.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    /// Choose when pointer motion turns the camera.
    pub fn look_gate(mut self, gate: LookGate) -> Self {
        self.look_gate = gate;
        self
    }

    /// Fix the seed for the scene's random materials.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Start with the pulse animation running or paused.
    pub fn animate(mut self, animate: bool) -> Self {
        self.animate = animate;
        self
    }
}

/// Everything the event handlers and the frame function share.
pub struct ViewerContext {
    /// The viewing camera.
    pub camera: Camera,
    /// Objects and light being drawn.
    pub scene: Scene,
    /// Character-keyed flags.
    pub toggles: Toggles,
    /// Pointer and modifier state.
    pub input: Input,
    look_gate: LookGate,
    animate: bool,
    start: Instant,
}

impl ViewerContext {
    /// A context for `scene` with the default camera and all toggles off.
    pub fn new(scene: Scene, config: &AppConfig) -> Self {
        let mut camera = Camera::new();
        camera.set_aspect(config.width, config.height);
        Self {
            camera,
            scene,
            toggles: Toggles::new(),
            input: Input::new(),
            look_gate: config.look_gate,
            animate: config.animate,
            start: Instant::now(),
        }
    }

    /// Whether the pulse animation is running. The animation toggle flips
    /// the configured starting state.
    pub fn animating(&self) -> bool {
        self.animate != self.toggles.is_on(TOGGLE_ANIMATION)
    }

    /// Animation clock at `now` in seconds; zero while paused.
    pub fn animation_time(&self, now: Instant) -> f32 {
        if self.animating() {
            now.saturating_duration_since(self.start).as_secs_f32()
        } else {
            0.0
        }
    }

    /// Rasterization chosen by the toggles.
    pub fn raster_state(&self) -> RasterState {
        RasterState {
            cull_back_faces: self.toggles.is_on(TOGGLE_CULL),
            wireframe: self.toggles.is_on(TOGGLE_WIREFRAME),
        }
    }

    /// React to one input event. Returns `true` when the viewer should close.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Pressed {
                position,
                shift,
                ctrl,
                alt,
            } => {
                self.camera
                    .mouse_clicked(position.x, position.y, shift, ctrl, alt);
            }
            InputEvent::Moved {
                position,
                left_down,
            } => {
                if self.look_gate.allows(left_down) {
                    self.camera.mouse_moved(position.x, position.y);
                }
            }
            InputEvent::Char { ch, repeat } => match Command::from_char(ch) {
                Some(command) => command.apply(&mut self.camera),
                None if !repeat => {
                    let on = self.toggles.flip(ch);
                    log::info!("toggle {ch:?} {}", if on { "on" } else { "off" });
                }
                None => {}
            },
            InputEvent::Escape => return true,
        }
        false
    }

    /// Compose the current frame into `draws`, replacing its contents.
    pub fn compose(&self, meshes: &impl MeshBounds, time: f32, draws: &mut Vec<DrawParams>) {
        draws.clear();
        compose_frame(&self.camera, &self.scene, meshes, time, draws);
    }
}

/// Upload the built-in meshes and return the handles the reference scene
/// uses.
fn upload_meshes(gpu: &GpuContext, library: &mut MeshLibrary) -> SceneMeshes {
    SceneMeshes {
        props: [
            library.upload(gpu, &MeshData::torus(0.35, 0.15, 48, 24)),
            library.upload(gpu, &MeshData::cylinder(32)),
        ],
        marker: library.upload(gpu, &MeshData::sphere(32, 16)),
        ground: library.upload(gpu, &MeshData::cube()),
    }
}

/// GPU state for drawing the scene into any color target.
struct Renderer {
    shading: ShadingPass,
    meshes: MeshLibrary,
    draws: Vec<DrawParams>,
}

impl Renderer {
    fn new(gpu: &GpuContext, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        Self {
            shading: ShadingPass::new(gpu, format, width, height),
            meshes: MeshLibrary::new(),
            draws: Vec::new(),
        }
    }

    /// Compose `ctx` at `time` and draw it into `target`.
    fn draw(
        &mut self,
        gpu: &GpuContext,
        ctx: &ViewerContext,
        time: f32,
        target: &wgpu::TextureView,
        (width, height): (u32, u32),
    ) {
        ctx.compose(&self.meshes, time, &mut self.draws);
        self.shading.ensure_depth_size(gpu, width, height);
        self.shading.prepare(gpu, &self.draws);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.shading.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.shading.render(
                &mut render_pass,
                &self.draws,
                &self.meshes,
                ctx.raster_state(),
            );
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Run the viewer until the window closes, or until the offline frame has
/// been written.
pub fn run(config: AppConfig) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        ViewerApp::Failed(e) => Err(e),
        _ => Ok(()),
    }
}

enum ViewerApp {
    Pending {
        config: AppConfig,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        renderer: Renderer,
        ctx: ViewerContext,
    },
    Finished,
    Failed(ViewerError),
}

impl ViewerApp {
    fn start(
        config: &AppConfig,
        event_loop: &ActiveEventLoop,
    ) -> Result<(Arc<Window>, GpuContext, Renderer, ViewerContext), ViewerError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .with_visible(!config.offline);

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        log::info!("window {}x{}", gpu.width(), gpu.height());

        let mut renderer = Renderer::new(&gpu, gpu.config.format, gpu.width(), gpu.height());
        let scene_meshes = upload_meshes(&gpu, &mut renderer.meshes);

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let scene = Scene::reference(scene_meshes, &mut rng);
        log::info!("scene has {} objects", scene.len());

        let mut ctx = ViewerContext::new(scene, config);
        if !config.offline {
            ctx.camera.set_aspect(gpu.width(), gpu.height());
        }

        Ok((window, gpu, renderer, ctx))
    }
}

/// Render one frame into an offscreen target of the configured size and
/// write it to `config.output`.
fn capture_frame(
    config: &AppConfig,
    gpu: &GpuContext,
    renderer: &mut Renderer,
    ctx: &ViewerContext,
) -> Result<(), ViewerError> {
    let (width, height) = (config.width.max(1), config.height.max(1));
    let capture = FrameCapture::new(gpu, gpu.config.format, width, height)?;
    renderer.draw(gpu, ctx, 0.0, capture.view(), (width, height));
    capture.save_png(gpu, &config.output)
}

/// Draw one frame to the window surface.
///
/// Lost or outdated surfaces are reconfigured and the frame skipped.
fn present_frame(
    gpu: &GpuContext,
    renderer: &mut Renderer,
    ctx: &ViewerContext,
) -> Result<(), ViewerError> {
    let output = match gpu.surface.get_current_texture() {
        Ok(output) => output,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            log::warn!("surface lost or outdated, reconfiguring");
            gpu.reconfigure();
            return Ok(());
        }
        Err(wgpu::SurfaceError::Timeout) => {
            log::warn!("timed out waiting for the next surface texture");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let time = ctx.animation_time(Instant::now());
    renderer.draw(gpu, ctx, time, &view, (gpu.width(), gpu.height()));
    output.present();
    Ok(())
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let ViewerApp::Pending { config } = self else {
            return;
        };
        let config = config.clone();

        let (window, gpu, mut renderer, mut ctx) = match Self::start(&config, event_loop) {
            Ok(parts) => parts,
            Err(e) => {
                *self = ViewerApp::Failed(e);
                event_loop.exit();
                return;
            }
        };

        if config.offline {
            ctx.camera.set_aspect(config.width, config.height);
            *self = match capture_frame(&config, &gpu, &mut renderer, &ctx) {
                Ok(()) => ViewerApp::Finished,
                Err(e) => ViewerApp::Failed(e),
            };
            event_loop.exit();
            return;
        }

        window.request_redraw();
        *self = ViewerApp::Running {
            window,
            gpu,
            renderer,
            ctx,
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ViewerApp::Running {
            window,
            gpu,
            renderer,
            ctx,
        } = self
        else {
            return;
        };

        if let Some(input) = ctx.input.handle_event(&event) {
            if ctx.handle_input(input) {
                event_loop.exit();
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
                ctx.camera.set_aspect(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = present_frame(gpu, renderer, ctx) {
                    log::error!("{e}");
                    *self = ViewerApp::Failed(e);
                    event_loop.exit();
                    return;
                }
                window.request_redraw();
            }
            _ => {}
        }
    }
}
