//! Penumbra renderer: shadow map + G-buffer + mirror reflections + deferred composite, on wgpu.

pub mod bindings;
pub mod composite;
pub mod config;
pub mod error;
pub mod frame;
pub mod gbuffer;
pub mod geometry;
pub mod graph;
pub mod material;
pub mod orchestrator;
pub mod present;
pub mod reflection;
pub mod scene;
pub mod shader;
pub mod shadow;
pub mod targets;
pub mod texture;

#[cfg(test)]
mod test_gpu;

use std::collections::HashMap;

use scene_api::{CentralModel, DisplayMode, SceneState};

pub use composite::CompositePass;
pub use config::RendererConfig;
pub use error::RenderError;
pub use frame::{FrameContext, ReflectionSide};
pub use gbuffer::GBufferPass;
pub use geometry::{GpuMesh, Mesh, Shape};
pub use graph::{PassGraph, PassKind};
pub use orchestrator::{FramePasses, Orchestrator, PassTrace, TraceEvent};
pub use present::{PresentPass, PresentUniform};
pub use reflection::{ReflectionPass, ReflectionTargets};
pub use scene::{build_draw_list, DrawItem, ObjectKind, SceneMeshes};
pub use shader::{ShaderLibrary, ShaderProgram, StageKind};
pub use shadow::{ShadowPass, ShadowTarget};
pub use targets::{GBuffer, GBufferAttachment, RenderTarget};

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: RendererConfig,
    materials: material::MaterialBindings,
    shadow_pass: ShadowPass,
    gbuffer_pass: GBufferPass,
    reflection_pass: ReflectionPass,
    composite_pass: CompositePass,
    present_pass: PresentPass,
    shadow: ShadowTarget,
    gbuffer: GBuffer,
    reflections: Option<ReflectionTargets>,
    /// CPU copies of every buildable central model; the selected one is on the GPU.
    central_meshes: HashMap<CentralModel, Mesh>,
    meshes: SceneMeshes<GpuMesh>,
    orchestrator: Orchestrator,
}

impl Renderer {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, RenderError> {
        Self::new_with_config(device, queue, RendererConfig::default())
    }

    /// Compiles every program, allocates every target and builds every mesh. Any
    /// failure here is fatal: the renderer is never half-initialized.
    pub fn new_with_config(device: wgpu::Device, queue: wgpu::Queue, config: RendererConfig) -> Result<Self, RenderError> {
        config.validate()?;
        device.on_uncaptured_error(Box::new(|e| log::error!("uncaptured wgpu error: {e}")));

        let shaders = ShaderLibrary::load(&config.shader_dir)?;
        let materials = material::MaterialBindings::new(&device, &queue, &config)?;
        let shadow_pass = ShadowPass::new(&device, &shaders.modules(&device, "shadow")?)?;
        let gbuffer_pass = GBufferPass::new(&device, &shaders.modules(&device, "gbuffer")?, &materials)?;
        let reflection_pass = ReflectionPass::new(&device, &shaders.modules(&device, "reflection")?, &materials)?;
        let composite_pass = CompositePass::new(
            &device,
            &shaders.modules(&device, "global_lighting")?,
            config.swapchain_format,
        )?;
        let present_pass = PresentPass::new(&device, &shaders.modules(&device, "present")?, config.swapchain_format)?;

        let shadow = ShadowTarget::create(&device, config.shadow_size)?;
        let gbuffer = GBuffer::create(&device, config.gbuffer_size, config.gbuffer_size)?;
        let reflections = if config.reflections {
            Some(ReflectionTargets::create(&device, config.reflection_size)?)
        } else {
            None
        };

        let mut central_meshes = HashMap::new();
        for model in config.available_models() {
            let mesh = config.central_shape(model)?.build()?;
            log::info!("central model {}: {} vertices", model.name(), mesh.vertex_count());
            central_meshes.insert(model, mesh);
        }
        let sphere = Shape::Sphere { n: config.sphere_resolution }.build()?;
        let ground = Shape::Ground { range: config.ground_range, n: config.ground_resolution }.build()?;
        let initial = CentralModel::default();
        let central = central_meshes
            .get(&initial)
            .ok_or_else(|| RenderError::Config(format!("{} cannot be built", initial.name())))?;
        let meshes = SceneMeshes {
            sphere: GpuMesh::upload(&device, &queue, "sphere", &sphere),
            ground: GpuMesh::upload(&device, &queue, "ground", &ground),
            central: GpuMesh::upload(&device, &queue, initial.name(), central),
            central_model: initial,
            central_bounds: *central.bounds(),
            central_material: central.material(),
        };

        log::info!(
            "renderer ready: shadow {}², gbuffer {}², reflections {}",
            config.shadow_size,
            config.gbuffer_size,
            if config.reflections { "on" } else { "off" }
        );
        Ok(Self {
            device,
            queue,
            config,
            materials,
            shadow_pass,
            gbuffer_pass,
            reflection_pass,
            composite_pass,
            present_pass,
            shadow,
            gbuffer,
            reflections,
            central_meshes,
            meshes,
            orchestrator: Orchestrator::new(),
        })
    }

    pub fn device(&self) -> &wgpu::Device { &self.device }
    pub fn queue(&self) -> &wgpu::Queue { &self.queue }
    pub fn config(&self) -> &RendererConfig { &self.config }
    pub fn gbuffer(&self) -> &GBuffer { &self.gbuffer }
    pub fn central_model(&self) -> CentralModel { self.meshes.central_model }
    pub fn trace(&self) -> &PassTrace { self.orchestrator.trace() }

    /// Apply scene changes that need GPU work: a newly selected central model
    /// replaces the previous one on the GPU.
    pub fn prepare(&mut self, state: &SceneState) -> Result<(), RenderError> {
        let model = state.central_model;
        if model == self.meshes.central_model {
            return Ok(());
        }
        let mesh = self
            .central_meshes
            .get(&model)
            .ok_or_else(|| RenderError::Config(format!("no mesh path configured for {}", model.name())))?;
        self.meshes.central = GpuMesh::upload(&self.device, &self.queue, model.name(), mesh);
        self.meshes.central_model = model;
        self.meshes.central_bounds = *mesh.bounds();
        self.meshes.central_material = mesh.material();
        log::info!("central model is now {}", model.name());
        Ok(())
    }

    /// Record every pass of one frame into `encoder`, ending with the pass that
    /// writes `output_view`.
    pub fn encode_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        state: &SceneState,
    ) -> Result<(), RenderError> {
        let ctx = FrameContext::new(state);
        if let Some(attachment) = GBufferAttachment::for_display_mode(state.mode) {
            self.gbuffer.select_read_attachment(attachment);
        }
        let output = if state.mode.is_composite() { PassKind::Composite } else { PassKind::Present };
        let graph = PassGraph::for_frame(self.reflections.is_some(), output);
        let items = build_draw_list(state, &self.meshes);

        let mut orchestrator = std::mem::take(&mut self.orchestrator);
        let result = orchestrator.run_frame(
            &graph,
            &mut FrameEncoder { renderer: self, encoder, output_view, items: &items, ctx: &ctx },
        );
        self.orchestrator = orchestrator;
        result
    }

    /// Encode, submit.
    pub fn render_to_view(&mut self, output_view: &wgpu::TextureView, state: &SceneState) -> Result<(), RenderError> {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("penumbra_frame"),
        });
        self.encode_frame(&mut encoder, output_view, state)?;
        self.queue.submit([encoder.finish()]);
        Ok(())
    }
}

/// One frame's worth of borrowed state, driven pass by pass by the orchestrator.
struct FrameEncoder<'a> {
    renderer: &'a Renderer,
    encoder: &'a mut wgpu::CommandEncoder,
    output_view: &'a wgpu::TextureView,
    items: &'a [DrawItem<GpuMesh>],
    ctx: &'a FrameContext,
}

impl FramePasses for FrameEncoder<'_> {
    fn run_pass(&mut self, pass: PassKind) -> Result<(), RenderError> {
        let r = self.renderer;
        let (device, queue) = (&r.device, &r.queue);
        match pass {
            PassKind::Shadow => {
                r.shadow_pass.encode(self.encoder, device, queue, &r.shadow, self.items, self.ctx);
            }
            PassKind::GBuffer => {
                r.gbuffer_pass.encode(self.encoder, device, queue, &r.gbuffer, &r.materials, self.items, self.ctx);
            }
            PassKind::ReflectionTop | PassKind::ReflectionBottom => {
                let targets = r
                    .reflections
                    .as_ref()
                    .ok_or_else(|| RenderError::PassOrder("reflection pass scheduled with reflections off".to_string()))?;
                let side = if pass == PassKind::ReflectionTop { ReflectionSide::Top } else { ReflectionSide::Bottom };
                r.reflection_pass.encode(
                    self.encoder,
                    device,
                    queue,
                    side,
                    targets,
                    &r.shadow,
                    &r.materials,
                    self.items,
                    self.ctx,
                );
            }
            PassKind::Composite => {
                r.composite_pass.encode(
                    self.encoder,
                    device,
                    queue,
                    self.output_view,
                    &r.gbuffer,
                    &r.shadow,
                    r.reflections.as_ref(),
                    self.ctx,
                );
            }
            PassKind::Present => {
                let params = PresentUniform::for_mode(self.ctx.mode)
                    .ok_or_else(|| RenderError::PassOrder("present pass scheduled for a lit view".to_string()))?;
                let source = if self.ctx.mode == DisplayMode::ShadowDepth {
                    r.shadow.depth_view()
                } else {
                    r.gbuffer.read_view()
                };
                r.present_pass.encode(self.encoder, device, queue, source, self.output_view, &params);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use scene_api::Control;

    use super::*;

    fn small_config() -> RendererConfig {
        RendererConfig {
            shadow_size: 64,
            gbuffer_size: 64,
            reflection_size: 32,
            teapot_resolution: 4,
            sphere_resolution: 8,
            ground_resolution: 4,
            swapchain_format: wgpu::TextureFormat::Rgba8Unorm,
            ..RendererConfig::default()
        }
    }

    fn output_view(device: &wgpu::Device) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("test_output"),
                size: wgpu::Extent3d { width: 64, height: 64, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&Default::default())
    }

    fn render(renderer: &mut Renderer, view: &wgpu::TextureView, state: &SceneState) {
        renderer.device().push_error_scope(wgpu::ErrorFilter::Validation);
        renderer.prepare(state).unwrap();
        renderer.render_to_view(view, state).unwrap();
        let err = pollster::block_on(renderer.device().pop_error_scope());
        assert!(err.is_none(), "{err:?}");
    }

    #[test]
    fn offscreen_frames_run_their_passes_in_order() {
        let Some((device, queue)) = test_gpu::device() else {
            return;
        };
        if !test_gpu::fits_gbuffer(&device) {
            return;
        }
        let view = output_view(&device);
        let mut renderer = Renderer::new_with_config(device, queue, small_config()).unwrap();
        let mut state = SceneState { width: 64, height: 64, ..SceneState::default() };

        render(&mut renderer, &view, &state);
        assert_eq!(
            renderer.trace().completed(),
            vec![
                PassKind::Shadow,
                PassKind::GBuffer,
                PassKind::ReflectionTop,
                PassKind::ReflectionBottom,
                PassKind::Composite
            ]
        );
        assert_eq!(renderer.trace().events().first(), Some(&TraceEvent::Enter(PassKind::Shadow)));
        assert_eq!(renderer.trace().events().last(), Some(&TraceEvent::Exit(PassKind::Composite)));

        state.apply(Control::SelectMode(4));
        render(&mut renderer, &view, &state);
        assert_eq!(renderer.trace().completed(), vec![PassKind::Shadow, PassKind::GBuffer, PassKind::Present]);
        assert_eq!(renderer.gbuffer().read_attachment(), GBufferAttachment::Normal);

        state.apply(Control::SelectMode(9));
        state.apply(Control::SelectModel(CentralModel::Sphere));
        render(&mut renderer, &view, &state);
        assert_eq!(renderer.central_model(), CentralModel::Sphere);
        assert_eq!(renderer.trace().completed().last(), Some(&PassKind::Present));
        let _ = renderer.device().poll(wgpu::Maintain::Wait);
    }

    #[test]
    fn unbuildable_model_is_refused_by_prepare() {
        let Some((device, queue)) = test_gpu::device() else {
            return;
        };
        if !test_gpu::fits_gbuffer(&device) {
            return;
        }
        let mut renderer = Renderer::new_with_config(device, queue, small_config()).unwrap();
        let state = SceneState { central_model: CentralModel::Bunny, ..SceneState::default() };
        assert!(matches!(renderer.prepare(&state), Err(RenderError::Config(_))));
        assert_eq!(renderer.central_model(), CentralModel::Teapot);
    }
}
