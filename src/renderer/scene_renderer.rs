/// Scene renderer: owns the GPU objects for one surface and draws published snapshots
/// Lifecycle is Uninitialized -> Ready -> Disposed, driven by the host's surface hooks.
use std::collections::HashMap;

use wgpu::{BindGroup, Buffer, Device, Queue, TextureFormat, TextureView};

use super::{
    camera::Camera,
    shader::ShaderProgram,
    shaders::{DEPTH_FORMAT, ShaderKind},
    textures::TextureManager,
    uniforms::{ObjectUniform, buffer_helpers},
};
use crate::{
    SkyConfig, SkydomeError, SkydomeResult,
    assets::TextureSource,
    catalog::{MOON_NAME, PLANETS},
    graphics::{MeshBuffers, VertexColors, generate_disc, generate_sphere},
    math::MoonPhase,
    scene::{MeshKind, SkyScene, renderable::WHITE},
};

const INITIAL_OBJECT_CAPACITY: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Ready,
    Disposed,
}

/// Everything a renderable needs to record its draw
pub struct FrameResources<'a> {
    programs: &'a HashMap<ShaderKind, ShaderProgram>,
    sphere: &'a MeshBuffers,
    disc: &'a MeshBuffers,
    textures: &'a TextureManager,
    pub object_bind_group: &'a BindGroup,
}

impl FrameResources<'_> {
    pub fn program(&self, kind: ShaderKind) -> SkydomeResult<&ShaderProgram> {
        self.programs
            .get(&kind)
            .ok_or_else(|| SkydomeError::Graphics(format!("{} was never compiled", kind.label())))
    }

    pub fn mesh(&self, kind: MeshKind) -> &MeshBuffers {
        match kind {
            MeshKind::Sphere => self.sphere,
            MeshKind::Disc => self.disc,
        }
    }

    pub fn texture_bind_group(&self, key: &str) -> &BindGroup {
        self.textures.bind_group(key)
    }
}

struct GpuState {
    device: Device,
    queue: Queue,

    programs: HashMap<ShaderKind, ShaderProgram>,
    sphere: MeshBuffers,
    disc: MeshBuffers,
    textures: TextureManager,

    camera_buffer: Buffer,
    camera_bind_group: BindGroup,

    object_layout: wgpu::BindGroupLayout,
    object_buffer: Buffer,
    object_bind_group: BindGroup,
    object_capacity: u32,

    depth_view: TextureView,
}

impl GpuState {
    fn ensure_object_capacity(&mut self, needed: usize) {
        let capacity = grow_capacity(self.object_capacity, needed);
        if capacity == self.object_capacity {
            return;
        }

        self.object_buffer = buffer_helpers::create_dynamic_object_buffer(&self.device, capacity);
        self.object_bind_group = buffer_helpers::create_dynamic_object_bind_group(
            &self.device,
            &self.object_layout,
            &self.object_buffer,
        );
        log::debug!(
            "Object uniform buffer grown from {} to {} slots",
            self.object_capacity,
            capacity
        );
        self.object_capacity = capacity;
    }
}

enum Lifecycle {
    Uninitialized,
    Ready(Box<GpuState>),
    Disposed,
}

pub struct SceneRenderer {
    config: SkyConfig,
    camera: Camera,
    lifecycle: Lifecycle,
    skip_logged: bool,
}

impl SceneRenderer {
    pub fn new(config: &SkyConfig) -> Self {
        Self {
            camera: Camera::new(config.field_of_view_deg, 16, 9),
            config: config.clone(),
            lifecycle: Lifecycle::Uninitialized,
            skip_logged: false,
        }
    }

    pub fn state(&self) -> RendererState {
        match self.lifecycle {
            Lifecycle::Uninitialized => RendererState::Uninitialized,
            Lifecycle::Ready(_) => RendererState::Ready,
            Lifecycle::Disposed => RendererState::Disposed,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Build every GPU resource for a new surface. Shader failures abort;
    /// missing or broken textures fall back to plain white.
    pub fn on_surface_created(
        &mut self,
        device: &Device,
        queue: &Queue,
        color_format: TextureFormat,
        width: u32,
        height: u32,
        texture_source: &dyn TextureSource,
    ) -> SkydomeResult<()> {
        if self.state() == RendererState::Disposed {
            return Err(SkydomeError::Graphics(
                "renderer was disposed and cannot be reused".to_string(),
            ));
        }

        log::info!("Creating scene resources for {}x{} surface", width, height);

        let mut textures = TextureManager::new(device, queue);

        let camera_layout = buffer_helpers::create_camera_bind_group_layout(device);
        let object_layout = buffer_helpers::create_object_bind_group_layout_dynamic(device);
        let layouts = [&camera_layout, &object_layout, textures.bind_group_layout()];

        let mut programs = HashMap::new();
        for kind in ShaderKind::ALL {
            let program = ShaderProgram::from_kind(device, kind, &layouts, color_format)
                .inspect_err(|e| log::error!("Scene init aborted: {}", e))?;
            programs.insert(kind, program);
        }

        let sphere = MeshBuffers::from_mesh(
            device,
            &generate_sphere(self.config.sphere_bands, self.config.sphere_steps),
            VertexColors::Uniform(WHITE),
        )?;
        let disc = MeshBuffers::from_mesh(
            device,
            &generate_disc(self.config.disc_segments, MeshKind::Disc.base_radius()),
            VertexColors::Radial {
                center: WHITE,
                rim: [1.0, 1.0, 1.0, 0.0],
            },
        )?;

        for key in texture_keys(&self.config) {
            textures.load_or_default(device, queue, &key, texture_source);
        }

        let camera_buffer = buffer_helpers::create_camera_buffer(device);
        let camera_bind_group =
            buffer_helpers::create_camera_bind_group(device, &camera_layout, &camera_buffer);

        let object_buffer =
            buffer_helpers::create_dynamic_object_buffer(device, INITIAL_OBJECT_CAPACITY);
        let object_bind_group =
            buffer_helpers::create_dynamic_object_bind_group(device, &object_layout, &object_buffer);

        self.camera.on_surface_changed(width, height);

        self.lifecycle = Lifecycle::Ready(Box::new(GpuState {
            device: device.clone(),
            queue: queue.clone(),
            programs,
            sphere,
            disc,
            textures,
            camera_buffer,
            camera_bind_group,
            object_layout,
            object_buffer,
            object_bind_group,
            object_capacity: INITIAL_OBJECT_CAPACITY,
            depth_view: create_depth_view(device, width, height),
        }));
        self.skip_logged = false;

        log::info!("Scene renderer ready");
        Ok(())
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Lifecycle::Ready(gpu) = &mut self.lifecycle {
            gpu.depth_view = create_depth_view(&gpu.device, width, height);
        }
        self.camera.on_surface_changed(width, height);
    }

    /// Advance per-frame object state
    pub fn update(&mut self, scene: &SkyScene, dt: f32) {
        scene.advance_rotations(dt);
    }

    /// Clear, then draw the sky, the solar-system bodies and the stars into `target`
    pub fn on_draw_frame(&mut self, target: &TextureView, scene: &SkyScene) -> SkydomeResult<()> {
        let state = self.state();
        if state != RendererState::Ready {
            if !self.skip_logged {
                log::debug!("Skipping draw, renderer is {:?}", state);
                self.skip_logged = true;
            }
            return Ok(());
        }
        let Lifecycle::Ready(gpu) = &mut self.lifecycle else {
            return Ok(());
        };

        let snapshot = scene.snapshot();
        let renderables: Vec<_> = snapshot.draw_order().collect();

        // All uniform writes land before the pass is recorded
        gpu.ensure_object_capacity(renderables.len());
        gpu.queue.write_buffer(
            &gpu.camera_buffer,
            0,
            bytemuck::bytes_of(&self.camera.uniform()),
        );
        if !renderables.is_empty() {
            let uniforms: Vec<ObjectUniform> =
                renderables.iter().map(|r| r.uniform(&self.camera)).collect();
            gpu.queue
                .write_buffer(&gpu.object_buffer, 0, bytemuck::cast_slice(&uniforms));
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Sky Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sky Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &gpu.camera_bind_group, &[]);

            let resources = FrameResources {
                programs: &gpu.programs,
                sphere: &gpu.sphere,
                disc: &gpu.disc,
                textures: &gpu.textures,
                object_bind_group: &gpu.object_bind_group,
            };
            for (slot, renderable) in renderables.iter().enumerate() {
                renderable.draw(&mut pass, &resources, slot)?;
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Release every GPU resource. The renderer cannot be used afterwards.
    /// Release GPU resources. Returns false when already disposed.
    pub fn dispose(&mut self) -> bool {
        if matches!(self.lifecycle, Lifecycle::Disposed) {
            return false;
        }
        if let Lifecycle::Ready(gpu) = &mut self.lifecycle {
            gpu.textures.release();
        }
        self.lifecycle = Lifecycle::Disposed;
        log::info!("Scene renderer disposed");
        true
    }
}

/// Every texture a scene can reference: sky, star glow, bodies and all moon phases
pub fn texture_keys(config: &SkyConfig) -> Vec<String> {
    let mut keys = vec![config.skybox_texture.clone(), config.star_texture.clone()];
    keys.extend(
        PLANETS
            .iter()
            .filter(|def| def.name != MOON_NAME)
            .map(|def| def.texture.to_string()),
    );
    keys.extend(MoonPhase::ALL.iter().map(|phase| phase.texture_key()));
    keys
}

/// Next slot count for the object buffer; never shrinks
fn grow_capacity(current: u32, needed: usize) -> u32 {
    if needed <= current as usize {
        return current;
    }
    (needed as u32).next_power_of_two()
}

fn create_depth_view(device: &Device, width: u32, height: u32) -> TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
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
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
