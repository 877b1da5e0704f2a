//! WGPU-based rendering engine for the viewer
//!
//! Draws the scene graph in two passes: a depth-only pass from the
//! shadow-casting directional light, then the lit pass into the window
//! surface. Model geometry is uploaded the first time a model node is seen.

use std::{collections::HashMap, sync::Arc};

use cgmath::{Matrix4, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    gfx::{
        camera::CameraRig,
        resources::{
            global_bindings::{shadow_of, GlobalBindings, GlobalUBO, GlobalUniform},
            texture_resource::TextureResource,
        },
        scene::{material::DEFAULT_BASE_COLOR, Material, Model, NodeId, SceneGraph},
    },
    viewport::ViewportState,
    wgpu_utils::{binding_types, uniform_buffer::UniformBuffer},
};

use super::{
    pipeline_manager::{PipelineConfig, PipelineManager},
    renderer::Renderer,
};

/// Background used when the scene has no sky dome
const DEFAULT_CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.2,
    b: 0.3,
    a: 1.0,
};

const SCENE_PIPELINE: &str = "scene";
const SHADOW_PIPELINE: &str = "shadow";

/// Per-mesh uniform block (group 1)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    /// x: roughness, y: 1.0 when the diffuse map is sampled
    pub surface: [f32; 4],
}

impl MeshUniform {
    pub fn new(transform: Matrix4<f32>, material: Option<&Material>) -> Self {
        let (base_color, roughness, textured) = match material {
            Some(m) => (m.base_color, m.roughness, m.is_textured()),
            None => (DEFAULT_BASE_COLOR, Material::default().roughness, false),
        };
        Self {
            model: transform.into(),
            base_color,
            surface: [roughness, if textured { 1.0 } else { 0.0 }, 0.0, 0.0],
        }
    }
}

/// Mesh buffers living on the GPU
pub struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    material_index: Option<usize>,
    uniform: UniformBuffer<MeshUniform>,
    bind_group: wgpu::BindGroup,
}

/// All uploaded meshes of one model node, plus the diffuse maps they sample
#[derive(Default)]
pub struct GpuModel {
    meshes: Vec<GpuMesh>,
    textures: Vec<Option<TextureResource>>,
}

pub trait DrawGpuMesh {
    fn draw_gpu_mesh(&mut self, mesh: &GpuMesh);
}

impl DrawGpuMesh for wgpu::RenderPass<'_> {
    fn draw_gpu_mesh(&mut self, mesh: &GpuMesh) {
        self.set_bind_group(1, &mesh.bind_group, &[]);
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    mesh_layout: wgpu::BindGroupLayout,
    shadow_layout: wgpu::BindGroupLayout,
    shadow_map: TextureResource,
    shadow_bind_group: wgpu::BindGroup,
    white_texture: TextureResource,
    models: HashMap<NodeId, GpuModel>,
    shadow_debug: bool,
}

impl RenderEngine {
    /// Creates a render engine drawing into `window`, with the surface
    /// configured at the physical size of `viewport`.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        viewport: &ViewportState,
    ) -> anyhow::Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow::anyhow!("failed to request adapter: {}", e))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no supported formats"))?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (physical_width, physical_height) = viewport.physical_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: physical_width,
            height: physical_height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(
            &device,
            physical_width,
            physical_height,
            "depth_texture",
        );

        let global_ubo = GlobalUBO::new(&device, "Globals Uniform", GlobalUniform::default());
        let global_bindings = GlobalBindings::new(&device, &global_ubo);

        let mesh_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Bind Group Layout"),
            entries: &[
                binding_types::rendering_entry(0, binding_types::uniform()),
                binding_types::rendering_entry(1, binding_types::texture_2d()),
                binding_types::rendering_entry(2, binding_types::filtering_sampler()),
            ],
        });
        let white_texture = TextureResource::create_white(&device, &queue);

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Bind Group Layout"),
            entries: &[
                binding_types::rendering_entry(0, binding_types::depth_texture_2d()),
                binding_types::rendering_entry(1, binding_types::comparison_sampler()),
            ],
        });

        // Placeholder until a light asks for a real map
        let shadow_map = TextureResource::create_shadow_map(&device, 1, 1);
        let shadow_bind_group = create_shadow_bind_group(&device, &shadow_layout, &shadow_map);

        let mut pipeline_manager = PipelineManager::new(device.clone());
        pipeline_manager.load_shader(SCENE_PIPELINE, include_str!("scene.wgsl"));
        pipeline_manager.load_shader(SHADOW_PIPELINE, include_str!("shadow.wgsl"));

        pipeline_manager.register_pipeline(
            SCENE_PIPELINE,
            &PipelineConfig::default()
                .with_label("Scene Pipeline")
                .with_shader(SCENE_PIPELINE)
                .with_bind_group_layouts(vec![
                    global_bindings.layout().clone(),
                    mesh_layout.clone(),
                    shadow_layout.clone(),
                ])
                .with_color_format(format)
                .with_depth(TextureResource::DEPTH_FORMAT),
        )?;

        pipeline_manager.register_pipeline(
            SHADOW_PIPELINE,
            &PipelineConfig::default()
                .with_label("Shadow Pipeline")
                .with_shader(SHADOW_PIPELINE)
                .with_bind_group_layouts(vec![
                    global_bindings.layout().clone(),
                    mesh_layout.clone(),
                ])
                .with_cull_mode(None)
                .with_depth(TextureResource::DEPTH_FORMAT)
                .with_depth_bias(wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                })
                .with_vertex_only(),
        )?;

        log::info!(
            "Render engine ready: {}x{} surface, format {:?}",
            physical_width,
            physical_height,
            format
        );

        Ok(RenderEngine {
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline_manager,
            global_ubo,
            global_bindings,
            mesh_layout,
            shadow_layout,
            shadow_map,
            shadow_bind_group,
            white_texture,
            models: HashMap::new(),
            shadow_debug: std::env::var("VISTA_SHADOW_DEBUG").is_ok(),
        })
    }

    /// Uploads geometry for model nodes that have not been seen yet
    fn upload_new_models(&mut self, scene: &SceneGraph) {
        for (node, model) in scene.models() {
            if self.models.contains_key(&node.id) {
                continue;
            }
            let gpu_model = self.upload_model(model);
            log::debug!(
                "Uploaded model '{}' ({} meshes, {} diffuse maps)",
                model.name,
                gpu_model.meshes.len(),
                gpu_model.textures.iter().flatten().count()
            );
            self.models.insert(node.id, gpu_model);
        }
    }

    fn upload_model(&self, model: &Model) -> GpuModel {
        let textures: Vec<Option<TextureResource>> = model
            .materials
            .iter()
            .map(|material| {
                material.diffuse_map.as_ref().map(|image| {
                    TextureResource::create_diffuse(
                        &self.device,
                        &self.queue,
                        image,
                        &format!("{} Diffuse", material.name),
                    )
                })
            })
            .collect();

        let meshes = model
            .meshes
            .iter()
            .filter(|mesh| mesh.index_count() > 0)
            .map(|mesh| {
                let diffuse = mesh
                    .material_index
                    .and_then(|i| textures.get(i))
                    .and_then(Option::as_ref)
                    .unwrap_or(&self.white_texture);

                let vertex_buffer =
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some(&format!("{} Vertex Buffer", mesh.name)),
                            contents: bytemuck::cast_slice(mesh.vertices()),
                            usage: wgpu::BufferUsages::VERTEX,
                        });
                let index_buffer =
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some(&format!("{} Index Buffer", mesh.name)),
                            contents: bytemuck::cast_slice(mesh.indices()),
                            usage: wgpu::BufferUsages::INDEX,
                        });

                let uniform = UniformBuffer::new(
                    &self.device,
                    &format!("{} Mesh Uniform", mesh.name),
                    MeshUniform::new(Matrix4::from_scale(1.0), model.material_for(mesh)),
                );
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{} Bind Group", mesh.name)),
                    layout: &self.mesh_layout,
                    entries: &[
                        uniform.entry(0),
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&diffuse.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                        },
                    ],
                });

                GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: mesh.index_count(),
                    material_index: mesh.material_index,
                    uniform,
                    bind_group,
                }
            })
            .collect();

        GpuModel { meshes, textures }
    }

    /// Writes node transforms into the per-mesh uniforms
    fn update_model_transforms(&mut self, scene: &SceneGraph) {
        for (node, model) in scene.models() {
            let Some(gpu_model) = self.models.get_mut(&node.id) else {
                continue;
            };
            let position = scene.world_position(node.id).unwrap_or(node.position);
            let transform = Matrix4::from_translation(Vector3::new(
                position.x, position.y, position.z,
            )) * Matrix4::from_scale(node.scale);

            for mesh in &mut gpu_model.meshes {
                let material = mesh.material_index.and_then(|i| model.materials.get(i));
                mesh.uniform
                    .update_content(&self.queue, MeshUniform::new(transform, material));
            }
        }
    }

    /// Recreates the shadow map when the casting light asks for another size
    fn ensure_shadow_map(&mut self, width: u32, height: u32) {
        if self.shadow_map.size() == (width.max(1), height.max(1)) {
            return;
        }
        self.shadow_map = TextureResource::create_shadow_map(&self.device, width, height);
        self.shadow_bind_group =
            create_shadow_bind_group(&self.device, &self.shadow_layout, &self.shadow_map);
        log::debug!("Shadow map resized to {}x{}", width, height);
    }

    fn clear_color(scene: &SceneGraph) -> wgpu::Color {
        match scene.sky() {
            Some(sky) => {
                let [r, g, b, a] = sky.params.clear_color();
                wgpu::Color { r, g, b, a }
            }
            None => DEFAULT_CLEAR_COLOR,
        }
    }

    /// Visible model nodes that have GPU geometry
    fn visible_models<'a>(
        &'a self,
        scene: &'a SceneGraph,
    ) -> impl Iterator<Item = &'a GpuModel> + 'a {
        scene
            .models()
            .filter(|(node, _)| node.visible)
            .filter_map(|(node, _)| self.models.get(&node.id))
    }
}

fn create_shadow_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    shadow_map: &TextureResource,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Shadow Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
            },
        ],
    })
}

impl Renderer for RenderEngine {
    fn set_surface_size(&mut self, viewport: &ViewportState) {
        let (physical_width, physical_height) = viewport.physical_size();
        self.config.width = physical_width;
        self.config.height = physical_height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = TextureResource::create_depth_texture(
            &self.device,
            physical_width,
            physical_height,
            "depth_texture",
        );
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn draw(&mut self, scene: &SceneGraph, camera: &CameraRig) -> anyhow::Result<()> {
        self.upload_new_models(scene);
        self.update_model_transforms(scene);

        let globals = GlobalUniform::from_scene(scene, camera);
        self.global_ubo.update_content(&self.queue, globals);

        if let Some(shadow) = scene.lights().find_map(|(_, light)| shadow_of(light)) {
            self.ensure_shadow_map(shadow.map_width, shadow.map_height);
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface texture acquisition timed out, skipping frame");
                return Ok(());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("failed to acquire surface texture"))
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // PASS 1: shadow depth from the casting light
        if globals.casts_shadow() {
            if self.shadow_debug {
                log::info!(
                    "SHADOW DEBUG: rendering {}x{} shadow map for {} models",
                    self.shadow_map.size().0,
                    self.shadow_map.size().1,
                    self.models.len()
                );
            }

            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(pipeline) = self.pipeline_manager.get_pipeline(SHADOW_PIPELINE) {
                shadow_pass.set_pipeline(pipeline);
                shadow_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
                for gpu_model in self.visible_models(scene) {
                    for mesh in &gpu_model.meshes {
                        shadow_pass.draw_gpu_mesh(mesh);
                    }
                }
            }
        }

        // PASS 2: lit scene
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(Self::clear_color(scene)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(pipeline) = self.pipeline_manager.get_pipeline(SCENE_PIPELINE) {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
                render_pass.set_bind_group(2, &self.shadow_bind_group, &[]);
                for gpu_model in self.visible_models(scene) {
                    for mesh in &gpu_model.meshes {
                        render_pass.draw_gpu_mesh(mesh);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}
