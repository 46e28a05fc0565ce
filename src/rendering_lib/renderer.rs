// src/rendering_lib/renderer.rs

use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use super::shader::{FLAT_SHADER_SOURCE, TEXTURED_SHADER_SOURCE};
use super::texture::GpuTexture;
use super::vertex::Vertex;
use crate::engine_lib::frame::{RenderCommand, RenderState, StencilMode};
use crate::engine_lib::scene_types::{BatchId, Material, SceneResources};

pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

const MAX_DRAWS: usize = 4096;
const UNIFORM_STRIDE: wgpu::BufferAddress = 256;
// view_proj + color; the rest of each 256-byte slot is padding.
const UNIFORM_BINDING_SIZE: u64 = 80;
const DEFAULT_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniform {
    view_proj: [[f32; 4]; 4],
    color: [f32; 4],
    _padding: [[f32; 4]; 11],
}

impl DrawUniform {
    fn new(view_proj: Mat4, color: [f32; 4]) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            color,
            _padding: [[0.0; 4]; 11],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Textured,
    Skybox,
    Flat,
}

struct GpuBatch {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    kind: ShaderKind,
    texture: Option<usize>,
    color: [f32; 4],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedDraw {
    pub batch: BatchId,
    pub view_proj: Mat4,
    pub state: RenderState,
}

/// One render pass: its load ops and the draws recorded until the next
/// clear.
#[derive(Clone, Debug, PartialEq)]
pub struct PassPlan {
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: bool,
    pub clear_stencil: bool,
    pub draws: Vec<PlannedDraw>,
}

impl PassPlan {
    fn loading() -> Self {
        Self {
            clear_color: None,
            clear_depth: false,
            clear_stencil: false,
            draws: Vec::new(),
        }
    }
}

/// Splits a recorded frame into passes. A clear opens a new pass unless the
/// current one has no draws yet, in which case the clears merge. The first
/// pass always clears so the frame never starts from undefined contents.
pub fn plan_passes(commands: &[RenderCommand]) -> Vec<PassPlan> {
    let mut passes = vec![PassPlan {
        clear_color: Some(DEFAULT_CLEAR),
        clear_depth: true,
        clear_stencil: true,
        draws: Vec::new(),
    }];
    for command in commands {
        match *command {
            RenderCommand::Clear { color, depth, stencil } => {
                if passes.last().map_or(true, |pass| !pass.draws.is_empty()) {
                    passes.push(PassPlan::loading());
                }
                if let Some(pass) = passes.last_mut() {
                    if color.is_some() {
                        pass.clear_color = color;
                    }
                    pass.clear_depth |= depth;
                    pass.clear_stencil |= stencil;
                }
            }
            RenderCommand::Draw { batch, view, projection, state } => {
                if let Some(pass) = passes.last_mut() {
                    pass.draws.push(PlannedDraw {
                        batch,
                        view_proj: projection * view,
                        state,
                    });
                }
            }
        }
    }
    passes
}

pub fn depth_stencil_state(state: RenderState) -> wgpu::DepthStencilState {
    let (face, read_mask, write_mask) = match state.stencil {
        StencilMode::Disabled => (wgpu::StencilFaceState::IGNORE, 0, 0),
        StencilMode::Increment => (
            wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Never,
                fail_op: wgpu::StencilOperation::IncrementClamp,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Keep,
            },
            0xff,
            0xff,
        ),
        StencilMode::Inside { .. } => (
            wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::LessEqual,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Keep,
            },
            0xff,
            0x00,
        ),
    };
    wgpu::DepthStencilState {
        format: DEPTH_STENCIL_FORMAT,
        depth_write_enabled: state.depth_write,
        depth_compare: if state.depth_test {
            wgpu::CompareFunction::Less
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask,
            write_mask,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

pub fn color_writes(state: RenderState) -> wgpu::ColorWrites {
    if state.color_write {
        wgpu::ColorWrites::ALL
    } else {
        wgpu::ColorWrites::empty()
    }
}

fn stencil_reference(state: RenderState) -> u32 {
    match state.stencil {
        StencilMode::Inside { reference } => reference,
        _ => 0,
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Stencil Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_STENCIL_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn texture_layout(device: &wgpu::Device, dimension: wgpu::TextureViewDimension, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: dimension,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub struct Renderer {
    surface_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    cube_layout: wgpu::BindGroupLayout,

    textured_module: wgpu::ShaderModule,
    flat_module: wgpu::ShaderModule,
    skybox_modules: Option<(wgpu::ShaderModule, wgpu::ShaderModule)>,
    pipelines: HashMap<(ShaderKind, RenderState), wgpu::RenderPipeline>,

    batches: Vec<Option<GpuBatch>>,
    texture_bind_groups: Vec<wgpu::BindGroup>,
    uniforms: Vec<DrawUniform>,
}

impl Renderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let textured_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Textured Shader Module"),
            source: wgpu::ShaderSource::Wgsl(TEXTURED_SHADER_SOURCE.into()),
        });
        let flat_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Flat Shader Module"),
            source: wgpu::ShaderSource::Wgsl(FLAT_SHADER_SOURCE.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: MAX_DRAWS as u64 * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_BINDING_SIZE),
                },
                count: None,
            }],
            label: Some("draw_uniform_bind_group_layout"),
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_BINDING_SIZE),
                }),
            }],
            label: Some("draw_uniform_bind_group"),
        });

        Self {
            surface_format,
            depth_view: create_depth_view(device, width, height),
            uniform_buffer,
            uniform_bind_group,
            uniform_layout,
            texture_layout: texture_layout(device, wgpu::TextureViewDimension::D2, "texture_bind_group_layout"),
            cube_layout: texture_layout(device, wgpu::TextureViewDimension::Cube, "cube_bind_group_layout"),
            textured_module,
            flat_module,
            skybox_modules: None,
            pipelines: HashMap::new(),
            batches: Vec::new(),
            texture_bind_groups: Vec::new(),
            uniforms: Vec::with_capacity(MAX_DRAWS),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = create_depth_view(device, width, height);
    }

    /// Uploads a scene's static batches, textures and skybox program,
    /// replacing whatever the previous scene left behind.
    pub fn load_scene(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, resources: &SceneResources) {
        let textures: Vec<GpuTexture> = resources
            .textures()
            .iter()
            .enumerate()
            .map(|(i, source)| GpuTexture::from_source(device, queue, source, &format!("Scene Texture {i}")))
            .collect();

        self.texture_bind_groups = textures
            .iter()
            .map(|texture| {
                let layout = if texture.is_cube { &self.cube_layout } else { &self.texture_layout };
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&texture.sampler),
                        },
                    ],
                    label: Some("scene_texture_bind_group"),
                })
            })
            .collect();

        self.batches = resources
            .batches()
            .iter()
            .enumerate()
            .map(|(id, batch)| {
                if batch.mesh.is_empty() {
                    return None;
                }
                let (kind, texture, color) = match batch.material {
                    Material::Textured(t) if textures.get(t).is_some_and(|tex| !tex.is_cube) => {
                        (ShaderKind::Textured, Some(t), [1.0; 4])
                    }
                    Material::Skybox(t) if textures.get(t).is_some_and(|tex| tex.is_cube) => {
                        (ShaderKind::Skybox, Some(t), [1.0; 4])
                    }
                    Material::Flat(color) => (ShaderKind::Flat, None, color),
                    ref other => {
                        log::warn!("batch {id}: material {other:?} has no matching texture; drawing flat");
                        (ShaderKind::Flat, None, [1.0, 0.0, 1.0, 1.0])
                    }
                };
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Batch Vertex Buffer"),
                    contents: bytemuck::cast_slice(&batch.mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Batch Index Buffer"),
                    contents: bytemuck::cast_slice(&batch.mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                Some(GpuBatch {
                    vertex_buffer,
                    index_buffer,
                    index_count: batch.mesh.indices.len() as u32,
                    kind,
                    texture,
                    color,
                })
            })
            .collect();

        self.skybox_modules = resources.skybox_shader.as_ref().map(|shader| {
            let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Skybox Vertex Module"),
                source: wgpu::ShaderSource::Wgsl(shader.vertex.as_str().into()),
            });
            let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Skybox Fragment Module"),
                source: wgpu::ShaderSource::Wgsl(shader.fragment.as_str().into()),
            });
            (vertex, fragment)
        });
        self.pipelines.retain(|(kind, _), _| *kind != ShaderKind::Skybox);

        log::info!(
            "renderer loaded {} batches and {} textures",
            self.batches.len(),
            self.texture_bind_groups.len()
        );
    }

    fn create_pipeline(&self, device: &wgpu::Device, kind: ShaderKind, state: RenderState) -> Option<wgpu::RenderPipeline> {
        let (vertex_module, fragment_module, layouts): (_, _, Vec<&wgpu::BindGroupLayout>) = match kind {
            ShaderKind::Textured => (
                &self.textured_module,
                &self.textured_module,
                vec![&self.uniform_layout, &self.texture_layout],
            ),
            ShaderKind::Flat => (&self.flat_module, &self.flat_module, vec![&self.uniform_layout]),
            ShaderKind::Skybox => {
                let (vertex, fragment) = self.skybox_modules.as_ref()?;
                (vertex, fragment, vec![&self.uniform_layout, &self.cube_layout])
            }
        };

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Renderer Pipeline Layout"),
            bind_group_layouts: &layouts,
            push_constant_ranges: &[],
        });

        Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Renderer Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: vertex_module,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: color_writes(state),
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(depth_stencil_state(state)),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        }))
    }

    fn ensure_pipeline(&mut self, device: &wgpu::Device, kind: ShaderKind, state: RenderState) -> bool {
        if self.pipelines.contains_key(&(kind, state)) {
            return true;
        }
        match self.create_pipeline(device, kind, state) {
            Some(pipeline) => {
                log::debug!("created pipeline for {kind:?} / {state:?}");
                self.pipelines.insert((kind, state), pipeline);
                true
            }
            None => false,
        }
    }

    /// Replays a recorded frame into `encoder`, targeting `output_view`.
    pub fn render_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        commands: &[RenderCommand],
    ) {
        let passes = plan_passes(commands);

        // Resolve pipelines and uniform slots before any pass borrows self.
        self.uniforms.clear();
        let mut slots: Vec<Vec<Option<u32>>> = Vec::with_capacity(passes.len());
        for pass in &passes {
            let mut pass_slots = Vec::with_capacity(pass.draws.len());
            for draw in &pass.draws {
                let Some((kind, color)) = self
                    .batches
                    .get(draw.batch)
                    .and_then(Option::as_ref)
                    .map(|batch| (batch.kind, batch.color))
                else {
                    pass_slots.push(None);
                    continue;
                };
                if self.uniforms.len() >= MAX_DRAWS {
                    log::warn!("frame exceeds {MAX_DRAWS} draws; dropping the rest");
                    pass_slots.push(None);
                    continue;
                }
                if !self.ensure_pipeline(device, kind, draw.state) {
                    pass_slots.push(None);
                    continue;
                }
                pass_slots.push(Some(self.uniforms.len() as u32));
                self.uniforms.push(DrawUniform::new(draw.view_proj, color));
            }
            slots.push(pass_slots);
        }
        if !self.uniforms.is_empty() {
            queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&self.uniforms));
        }

        for (pass, pass_slots) in passes.iter().zip(&slots) {
            let color_load = match pass.clear_color {
                Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: a as f64,
                }),
                None => wgpu::LoadOp::Load,
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: if pass.clear_depth { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: if pass.clear_stencil { wgpu::LoadOp::Clear(0) } else { wgpu::LoadOp::Load },
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for (draw, slot) in pass.draws.iter().zip(pass_slots) {
                let Some(slot) = slot else { continue };
                let Some(batch) = self.batches.get(draw.batch).and_then(Option::as_ref) else {
                    continue;
                };
                let Some(pipeline) = self.pipelines.get(&(batch.kind, draw.state)) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_stencil_reference(stencil_reference(draw.state));
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[slot * UNIFORM_STRIDE as u32]);
                if let Some(bind_group) = batch.texture.and_then(|t| self.texture_bind_groups.get(t)) {
                    render_pass.set_bind_group(1, bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, batch.vertex_buffer.slice(..));
                render_pass.set_index_buffer(batch.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..batch.index_count, 0, 0..1);
            }
        }
    }
}
