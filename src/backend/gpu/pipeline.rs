use std::sync::Arc;

use ahash::{HashMap, HashMapExt};

use crate::batch::Topology;
use crate::error::{RenderError, Result};
use crate::shader::{FragmentShader, FRAGMENT_PREAMBLE};
use crate::style::BlendMode;
use crate::vertex::GpuVertex;

pub(super) const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_STAGE: &str = include_str!("vertex.wgsl");
const DEFAULT_FRAGMENT: &str = include_str!("fragment.wgsl");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub topology: Topology,
    pub blend: BlendMode,
    pub depth_test: bool,
    /// `None` for the built-in fragment stage.
    pub shader: Option<u64>,
}

/// Blend states for a straight-alpha fragment over a premultiplied target. They encode the
/// same equations as the software rasterizer's `blend`.
pub(super) fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    use wgpu::{BlendComponent as C, BlendFactor as F, BlendOperation as Op};

    let component = |src_factor, dst_factor, operation| C {
        src_factor,
        dst_factor,
        operation,
    };
    match mode {
        BlendMode::Blend => wgpu::BlendState {
            color: component(F::SrcAlpha, F::OneMinusSrcAlpha, Op::Add),
            alpha: component(F::One, F::OneMinusSrcAlpha, Op::Add),
        },
        BlendMode::Add => wgpu::BlendState {
            color: component(F::SrcAlpha, F::One, Op::Add),
            alpha: component(F::One, F::One, Op::Add),
        },
        BlendMode::Subtract => wgpu::BlendState {
            color: component(F::SrcAlpha, F::One, Op::ReverseSubtract),
            alpha: component(F::Zero, F::One, Op::Add),
        },
        BlendMode::Multiply => wgpu::BlendState {
            color: component(F::Dst, F::OneMinusSrcAlpha, Op::Add),
            alpha: component(F::One, F::OneMinusSrcAlpha, Op::Add),
        },
        BlendMode::Replace => wgpu::BlendState {
            color: component(F::SrcAlpha, F::Zero, Op::Add),
            alpha: component(F::One, F::Zero, Op::Add),
        },
    }
}

fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
        Topology::Points => wgpu::PrimitiveTopology::PointList,
    }
}

fn depth_state(depth_test: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: depth_test,
        depth_compare: if depth_test {
            wgpu::CompareFunction::LessEqual
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Texture + sampler bind group layout shared by every drawing pipeline.
pub(super) fn create_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("easel_texture_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
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

/// Compiled pipelines of one backend, keyed by draw state. Shader modules are compiled once
/// per fragment shader and reused for every blend and topology.
pub(super) struct PipelineCache {
    device: Arc<wgpu::Device>,
    sample_count: u32,
    layout: wgpu::PipelineLayout,
    default_module: wgpu::ShaderModule,
    modules: HashMap<u64, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, Arc<wgpu::RenderPipeline>>,
}

impl PipelineCache {
    pub(super) fn new(
        device: Arc<wgpu::Device>,
        texture_layout: &wgpu::BindGroupLayout,
        sample_count: u32,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("easel_pipeline_layout"),
            bind_group_layouts: &[texture_layout],
            push_constant_ranges: &[],
        });
        let default_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("easel_default_shader"),
            source: wgpu::ShaderSource::Wgsl(
                format!("{FRAGMENT_PREAMBLE}\n{VERTEX_STAGE}\n{DEFAULT_FRAGMENT}").into(),
            ),
        });
        Self {
            device,
            sample_count,
            layout,
            default_module,
            modules: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Compiles a user fragment stage, reporting WGSL errors instead of panicking.
    pub(super) fn load_shader(&mut self, shader: &FragmentShader) -> Result<()> {
        if self.modules.contains_key(&shader.id()) {
            return Ok(());
        }
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("easel_user_shader"),
                source: wgpu::ShaderSource::Wgsl(shader.module_source(VERTEX_STAGE).into()),
            });
        if let Some(error) = futures::executor::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::ResourceUpload {
                resource: "fragment shader".into(),
                reason: error.to_string(),
            });
        }
        tracing::debug!("compiled fragment shader {}", shader.id());
        self.modules.insert(shader.id(), module);
        Ok(())
    }

    pub(super) fn get(&mut self, key: PipelineKey) -> Option<Arc<wgpu::RenderPipeline>> {
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Some(pipeline.clone());
        }
        let module = match key.shader {
            Some(id) => self.modules.get(&id)?,
            None => &self.default_module,
        };
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("easel_draw_pipeline"),
                layout: Some(&self.layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[GpuVertex::desc()],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: Some(blend_state(key.blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: primitive_topology(key.topology),
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(depth_state(key.depth_test)),
                multisample: wgpu::MultisampleState {
                    count: self.sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            });
        let pipeline = Arc::new(pipeline);
        self.pipelines.insert(key, pipeline.clone());
        Some(pipeline)
    }
}

/// Pipeline that copies the color target onto a window surface.
pub(super) struct PresentPipeline {
    pub(super) pipeline: wgpu::RenderPipeline,
    pub(super) layout: wgpu::BindGroupLayout,
}

impl PresentPipeline {
    pub(super) fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let layout = create_texture_bind_group_layout(device);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("easel_present_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("present.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("easel_present_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("easel_present_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_quad"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_present"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        Self { pipeline, layout }
    }
}

/// MSAA counts every adapter supports for RGBA8: 1 and 4.
pub(super) fn validate_sample_count(requested: u32) -> u32 {
    match requested {
        0 | 1 => 1,
        2..=4 => 4,
        _ => {
            tracing::warn!(
                "requested MSAA sample count {} is not widely supported, clamping to 4",
                requested
            );
            4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts_are_clamped() {
        assert_eq!(validate_sample_count(0), 1);
        assert_eq!(validate_sample_count(2), 4);
        assert_eq!(validate_sample_count(16), 4);
    }

    #[test]
    fn replace_ignores_the_destination() {
        let state = blend_state(BlendMode::Replace);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::Zero);
        assert_eq!(state.alpha.dst_factor, wgpu::BlendFactor::Zero);
    }
}
