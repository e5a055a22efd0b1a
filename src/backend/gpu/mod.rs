//! wgpu backend: renders into an offscreen RGBA8 target with a depth buffer, optionally
//! copying each finished frame onto a window surface.

mod pipeline;
mod readback;
mod texture_cache;

use std::ops::Range;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{CompositeAlphaMode, InstanceDescriptor, SurfaceTarget};

use self::pipeline::{
    create_texture_bind_group_layout, validate_sample_count, PipelineCache, PipelineKey,
    PresentPipeline, COLOR_FORMAT, DEPTH_FORMAT,
};
use self::texture_cache::{create_bind_group, TextureCache};
use crate::backend::{unpremultiply, Capabilities, RenderBackend};
use crate::batch::DrawCommand;
use crate::color::Color;
use crate::error::{RenderError, Result};
use crate::style::TextureWrap;
use crate::vertex::GpuVertex;

/// Device and queue shared by every backend created from the same adapter.
#[derive(Clone)]
pub struct GpuContext {
    adapter: Arc<wgpu::Adapter>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// Requests an adapter and device. Fails with [`RenderError::DeviceUnavailable`] in
    /// environments without a usable GPU.
    pub async fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());
        Self::request_with(instance, None).await
    }

    async fn request_with(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::DeviceUnavailable(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("easel_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| RenderError::DeviceUnavailable(e.to_string()))?;

        let info = adapter.get_info();
        tracing::info!("using {} ({:?})", info.name, info.backend);

        Ok(Self {
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }
}

struct RenderTargets {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
}

impl RenderTargets {
    fn new(device: &wgpu::Device, (width, height): (u32, u32), sample_count: u32) -> Self {
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = |label, samples, format, usage| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: extent,
                mip_level_count: 1,
                sample_count: samples,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        };
        let color = texture(
            "easel_color_target",
            1,
            COLOR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let msaa_view = (sample_count > 1).then(|| {
            texture(
                "easel_msaa_target",
                sample_count,
                COLOR_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            )
            .create_view(&wgpu::TextureViewDescriptor::default())
        });
        let depth_view = texture(
            "easel_depth_target",
            sample_count,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
        .create_view(&wgpu::TextureViewDescriptor::default());
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            color,
            color_view,
            msaa_view,
            depth_view,
        }
    }
}

struct WindowTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    present: PresentPipeline,
    bind_group: wgpu::BindGroup,
}

impl WindowTarget {
    fn rebind(&mut self, device: &wgpu::Device, color: &wgpu::Texture) {
        self.bind_group = create_bind_group(
            device,
            &self.present.layout,
            color,
            wgpu::FilterMode::Nearest,
            TextureWrap::Clamp,
        );
    }
}

struct PreparedDraw {
    pipeline: Arc<wgpu::RenderPipeline>,
    bind_group: Arc<wgpu::BindGroup>,
    range: Range<u32>,
}

pub struct WgpuBackend {
    context: GpuContext,
    size: (u32, u32),
    sample_count: u32,
    smooth: bool,
    targets: RenderTargets,
    pipelines: PipelineCache,
    textures: TextureCache,
    window: Option<WindowTarget>,
}

impl WgpuBackend {
    /// Offscreen backend on a freshly requested device.
    pub async fn try_new_headless(
        size: (u32, u32),
        msaa_samples: u32,
        smooth: bool,
    ) -> Result<Self> {
        let context = GpuContext::request().await?;
        Ok(Self::with_context(context, size, msaa_samples, smooth))
    }

    /// Backend that presents every finished frame to `window`.
    pub async fn new_windowed(
        window: impl Into<SurfaceTarget<'static>>,
        size: (u32, u32),
        msaa_samples: u32,
        smooth: bool,
        vsync: bool,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::DeviceUnavailable(e.to_string()))?;
        let context = GpuContext::request_with(instance, Some(&surface)).await?;
        let mut backend = Self::with_context(context, size, msaa_samples, smooth);

        let caps = surface.get_capabilities(&backend.context.adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| RenderError::DeviceUnavailable("surface has no formats".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: backend.size.0,
            height: backend.size.1,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            desired_maximum_frame_latency: 2,
            alpha_mode: CompositeAlphaMode::Opaque,
            view_formats: vec![],
        };
        surface.configure(&backend.context.device, &config);

        let present = PresentPipeline::new(&backend.context.device, format);
        let bind_group = create_bind_group(
            &backend.context.device,
            &present.layout,
            &backend.targets.color,
            wgpu::FilterMode::Nearest,
            TextureWrap::Clamp,
        );
        backend.window = Some(WindowTarget {
            surface,
            config,
            present,
            bind_group,
        });
        Ok(backend)
    }

    /// Backend sharing an existing device.
    pub fn with_context(
        context: GpuContext,
        size: (u32, u32),
        msaa_samples: u32,
        smooth: bool,
    ) -> Self {
        let size = (size.0.max(1), size.1.max(1));
        let sample_count = validate_sample_count(msaa_samples);
        let device = context.device.clone();
        let texture_layout = Arc::new(create_texture_bind_group_layout(&device));
        let pipelines = PipelineCache::new(device.clone(), &texture_layout, sample_count);
        let textures = TextureCache::new(device.clone(), context.queue.clone(), texture_layout, smooth);
        let targets = RenderTargets::new(&device, size, sample_count);
        Self {
            context,
            size,
            sample_count,
            smooth,
            targets,
            pipelines,
            textures,
            window: None,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        vertex_buffer: Option<&wgpu::Buffer>,
        clear: Option<Color>,
        draws: &[PreparedDraw],
    ) {
        let (view, resolve_target) = match &self.targets.msaa_view {
            Some(msaa) => (msaa, Some(&self.targets.color_view)),
            None => (&self.targets.color_view, None),
        };
        let color_load = match clear {
            Some(color) => {
                let c = color.normalize();
                let a = c[3] as f64;
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: c[0] as f64 * a,
                    g: c[1] as f64 * a,
                    b: c[2] as f64 * a,
                    a,
                })
            }
            None => wgpu::LoadOp::Load,
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("easel_draw_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: if clear.is_some() {
                        wgpu::LoadOp::Clear(1.0)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let Some(vertex_buffer) = vertex_buffer else {
            return;
        };
        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        for draw in draws {
            pass.set_pipeline(&draw.pipeline);
            pass.set_bind_group(0, draw.bind_group.as_ref(), &[]);
            pass.draw(draw.range.clone(), 0..1);
        }
    }

    fn present(&mut self) -> Result<()> {
        let Some(window) = &self.window else {
            return Ok(());
        };
        let frame = match window.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("window surface lost, reconfiguring");
                window.surface.configure(&self.context.device, &window.config);
                window.surface.get_current_texture()?
            }
            Err(e) => return Err(e.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("easel_present_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("easel_present_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&window.present.pipeline);
            pass.set_bind_group(0, &window.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_texture_size: self.context.device.limits().max_texture_dimension_2d,
            custom_shaders: true,
            max_samples: 4,
        }
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.size = (width.max(1), height.max(1));
        self.targets = RenderTargets::new(&self.context.device, self.size, self.sample_count);
        if let Some(window) = &mut self.window {
            window.config.width = self.size.0;
            window.config.height = self.size.1;
            window.surface.configure(&self.context.device, &window.config);
            window.rebind(&self.context.device, &self.targets.color);
        }
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.textures.begin_frame();
        Ok(())
    }

    fn submit(&mut self, commands: Vec<DrawCommand>) -> Result<()> {
        let mut first_error = None;
        let mut vertices: Vec<GpuVertex> = Vec::new();
        let mut passes: Vec<(Option<Color>, Vec<PreparedDraw>)> = Vec::new();

        for command in commands {
            let batch = match command {
                DrawCommand::Clear(color) => {
                    passes.push((Some(color), Vec::new()));
                    continue;
                }
                DrawCommand::Geometry(batch) => batch,
            };
            let shader = match &batch.shader {
                Some(shader) => match self.pipelines.load_shader(shader) {
                    Ok(()) => Some(shader.id()),
                    Err(e) => {
                        tracing::warn!("{}, using the default shading", e);
                        first_error.get_or_insert(e);
                        None
                    }
                },
                None => None,
            };
            let bind_group = match &batch.texture {
                Some((image, wrap)) => match self.textures.bind_group(image, *wrap) {
                    Ok(bind_group) => bind_group,
                    Err(e) => {
                        tracing::warn!("{}, drawing untextured", e);
                        first_error.get_or_insert(e);
                        self.textures.default_bind_group()
                    }
                },
                None => self.textures.default_bind_group(),
            };
            let key = PipelineKey {
                topology: batch.topology,
                blend: batch.blend,
                depth_test: batch.depth_test,
                shader,
            };
            let Some(pipeline) = self.pipelines.get(key) else {
                continue;
            };
            let usable = batch.primitive_count() * batch.topology.vertices_per_primitive();
            let start = vertices.len() as u32;
            vertices.extend_from_slice(&batch.vertices[..usable]);
            if passes.is_empty() {
                passes.push((None, Vec::new()));
            }
            if let Some((_, draws)) = passes.last_mut() {
                draws.push(PreparedDraw {
                    pipeline,
                    bind_group,
                    range: start..vertices.len() as u32,
                });
            }
        }

        if !passes.is_empty() {
            let vertex_buffer = (!vertices.is_empty()).then(|| {
                self.context
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("easel_vertex_buffer"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    })
            });
            let mut encoder =
                self.context
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("easel_draw_encoder"),
                    });
            for (clear, draws) in &passes {
                self.encode_pass(&mut encoder, vertex_buffer.as_ref(), *clear, draws);
            }
            self.context.queue.submit(std::iter::once(encoder.finish()));
            tracing::debug!(
                "submitted {} passes, {} vertices",
                passes.len(),
                vertices.len()
            );
        }
        first_error.map_or(Ok(()), Err)
    }

    fn end_frame(&mut self) -> Result<()> {
        self.textures.end_frame();
        self.present()
    }

    fn read_pixels(&mut self) -> Result<Vec<u8>> {
        let mut pixels = readback::read_texture(
            &self.context.device,
            &self.context.queue,
            &self.targets.color,
            self.size,
        )?;
        unpremultiply(&mut pixels);
        Ok(pixels)
    }

    fn create_offscreen(&self, width: u32, height: u32) -> Result<Box<dyn RenderBackend>> {
        Ok(Box::new(Self::with_context(
            self.context.clone(),
            (width, height),
            self.sample_count,
            self.smooth,
        )))
    }
}
