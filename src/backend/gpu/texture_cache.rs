use std::sync::Arc;

use ahash::{HashMap, HashMapExt};

use crate::error::{RenderError, Result};
use crate::style::TextureWrap;
use crate::texture::Image;

/// Uploaded textures not sampled for this many frames are released.
const TEXTURE_IDLE_FRAMES: u64 = 120;

struct CachedTexture {
    generation: u64,
    texture: wgpu::Texture,
    bind_groups: HashMap<TextureWrap, Arc<wgpu::BindGroup>>,
    last_used: u64,
}

/// GPU copies of caller-owned images, keyed by [`Image::id`]. An image is uploaded on first use
/// and written again whenever its generation moved.
pub(super) struct TextureCache {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    layout: Arc<wgpu::BindGroupLayout>,
    filter: wgpu::FilterMode,
    max_size: u32,
    textures: HashMap<u64, CachedTexture>,
    default_bind_group: Arc<wgpu::BindGroup>,
    frame: u64,
}

impl TextureCache {
    pub(super) fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        layout: Arc<wgpu::BindGroupLayout>,
        smooth: bool,
    ) -> Self {
        let filter = if smooth {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        let max_size = device.limits().max_texture_dimension_2d;
        let white = create_texture(&device, (1, 1), "easel_default_white_texture");
        write_pixels(&queue, &white, (1, 1), &[255, 255, 255, 255]);
        let default_bind_group = Arc::new(create_bind_group(
            &device,
            &layout,
            &white,
            filter,
            TextureWrap::Clamp,
        ));
        Self {
            device,
            queue,
            layout,
            filter,
            max_size,
            textures: HashMap::new(),
            default_bind_group,
            frame: 0,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.textures.len()
    }

    pub(super) fn default_bind_group(&self) -> Arc<wgpu::BindGroup> {
        self.default_bind_group.clone()
    }

    pub(super) fn begin_frame(&mut self) {
        self.frame += 1;
    }

    pub(super) fn end_frame(&mut self) {
        let frame = self.frame;
        self.textures
            .retain(|_, t| frame.saturating_sub(t.last_used) < TEXTURE_IDLE_FRAMES);
    }

    /// Bind group sampling `image` with `wrap`, uploading it first when needed.
    pub(super) fn bind_group(
        &mut self,
        image: &Image,
        wrap: TextureWrap,
    ) -> Result<Arc<wgpu::BindGroup>> {
        let (width, height) = image.size();
        if width == 0 || height == 0 || width > self.max_size || height > self.max_size {
            return Err(RenderError::ResourceUpload {
                resource: format!("image {}", image.id()),
                reason: format!(
                    "{}x{} exceeds the device limit of {}",
                    width, height, self.max_size
                ),
            });
        }

        let generation = image.generation();
        let frame = self.frame;
        let entry = self.textures.entry(image.id()).or_insert_with(|| {
            tracing::debug!("allocating {}x{} texture for image {}", width, height, image.id());
            CachedTexture {
                // forces the first write below
                generation: u64::MAX,
                texture: create_texture(&self.device, (width, height), "easel_image_texture"),
                bind_groups: HashMap::new(),
                last_used: frame,
            }
        });
        if entry.generation != generation {
            write_pixels(&self.queue, &entry.texture, (width, height), &image.pixels());
            entry.generation = generation;
        }
        entry.last_used = frame;

        let CachedTexture {
            texture,
            bind_groups,
            ..
        } = entry;
        let bind_group = bind_groups.entry(wrap).or_insert_with(|| {
            Arc::new(create_bind_group(
                &self.device,
                &self.layout,
                texture,
                self.filter,
                wrap,
            ))
        });
        Ok(bind_group.clone())
    }
}

fn create_texture(device: &wgpu::Device, size: (u32, u32), label: &str) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_pixels(queue: &wgpu::Queue, texture: &wgpu::Texture, size: (u32, u32), pixels: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * size.0),
            rows_per_image: Some(size.1),
        },
        wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
    );
}

pub(super) fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    filter: wgpu::FilterMode,
    wrap: TextureWrap,
) -> wgpu::BindGroup {
    let address_mode = match wrap {
        TextureWrap::Clamp => wgpu::AddressMode::ClampToEdge,
        TextureWrap::Repeat => wgpu::AddressMode::Repeat,
    };
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("easel_texture_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}
