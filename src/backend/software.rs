//! CPU rasterizer with a depth buffer.
//!
//! Triangles are clipped against the near plane, then scan-converted with edge functions at
//! pixel centers and perspective-correct attribute interpolation. Lines are single-pixel DDA
//! segments and points single pixels; wide strokes and points reach this backend already
//! expanded to triangles.

use ahash::{HashMap, HashMapExt};

use crate::backend::{blend, Capabilities, RenderBackend};
use crate::batch::{DrawBatch, DrawCommand, Topology};
use crate::error::{RenderError, Result};
use crate::style::{BlendMode, TextureWrap};
use crate::texture::Image;
use crate::vertex::GpuVertex;

const MAX_TEXTURE_SIZE: u32 = 16384;
/// Uploaded textures not sampled for this many frames are dropped.
const TEXTURE_IDLE_FRAMES: u64 = 120;
const NEAR_EPSILON: f32 = 1e-6;

struct CachedTexture {
    generation: u64,
    width: u32,
    height: u32,
    texels: Vec<[f32; 4]>,
    last_used: u64,
}

impl CachedTexture {
    fn sample(&self, uv: [f32; 2], wrap: TextureWrap) -> [f32; 4] {
        let wrap_coord = |t: f32| match wrap {
            TextureWrap::Clamp => t.clamp(0.0, 1.0),
            TextureWrap::Repeat => t - t.floor(),
        };
        let x = ((wrap_coord(uv[0]) * self.width as f32) as u32).min(self.width - 1);
        let y = ((wrap_coord(uv[1]) * self.height as f32) as u32).min(self.height - 1);
        self.texels[(y * self.width + x) as usize]
    }
}

/// Window-space vertex: pixel position, depth in `0..1`, `1/w`, and attributes divided by w.
#[derive(Debug, Clone, Copy)]
struct Projected {
    x: f32,
    y: f32,
    z: f32,
    inv_w: f32,
    color: [f32; 4],
    uv: [f32; 2],
}

pub struct SoftwareBackend {
    width: u32,
    height: u32,
    color: Vec<[f32; 4]>,
    depth: Vec<f32>,
    textures: HashMap<u64, CachedTexture>,
    frame: u64,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![[0.0; 4]; len],
            depth: vec![1.0; len],
            textures: HashMap::new(),
            frame: 0,
        }
    }

    /// Number of images currently uploaded.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn clear(&mut self, color: crate::color::Color) {
        let c = color.normalize();
        let premultiplied = [c[0] * c[3], c[1] * c[3], c[2] * c[3], c[3]];
        self.color.fill(premultiplied);
        self.depth.fill(1.0);
    }

    /// Uploads `image` if this backend has not seen its current generation yet.
    fn prepare_texture(&mut self, image: &Image) -> Result<u64> {
        let id = image.id();
        let frame = self.frame;
        if let Some(cached) = self.textures.get_mut(&id) {
            if cached.generation == image.generation() {
                cached.last_used = frame;
                return Ok(id);
            }
        }
        let (width, height) = image.size();
        if width == 0 || height == 0 || width > MAX_TEXTURE_SIZE || height > MAX_TEXTURE_SIZE {
            return Err(RenderError::ResourceUpload {
                resource: format!("image {}", id),
                reason: format!(
                    "{}x{} is outside the supported 1..={} range",
                    width, height, MAX_TEXTURE_SIZE
                ),
            });
        }
        let generation = image.generation();
        let texels = image
            .pixels()
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]].map(|c| c as f32 / 255.0))
            .collect();
        tracing::debug!("uploading {}x{} image {} (generation {})", width, height, id, generation);
        self.textures.insert(
            id,
            CachedTexture {
                generation,
                width,
                height,
                texels,
                last_used: frame,
            },
        );
        Ok(id)
    }

    fn draw_batch(&mut self, batch: &DrawBatch) -> Result<()> {
        let mut error = None;
        let texture = match &batch.texture {
            Some((image, wrap)) => match self.prepare_texture(image) {
                Ok(id) => Some((id, *wrap)),
                Err(e) => {
                    tracing::warn!("{}, drawing untextured", e);
                    error = Some(e);
                    None
                }
            },
            None => None,
        };
        if batch.shader.is_some() {
            let e = RenderError::UnsupportedCapability {
                capability: "custom fragment shaders",
                backend: self.name(),
            };
            tracing::warn!("{}, using the default shading", e);
            error.get_or_insert(e);
        }

        let raster = Raster {
            blend: batch.blend,
            depth_test: batch.depth_test,
            texture: texture.and_then(|(id, wrap)| self.textures.get(&id).map(|t| (t, wrap))),
            width: self.width,
            height: self.height,
        };
        let color = &mut self.color;
        let depth = &mut self.depth;
        match batch.topology {
            Topology::Triangles => {
                for tri in batch.vertices.chunks_exact(3) {
                    for clipped in clip_triangle(tri[0], tri[1], tri[2]) {
                        raster.triangle(color, depth, clipped);
                    }
                }
            }
            Topology::Lines => {
                for seg in batch.vertices.chunks_exact(2) {
                    if let Some((a, b)) = clip_segment(seg[0], seg[1]) {
                        raster.line(color, depth, a, b);
                    }
                }
            }
            Topology::Points => {
                for v in &batch.vertices {
                    if v.clip[3] > NEAR_EPSILON && v.clip[2] >= -v.clip[3] {
                        let p = raster.project(v);
                        let (x, y) = (p.x.floor() as i64, p.y.floor() as i64);
                        raster.plot(color, depth, x, y, p.z, v.color, v.tex_coords);
                    }
                }
            }
        }
        error.map_or(Ok(()), Err)
    }
}

impl RenderBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_texture_size: MAX_TEXTURE_SIZE,
            custom_shaders: false,
            max_samples: 1,
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let textures = std::mem::take(&mut self.textures);
        *self = Self {
            textures,
            frame: self.frame,
            ..Self::new(width, height)
        };
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.frame += 1;
        Ok(())
    }

    fn submit(&mut self, commands: Vec<DrawCommand>) -> Result<()> {
        let mut first_error = None;
        for command in commands {
            match command {
                DrawCommand::Clear(c) => self.clear(c),
                DrawCommand::Geometry(batch) => {
                    if let Err(e) = self.draw_batch(&batch) {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn end_frame(&mut self) -> Result<()> {
        let frame = self.frame;
        self.textures
            .retain(|_, t| frame.saturating_sub(t.last_used) < TEXTURE_IDLE_FRAMES);
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.color.len() * 4);
        for px in &self.color {
            let a = px[3];
            let straight = if a > 0.0 {
                [px[0] / a, px[1] / a, px[2] / a]
            } else {
                [0.0; 3]
            };
            out.extend(straight.map(to_u8));
            out.push(to_u8(a));
        }
        Ok(out)
    }

    fn create_offscreen(&self, width: u32, height: u32) -> Result<Box<dyn RenderBackend>> {
        Ok(Box::new(SoftwareBackend::new(width, height)))
    }
}

fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

struct Raster<'a> {
    blend: BlendMode,
    depth_test: bool,
    texture: Option<(&'a CachedTexture, TextureWrap)>,
    width: u32,
    height: u32,
}

impl Raster<'_> {
    fn project(&self, v: &GpuVertex) -> Projected {
        let inv_w = 1.0 / v.clip[3];
        let ndc = [v.clip[0] * inv_w, v.clip[1] * inv_w, v.clip[2] * inv_w];
        Projected {
            x: (ndc[0] + 1.0) / 2.0 * self.width as f32,
            y: (1.0 - ndc[1]) / 2.0 * self.height as f32,
            z: (ndc[2] + 1.0) / 2.0,
            inv_w,
            color: v.color.map(|c| c * inv_w),
            uv: v.tex_coords.map(|c| c * inv_w),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn plot(
        &self,
        color: &mut [[f32; 4]],
        depth: &mut [f32],
        x: i64,
        y: i64,
        z: f32,
        rgba: [f32; 4],
        uv: [f32; 2],
    ) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = y as usize * self.width as usize + x as usize;
        if self.depth_test {
            if z > depth[i] || !(0.0..=1.0).contains(&z) {
                return;
            }
            depth[i] = z;
        }
        let mut src = rgba;
        if let Some((texture, wrap)) = self.texture {
            let texel = texture.sample(uv, wrap);
            for c in 0..4 {
                src[c] *= texel[c];
            }
        }
        color[i] = blend(self.blend, src, color[i]);
    }

    fn triangle(&self, color: &mut [[f32; 4]], depth: &mut [f32], tri: [GpuVertex; 3]) {
        let p = tri.map(|v| self.project(&v));
        let area = edge(&p[0], &p[1], p[2].x, p[2].y);
        if area.abs() <= f32::EPSILON {
            return;
        }
        let min_x = p.iter().map(|v| v.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as i64;
        let max_x = p
            .iter()
            .map(|v| v.x)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil()
            .min(self.width as f32) as i64;
        let min_y = p.iter().map(|v| v.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as i64;
        let max_y = p
            .iter()
            .map(|v| v.y)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil()
            .min(self.height as f32) as i64;

        for y in min_y..max_y {
            for x in min_x..max_x {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(&p[1], &p[2], px, py) / area;
                let w1 = edge(&p[2], &p[0], px, py) / area;
                let w2 = edge(&p[0], &p[1], px, py) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                // Shared edges: only the edge owning the sample keeps it.
                if (w0 == 0.0 && !owns_edge(&p[1], &p[2], area))
                    || (w1 == 0.0 && !owns_edge(&p[2], &p[0], area))
                    || (w2 == 0.0 && !owns_edge(&p[0], &p[1], area))
                {
                    continue;
                }
                let z = w0 * p[0].z + w1 * p[1].z + w2 * p[2].z;
                let inv_w = w0 * p[0].inv_w + w1 * p[1].inv_w + w2 * p[2].inv_w;
                let lerp = |a: f32, b: f32, c: f32| (w0 * a + w1 * b + w2 * c) / inv_w;
                let rgba = [0, 1, 2, 3]
                    .map(|i| lerp(p[0].color[i], p[1].color[i], p[2].color[i]));
                let uv = [0, 1].map(|i| lerp(p[0].uv[i], p[1].uv[i], p[2].uv[i]));
                self.plot(color, depth, x, y, z, rgba, uv);
            }
        }
    }

    fn line(&self, color: &mut [[f32; 4]], depth: &mut [f32], a: GpuVertex, b: GpuVertex) {
        let (p, q) = (self.project(&a), self.project(&b));
        if ![p.x, p.y, q.x, q.y].iter().all(|c| c.is_finite()) {
            return;
        }
        // Far off-screen endpoints lose the visible span in f32.
        let (px, py) = (p.x as f64, p.y as f64);
        let (dx, dy) = (q.x as f64 - px, q.y as f64 - py);
        let Some((t0, t1)) =
            clip_to_viewport(px, py, dx, dy, self.width as f64, self.height as f64)
        else {
            return;
        };
        let span = (t1 - t0) * dx.abs().max(dy.abs());
        let steps = span.ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = t0 + (t1 - t0) * (i as f64 / steps as f64);
            let x = px + dx * t;
            let y = py + dy * t;
            let t = t as f32;
            let z = p.z + (q.z - p.z) * t;
            let inv_w = p.inv_w + (q.inv_w - p.inv_w) * t;
            let rgba = [0, 1, 2, 3].map(|c| (p.color[c] + (q.color[c] - p.color[c]) * t) / inv_w);
            let uv = [0, 1].map(|c| (p.uv[c] + (q.uv[c] - p.uv[c]) * t) / inv_w);
            self.plot(color, depth, x.floor() as i64, y.floor() as i64, z, rgba, uv);
        }
    }
}

/// Liang-Barsky: parameter range of `p + t * d`, `t` in `0..=1`, inside `[0, w] x [0, h]`.
fn clip_to_viewport(px: f64, py: f64, dx: f64, dy: f64, w: f64, h: f64) -> Option<(f64, f64)> {
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (denom, dist) in [(-dx, px), (dx, w - px), (-dy, py), (dy, h - py)] {
        if denom == 0.0 {
            if dist < 0.0 {
                return None;
            }
            continue;
        }
        let t = dist / denom;
        if denom < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
    }
    (t0 <= t1).then_some((t0, t1))
}

fn edge(a: &Projected, b: &Projected, x: f32, y: f32) -> f32 {
    (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x)
}

/// Top-left fill convention, independent of winding.
fn owns_edge(a: &Projected, b: &Projected, area: f32) -> bool {
    let (dx, dy) = if area > 0.0 {
        (b.x - a.x, b.y - a.y)
    } else {
        (a.x - b.x, a.y - b.y)
    };
    dy < 0.0 || (dy == 0.0 && dx > 0.0)
}

fn near_distance(v: &GpuVertex) -> f32 {
    v.clip[2] + v.clip[3]
}

fn lerp_vertex(a: &GpuVertex, b: &GpuVertex, t: f32) -> GpuVertex {
    let mix = |x: f32, y: f32| x + (y - x) * t;
    GpuVertex {
        clip: [0, 1, 2, 3].map(|i| mix(a.clip[i], b.clip[i])),
        color: [0, 1, 2, 3].map(|i| mix(a.color[i], b.color[i])),
        tex_coords: [0, 1].map(|i| mix(a.tex_coords[i], b.tex_coords[i])),
    }
}

/// Clips a triangle against the near plane (`z >= -w`), returning up to two triangles.
fn clip_triangle(a: GpuVertex, b: GpuVertex, c: GpuVertex) -> Vec<[GpuVertex; 3]> {
    let input = [a, b, c];
    let mut poly: smallvec::SmallVec<[GpuVertex; 4]> = smallvec::SmallVec::new();
    for i in 0..3 {
        let (cur, next) = (&input[i], &input[(i + 1) % 3]);
        let (dc, dn) = (near_distance(cur), near_distance(next));
        if dc >= 0.0 {
            poly.push(*cur);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            poly.push(lerp_vertex(cur, next, dc / (dc - dn)));
        }
    }
    poly.retain(|v| v.clip[3] > NEAR_EPSILON);
    (1..poly.len().saturating_sub(1))
        .map(|i| [poly[0], poly[i], poly[i + 1]])
        .collect()
}

fn clip_segment(a: GpuVertex, b: GpuVertex) -> Option<(GpuVertex, GpuVertex)> {
    let (da, db) = (near_distance(&a), near_distance(&b));
    let (a, b) = match (da >= 0.0, db >= 0.0) {
        (true, true) => (a, b),
        (false, false) => return None,
        (true, false) => (a, lerp_vertex(&a, &b, da / (da - db))),
        (false, true) => (lerp_vertex(&a, &b, da / (da - db)), b),
    };
    (a.clip[3] > NEAR_EPSILON && b.clip[3] > NEAR_EPSILON).then_some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn v(x: f32, y: f32, color: [f32; 4]) -> GpuVertex {
        GpuVertex {
            clip: [x, y, 0.0, 1.0],
            color,
            tex_coords: [0.0, 0.0],
        }
    }

    fn pixel(backend: &mut SoftwareBackend, x: u32, y: u32) -> [u8; 4] {
        let pixels = backend.read_pixels().unwrap();
        let i = ((y * backend.width + x) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    fn full_screen(color: [f32; 4]) -> DrawBatch {
        let mut batch = DrawBatch::new(Topology::Triangles, BlendMode::Blend, false);
        batch.vertices = vec![
            v(-1.0, -1.0, color),
            v(1.0, -1.0, color),
            v(1.0, 1.0, color),
            v(-1.0, -1.0, color),
            v(1.0, 1.0, color),
            v(-1.0, 1.0, color),
        ];
        batch
    }

    #[test]
    fn clear_then_fill_covers_every_pixel_once() {
        let mut backend = SoftwareBackend::new(8, 8);
        backend
            .submit(vec![
                DrawCommand::Clear(Color::BLACK),
                DrawCommand::Geometry(full_screen([0.0, 0.0, 1.0, 0.5])),
            ])
            .unwrap();
        // a pixel covered twice along the diagonal would be brighter
        for (x, y) in [(0, 0), (3, 3), (4, 3), (7, 7)] {
            assert_eq!(pixel(&mut backend, x, y), [0, 0, 128, 255]);
        }
    }

    #[test]
    fn depth_test_keeps_the_nearest_fragment() {
        let mut backend = SoftwareBackend::new(4, 4);
        let mut near = full_screen([1.0, 0.0, 0.0, 1.0]);
        near.depth_test = true;
        let mut far = full_screen([0.0, 1.0, 0.0, 1.0]);
        far.depth_test = true;
        for vertex in &mut far.vertices {
            vertex.clip[2] = 0.5;
        }
        backend
            .submit(vec![
                DrawCommand::Clear(Color::BLACK),
                DrawCommand::Geometry(near),
                DrawCommand::Geometry(far),
            ])
            .unwrap();
        assert_eq!(pixel(&mut backend, 2, 2), [255, 0, 0, 255]);
    }

    #[test]
    fn triangles_behind_the_eye_are_clipped() {
        let mut backend = SoftwareBackend::new(4, 4);
        let mut batch = full_screen([1.0; 4]);
        for vertex in &mut batch.vertices {
            vertex.clip = [vertex.clip[0], vertex.clip[1], -2.0, 1.0];
        }
        backend
            .submit(vec![DrawCommand::Clear(Color::BLACK), DrawCommand::Geometry(batch)])
            .unwrap();
        assert_eq!(pixel(&mut backend, 1, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn near_plane_clipping_splits_crossing_triangles() {
        let a = v(-1.0, -1.0, [1.0; 4]);
        let b = GpuVertex {
            clip: [1.0, -1.0, -3.0, 1.0],
            ..a
        };
        let c = v(0.0, 1.0, [1.0; 4]);
        assert_eq!(clip_triangle(a, b, c).len(), 2);
    }

    #[test]
    fn textures_upload_once_per_generation() {
        let mut backend = SoftwareBackend::new(2, 2);
        let image = Image::from_rgba(1, 1, vec![255, 0, 0, 255]).unwrap();
        let mut batch = full_screen([1.0; 4]);
        batch.texture = Some((image.clone(), TextureWrap::Clamp));
        backend.submit(vec![DrawCommand::Geometry(batch.clone())]).unwrap();
        assert_eq!(pixel(&mut backend, 0, 0), [255, 0, 0, 255]);

        image.set(0, 0, Color::rgb(0, 255, 0));
        backend.submit(vec![DrawCommand::Geometry(batch)]).unwrap();
        assert_eq!(pixel(&mut backend, 0, 0), [0, 255, 0, 255]);
        assert_eq!(backend.texture_count(), 1);
    }

    #[test]
    fn custom_shaders_are_reported_but_geometry_still_draws() {
        let mut backend = SoftwareBackend::new(2, 2);
        let shader = crate::shader::FragmentShader::new(
            "@fragment fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> { return in.color; }",
        )
        .unwrap();
        let batch = full_screen([1.0; 4]).with_shader(Some(shader));
        let err = backend.submit(vec![DrawCommand::Geometry(batch)]).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedCapability { .. }));
        assert_eq!(pixel(&mut backend, 1, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn lines_are_clipped_to_the_viewport() {
        assert_eq!(clip_to_viewport(-10.0, 5.0, 20.0, 0.0, 10.0, 10.0), Some((0.5, 1.0)));
        assert_eq!(clip_to_viewport(2.0, -5.0, 0.0, -5.0, 10.0, 10.0), None);
        assert_eq!(clip_to_viewport(2.0, 2.0, 3.0, 3.0, 10.0, 10.0), Some((0.0, 1.0)));
        assert_eq!(clip_to_viewport(-5.0, -5.0, -1.0, 20.0, 10.0, 10.0), None);
    }

    #[test]
    fn huge_lines_only_walk_the_visible_span() {
        let mut backend = SoftwareBackend::new(16, 16);
        let mut batch = DrawBatch::new(Topology::Lines, BlendMode::Blend, false);
        // pixel row 8 crosses the viewport, the endpoints are far outside it
        batch.vertices = vec![v(-1.0e8, -0.0625, [1.0; 4]), v(1.0e8, -0.0625, [1.0; 4])];
        let started = std::time::Instant::now();
        backend
            .submit(vec![DrawCommand::Clear(Color::BLACK), DrawCommand::Geometry(batch)])
            .unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        for x in [0, 7, 15] {
            assert_eq!(pixel(&mut backend, x, 8), [255; 4]);
        }
        assert_eq!(pixel(&mut backend, 5, 3), [0, 0, 0, 255]);
    }

    #[test]
    fn lines_touch_both_endpoints() {
        let mut backend = SoftwareBackend::new(10, 10);
        let mut batch = DrawBatch::new(Topology::Lines, BlendMode::Blend, false);
        // pixel centers (0.5, 0.5) and (9.5, 0.5)
        batch.vertices = vec![v(-0.9, 0.9, [1.0; 4]), v(0.9, 0.9, [1.0; 4])];
        backend
            .submit(vec![DrawCommand::Clear(Color::BLACK), DrawCommand::Geometry(batch)])
            .unwrap();
        assert_eq!(pixel(&mut backend, 0, 0), [255; 4]);
        assert_eq!(pixel(&mut backend, 9, 0), [255; 4]);
        assert_eq!(pixel(&mut backend, 5, 5), [0, 0, 0, 255]);
    }
}
