use crate::matrix::DEFAULT_MAX_DEPTH;

/// Which backend a surface renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// CPU rasterizer, always available.
    #[default]
    Software,
    /// wgpu device rendering into an offscreen texture.
    Gpu,
}

/// 2D or 3D rendering. Controls the default projection and depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Pixel-aligned orthographic projection, painter's order, no depth test.
    #[default]
    P2D,
    /// Perspective projection through the default camera, depth tested.
    P3D,
}

/// Creation parameters of a [`Surface`](crate::Surface).
///
/// ```
/// use easel::{BackendKind, RenderMode, SurfaceConfig};
///
/// let config = SurfaceConfig::new(320, 240)
///     .with_render_mode(RenderMode::P3D)
///     .with_backend(BackendKind::Software)
///     .with_msaa_samples(4);
/// assert_eq!(config.size(), (320, 240));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub backend: BackendKind,
    pub render_mode: RenderMode,
    /// Requested MSAA sample count. Only the GPU backend uses it; unsupported counts are
    /// lowered to the closest supported one.
    pub msaa_samples: u32,
    pub max_matrix_depth: usize,
    /// Anti-aliased edges when the backend supports them.
    pub smooth: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self::new(100, 100)
    }
}

impl SurfaceConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            backend: BackendKind::default(),
            render_mode: RenderMode::default(),
            msaa_samples: 1,
            max_matrix_depth: DEFAULT_MAX_DEPTH,
            smooth: true,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_render_mode(mut self, render_mode: RenderMode) -> Self {
        self.render_mode = render_mode;
        self
    }

    pub fn with_msaa_samples(mut self, samples: u32) -> Self {
        self.msaa_samples = samples.max(1);
        self
    }

    pub fn with_max_matrix_depth(mut self, depth: usize) -> Self {
        self.max_matrix_depth = depth;
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn is_3d(&self) -> bool {
        self.render_mode == RenderMode::P3D
    }
}
