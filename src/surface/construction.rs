use super::*;
use crate::backend::{SoftwareBackend, WgpuBackend};
use crate::config::{BackendKind, RenderMode};

impl Surface {
    /// Creates a surface on the backend selected by `config.backend`.
    ///
    /// GPU surfaces request a device and block until it is ready; without a usable adapter
    /// this fails with [`RenderError::DeviceUnavailable`].
    pub fn new(config: SurfaceConfig) -> Result<Self> {
        let backend: Box<dyn RenderBackend> = match config.backend {
            BackendKind::Software => Box::new(SoftwareBackend::new(config.width, config.height)),
            BackendKind::Gpu => Box::new(futures::executor::block_on(
                WgpuBackend::try_new_headless(config.size(), config.msaa_samples, config.smooth),
            )?),
        };
        Ok(Self::from_backend(config, backend))
    }

    /// Software surface. Never fails.
    pub fn new_software(config: SurfaceConfig) -> Self {
        let backend = SoftwareBackend::new(config.width, config.height);
        Self::from_backend(config.with_backend(BackendKind::Software), Box::new(backend))
    }

    /// Wraps an existing backend, for example a [`WgpuBackend`] presenting to a window. The
    /// surface takes the backend's size.
    pub fn from_backend(config: SurfaceConfig, backend: Box<dyn RenderBackend>) -> Self {
        let (width, height) = backend.size();
        let config = config.with_size(width, height);
        tracing::debug!(
            "created {}x{} {:?} surface on the {} backend",
            width,
            height,
            config.render_mode,
            backend.name()
        );
        Self {
            matrices: MatrixStack::new(config.max_matrix_depth),
            view: ViewState::new(width, height, config.is_3d()),
            view_stale: false,
            config,
            backend,
            state: SurfaceState::Created,
            styles: StyleState::default(),
            lights: Lights::default(),
            shader: None,
            recorder: ShapeRecorder::default(),
            tessellator: Tessellator::new(),
            geometry_cache: GeometryCache::default(),
            draw_list: DrawList::default(),
            snapshot: None,
            readback: None,
            frame_count: 0,
        }
    }

    /// Independent offscreen surface of the same backend kind. GPU surfaces share this
    /// surface's device. The new surface is owned by the caller, not by this one.
    pub fn create_graphics(
        &self,
        width: u32,
        height: u32,
        render_mode: RenderMode,
    ) -> Result<Surface> {
        self.require_alive("create_graphics")?;
        let backend = self.backend.create_offscreen(width.max(1), height.max(1))?;
        let config = self
            .config
            .clone()
            .with_size(width, height)
            .with_render_mode(render_mode);
        Ok(Self::from_backend(config, backend))
    }
}
