use super::*;
use crate::color::Color;

impl Surface {
    /// Straight-alpha RGBA8 contents, top row first. Pending geometry of a frame in progress is
    /// drawn first.
    pub fn load_pixels(&mut self) -> Result<Vec<u8>> {
        self.require_alive("load_pixels")?;
        Ok(self.read_back()?.to_vec())
    }

    /// One pixel of [`Surface::load_pixels`]. Out-of-range coordinates read as transparent.
    ///
    /// The first call after drawing reads the whole target back; later calls reuse that copy
    /// until more geometry is submitted, the frame ends or the surface is resized.
    pub fn get_pixel(&mut self, x: u32, y: u32) -> Result<Color> {
        self.require_alive("get_pixel")?;
        let (width, height) = self.size();
        if x >= width || y >= height {
            return Ok(Color::TRANSPARENT);
        }
        let i = (y as usize * width as usize + x as usize) * 4;
        let pixels = self.read_back()?;
        match pixels.get(i..i + 4) {
            Some(p) => Ok(Color([p[0], p[1], p[2], p[3]])),
            None => Ok(Color::TRANSPARENT),
        }
    }

    fn read_back(&mut self) -> Result<&[u8]> {
        if self.state == SurfaceState::Drawing {
            self.submit_pending()?;
        }
        let pixels = match self.readback.take() {
            Some(pixels) => pixels,
            None => self.backend.read_pixels()?,
        };
        let pixels: &[u8] = self.readback.insert(pixels);
        Ok(pixels)
    }

    /// The surface contents as an image that other surfaces can draw. The same handle is
    /// returned until the surface is resized and is rewritten by every `end_draw`, so drawing
    /// it always shows the last finished frame.
    pub fn as_image(&mut self) -> Result<Image> {
        self.require_alive("as_image")?;
        if let Some(snapshot) = &self.snapshot {
            return Ok(snapshot.clone());
        }
        let (width, height) = self.size();
        let image = Image::from_rgba(width, height, self.load_pixels()?)?;
        self.snapshot = Some(image.clone());
        Ok(image)
    }

    pub(super) fn refresh_snapshot(&mut self) -> Result<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        let snapshot = snapshot.clone();
        let pixels = self.backend.read_pixels()?;
        if snapshot.size() == self.size() {
            snapshot.replace_pixels(&pixels)
        } else {
            let (width, height) = self.size();
            self.snapshot = Some(Image::from_rgba(width, height, pixels)?);
            Ok(())
        }
    }

    /// Reallocates the target. The contents are cleared to transparent and the default
    /// camera for the new size is applied at the next `begin_draw`.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        match self.state {
            SurfaceState::Created | SurfaceState::Idle => {}
            actual => {
                return Err(RenderError::SurfaceState {
                    operation: "resize",
                    expected: SurfaceState::Idle,
                    actual,
                })
            }
        }
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == self.size() {
            return Ok(());
        }
        self.readback = None;
        self.backend.resize(width, height)?;
        self.config = self.config.clone().with_size(width, height);
        self.view_stale = true;
        self.snapshot = None;
        tracing::debug!("resized surface to {}x{}", width, height);
        Ok(())
    }
}
