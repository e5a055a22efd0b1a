//! Caller-owned RGBA8 images.
//!
//! An [`Image`] is a cheap handle: clones share the same pixel buffer. Every backend keeps its
//! own uploaded copy keyed by [`Image::id`] and refreshes it when [`Image::generation`] moves,
//! so the same image can be used by several surfaces at once.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::color::Color;
use crate::error::{RenderError, Result};

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

struct ImageInner {
    id: u64,
    width: u32,
    height: u32,
    pixels: RwLock<Vec<u8>>,
    generation: AtomicU64,
}

#[derive(Clone)]
pub struct Image {
    inner: Arc<ImageInner>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.inner.id)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("generation", &self.generation())
            .finish()
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Image {
    /// A fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_parts(width, height, vec![0; width as usize * height as usize * 4])
    }

    /// Wraps already decoded, non-premultiplied RGBA8 pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::ResourceUpload {
                resource: format!("{}x{} image", width, height),
                reason: format!("expected {} bytes of RGBA8, got {}", expected, pixels.len()),
            });
        }
        Ok(Self::from_parts(width, height, pixels))
    }

    fn from_parts(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(ImageInner {
                id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
                width,
                height,
                pixels: RwLock::new(pixels),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    /// Bumped on every pixel modification.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    pub fn pixels(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.inner
            .pixels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.inner.width || y >= self.inner.height {
            return None;
        }
        let i = (y as usize * self.inner.width as usize + x as usize) * 4;
        let pixels = self.pixels();
        Some(Color([
            pixels[i],
            pixels[i + 1],
            pixels[i + 2],
            pixels[i + 3],
        ]))
    }

    /// Sets one pixel. Out of bounds coordinates are ignored.
    pub fn set(&self, x: u32, y: u32, color: Color) {
        if x >= self.inner.width || y >= self.inner.height {
            return;
        }
        let i = (y as usize * self.inner.width as usize + x as usize) * 4;
        self.update_pixels(|pixels| pixels[i..i + 4].copy_from_slice(&color.0));
    }

    /// Mutates the pixel buffer in place and marks the image dirty.
    pub fn update_pixels<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let result = {
            let mut pixels = self
                .inner
                .pixels
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            f(&mut pixels)
        };
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// Replaces every pixel. `pixels` must have the image's exact size.
    pub fn replace_pixels(&self, pixels: &[u8]) -> Result<()> {
        let expected = self.inner.width as usize * self.inner.height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::ResourceUpload {
                resource: format!("image {}", self.inner.id),
                reason: format!("expected {} bytes of RGBA8, got {}", expected, pixels.len()),
            });
        }
        self.update_pixels(|dst| dst.copy_from_slice(pixels));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_pixels_and_ids() {
        let a = Image::new(2, 2);
        let b = a.clone();
        a.set(1, 1, Color::rgb(9, 8, 7));
        assert_eq!(b.get(1, 1), Some(Color::rgb(9, 8, 7)));
        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
        assert_ne!(a.id(), Image::new(2, 2).id());
    }

    #[test]
    fn modifications_bump_the_generation() {
        let image = Image::new(1, 1);
        assert_eq!(image.generation(), 0);
        image.set(0, 0, Color::WHITE);
        image.set(5, 5, Color::WHITE);
        assert_eq!(image.generation(), 1);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        assert!(matches!(
            Image::from_rgba(2, 2, vec![0; 3]),
            Err(RenderError::ResourceUpload { .. })
        ));
        let image = Image::new(1, 1);
        assert!(image.replace_pixels(&[0; 8]).is_err());
        assert_eq!(image.generation(), 0);
    }
}
