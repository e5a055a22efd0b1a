//! Non-geometric drawing state.
//!
//! [`Style`] is the plain value captured into every recorded shape; [`StyleState`] is the
//! mutable manager owned by a surface that the style-setting calls go through.

use crate::color::{Color, ColorArg, ColorSpace};
use crate::error::{RenderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrokeCap {
    #[default]
    Round,
    Square,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrokeJoin {
    #[default]
    Miter,
    Bevel,
    Round,
}

/// How the color of new geometry is combined with what is already in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Source-over alpha blending.
    #[default]
    Blend,
    Add,
    Subtract,
    Multiply,
    /// Overwrites the target, alpha included.
    Replace,
}

/// Interpretation of the position arguments of `rect` and `ellipse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeAnchor {
    /// `(x, y)` is the top-left corner, then width and height.
    #[default]
    Corner,
    /// Two opposite corners.
    Corners,
    /// `(x, y)` is the center, then width and height.
    Center,
    /// `(x, y)` is the center, then half width and half height.
    Radius,
}

/// Units of texture coordinates passed to `vertex_uv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMode {
    /// Coordinates are in image pixels.
    #[default]
    Image,
    /// Coordinates are normalized to [0, 1].
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    #[default]
    Clamp,
    Repeat,
}

/// Segment counts for curved geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detail {
    pub bezier: u32,
    pub curve: u32,
    pub sphere_u: u32,
    pub sphere_v: u32,
}

impl Default for Detail {
    fn default() -> Self {
        Self {
            bezier: 20,
            curve: 20,
            sphere_u: 30,
            sphere_v: 30,
        }
    }
}

/// Snapshot of the drawing style. Captured by value whenever geometry is emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub fill: Color,
    pub fill_enabled: bool,
    pub stroke: Color,
    pub stroke_enabled: bool,
    pub stroke_weight: f32,
    pub stroke_cap: StrokeCap,
    pub stroke_join: StrokeJoin,
    pub tint: Color,
    pub tint_enabled: bool,
    pub blend_mode: BlendMode,
    pub color_space: ColorSpace,
    pub rect_mode: ShapeAnchor,
    pub ellipse_mode: ShapeAnchor,
    pub texture_mode: TextureMode,
    pub texture_wrap: TextureWrap,
    pub curve_tightness: f32,
    pub detail: Detail,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Color::WHITE,
            fill_enabled: true,
            stroke: Color::BLACK,
            stroke_enabled: true,
            stroke_weight: 1.0,
            stroke_cap: StrokeCap::default(),
            stroke_join: StrokeJoin::default(),
            tint: Color::WHITE,
            tint_enabled: false,
            blend_mode: BlendMode::default(),
            color_space: ColorSpace::default(),
            rect_mode: ShapeAnchor::Corner,
            ellipse_mode: ShapeAnchor::Center,
            texture_mode: TextureMode::default(),
            texture_wrap: TextureWrap::default(),
            curve_tightness: 0.0,
            detail: Detail::default(),
        }
    }
}

impl Style {
    pub fn fill_color(&self) -> Option<Color> {
        self.fill_enabled.then_some(self.fill)
    }

    pub fn stroke_color(&self) -> Option<Color> {
        (self.stroke_enabled && self.stroke_weight > 0.0).then_some(self.stroke)
    }

    /// Color applied to texture samples: the tint, or white when tinting is off.
    pub fn texture_modulation(&self) -> Color {
        if self.tint_enabled {
            self.tint
        } else {
            Color::WHITE
        }
    }
}

/// The current style plus the `push_style`/`pop_style` stack.
#[derive(Debug, Clone, Default)]
pub struct StyleState {
    current: Style,
    saved: Vec<Style>,
}

impl StyleState {
    pub fn current(&self) -> &Style {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Style {
        &mut self.current
    }

    /// Resolves a numeric color against the active color mode.
    pub fn resolve(&self, color: impl Into<ColorArg>) -> Color {
        self.current.color_space.resolve(color.into())
    }

    pub fn fill(&mut self, color: impl Into<ColorArg>) {
        self.current.fill = self.resolve(color);
        self.current.fill_enabled = true;
    }

    pub fn no_fill(&mut self) {
        self.current.fill_enabled = false;
    }

    pub fn stroke(&mut self, color: impl Into<ColorArg>) {
        self.current.stroke = self.resolve(color);
        self.current.stroke_enabled = true;
    }

    pub fn no_stroke(&mut self) {
        self.current.stroke_enabled = false;
    }

    pub fn stroke_weight(&mut self, weight: f32) {
        self.current.stroke_weight = weight.max(0.0);
    }

    pub fn tint(&mut self, color: impl Into<ColorArg>) {
        self.current.tint = self.resolve(color);
        self.current.tint_enabled = true;
    }

    pub fn no_tint(&mut self) {
        self.current.tint_enabled = false;
    }

    pub fn color_mode(&mut self, space: ColorSpace) {
        self.current.color_space = space;
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    pub fn pop(&mut self) -> Result<()> {
        self.current = self.saved.pop().ok_or(RenderError::UnbalancedStack)?;
        Ok(())
    }

    /// Restores defaults and drops saved styles. Returns the number of unbalanced pushes.
    pub fn reset(&mut self) -> usize {
        let leaked = self.saved.len();
        self.saved.clear();
        self.current = Style::default();
        leaked
    }
}
