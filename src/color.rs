use crate::util::normalize_rgba_color;

/// Represents a color in RGBA format.
///
/// This struct encapsulates color information using red, green, blue, and alpha (opacity) channels.
/// Each channel is an 8-bit unsigned integer. Colors are always stored in this absolute form:
/// whatever [`ColorMode`] was active when a color was specified has already been applied.
///
/// # Examples
///
/// ```
/// use easel::Color;
///
/// let red = Color::rgb(255, 0, 0);
/// assert_eq!(red.normalize(), [1.0, 0.0, 0.0, 1.0]);
///
/// let semi_blue = Color::rgba(0, 0, 255, 128);
/// assert_eq!(semi_blue.to_array(), [0, 0, 255, 128]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub [u8; 4]);

impl Color {
    /// All channels zero, fully transparent.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);
    /// Opaque black.
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    /// Opaque white.
    pub const WHITE: Self = Self([255, 255, 255, 255]);

    /// Creates a new color with the specified RGB values and full opacity.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    /// Creates a new color with the specified RGBA values.
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Opaque gray level.
    pub fn gray(v: u8) -> Self {
        Self([v, v, v, 255])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }

    pub fn alpha(&self) -> u8 {
        self.0[3]
    }

    /// Returns the same color with a different alpha channel.
    pub fn with_alpha(self, a: u8) -> Self {
        Self([self.0[0], self.0[1], self.0[2], a])
    }

    /// Normalizes the color values to the range [0.0, 1.0].
    pub fn normalize(&self) -> [f32; 4] {
        normalize_rgba_color(&self.0)
    }

    /// Builds a color from normalized channels, clamping each to [0.0, 1.0].
    pub fn from_normalized(c: [f32; 4]) -> Self {
        Self([
            unit_to_u8(c[0]),
            unit_to_u8(c[1]),
            unit_to_u8(c[2]),
            unit_to_u8(c[3]),
        ])
    }

    /// Returns the color as an array of 4 `u8` values.
    pub fn to_array(&self) -> [u8; 4] {
        self.0
    }

    /// Channel-wise product, used for tinting and lighting.
    pub fn modulate(self, other: Color) -> Color {
        let a = self.normalize();
        let b = other.normalize();
        Color::from_normalized([a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]])
    }

    /// Linear interpolation in RGBA space, `t` clamped to [0, 1].
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let a = self.normalize();
        let b = other.normalize();
        Color::from_normalized([
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
            a[2] + (b[2] - a[2]) * t,
            a[3] + (b[3] - a[3]) * t,
        ])
    }

    /// Converts hue/saturation/brightness (each in [0, 1], hue wrapping) to RGB.
    pub fn from_hsb(h: f32, s: f32, v: f32, a: f32) -> Color {
        let (r, g, b) = if s <= 0.0 {
            (v, v, v)
        } else {
            let which = (h - h.floor()) * 6.0;
            let f = which - which.floor();
            let p = v * (1.0 - s);
            let q = v * (1.0 - s * f);
            let t = v * (1.0 - s * (1.0 - f));
            match which as u32 {
                0 => (v, t, p),
                1 => (q, v, p),
                2 => (p, v, t),
                3 => (p, q, v),
                4 => (t, p, v),
                _ => (v, p, q),
            }
        };
        Color::from_normalized([r, g, b, a])
    }
}

fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// How numeric color arguments are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Hsb,
}

/// Active color mode plus the per-channel maxima used to scale numeric arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSpace {
    pub mode: ColorMode,
    pub maxes: [f32; 4],
}

impl Default for ColorSpace {
    fn default() -> Self {
        Self {
            mode: ColorMode::Rgb,
            maxes: [255.0; 4],
        }
    }
}

impl ColorSpace {
    /// Uses the same maximum for every channel, including alpha.
    pub fn uniform(mode: ColorMode, max: f32) -> Self {
        Self {
            mode,
            maxes: [max; 4],
        }
    }

    /// Separate maxima for the three color channels and alpha.
    pub fn with_maxes(mode: ColorMode, max1: f32, max2: f32, max3: f32, max_alpha: f32) -> Self {
        Self {
            mode,
            maxes: [max1, max2, max3, max_alpha],
        }
    }

    /// Switches to `mode` with new maxima for the three color channels. The alpha maximum of
    /// `self` is kept.
    pub fn with_channel_maxes(self, mode: ColorMode, max1: f32, max2: f32, max3: f32) -> Self {
        Self::with_maxes(mode, max1, max2, max3, self.maxes[3])
    }

    fn unit(&self, channel: usize, value: f32) -> f32 {
        let max = self.maxes[channel];
        if max <= 0.0 {
            return 0.0;
        }
        (value / max).clamp(0.0, 1.0)
    }

    /// Resolves a numeric color argument into an absolute RGBA color.
    pub fn resolve(&self, arg: ColorArg) -> Color {
        match arg {
            ColorArg::Absolute(color) => color,
            ColorArg::Gray(v) => self.resolve(ColorArg::GrayAlpha(v, self.maxes[3])),
            ColorArg::GrayAlpha(v, a) => {
                let g = self.unit(0, v);
                Color::from_normalized([g, g, g, self.unit(3, a)])
            }
            ColorArg::Channels(c1, c2, c3) => {
                self.resolve(ColorArg::ChannelsAlpha(c1, c2, c3, self.maxes[3]))
            }
            ColorArg::ChannelsAlpha(c1, c2, c3, a) => {
                let x = self.unit(0, c1);
                let y = self.unit(1, c2);
                let z = self.unit(2, c3);
                let a = self.unit(3, a);
                match self.mode {
                    ColorMode::Rgb => Color::from_normalized([x, y, z, a]),
                    ColorMode::Hsb => Color::from_hsb(x, y, z, a),
                }
            }
        }
    }
}

/// A color argument as written in a sketch: either an absolute color or numbers that are
/// interpreted by the surface's current [`ColorSpace`].
///
/// ```
/// use easel::{Color, ColorArg, ColorMode, ColorSpace};
///
/// let hsb = ColorSpace::with_maxes(ColorMode::Hsb, 360.0, 100.0, 100.0, 255.0);
/// assert_eq!(hsb.resolve(ColorArg::from((0.0, 100.0, 100.0))), Color::rgb(255, 0, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorArg {
    Absolute(Color),
    Gray(f32),
    GrayAlpha(f32, f32),
    Channels(f32, f32, f32),
    ChannelsAlpha(f32, f32, f32, f32),
}

impl ColorArg {
    pub fn gray(v: f32) -> Self {
        ColorArg::Gray(v)
    }

    pub fn gray_alpha(v: f32, alpha: f32) -> Self {
        ColorArg::GrayAlpha(v, alpha)
    }

    /// Three channels, read as RGB or HSB depending on the color mode.
    pub fn rgb(c1: f32, c2: f32, c3: f32) -> Self {
        ColorArg::Channels(c1, c2, c3)
    }

    pub fn rgba(c1: f32, c2: f32, c3: f32, alpha: f32) -> Self {
        ColorArg::ChannelsAlpha(c1, c2, c3, alpha)
    }
}

impl From<Color> for ColorArg {
    fn from(value: Color) -> Self {
        ColorArg::Absolute(value)
    }
}

impl From<f32> for ColorArg {
    fn from(value: f32) -> Self {
        ColorArg::Gray(value)
    }
}

impl From<(f32, f32)> for ColorArg {
    fn from((v, a): (f32, f32)) -> Self {
        ColorArg::GrayAlpha(v, a)
    }
}

impl From<(f32, f32, f32)> for ColorArg {
    fn from((a, b, c): (f32, f32, f32)) -> Self {
        ColorArg::Channels(a, b, c)
    }
}

impl From<(f32, f32, f32, f32)> for ColorArg {
    fn from((a, b, c, d): (f32, f32, f32, f32)) -> Self {
        ColorArg::ChannelsAlpha(a, b, c, d)
    }
}
