//! Per-vertex Lambert lighting for geometry that carries normals.
//!
//! Lights are stored in world space: positions and directions are transformed by the model
//! matrix that was current when the light was declared, the same way geometry is.

use crate::color::Color;
use crate::util::{dot3, normalize3};

/// Upper bound on simultaneously active lights.
pub const MAX_LIGHTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
    },
    /// `direction` points from the light towards the scene.
    Directional {
        color: [f32; 3],
        direction: [f32; 3],
    },
    Point {
        color: [f32; 3],
        position: [f32; 3],
    },
    /// A cone of light. `angle` is the half-angle of the cone in radians and `concentration`
    /// the exponent that biases light towards its axis.
    Spot {
        color: [f32; 3],
        position: [f32; 3],
        direction: [f32; 3],
        angle: f32,
        concentration: f32,
    },
}

/// Distance attenuation `1 / (constant + linear * d + quadratic * d^2)` for point and spot
/// lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Falloff {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Falloff {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl Falloff {
    pub fn attenuation(&self, distance: f32) -> f32 {
        let denominator =
            self.constant + self.linear * distance + self.quadratic * distance * distance;
        if denominator <= f32::EPSILON {
            return 1.0;
        }
        1.0 / denominator
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lights {
    lights: Vec<Light>,
    falloff: Falloff,
}

impl Lights {
    pub fn is_enabled(&self) -> bool {
        !self.lights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Removes every light and restores the default falloff.
    pub fn clear(&mut self) {
        self.lights.clear();
        self.falloff = Falloff::default();
    }

    pub fn falloff(&self) -> Falloff {
        self.falloff
    }

    /// Falloff for point and spot lights declared from now on and already active.
    pub fn set_falloff(&mut self, falloff: Falloff) {
        self.falloff = falloff;
    }

    /// Adds a light. Returns `false` and ignores the light once [`MAX_LIGHTS`] are active.
    pub fn add(&mut self, light: Light) -> bool {
        if self.lights.len() >= MAX_LIGHTS {
            tracing::warn!("ignoring light, at most {} lights can be active", MAX_LIGHTS);
            return false;
        }
        self.lights.push(light);
        true
    }

    /// The default setup: half-gray ambient plus a half-gray light shining along -z.
    pub fn set_defaults(&mut self) {
        self.clear();
        self.lights.push(Light::Ambient {
            color: [0.5, 0.5, 0.5],
        });
        self.lights.push(Light::Directional {
            color: [0.5, 0.5, 0.5],
            direction: [0.0, 0.0, -1.0],
        });
    }

    /// Shades a base color at a world-space position with a world-space unit normal.
    pub fn shade(&self, base: Color, position: [f32; 3], normal: [f32; 3]) -> Color {
        if self.lights.is_empty() {
            return base;
        }
        let mut intensity = [0.0f32; 3];
        for light in &self.lights {
            let (color, factor) = match *light {
                Light::Ambient { color } => (color, 1.0),
                Light::Directional { color, direction } => {
                    let to_light = normalize3([-direction[0], -direction[1], -direction[2]]);
                    (color, lambert(normal, to_light))
                }
                Light::Point { color, position: light_pos } => {
                    let (to_light, distance) = towards(position, light_pos);
                    let factor = lambert(normal, to_light) * self.falloff.attenuation(distance);
                    (color, factor)
                }
                Light::Spot {
                    color,
                    position: light_pos,
                    direction,
                    angle,
                    concentration,
                } => {
                    let (to_light, distance) = towards(position, light_pos);
                    let axis = normalize3(direction);
                    let spot = -dot3(to_light, axis);
                    if spot < angle.cos() {
                        continue;
                    }
                    let factor = lambert(normal, to_light)
                        * spot.max(0.0).powf(concentration)
                        * self.falloff.attenuation(distance);
                    (color, factor)
                }
            };
            for i in 0..3 {
                intensity[i] += color[i] * factor;
            }
        }
        let c = base.normalize();
        Color::from_normalized([
            c[0] * intensity[0],
            c[1] * intensity[1],
            c[2] * intensity[2],
            c[3],
        ])
    }
}

/// Unit vector from `from` to `to` and the distance between them.
fn towards(from: [f32; 3], to: [f32; 3]) -> ([f32; 3], f32) {
    let d = [to[0] - from[0], to[1] - from[1], to[2] - from[2]];
    (normalize3(d), dot3(d, d).sqrt())
}

// Two-sided: geometry is not culled, so back faces are lit as if they faced the light.
fn lambert(normal: [f32; 3], to_light: [f32; 3]) -> f32 {
    dot3(normal, to_light).abs()
}
