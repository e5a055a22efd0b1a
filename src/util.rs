use euclid::default::Transform3D;

pub fn normalize_rgba_color(color: &[u8; 4]) -> [f32; 4] {
    [
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
        color[3] as f32 / 255.0,
    ]
}

/// Multiplies a homogeneous point by a row-vector euclid transform (`p * M`).
#[inline(always)]
pub fn transform_point4(m: &Transform3D<f32>, x: f32, y: f32, z: f32) -> [f32; 4] {
    [
        x * m.m11 + y * m.m21 + z * m.m31 + m.m41,
        x * m.m12 + y * m.m22 + z * m.m32 + m.m42,
        x * m.m13 + y * m.m23 + z * m.m33 + m.m43,
        x * m.m14 + y * m.m24 + z * m.m34 + m.m44,
    ]
}

/// Transforms a direction (w = 0) and normalizes it. Zero-length input stays zero.
#[inline(always)]
pub fn transform_direction(m: &Transform3D<f32>, v: [f32; 3]) -> [f32; 3] {
    let d = [
        v[0] * m.m11 + v[1] * m.m21 + v[2] * m.m31,
        v[0] * m.m12 + v[1] * m.m22 + v[2] * m.m32,
        v[0] * m.m13 + v[1] * m.m23 + v[2] * m.m33,
    ];
    normalize3(d)
}

#[inline(always)]
pub fn normalize3(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f32::EPSILON {
        return [0.0, 0.0, 0.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

#[inline(always)]
pub fn dot3(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Row pitch for texture-to-buffer copies, padded to `COPY_BYTES_PER_ROW_ALIGNMENT`.
pub fn compute_padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> (u32, u32) {
    let unpadded_bytes_per_row = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
    (unpadded_bytes_per_row, padded_bytes_per_row)
}
