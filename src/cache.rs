use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

const DEFAULT_CAPACITY: usize = 64;

/// Unit sphere as a flat triangle list. Positions double as normals.
#[derive(Debug)]
pub struct SphereMesh {
    pub triangles: Vec<[f32; 3]>,
}

/// Caches unit templates for round primitives, keyed by their detail level, so that drawing
/// many circles or spheres per frame does not recompute trigonometry.
pub(crate) struct GeometryCache {
    rings: LruCache<u32, Arc<[[f32; 2]]>>,
    spheres: LruCache<(u32, u32), Arc<SphereMesh>>,
}

impl Default for GeometryCache {
    fn default() -> Self {
        // Capacity is a non-zero literal.
        let size = NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::new(size)
    }
}

impl GeometryCache {
    pub(crate) fn new(size: NonZeroUsize) -> Self {
        Self {
            rings: LruCache::new(size),
            spheres: LruCache::new(size),
        }
    }

    pub fn len(&self) -> usize {
        self.rings.len() + self.spheres.len()
    }

    /// `segments` points evenly spaced on the unit circle, starting at angle 0.
    pub(crate) fn ring(&mut self, segments: u32) -> Arc<[[f32; 2]]> {
        self.rings
            .get_or_insert(segments, || {
                (0..segments)
                    .map(|i| {
                        let angle = std::f32::consts::TAU * i as f32 / segments as f32;
                        [angle.cos(), angle.sin()]
                    })
                    .collect()
            })
            .clone()
    }

    pub(crate) fn sphere(&mut self, u_detail: u32, v_detail: u32) -> Arc<SphereMesh> {
        let u = u_detail.max(3);
        let v = v_detail.max(2);
        self.spheres
            .get_or_insert((u, v), || Arc::new(build_sphere(u, v)))
            .clone()
    }
}

fn build_sphere(u: u32, v: u32) -> SphereMesh {
    let point = |i: u32, j: u32| {
        // i walks from the north pole (y = -1, screen up) to the south pole
        let theta = std::f32::consts::PI * i as f32 / v as f32;
        let phi = std::f32::consts::TAU * j as f32 / u as f32;
        [theta.sin() * phi.cos(), -theta.cos(), theta.sin() * phi.sin()]
    };
    let mut triangles = Vec::with_capacity((u * v * 6) as usize);
    for i in 0..v {
        for j in 0..u {
            let a = point(i, j);
            let b = point(i + 1, j);
            let c = point(i + 1, j + 1);
            let d = point(i, j + 1);
            if i != 0 {
                triangles.extend([a, b, d]);
            }
            if i + 1 != v {
                triangles.extend([d, b, c]);
            }
        }
    }
    SphereMesh { triangles }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_are_shared() {
        let mut cache = GeometryCache::default();
        let a = cache.ring(12);
        let b = cache.ring(12);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 12);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn least_recently_used_entries_are_evicted() {
        let mut cache = GeometryCache::new(NonZeroUsize::new(2).unwrap());
        let first = cache.ring(6);
        cache.ring(7);
        cache.ring(8);
        assert!(!Arc::ptr_eq(&first, &cache.ring(6)));
    }

    #[test]
    fn sphere_vertices_are_on_the_unit_sphere() {
        let mut cache = GeometryCache::default();
        let mesh = cache.sphere(8, 6);
        // pole rows contribute one triangle per column, the rest two
        assert_eq!(mesh.triangles.len(), (8 * (2 * 6 - 2) * 3) as usize);
        for p in &mesh.triangles {
            let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }
}
