use super::*;
use crate::batch::{DrawBatch, Topology};
use crate::shape::Shape;
use crate::util::{normalize3, transform_direction, transform_point4};
use crate::vertex::{GpuVertex, MeshVertex};

impl Surface {
    /// Tessellates a finished shape and queues it: fills, then strokes, then hairlines and
    /// points, each as its own batch.
    pub(super) fn emit(&mut self, shape: Shape) {
        let geometry = self.tessellator.tessellate(&shape);
        if geometry.is_empty() {
            return;
        }

        let clip = self.view.clip_matrix(&shape.transform);
        let depth_test = self.config.is_3d();
        let blend = shape.style.blend_mode;
        let lit = self.lights.is_enabled();
        let batch = |topology| {
            DrawBatch::new(topology, blend, depth_test).with_shader(self.shader.clone())
        };

        let fill = geometry
            .triangles
            .iter()
            .map(|v| {
                let color = match v.normal {
                    Some(normal) if lit => self.shade(&shape, v, normal),
                    _ => v.color,
                };
                to_gpu(&clip, v, color)
            })
            .collect();
        let texture = shape
            .texture
            .clone()
            .map(|image| (image, shape.style.texture_wrap));
        let mut fills = batch(Topology::Triangles).with_texture(texture);
        fills.vertices = fill;
        self.draw_list.push(fills);

        for (topology, vertices) in [
            (Topology::Triangles, &geometry.stroke_triangles),
            (Topology::Lines, &geometry.lines),
            (Topology::Points, &geometry.points),
        ] {
            let mut strokes = batch(topology);
            strokes.vertices = vertices.iter().map(|v| to_gpu(&clip, v, v.color)).collect();
            self.draw_list.push(strokes);
        }
    }

    /// Per-vertex lighting in world space.
    fn shade(&self, shape: &Shape, v: &MeshVertex, normal: [f32; 3]) -> crate::color::Color {
        let world = transform_point4(&shape.transform, v.position[0], v.position[1], v.position[2]);
        let w = if world[3].abs() > f32::EPSILON { world[3] } else { 1.0 };
        let position = [world[0] / w, world[1] / w, world[2] / w];
        let normal = normalize3(transform_direction(&shape.transform, normal));
        self.lights.shade(v.color, position, normal)
    }
}

fn to_gpu(clip: &crate::matrix::Matrix, v: &MeshVertex, color: crate::color::Color) -> GpuVertex {
    GpuVertex {
        clip: transform_point4(clip, v.position[0], v.position[1], v.position[2]),
        color: color.normalize(),
        tex_coords: v.uv,
    }
}
