//! The per-frame draw list handed to a backend.
//!
//! Geometry arrives already in clip space. Consecutive batches that share topology, blend
//! state, depth test, texture and shader are merged so a frame of many small shapes turns into
//! a handful of backend draws while keeping painter's order.

use crate::color::Color;
use crate::shader::FragmentShader;
use crate::style::{BlendMode, TextureWrap};
use crate::texture::Image;
use crate::vertex::GpuVertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Three vertices per triangle.
    Triangles,
    /// Two vertices per segment.
    Lines,
    Points,
}

impl Topology {
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            Topology::Triangles => 3,
            Topology::Lines => 2,
            Topology::Points => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrawBatch {
    pub topology: Topology,
    pub blend: BlendMode,
    pub depth_test: bool,
    pub texture: Option<(Image, TextureWrap)>,
    pub shader: Option<FragmentShader>,
    pub vertices: Vec<GpuVertex>,
}

impl DrawBatch {
    pub fn new(topology: Topology, blend: BlendMode, depth_test: bool) -> Self {
        Self {
            topology,
            blend,
            depth_test,
            texture: None,
            shader: None,
            vertices: Vec::new(),
        }
    }

    pub fn with_texture(mut self, texture: Option<(Image, TextureWrap)>) -> Self {
        self.texture = texture;
        self
    }

    pub fn with_shader(mut self, shader: Option<FragmentShader>) -> Self {
        self.shader = shader;
        self
    }

    pub fn primitive_count(&self) -> usize {
        self.vertices.len() / self.topology.vertices_per_primitive()
    }

    fn same_state(&self, other: &DrawBatch) -> bool {
        self.topology == other.topology
            && self.blend == other.blend
            && self.depth_test == other.depth_test
            && self.texture == other.texture
            && self.shader == other.shader
    }
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Clears color to the given value and depth to the far plane.
    Clear(Color),
    Geometry(DrawBatch),
}

/// Draw commands accumulated since the last flush.
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// A clear makes everything queued before it invisible, so that work is dropped.
    pub fn clear_to(&mut self, color: Color) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    pub fn push(&mut self, batch: DrawBatch) {
        if batch.vertices.is_empty() {
            return;
        }
        if let Some(DrawCommand::Geometry(last)) = self.commands.last_mut() {
            if last.same_state(&batch) {
                last.vertices.extend_from_slice(&batch.vertices);
                return;
            }
        }
        self.commands.push(DrawCommand::Geometry(batch));
    }

    pub fn vertex_count(&self) -> usize {
        self.commands
            .iter()
            .map(|command| match command {
                DrawCommand::Geometry(batch) => batch.vertices.len(),
                DrawCommand::Clear(_) => 0,
            })
            .sum()
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(blend: BlendMode) -> DrawBatch {
        let mut batch = DrawBatch::new(Topology::Triangles, blend, false);
        batch.vertices = vec![
            GpuVertex {
                clip: [0.0, 0.0, 0.0, 1.0],
                color: [1.0; 4],
                tex_coords: [0.0; 2],
            };
            3
        ];
        batch
    }

    #[test]
    fn consecutive_batches_with_the_same_state_merge() {
        let mut list = DrawList::default();
        list.push(tri(BlendMode::Blend));
        list.push(tri(BlendMode::Blend));
        assert_eq!(list.len(), 1);
        assert_eq!(list.vertex_count(), 6);

        list.push(tri(BlendMode::Add));
        list.push(tri(BlendMode::Blend));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn texture_changes_split_batches() {
        let mut list = DrawList::default();
        let image = Image::new(1, 1);
        list.push(tri(BlendMode::Blend).with_texture(Some((image.clone(), TextureWrap::Clamp))));
        list.push(tri(BlendMode::Blend).with_texture(Some((image, TextureWrap::Repeat))));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn clear_drops_earlier_work() {
        let mut list = DrawList::default();
        list.push(tri(BlendMode::Blend));
        list.clear_to(Color::BLACK);
        list.push(tri(BlendMode::Blend));
        let commands = list.take();
        assert!(matches!(commands[0], DrawCommand::Clear(Color::BLACK)));
        assert_eq!(commands.len(), 2);
        assert!(list.is_empty());
    }

    #[test]
    fn empty_batches_are_ignored() {
        let mut list = DrawList::default();
        list.push(DrawBatch::new(Topology::Lines, BlendMode::Blend, true));
        assert!(list.is_empty());
    }
}
