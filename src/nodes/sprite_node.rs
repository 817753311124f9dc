//! Built-in textured sprite node type and its `RenderPipeline`.
//!
//! Mirrors [`crate::nodes::geometry_node`]'s batch-by-geometry shape, with
//! the one addition a sprite needs over solid-color geometry: a bound
//! [`Texture`] descriptor instead of a push-constant-only draw, plus a
//! `uv_rect` that selects a sub-region of the texture.

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2, Vec4};
use rustc_hash::FxHashMap;

use crate::assets::{StrongHandle, Texture};
use crate::errors::Result;
use crate::render::context::RenderContext;
use crate::render::draw_command::{
    DescriptorBinding, DescriptorEntry, DescriptorKind, DrawCommand, InputRate, PushConstantRange,
    ShaderLayout, VertexAttribute, VertexBinding,
};
use crate::render::pipeline::RenderPipeline;
use crate::scene::{Geometry, Scene};
use crate::utils::Identifier;

/// The component attached to every sprite node.
#[derive(Clone)]
pub struct SpriteNode {
    pub texture: StrongHandle<Texture>,
    pub tint: [f32; 4],
    pub pivot: Vec2,
    pub size: Vec2,
    /// `(u_min, v_min, u_max, v_max)` within the bound texture, `0..1`
    /// normalized. Defaults to the whole texture.
    pub uv_rect: Vec4,
}

impl SpriteNode {
    #[must_use]
    pub fn new(texture: StrongHandle<Texture>, size: Vec2) -> Self {
        Self {
            texture,
            tint: [1.0, 1.0, 1.0, 1.0],
            pivot: Vec2::ZERO,
            size,
            uv_rect: Vec4::new(0.0, 0.0, 1.0, 1.0),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Instance {
    transform_cols: [f32; 6],
    tint: [f32; 4],
    size: [f32; 2],
    pivot: [f32; 2],
    uv_rect: [f32; 4],
}

fn instance_of(world_to_clip: Affine2, world: Affine2, node: &SpriteNode) -> Instance {
    let clip = world_to_clip * world;
    Instance {
        transform_cols: [
            clip.matrix2.x_axis.x,
            clip.matrix2.x_axis.y,
            clip.matrix2.y_axis.x,
            clip.matrix2.y_axis.y,
            clip.translation.x,
            clip.translation.y,
        ],
        tint: node.tint,
        size: [node.size.x, node.size.y],
        pivot: [node.pivot.x, node.pivot.y],
        uv_rect: node.uv_rect.to_array(),
    }
}

struct Batch {
    /// Every instance in a batch shares one bound texture: unlike
    /// `GeometryPipeline` (batched by geometry, since solid-color quads
    /// share no other GPU resource), a sprite's draw call binds a
    /// combined-image-sampler descriptor, so the batch key must include the
    /// texture identity, not just the (here, always-rectangle) geometry.
    texture: StrongHandle<Texture>,
    instances: Vec<Instance>,
}

/// Draws every live `SpriteNode`, batched by bound texture.
pub struct SpritePipeline {
    shaders: ShaderLayout,
    batches: FxHashMap<usize, Batch>,
    viewport_size: (u32, u32),
}

impl SpritePipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shaders: shader_layout(),
            batches: FxHashMap::default(),
            viewport_size: (0, 0),
        }
    }
}

impl Default for SpritePipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// `SpriteNode`'s type tag.
#[must_use]
pub fn sprite_node_type_tag() -> Identifier {
    Identifier::new("vela::sprite_node")
}

fn shader_layout() -> ShaderLayout {
    ShaderLayout {
        vertex_shader_path: "shaders/sprite.vert.spv".to_string(),
        fragment_shader_path: "shaders/sprite.frag.spv".to_string(),
        vertex_bindings: vec![
            VertexBinding {
                stride: std::mem::size_of::<crate::scene::Vertex>() as u64,
                input_rate: InputRate::PerVertex,
                attributes: vec![
                    VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 0 },
                    VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 8 },
                ],
            },
            VertexBinding {
                stride: std::mem::size_of::<Instance>() as u64,
                input_rate: InputRate::PerInstance,
                attributes: vec![
                    VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 0 },
                    VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 8 },
                    VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 16 },
                    VertexAttribute { format: wgpu::VertexFormat::Float32x4, offset: 24 },
                    VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 40 },
                    VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 48 },
                    VertexAttribute { format: wgpu::VertexFormat::Float32x4, offset: 56 },
                ],
            },
        ],
        descriptor_bindings: vec![DescriptorBinding {
            kind: DescriptorKind::CombinedImageSampler,
            count: 1,
            stages: wgpu::ShaderStages::FRAGMENT,
        }],
        push_constant_range: Some(PushConstantRange {
            stages: wgpu::ShaderStages::VERTEX,
            offset: 0,
            size: 16,
        }),
    }
}

impl RenderPipeline for SpritePipeline {
    fn component_type(&self) -> Identifier {
        sprite_node_type_tag()
    }

    fn shaders(&self) -> &ShaderLayout {
        &self.shaders
    }

    fn collect_draw_calls(&mut self, scene: &Scene, world_to_clip: Affine2, viewport_size: (u32, u32)) {
        self.viewport_size = viewport_size;
        for (handle, component) in scene.nodes_of_type::<SpriteNode>() {
            let Some(node) = scene.node(handle) else { continue };
            if !node.visible || !component.texture.is_uploaded() {
                continue;
            }
            let world = node.world_transform_cached();
            let key = StrongHandle::ptr_key(&component.texture);
            let batch = self.batches.entry(key).or_insert_with(|| Batch {
                texture: component.texture.clone(),
                instances: Vec::new(),
            });
            batch.instances.push(instance_of(world_to_clip, world, component));
        }
    }

    fn execute(&mut self, render_context: &mut RenderContext<'_>) -> Result<()> {
        let (width, height) = self.viewport_size;
        let push_constants = crate::nodes::geometry_node::screen_to_ndc_push_constants(width, height);
        let quad = Geometry::rectangle();
        let vertex_bytes = bytemuck::cast_slice(quad.vertices());

        for batch in self.batches.values() {
            let instance_bytes = bytemuck::cast_slice(&batch.instances);
            let command = DrawCommand {
                vertex_buffers: smallvec::smallvec![vertex_bytes],
                instance_buffers: smallvec::smallvec![instance_bytes],
                index_buffer: quad.indices(),
                descriptor_sets: smallvec::smallvec![DescriptorEntry::Texture(&batch.texture)],
                push_constants: &push_constants,
                index_count: quad.indices().len() as u32,
                instance_count: batch.instances.len() as u32,
            };
            render_context.draw(std::slice::from_ref(&command), &self.shaders)?;
        }
        Ok(())
    }

    fn clear_draw_queue(&mut self) {
        self.batches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;

    fn cpu_only_texture() -> StrongHandle<Texture> {
        StrongHandle::new(Texture::from_bytes(2, 2, wgpu::TextureFormat::Rgba8Unorm, vec![0u8; 16]))
    }

    #[test]
    fn uncollected_until_texture_is_uploaded() {
        let mut scene = Scene::new();
        let tag = sprite_node_type_tag();
        scene.create_node(None, tag, SpriteNode::new(cpu_only_texture(), Vec2::splat(32.0)));
        scene.refresh_transforms();

        let mut pipeline = SpritePipeline::new();
        pipeline.collect_draw_calls(&scene, Affine2::IDENTITY, (800, 600));
        assert_eq!(pipeline.batches.len(), 0, "CPU-only textures must not be bound into a draw command");
    }

    #[test]
    fn instances_sharing_a_texture_share_a_batch() {
        let mut scene = Scene::new();
        let tag = sprite_node_type_tag();
        let texture = cpu_only_texture();
        let a = scene.create_node(None, tag, SpriteNode::new(texture.clone(), Vec2::splat(32.0)));
        let b = scene.create_node(None, tag, SpriteNode::new(texture, Vec2::splat(16.0)));
        scene.refresh_transforms();
        let _ = (a, b);

        // Without a GPU device to call `Texture::upload`, this only exercises
        // the not-yet-uploaded skip path above; the batching-by-texture-key
        // behavior itself is covered once `upload` has run in an
        // engine-level integration test (see tests/).
        let mut pipeline = SpritePipeline::new();
        pipeline.collect_draw_calls(&scene, Affine2::IDENTITY, (800, 600));
        assert_eq!(pipeline.batches.len(), 0);
    }
}
