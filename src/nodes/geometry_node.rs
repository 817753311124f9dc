//! Built-in solid-color geometry node type and its `RenderPipeline`.

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2};
use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::render::context::RenderContext;
use crate::render::draw_command::{
    DrawCommand, InputRate, PushConstantRange, ShaderLayout, VertexAttribute, VertexBinding,
};
use crate::render::pipeline::RenderPipeline;
use crate::scene::{Geometry, Scene};
use crate::utils::Identifier;

/// The component attached to every geometry node: what shape it draws and
/// how.
#[derive(Debug, Clone)]
pub struct GeometryNode {
    pub geometry: Geometry,
    pub color: [f32; 4],
    pub pivot: Vec2,
    pub size: Vec2,
}

impl GeometryNode {
    #[must_use]
    pub fn rectangle(color: [f32; 4], size: Vec2) -> Self {
        Self {
            geometry: Geometry::rectangle(),
            color,
            pivot: Vec2::ZERO,
            size,
        }
    }

    #[must_use]
    pub fn triangle(color: [f32; 4], size: Vec2) -> Self {
        Self {
            geometry: Geometry::triangle(),
            color,
            pivot: Vec2::ZERO,
            size,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Instance {
    /// `Affine2`'s two matrix columns and translation, column-major.
    transform_cols: [f32; 6],
    color: [f32; 4],
    size: [f32; 2],
    pivot: [f32; 2],
}

fn instance_of(world_to_clip: Affine2, world: Affine2, node: &GeometryNode) -> Instance {
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
        color: node.color,
        size: [node.size.x, node.size.y],
        pivot: [node.pivot.x, node.pivot.y],
    }
}

struct Batch {
    geometry: Geometry,
    instances: Vec<Instance>,
}

/// Draws every live `GeometryNode`, batched by shared geometry.
pub struct GeometryPipeline {
    shaders: ShaderLayout,
    batches: FxHashMap<usize, Batch>,
    viewport_size: (u32, u32),
}

impl GeometryPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shaders: shader_layout(),
            batches: FxHashMap::default(),
            viewport_size: (0, 0),
        }
    }
}

impl Default for GeometryPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryPipeline {
    /// Number of distinct geometry batches collected this frame. Exposed for
    /// integration tests that assert on batching behavior without reaching
    /// into the private batch map.
    #[doc(hidden)]
    #[must_use]
    pub fn batch_count_for_test(&self) -> usize {
        self.batches.len()
    }

    /// Total instance count across every batch collected this frame.
    #[doc(hidden)]
    #[must_use]
    pub fn instance_count_for_test(&self) -> usize {
        self.batches.values().map(|b| b.instances.len()).sum()
    }
}

/// `GeometryNode`'s type tag, interned once and reused by every pipeline
/// call site that needs to match it against `Node::type_tag`.
#[must_use]
pub fn geometry_node_type_tag() -> Identifier {
    Identifier::new("vela::geometry_node")
}

fn shader_layout() -> ShaderLayout {
    ShaderLayout {
        vertex_shader_path: "shaders/geometry.vert.spv".to_string(),
        fragment_shader_path: "shaders/geometry.frag.spv".to_string(),
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
                ],
            },
        ],
        descriptor_bindings: Vec::new(),
        // A screen-to-NDC scale/offset: `ndc = pos * scale + offset`.
        push_constant_range: Some(PushConstantRange {
            stages: wgpu::ShaderStages::VERTEX,
            offset: 0,
            size: 16,
        }),
    }
}

impl RenderPipeline for GeometryPipeline {
    fn component_type(&self) -> Identifier {
        geometry_node_type_tag()
    }

    fn shaders(&self) -> &ShaderLayout {
        &self.shaders
    }

    fn collect_draw_calls(&mut self, scene: &Scene, world_to_clip: Affine2, viewport_size: (u32, u32)) {
        self.viewport_size = viewport_size;
        for (handle, component) in scene.nodes_of_type::<GeometryNode>() {
            let Some(node) = scene.node(handle) else { continue };
            if !node.visible {
                continue;
            }
            let world = node.world_transform_cached();
            let batch = self
                .batches
                .entry(component.geometry.batch_key())
                .or_insert_with(|| Batch {
                    geometry: component.geometry.clone(),
                    instances: Vec::new(),
                });
            batch.instances.push(instance_of(world_to_clip, world, component));
        }
    }

    fn execute(&mut self, render_context: &mut RenderContext<'_>) -> Result<()> {
        let (width, height) = self.viewport_size;
        let push_constants = screen_to_ndc_push_constants(width, height);

        for batch in self.batches.values() {
            let vertex_bytes = bytemuck::cast_slice(batch.geometry.vertices());
            let instance_bytes = bytemuck::cast_slice(&batch.instances);
            let command = DrawCommand {
                vertex_buffers: smallvec::smallvec![vertex_bytes],
                instance_buffers: smallvec::smallvec![instance_bytes],
                index_buffer: batch.geometry.indices(),
                descriptor_sets: smallvec::SmallVec::new(),
                push_constants: &push_constants,
                index_count: batch.geometry.indices().len() as u32,
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

/// Bytes for a push-constant block holding `(scale_x, scale_y, offset_x,
/// offset_y)` such that `ndc = screen_px * scale + offset`.
pub(crate) fn screen_to_ndc_push_constants(width: u32, height: u32) -> [u8; 16] {
    let scale_x = if width == 0 { 0.0 } else { 2.0 / width as f32 };
    let scale_y = if height == 0 { 0.0 } else { -2.0 / height as f32 };
    bytemuck::cast([scale_x, scale_y, -1.0f32, 1.0f32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;

    #[test]
    fn collect_batches_instances_sharing_geometry() {
        let mut scene = Scene::new();
        let tag = geometry_node_type_tag();
        let a = scene.create_node(None, tag, GeometryNode::rectangle([1.0, 0.0, 0.0, 1.0], Vec2::splat(100.0)));
        let b = scene.create_node(None, tag, GeometryNode::rectangle([0.0, 1.0, 0.0, 1.0], Vec2::splat(50.0)));
        scene.refresh_transforms();
        let _ = (a, b);

        let mut pipeline = GeometryPipeline::new();
        pipeline.collect_draw_calls(&scene, Affine2::IDENTITY, (800, 600));
        assert_eq!(pipeline.batches.len(), 1);
        assert_eq!(pipeline.batches.values().next().unwrap().instances.len(), 2);
    }

    #[test]
    fn invisible_nodes_are_skipped() {
        let mut scene = Scene::new();
        let tag = geometry_node_type_tag();
        let handle = scene.create_node(None, tag, GeometryNode::rectangle([1.0, 1.0, 1.0, 1.0], Vec2::splat(10.0)));
        scene.node_mut(handle).unwrap().visible = false;
        scene.refresh_transforms();

        let mut pipeline = GeometryPipeline::new();
        pipeline.collect_draw_calls(&scene, Affine2::IDENTITY, (800, 600));
        assert_eq!(pipeline.batches.values().map(|b| b.instances.len()).sum::<usize>(), 0);
    }

    #[test]
    fn screen_to_ndc_maps_top_left_to_minus_one_minus_one() {
        let bytes = screen_to_ndc_push_constants(800, 600);
        let values: [f32; 4] = bytemuck::cast(bytes);
        let ndc_x = 0.0 * values[0] + values[2];
        let ndc_y = 0.0 * values[1] + values[3];
        assert!((ndc_x + 1.0).abs() < 1e-6);
        assert!((ndc_y - 1.0).abs() < 1e-6);
    }
}
