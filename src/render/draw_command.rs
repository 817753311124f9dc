//! Language-neutral draw-command and pipeline-layout description.
//!
//! `ShaderLayout` borrows a handful of plain `wgpu` enums (`VertexFormat`,
//! `ShaderStages`) as convenient, already-portable vocabulary, but never a
//! `wgpu` pipeline or descriptor type — it is a static, backend-agnostic
//! description of *what* a pipeline needs, not *how* to build it.
//! [`crate::render::gpu::build_pipeline`] is the one place that turns it
//! into a concrete `wgpu::RenderPipelineDescriptor`.

use smallvec::SmallVec;

use crate::assets::Texture;

/// Where a vertex/instance buffer's attributes come from, per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRate {
    PerVertex,
    PerInstance,
}

/// One attribute within a vertex or instance binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexAttribute {
    pub format: wgpu::VertexFormat,
    pub offset: u64,
}

/// One vertex or instance buffer binding declared by a pipeline.
#[derive(Debug, Clone)]
pub struct VertexBinding {
    pub stride: u64,
    pub input_rate: InputRate,
    pub attributes: Vec<VertexAttribute>,
}

/// Resource kinds a descriptor binding may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Sampler,
    CombinedImageSampler,
    UniformBuffer,
    StorageBuffer,
}

/// One descriptor-set binding declared by a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorBinding {
    pub kind: DescriptorKind,
    pub count: u32,
    pub stages: wgpu::ShaderStages,
}

/// A push-constant block, if the pipeline declares one.
#[derive(Debug, Clone, Copy)]
pub struct PushConstantRange {
    pub stages: wgpu::ShaderStages,
    pub offset: u32,
    pub size: u32,
}

/// Static description of a pipeline's shaders, vertex input, descriptor
/// bindings, and push-constant block. Stable for the pipeline's lifetime.
#[derive(Debug, Clone)]
pub struct ShaderLayout {
    pub vertex_shader_path: String,
    pub fragment_shader_path: String,
    pub vertex_bindings: Vec<VertexBinding>,
    pub descriptor_bindings: Vec<DescriptorBinding>,
    pub push_constant_range: Option<PushConstantRange>,
}

/// Either a storage-buffer upload or a bound texture, matching one
/// `descriptor_bindings` entry in the pipeline's `ShaderLayout`.
pub enum DescriptorEntry<'a> {
    StorageBytes(&'a [u8]),
    Texture(&'a Texture),
}

/// One draw call's worth of data, referencing externally-owned byte spans
/// by borrow. The caller (a `RenderPipeline::execute` implementation) must
/// keep the referenced buffers alive until the command buffer is submitted.
///
/// `vertex_buffers`/`instance_buffers`/`descriptor_sets` are inline-backed:
/// a draw call almost always has one vertex buffer, at most one instance
/// buffer, and zero or one bound descriptor, so the common case never
/// touches the heap.
pub struct DrawCommand<'a> {
    pub vertex_buffers: SmallVec<[&'a [u8]; 2]>,
    pub instance_buffers: SmallVec<[&'a [u8]; 2]>,
    pub index_buffer: &'a [u32],
    pub descriptor_sets: SmallVec<[DescriptorEntry<'a>; 1]>,
    pub push_constants: &'a [u8],
    pub index_count: u32,
    pub instance_count: u32,
}

impl<'a> DrawCommand<'a> {
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        !self.index_buffer.is_empty()
    }
}
