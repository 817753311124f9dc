//! The context a `RenderPipeline::execute` implementation draws through.

use crate::render::arena::TransientBufferArena;
use crate::render::draw_command::{DescriptorEntry, DrawCommand, ShaderLayout};
use crate::errors::{Result, VelaError};

/// Passed to `RenderPipeline::execute`. Wraps one frame's render pass, the
/// transient arena, and the queue used to upload into it.
///
/// The pipeline manager binds the currently-executing pipeline's compiled
/// `wgpu::RenderPipeline` before calling the `RenderPipeline` trait's
/// `execute`, so `draw` only needs the language-neutral `ShaderLayout` to
/// know which binding slots to fill.
pub struct RenderContext<'a> {
    pass: wgpu::RenderPass<'a>,
    arena: &'a mut TransientBufferArena,
    queue: &'a wgpu::Queue,
    bind_group_layout: Option<&'a wgpu::BindGroupLayout>,
    device: &'a wgpu::Device,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        pass: wgpu::RenderPass<'a>,
        arena: &'a mut TransientBufferArena,
        queue: &'a wgpu::Queue,
        device: &'a wgpu::Device,
    ) -> Self {
        Self {
            pass,
            arena,
            queue,
            bind_group_layout: None,
            device,
        }
    }

    pub(crate) fn bind_pipeline(
        &mut self,
        pipeline: &'a wgpu::RenderPipeline,
        bind_group_layout: &'a wgpu::BindGroupLayout,
    ) {
        self.pass.set_pipeline(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
    }

    /// Uploads each command's buffers into the transient arena, binds them
    /// at the slots `layout` declares, and issues the draw call.
    pub fn draw(&mut self, commands: &[DrawCommand<'_>], layout: &ShaderLayout) -> Result<()> {
        for command in commands {
            self.draw_one(command, layout)?;
        }
        Ok(())
    }

    fn draw_one(&mut self, command: &DrawCommand<'_>, layout: &ShaderLayout) -> Result<()> {
        for (slot, bytes) in command.vertex_buffers.iter().enumerate() {
            let alloc = self.arena.allocate(self.queue, bytes)?;
            let slice = self
                .arena
                .buffer()
                .slice(alloc.buffer_offset..alloc.buffer_offset + alloc.size);
            self.pass.set_vertex_buffer(slot as u32, slice);
        }

        let instance_base = command.vertex_buffers.len() as u32;
        for (i, bytes) in command.instance_buffers.iter().enumerate() {
            let alloc = self.arena.allocate(self.queue, bytes)?;
            let slice = self
                .arena
                .buffer()
                .slice(alloc.buffer_offset..alloc.buffer_offset + alloc.size);
            self.pass.set_vertex_buffer(instance_base + i as u32, slice);
        }

        if command.is_indexed() {
            let alloc = self
                .arena
                .allocate(self.queue, bytemuck::cast_slice(command.index_buffer))?;
            let slice = self
                .arena
                .buffer()
                .slice(alloc.buffer_offset..alloc.buffer_offset + alloc.size);
            self.pass.set_index_buffer(slice, wgpu::IndexFormat::Uint32);
        }

        if let Some(range) = layout.push_constant_range {
            self.pass
                .set_push_constants(range.stages, range.offset, command.push_constants);
        }

        if !command.descriptor_sets.is_empty() {
            if let Some(bind_group_layout) = self.bind_group_layout {
                let bind_group = self.build_descriptor_bind_group(command, bind_group_layout)?;
                self.pass.set_bind_group(0, &bind_group, &[]);
            }
        }

        if command.is_indexed() {
            self.pass
                .draw_indexed(0..command.index_count, 0, 0..command.instance_count);
        } else {
            self.pass.draw(0..command.index_count, 0..command.instance_count);
        }
        Ok(())
    }

    /// Builds a one-off bind group for this command's descriptor entries.
    /// Storage-buffer entries are uploaded into the arena first; texture
    /// entries bind the asset's existing GPU view *and* sampler, at
    /// consecutive slots — mirrors
    /// [`crate::render::gpu::push_descriptor_layout_entries`]'s expansion of
    /// a `CombinedImageSampler` binding into two layout entries, since
    /// `wgpu` has no single binding type for a combined image sampler.
    fn build_descriptor_bind_group(
        &mut self,
        command: &DrawCommand<'_>,
        layout: &wgpu::BindGroupLayout,
    ) -> Result<wgpu::BindGroup> {
        let mut storage_slices = Vec::new();
        for entry in &command.descriptor_sets {
            if let DescriptorEntry::StorageBytes(bytes) = entry {
                storage_slices.push(self.arena.allocate(self.queue, bytes)?);
            }
        }

        let mut storage_cursor = 0;
        let mut next_slot = 0u32;
        let mut entries = Vec::with_capacity(command.descriptor_sets.len());
        for entry in &command.descriptor_sets {
            match entry {
                DescriptorEntry::StorageBytes(bytes) => {
                    let alloc = storage_slices[storage_cursor];
                    storage_cursor += 1;
                    entries.push(wgpu::BindGroupEntry {
                        binding: next_slot,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: self.arena.buffer(),
                            offset: alloc.buffer_offset,
                            size: wgpu::BufferSize::new(bytes.len() as u64),
                        }),
                    });
                    next_slot += 1;
                }
                DescriptorEntry::Texture(texture) => {
                    let gpu = texture.gpu().ok_or_else(|| VelaError::PipelineCreateFailed {
                        type_tag: "<draw>".to_string(),
                        reason: "texture bound into draw command before upload".to_string(),
                    })?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: next_slot,
                        resource: wgpu::BindingResource::TextureView(&gpu.view),
                    });
                    next_slot += 1;
                    entries.push(wgpu::BindGroupEntry {
                        binding: next_slot,
                        resource: wgpu::BindingResource::Sampler(&gpu.sampler),
                    });
                    next_slot += 1;
                }
            }
        }

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vela::draw_descriptor_set"),
            layout,
            entries: &entries,
        }))
    }
}
