//! Translates a [`ShaderLayout`] into concrete `wgpu` pipeline state, and
//! owns the device/queue/surface triple the rest of the renderer shares.

use std::fs;

use crate::errors::{Result, VelaError};
use crate::render::draw_command::{DescriptorKind, InputRate, ShaderLayout};

/// One pipeline's compiled GPU state: the pipeline object itself plus the
/// bind-group layout `RenderContext` needs to build per-draw bind groups.
pub struct CompiledPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Loads a SPIR-V binary from `path` and creates a shader module from it.
///
/// A binary that isn't a whole multiple of 4 bytes fails pipeline creation
/// fatally. `wgpu`'s portable API only accepts WGSL/Naga IR, so raw SPIR-V
/// passthrough is unsafe: the caller vouches the binary is valid SPIR-V,
/// which we cannot verify here beyond its length.
fn load_shader_module(device: &wgpu::Device, path: &str) -> Result<wgpu::ShaderModule> {
    let bytes = fs::read(path).map_err(|e| VelaError::ShaderBinaryError {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    if bytes.len() % 4 != 0 {
        return Err(VelaError::ShaderBinaryError {
            path: path.to_string(),
            reason: format!("binary is {} bytes, not a multiple of 4", bytes.len()),
        });
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    // SAFETY: the caller is responsible for `path` naming a binary produced
    // by a trusted shader compiler; `wgpu` validates structural well-formedness
    // at submission time but not at module-creation time for the passthrough path.
    Ok(unsafe {
        device.create_shader_module_spirv(&wgpu::ShaderModuleDescriptorSpirV {
            label: Some(path),
            source: std::borrow::Cow::Owned(words),
        })
    })
}

fn descriptor_binding_type(kind: DescriptorKind) -> wgpu::BindingType {
    match kind {
        DescriptorKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        DescriptorKind::CombinedImageSampler => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        DescriptorKind::UniformBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        DescriptorKind::StorageBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
    }
}

/// Appends this binding's layout entries at `next_slot`, advancing it by
/// however many slots the binding consumes, and returns the count appended.
///
/// `wgpu` has no single `BindingType` for a Vulkan-style combined image
/// sampler, so `CombinedImageSampler` expands into two consecutive entries
/// (a filterable texture, then a filtering sampler) rather than one —
/// [`crate::render::context::RenderContext`]'s bind-group construction
/// mirrors this exact expansion so the two stay in sync.
pub(crate) fn push_descriptor_layout_entries(
    entries: &mut Vec<wgpu::BindGroupLayoutEntry>,
    next_slot: &mut u32,
    binding: &crate::render::draw_command::DescriptorBinding,
) {
    let count = std::num::NonZeroU32::new(binding.count).filter(|c| c.get() > 1);
    if binding.kind == DescriptorKind::CombinedImageSampler {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: *next_slot,
            visibility: binding.stages,
            ty: descriptor_binding_type(binding.kind),
            count,
        });
        *next_slot += 1;
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: *next_slot,
            visibility: binding.stages,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count,
        });
        *next_slot += 1;
    } else {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: *next_slot,
            visibility: binding.stages,
            ty: descriptor_binding_type(binding.kind),
            count,
        });
        *next_slot += 1;
    }
}

/// Builds the `wgpu::RenderPipeline` and its bind-group layout for `layout`,
/// following a deterministic construction: vertex bindings in declared
/// order with attribute locations assigned linearly across bindings;
/// descriptor bindings at sequential slots starting at 0; triangle-list
/// topology, back-face cull, CCW front face, standard alpha blending, no
/// depth/stencil (2D, no z-test).
pub fn build_pipeline(
    device: &wgpu::Device,
    layout: &ShaderLayout,
    surface_format: wgpu::TextureFormat,
) -> Result<CompiledPipeline> {
    let vertex_module = load_shader_module(device, &layout.vertex_shader_path)?;
    let fragment_module = load_shader_module(device, &layout.fragment_shader_path)?;

    let mut vertex_buffer_layouts = Vec::with_capacity(layout.vertex_bindings.len());
    // Attribute storage must outlive `vertex_buffer_layouts`, which borrows it.
    let mut attribute_storage: Vec<Vec<wgpu::VertexAttribute>> =
        Vec::with_capacity(layout.vertex_bindings.len());
    let mut next_location = 0u32;
    for binding in &layout.vertex_bindings {
        let mut attrs = Vec::with_capacity(binding.attributes.len());
        for attribute in &binding.attributes {
            attrs.push(wgpu::VertexAttribute {
                format: attribute.format,
                offset: attribute.offset,
                shader_location: next_location,
            });
            next_location += 1;
        }
        attribute_storage.push(attrs);
    }
    for (binding, attrs) in layout.vertex_bindings.iter().zip(attribute_storage.iter()) {
        vertex_buffer_layouts.push(wgpu::VertexBufferLayout {
            array_stride: binding.stride,
            step_mode: match binding.input_rate {
                InputRate::PerVertex => wgpu::VertexStepMode::Vertex,
                InputRate::PerInstance => wgpu::VertexStepMode::Instance,
            },
            attributes: attrs,
        });
    }

    let mut bind_group_layout_entries = Vec::with_capacity(layout.descriptor_bindings.len());
    let mut next_slot = 0u32;
    for binding in &layout.descriptor_bindings {
        push_descriptor_layout_entries(&mut bind_group_layout_entries, &mut next_slot, binding);
    }
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("vela::pipeline_descriptor_set"),
        entries: &bind_group_layout_entries,
    });

    let push_constant_ranges: Vec<wgpu::PushConstantRange> = layout
        .push_constant_range
        .iter()
        .map(|range| wgpu::PushConstantRange {
            stages: range.stages,
            range: range.offset..(range.offset + range.size),
        })
        .collect();

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("vela::pipeline_layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &push_constant_ranges,
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vela::render_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some("main"),
            buffers: &vertex_buffer_layouts,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    Ok(CompiledPipeline {
        pipeline,
        bind_group_layout,
    })
}

/// Owns the device/queue used across the renderer. Surface creation is left
/// to `Engine`/`Window` (surfaces borrow the window, which this module has
/// no knowledge of) — `GpuContext` only wraps the backend-selection and
/// adapter/device request sequence shared by every entry point.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Requests a GPU adapter/device against a fresh `wgpu::Instance`, with
    /// no compatible surface — the headless path (`EngineConfig::require_swapchain
    /// == false`), and `PUSH_CONSTANTS` enabled since `ShaderLayout`
    /// pipelines may declare a push-constant range.
    pub async fn request_headless() -> Result<Self> {
        Self::request(wgpu::Instance::new(wgpu::InstanceDescriptor::default()), None).await
    }

    /// Requests a GPU adapter/device compatible with `compatible_surface`
    /// (if given), reusing an `instance` the caller already created a
    /// surface from — `wgpu` requires the adapter and the surface it will
    /// present to come from the same instance.
    pub async fn request(instance: wgpu::Instance, compatible_surface: Option<&wgpu::Surface<'_>>) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| VelaError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("vela::device"),
                required_features: wgpu::Features::PUSH_CONSTANTS | wgpu::Features::SPIRV_SHADER_PASSTHROUGH,
                required_limits: wgpu::Limits {
                    max_push_constant_size: 128,
                    ..wgpu::Limits::default()
                },
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        Ok(Self { instance, adapter, device, queue })
    }
}
