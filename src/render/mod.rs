//! GPU-facing rendering: transient buffer arena, draw-command protocol,
//! pipeline registry, and the per-frame presenter state machine.

pub mod arena;
pub mod context;
pub mod draw_command;
pub mod gpu;
pub mod pipeline;
pub mod presenter;

pub use arena::{TransientAllocation, TransientBufferArena};
pub use context::RenderContext;
pub use draw_command::{
    DescriptorBinding, DescriptorEntry, DescriptorKind, DrawCommand, InputRate, PushConstantRange,
    ShaderLayout, VertexAttribute, VertexBinding,
};
pub use gpu::{build_pipeline, CompiledPipeline, GpuContext};
pub use pipeline::{PipelineManager, RenderPipeline};
pub use presenter::{FramePresenter, FrameSlot, PresenterError, PresenterState};
