//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! [`VelaError`] covers the *fatal* tier only: conditions a caller cannot
//! recover from locally and that the engine expects to be torn down after.
//! Everything recoverable-at-call-site (asset loading, scene mutation,
//! stream I/O, identifier interning) returns its own small error enum
//! instead of being folded into `VelaError` — see [`crate::assets::AssetLoadError`],
//! [`crate::scene::SceneError`], [`crate::utils::interner::InternError`].
//! Recoverable-inside-presenter conditions (swapchain out-of-date, zero-size
//! window) are not errors at all; they are logged at `warn` and handled by
//! retrying next frame.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vela::errors::{VelaError, Result};
//!
//! fn build_pipeline() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The fatal error type for the Vela engine.
///
/// Every variant here is a fatal-tier condition: propagate up as a single
/// error and expect the engine to terminate.
#[derive(Error, Debug)]
pub enum VelaError {
    /// Failed to request a compatible GPU adapter.
    #[error("failed to request a GPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// The GPU device was lost (driver reset, external termination, etc).
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// Window handle could not be obtained.
    #[error("window handle error: {0}")]
    WindowError(#[from] raw_window_handle::HandleError),

    /// `wgpu::Instance::create_surface` rejected the window handle.
    #[error("failed to create a GPU surface for the window: {0}")]
    SurfaceCreateFailed(String),

    /// A `RenderPipeline`'s GPU pipeline state failed to build.
    #[error("pipeline creation failed for type {type_tag}: {reason}")]
    PipelineCreateFailed {
        /// Debug name of the node type the pipeline was being built for.
        type_tag: String,
        /// Underlying failure reason.
        reason: String,
    },

    /// A shader binary was missing or not a whole multiple of 4 bytes.
    #[error("shader binary error at {path}: {reason}")]
    ShaderBinaryError {
        /// Path the binary was loaded from.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The transient buffer arena ran out of space within a frame.
    ///
    /// This indicates misconfiguration (`transient_arena_bytes` too small
    /// for the scene's per-frame working set), not a transient condition.
    #[error("transient arena exhausted: requested {requested} bytes, {available} available")]
    TransientArenaExhausted {
        /// Bytes requested by the failing `allocate` call.
        requested: u64,
        /// Bytes remaining in the arena before the call.
        available: u64,
    },

    /// A frame fence wait exceeded its configured bound.
    #[error("fence wait timed out after {millis}ms")]
    FenceTimeout {
        /// The configured wait bound, in milliseconds.
        millis: u64,
    },

    /// An acquire/present result the presenter does not know how to
    /// recover from locally (distinct from `OutOfDate`/`Suboptimal`, which
    /// are handled by recreating the swapchain and are never surfaced here).
    #[error("swapchain acquire/present failed: {0}")]
    SurfaceError(#[from] wgpu::SurfaceError),
}

/// Alias for `Result<T, VelaError>`.
pub type Result<T> = std::result::Result<T, VelaError>;
