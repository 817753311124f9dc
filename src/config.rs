//! Engine configuration
//!
//! No structured config file is mandated. The engine accepts a plain,
//! `Default`-deriving `EngineConfig` struct at construction time rather than
//! a file format.

/// Options recognized at engine construction time.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Number of frames the presenter allows in flight simultaneously.
    /// Must be at least 1. Defaults to 2 (double buffering).
    pub max_frames_in_flight: u32,

    /// Size, in bytes, of the transient buffer arena's backing GPU buffer.
    /// Must be non-zero. Defaults to 16 MiB.
    pub transient_arena_bytes: u64,

    /// When `false`, no swapchain is created and the presenter runs in
    /// headless mode (used by tests and offscreen tooling). Defaults to
    /// `true`.
    pub require_swapchain: bool,

    /// Enables GPU validation-layer-style diagnostics where the backend
    /// supports them. Defaults to `false`.
    pub validation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: 2,
            transient_arena_bytes: 16 * 1024 * 1024,
            require_swapchain: true,
            validation: false,
        }
    }
}

impl EngineConfig {
    /// Returns a config suitable for headless test/tooling use: no
    /// swapchain, a small transient arena, single-buffered.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            max_frames_in_flight: 2,
            transient_arena_bytes: 1024 * 1024,
            require_swapchain: false,
            validation: true,
        }
    }

    /// Validates the configuration, panicking with a clear message if a
    /// recognized option is out of range. Called once at engine construction.
    pub fn validate(&self) {
        assert!(
            self.max_frames_in_flight >= 1,
            "max_frames_in_flight must be >= 1, got {}",
            self.max_frames_in_flight
        );
        assert!(
            self.transient_arena_bytes > 0,
            "transient_arena_bytes must be non-zero"
        );
    }
}
