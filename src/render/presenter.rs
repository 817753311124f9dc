//! Per-frame state machine: acquire, record, submit, present.
//!
//! `wgpu` hides explicit semaphore objects (`image_available`,
//! `render_finished`, fences) behind `Surface`/`Queue`:
//! `Surface::get_current_texture` and `SurfaceTexture::present` already
//! enforce the correct per-image waits and signals internally, and
//! `Queue::submit`'s returned `SubmissionIndex` is the fence-equivalent this
//! module polls before reusing a frame slot's resources. What remains as
//! code we own is the *slot* bookkeeping — which in-flight slot is current,
//! how many are in flight, and the swapchain-recreate sequencing — so
//! [`FrameSync`] isolates exactly that, GPU-free and unit-testable, the
//! same split the rest of this crate keeps between pure bookkeeping and
//! `wgpu`-touching glue.

use crate::errors::{Result, VelaError};
use crate::render::arena::TransientBufferArena;
use crate::render::context::RenderContext;
use crate::render::pipeline::PipelineManager;

/// `{Idle, Acquired, Recorded, Submitted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterState {
    Idle,
    Acquired,
    Recorded,
    Submitted,
}

/// Per-slot fence-equivalent: the submission this slot's command buffer was
/// last recorded into, if any is still outstanding.
#[derive(Default)]
pub struct FrameSlot {
    fence: Option<wgpu::SubmissionIndex>,
}

/// Pure slot-rotation and recreate-count bookkeeping, with no `wgpu` types,
/// so the rotation and recreate-idempotence properties are directly
/// unit-testable.
pub struct FrameSync {
    current_slot: usize,
    frames_in_flight: usize,
    recreate_count: u64,
}

impl FrameSync {
    #[must_use]
    pub fn new(frames_in_flight: usize) -> Self {
        assert!(frames_in_flight >= 1, "max_frames_in_flight must be >= 1");
        Self {
            current_slot: 0,
            frames_in_flight,
            recreate_count: 0,
        }
    }

    #[must_use]
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    #[must_use]
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    pub fn advance(&mut self) {
        self.current_slot = (self.current_slot + 1) % self.frames_in_flight;
    }

    pub fn note_recreate(&mut self) {
        self.recreate_count += 1;
    }

    #[must_use]
    pub fn recreate_count(&self) -> u64 {
        self.recreate_count
    }
}

/// Errors a presenter call can surface. Every variant here is fatal
/// (a fatal-tier condition); `OutOfDate`/`Suboptimal`/zero-size-window are not
/// errors at all and are handled by `begin_frame`/`resize` returning `Ok`
/// with a "skip this frame" signal instead.
#[derive(Debug, thiserror::Error)]
pub enum PresenterError {
    #[error(transparent)]
    Fatal(#[from] VelaError),
}

/// Drives one swapchain's acquire/record/submit/present cycle across
/// `N` in-flight frame slots.
pub struct FramePresenter {
    state: PresenterState,
    sync: FrameSync,
    slots: Vec<FrameSlot>,
    surface_config: wgpu::SurfaceConfiguration,
    acquired: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

impl FramePresenter {
    #[must_use]
    pub fn new(frames_in_flight: usize, surface_config: wgpu::SurfaceConfiguration) -> Self {
        let mut slots = Vec::with_capacity(frames_in_flight);
        slots.resize_with(frames_in_flight, FrameSlot::default);
        Self {
            state: PresenterState::Idle,
            sync: FrameSync::new(frames_in_flight),
            slots,
            surface_config,
            acquired: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> PresenterState {
        self.state
    }

    #[must_use]
    pub fn recreate_count(&self) -> u64 {
        self.sync.recreate_count()
    }

    /// Reconfigures the surface for a new window size. A zero-size window
    /// is a no-op: no fatal error, nothing to present to.
    pub fn resize(&mut self, device: &wgpu::Device, surface: &wgpu::Surface<'_>, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("skipping resize to {width}x{height}: zero-size window");
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        surface.configure(device, &self.surface_config);
        self.sync.note_recreate();
        log::debug!("surface reconfigured to {width}x{height}");
    }

    /// Idle → Acquired. Waits on the current slot's fence, then acquires
    /// the next swapchain image. Returns `Ok(false)` if the frame should be
    /// skipped (timeout, or a just-recreated swapchain) without advancing
    /// the slot or touching `state`.
    pub fn begin_frame(&mut self, device: &wgpu::Device, surface: &wgpu::Surface<'_>) -> Result<bool> {
        debug_assert_eq!(self.state, PresenterState::Idle);

        let slot = self.sync.current_slot();
        if let Some(fence) = self.slots[slot].fence.take() {
            device.poll(wgpu::Maintain::WaitForSubmissionIndex(fence));
        }

        match surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.acquired = Some((texture, view));
                self.state = PresenterState::Acquired;
                Ok(true)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface acquire timed out, skipping this frame");
                Ok(false)
            }
            Err(err @ (wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost)) => {
                log::warn!("surface {err:?}, reconfiguring and skipping this frame");
                surface.configure(device, &self.surface_config);
                self.sync.note_recreate();
                Ok(false)
            }
            Err(err @ wgpu::SurfaceError::OutOfMemory) => Err(VelaError::SurfaceError(err)),
        }
    }

    /// Acquired → Submitted. Records a render pass clearing to `(0,0,0,1)`,
    /// lets `record` (the caller, iterating viewports in ascending z-order)
    /// drive the `PipelineManager` through a `RenderContext`, then submits.
    pub fn end_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        arena: &mut TransientBufferArena,
        mut record: impl FnMut(&mut RenderContext<'_>) -> Result<()>,
    ) -> Result<()> {
        debug_assert_eq!(self.state, PresenterState::Acquired);
        let (_texture, view) = self
            .acquired
            .as_ref()
            .expect("begin_frame populated `acquired`");

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vela::frame_encoder"),
        });
        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vela::frame_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut ctx = RenderContext::new(pass, arena, queue, device);
            record(&mut ctx)?;
        }
        self.state = PresenterState::Recorded;

        let fence = queue.submit(std::iter::once(encoder.finish()));
        self.slots[self.sync.current_slot()].fence = Some(fence);
        self.state = PresenterState::Submitted;
        Ok(())
    }

    /// Submitted → Idle. Presents the acquired image and advances the
    /// current slot.
    pub fn present_frame(&mut self) {
        debug_assert_eq!(self.state, PresenterState::Submitted);
        if let Some((texture, _view)) = self.acquired.take() {
            texture.present();
        }
        self.sync.advance();
        self.state = PresenterState::Idle;
    }

    /// Runs one full collect/execute cycle against every viewport returned
    /// by `viewports`, in the order given (callers pass viewports already
    /// sorted by ascending z-order, per `SceneManager::viewports_by_z_order`).
    pub fn recreate_pipelines(
        &mut self,
        pipeline_manager: &mut PipelineManager,
        device: &wgpu::Device,
    ) -> Result<()> {
        pipeline_manager.recreate_pipelines(device, self.surface_config.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_advances_and_wraps_modulo_frames_in_flight() {
        let mut sync = FrameSync::new(2);
        assert_eq!(sync.current_slot(), 0);
        sync.advance();
        assert_eq!(sync.current_slot(), 1);
        sync.advance();
        assert_eq!(sync.current_slot(), 0);
    }

    #[test]
    fn recreate_count_tracks_note_recreate_calls() {
        let mut sync = FrameSync::new(2);
        assert_eq!(sync.recreate_count(), 0);
        sync.note_recreate();
        assert_eq!(sync.recreate_count(), 1);
        sync.note_recreate();
        assert_eq!(sync.recreate_count(), 2);
    }

    #[test]
    fn single_resize_recreates_exactly_once() {
        let mut sync = FrameSync::new(2);
        // A resize pass that touches the surface exactly once should leave
        // recreate_count at 1, matching "resize once -> recreate
        // count equals exactly 1" scenario. `resize` itself is GPU-bound and
        // covered separately; this isolates the bookkeeping half.
        sync.note_recreate();
        assert_eq!(sync.recreate_count(), 1);
    }

    #[test]
    #[should_panic(expected = "max_frames_in_flight")]
    fn zero_frames_in_flight_is_rejected() {
        let _ = FrameSync::new(0);
    }
}
