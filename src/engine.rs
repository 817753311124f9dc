//! Wires the scene/asset/pipeline/presenter pieces into one frame loop.
//!
//! Owns a `Scene`, an `AssetServer`, and a `Renderer`-equivalent the same
//! way an application-level frame loop does: one `pollster::block_on`'d
//! async GPU init at startup, then a `RedrawRequested`-style event drives
//! `update` → `render` every frame. Generalized from a single implicit
//! scene/camera to a `SceneManager` registry of many scenes and
//! independently z-ordered viewports.

use std::sync::Arc;

use crate::assets::AssetServer;
use crate::config::EngineConfig;
use crate::errors::{Result, VelaError};
use crate::render::{FramePresenter, GpuContext, PipelineManager, RenderPipeline, TransientBufferArena};
use crate::scene::SceneManager;
use crate::window::Window;

/// Owns every live `Scene`/`Viewport` ([`SceneManager`]), the asset cache
/// ([`AssetServer`]), the registered draw pipelines ([`PipelineManager`]),
/// and — once [`Engine::attach_window`] has run — the GPU device/queue,
/// surface, transient arena, and frame presenter the frame loop needs.
///
/// Scene/viewport/asset/pipeline-registration operations never touch the
/// GPU and work before a window is attached (the headless path,
/// `EngineConfig::require_swapchain == false`); only [`Engine::run_frame`]
/// and [`Engine::resize`] require one.
pub struct Engine {
    config: EngineConfig,
    scenes: SceneManager,
    assets: AssetServer,
    pipelines: PipelineManager,
    gpu: Option<GpuContext>,
    arena: Option<TransientBufferArena>,
    presenter: Option<FramePresenter>,
    surface: Option<wgpu::Surface<'static>>,
    surface_format: Option<wgpu::TextureFormat>,
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        config.validate();
        Self {
            config,
            scenes: SceneManager::new(),
            assets: AssetServer::new(),
            pipelines: PipelineManager::new(),
            gpu: None,
            arena: None,
            presenter: None,
            surface: None,
            surface_format: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    #[must_use]
    pub fn assets(&self) -> &AssetServer {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetServer {
        &mut self.assets
    }

    /// `true` once [`Engine::attach_window`] (or the headless equivalent)
    /// has successfully requested a GPU device.
    #[must_use]
    pub fn is_gpu_ready(&self) -> bool {
        self.gpu.is_some()
    }

    /// Clones of the attached GPU device/queue, if a GPU has been requested.
    /// `wgpu::Device`/`wgpu::Queue` are cheap `Arc`-backed handles, so this
    /// lets a caller upload a [`crate::assets::Texture`] (which needs
    /// `&mut self` and so cannot be done through an already-shared
    /// [`crate::assets::StrongHandle`]) without holding a borrow of `Engine`
    /// for the duration of the upload.
    #[must_use]
    pub fn gpu_handles(&self) -> Option<(wgpu::Device, wgpu::Queue)> {
        self.gpu.as_ref().map(|gpu| (gpu.device.clone(), gpu.queue.clone()))
    }

    /// Loads (or returns a cached handle to) the texture at `path` through
    /// the engine's [`AssetServer`], uploading it immediately if a GPU
    /// device is attached. With no device attached yet (headless mode, or
    /// before [`Engine::attach_window`] has run), the texture is returned
    /// CPU-only — spec §3's "before upload, the texture is CPU-only and may
    /// not be bound into a draw command" then applies until it is reloaded
    /// with a device present.
    pub fn load_texture(
        &mut self,
        path: impl AsRef<std::path::Path>,
    ) -> std::result::Result<crate::assets::StrongHandle<crate::assets::Texture>, crate::assets::AssetLoadError> {
        let gpu = self.gpu_handles();
        self.assets.load(path, move |bytes| {
            let mut texture = crate::assets::Texture::decode_native(&bytes)?;
            if let Some((device, queue)) = &gpu {
                texture.upload(device, queue);
            }
            Ok(texture)
        })
    }

    /// Registers a pipeline for a node type. If the GPU device is already
    /// available, its pipeline state is built immediately against the
    /// current surface format; otherwise it is left uncompiled until the
    /// next [`Engine::attach_window`]/[`Engine::resize`] drives
    /// `PipelineManager::recreate_pipelines`.
    pub fn register_pipeline(&mut self, pipeline: Box<dyn RenderPipeline>) -> Result<()> {
        let device_and_format = match (&self.gpu, self.surface_format) {
            (Some(gpu), Some(format)) => Some((&gpu.device, format)),
            _ => None,
        };
        self.pipelines.create_pipeline(pipeline, device_and_format)
    }

    pub fn destroy_pipeline(&mut self, type_tag: crate::utils::Identifier) {
        self.pipelines.destroy_pipeline(type_tag);
    }

    /// Requests a GPU device/queue and, when `config.require_swapchain` is
    /// `true`, a surface against `window` sized `width`×`height`. The one
    /// suspension point allowed outside the frame loop itself — callers
    /// block on it once at startup via `pollster::block_on`.
    pub async fn attach_window<W>(&mut self, window: Arc<W>, width: u32, height: u32) -> Result<()>
    where
        W: Window + Send + Sync + 'static,
    {
        if !self.config.require_swapchain {
            let gpu = GpuContext::request_headless().await?;
            self.arena = Some(TransientBufferArena::new(&gpu.device, self.config.transient_arena_bytes));
            self.gpu = Some(gpu);
            return Ok(());
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|e| VelaError::SurfaceCreateFailed(e.to_string()))?;
        let gpu = GpuContext::request(instance, Some(&surface)).await?;

        let capabilities = surface.get_capabilities(&gpu.adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .unwrap_or(capabilities.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: capabilities.present_modes[0],
            alpha_mode: capabilities.alpha_modes[0],
            view_formats: Vec::new(),
            desired_maximum_frame_latency: self.config.max_frames_in_flight,
        };
        surface.configure(&gpu.device, &surface_config);

        self.pipelines.recreate_pipelines(&gpu.device, format)?;

        self.arena = Some(TransientBufferArena::new(&gpu.device, self.config.transient_arena_bytes));
        self.presenter = Some(FramePresenter::new(self.config.max_frames_in_flight as usize, surface_config));
        self.surface_format = Some(format);
        self.surface = Some(surface);
        self.gpu = Some(gpu);
        Ok(())
    }

    /// Reconfigures the swapchain for a new window size and, if that
    /// triggered a recreate, rebuilds every registered pipeline's GPU
    /// state against it — resize must not silently leave stale pipeline
    /// state bound to a destroyed swapchain image format.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let Some(gpu) = self.gpu.as_ref() else { return Ok(()) };
        let Some(surface) = self.surface.as_ref() else { return Ok(()) };
        let Some(presenter) = self.presenter.as_mut() else { return Ok(()) };

        let before = presenter.recreate_count();
        presenter.resize(&gpu.device, surface, width, height);
        if presenter.recreate_count() != before {
            presenter.recreate_pipelines(&mut self.pipelines, &gpu.device)?;
        }
        Ok(())
    }

    /// One acquire → collect → execute → present cycle across every live
    /// viewport, ascending z-order. A no-op, returning `Ok(())`, before a
    /// window is attached or while the window is zero-size.
    ///
    /// Each viewport's scene has its dirty world transforms refreshed before
    /// collection (`Scene::create_node`/`set_local_transform` only mark
    /// nodes dirty; nothing else in the frame loop recomputes them), and
    /// each viewport runs its own collect → execute → clear cycle so later
    /// z-order viewports draw over earlier ones within the same render pass
    /// rather than every viewport's batches merging into one `execute` call.
    pub fn run_frame(&mut self) -> Result<()> {
        let Some(gpu) = self.gpu.as_ref() else { return Ok(()) };
        let Some(surface) = self.surface.as_ref() else { return Ok(()) };
        let Some(presenter) = self.presenter.as_mut() else { return Ok(()) };
        let Some(arena) = self.arena.as_mut() else { return Ok(()) };

        if !presenter.begin_frame(&gpu.device, surface)? {
            return Ok(());
        }

        let viewport_order = self.scenes.viewports_by_z_order();

        let mut refreshed: std::collections::HashSet<crate::scene::SceneHandle> = std::collections::HashSet::new();
        for &viewport_handle in &viewport_order {
            let Some(scene_handle) = self.scenes.viewport(viewport_handle).and_then(|vp| vp.scene()) else {
                continue;
            };
            if refreshed.insert(scene_handle) {
                if let Some(scene) = self.scenes.scene_mut(scene_handle) {
                    scene.refresh_transforms();
                }
            }
        }

        let scenes = &self.scenes;
        let pipelines = &mut self.pipelines;

        presenter.end_frame(&gpu.device, &gpu.queue, arena, |ctx| {
            for &viewport_handle in &viewport_order {
                let Some(viewport) = scenes.viewport(viewport_handle) else { continue };
                let Some(scene_handle) = viewport.scene() else { continue };
                if !scenes.scene_is_live(scene_handle) {
                    continue;
                }
                let Some(scene) = scenes.scene(scene_handle) else { continue };
                let layout = viewport.screen_layout();
                let viewport_size = (layout.size.x as u32, layout.size.y as u32);
                pipelines.collect(scene, viewport.world_to_clip(), viewport_size);
                pipelines.execute(ctx)?;
                pipelines.clear_draw_queue();
            }
            Ok(())
        })?;

        presenter.present_frame();
        arena.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_engine_has_no_gpu_and_empty_registries() {
        let engine = Engine::new(EngineConfig::headless());
        assert!(!engine.is_gpu_ready());
        assert_eq!(engine.scenes().viewports_by_z_order().len(), 0);
    }

    #[test]
    fn run_frame_before_attach_is_a_harmless_noop() {
        let mut engine = Engine::new(EngineConfig::headless());
        assert!(engine.run_frame().is_ok());
    }

    #[test]
    fn scene_and_viewport_crud_works_without_a_gpu() {
        let mut engine = Engine::new(EngineConfig::headless());
        let scene = engine.scenes_mut().create_scene();
        let viewport = engine.scenes_mut().create_viewport();
        engine.scenes_mut().viewport_mut(viewport).unwrap().set_scene(Some(scene));
        assert_eq!(engine.scenes().viewport(viewport).unwrap().scene(), Some(scene));
        assert!(engine.scenes().scene_is_live(scene));

        engine.scenes_mut().destroy_scene(scene);
        assert!(!engine.scenes().scene_is_live(scene));
    }
}
