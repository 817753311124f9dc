//! Viewport: binds a screen region and camera to a (possibly absent) scene.

use glam::{Affine2, Vec2};
use slotmap::new_key_type;

use crate::scene::manager::SceneHandle;

new_key_type! {
    /// Handle to a `Viewport` owned by the engine.
    pub struct ViewportHandle;
}

/// Screen-space placement of a viewport, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenLayout {
    pub position: Vec2,
    pub size: Vec2,
}

impl ScreenLayout {
    #[must_use]
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }
}

/// Camera placement in scene space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraLayout {
    pub position: Vec2,
    /// Point in camera space mapped to the viewport center.
    pub pivot: Vec2,
    pub rotation: f32,
    pub zoom: f32,
}

impl CameraLayout {
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Vec2::ZERO,
            pivot: Vec2::ZERO,
            rotation: 0.0,
            zoom: 1.0,
        }
    }
}

impl Default for CameraLayout {
    fn default() -> Self {
        Self::identity()
    }
}

/// A (screen-rect, camera, scene) triple defining one "window" into a
/// scene. Multiple viewports may observe the same scene independently.
pub struct Viewport {
    screen_layout: ScreenLayout,
    camera_layout: CameraLayout,
    z_order: i32,
    /// Weak reference: a cleared or dangling scene handle means "skip
    /// rendering this viewport", not an error.
    scene: Option<SceneHandle>,
    creation_order: u64,
    z_order_listeners: Vec<Box<dyn FnMut(i32) + Send>>,
}

impl Viewport {
    pub(crate) fn new(creation_order: u64) -> Self {
        Self {
            screen_layout: ScreenLayout::new(Vec2::ZERO, Vec2::ZERO),
            camera_layout: CameraLayout::identity(),
            z_order: 0,
            scene: None,
            creation_order,
            z_order_listeners: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn screen_layout(&self) -> ScreenLayout {
        self.screen_layout
    }

    #[inline]
    pub fn set_screen_layout(&mut self, layout: ScreenLayout) {
        self.screen_layout = layout;
    }

    #[inline]
    #[must_use]
    pub fn camera_layout(&self) -> CameraLayout {
        self.camera_layout
    }

    #[inline]
    pub fn set_camera_layout(&mut self, layout: CameraLayout) {
        self.camera_layout = layout;
    }

    #[inline]
    #[must_use]
    pub fn z_order(&self) -> i32 {
        self.z_order
    }

    /// Sets the z-order, firing every registered `on_z_order_changed`
    /// listener. Ties between viewports of equal z-order break by creation
    /// order, ascending.
    pub fn set_z_order(&mut self, z_order: i32) {
        self.z_order = z_order;
        for listener in &mut self.z_order_listeners {
            listener(z_order);
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn creation_order(&self) -> u64 {
        self.creation_order
    }

    pub fn on_z_order_changed(&mut self, listener: impl FnMut(i32) + Send + 'static) {
        self.z_order_listeners.push(Box::new(listener));
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> Option<SceneHandle> {
        self.scene
    }

    /// Binds (or clears, with `None`) the scene this viewport renders.
    /// Clearing causes the presenter to skip this viewport without
    /// removing it.
    #[inline]
    pub fn set_scene(&mut self, scene: Option<SceneHandle>) {
        self.scene = scene;
    }

    /// The effective world-to-clip transform: `ScreenProjection(screen) ∘
    /// Camera(camera)^{-1}`. Camera pivot/rotation/zoom are applied in
    /// camera space before the screen-space affine.
    #[must_use]
    pub fn world_to_clip(&self) -> Affine2 {
        let camera_world = Affine2::from_scale_angle_translation(
            Vec2::splat(self.camera_layout.zoom),
            self.camera_layout.rotation,
            self.camera_layout.position,
        ) * Affine2::from_translation(-self.camera_layout.pivot);
        let camera_to_world = camera_world.inverse();

        let half_size = self.screen_layout.size * 0.5;
        let screen_projection = Affine2::from_translation(self.screen_layout.position + half_size)
            * Affine2::from_scale(Vec2::new(1.0, -1.0));

        screen_projection * camera_to_world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_camera_maps_origin_to_screen_center() {
        let mut vp = Viewport::new(0);
        vp.set_screen_layout(ScreenLayout::new(Vec2::ZERO, Vec2::new(800.0, 600.0)));
        let clip = vp.world_to_clip();
        let center = clip.transform_point2(Vec2::ZERO);
        assert!((center - Vec2::new(400.0, 300.0)).length() < 1e-3);
    }

    #[test]
    fn set_z_order_fires_listener() {
        use std::sync::atomic::{AtomicI32, Ordering};
        use std::sync::Arc;

        let observed = Arc::new(AtomicI32::new(-1));
        let observed_clone = observed.clone();
        let mut vp = Viewport::new(0);
        vp.on_z_order_changed(move |z| observed_clone.store(z, Ordering::SeqCst));
        vp.set_z_order(5);
        assert_eq!(observed.load(Ordering::SeqCst), 5);
        assert_eq!(vp.z_order(), 5);
    }
}
