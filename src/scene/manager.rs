//! Owns every `Scene` and `Viewport` the engine has created.
//!
//! A `SlotMap`-backed registry with create/destroy operations, owning both
//! scenes and viewports since the engine creates/destroys both through the
//! same kind of handle-returning API.

use slotmap::{new_key_type, SlotMap};

use crate::scene::viewport::{Viewport, ViewportHandle};
use crate::scene::Scene;

new_key_type! {
    /// Handle to a `Scene` owned by the engine.
    pub struct SceneHandle;
}

/// Registry of live scenes and viewports.
pub struct SceneManager {
    scenes: SlotMap<SceneHandle, Scene>,
    viewports: SlotMap<ViewportHandle, Viewport>,
    next_viewport_creation_order: u64,
}

impl SceneManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scenes: SlotMap::with_key(),
            viewports: SlotMap::with_key(),
            next_viewport_creation_order: 0,
        }
    }

    /// Creates an empty scene and returns its handle.
    pub fn create_scene(&mut self) -> SceneHandle {
        self.scenes.insert(Scene::new())
    }

    /// Destroys a scene. Any viewport still bound to it will see its
    /// `scene()` resolve to `None` on next lookup and be skipped by the
    /// presenter, rather than erroring.
    pub fn destroy_scene(&mut self, handle: SceneHandle) {
        self.scenes.remove(handle);
    }

    #[must_use]
    pub fn scene(&self, handle: SceneHandle) -> Option<&Scene> {
        self.scenes.get(handle)
    }

    pub fn scene_mut(&mut self, handle: SceneHandle) -> Option<&mut Scene> {
        self.scenes.get_mut(handle)
    }

    /// `true` if `handle` still resolves to a live scene — used to resolve
    /// a viewport's weak scene reference each frame.
    #[must_use]
    pub fn scene_is_live(&self, handle: SceneHandle) -> bool {
        self.scenes.contains_key(handle)
    }

    /// Creates a viewport with default (zero-size) screen layout and
    /// identity camera, bound to no scene.
    pub fn create_viewport(&mut self) -> ViewportHandle {
        let order = self.next_viewport_creation_order;
        self.next_viewport_creation_order += 1;
        self.viewports.insert(Viewport::new(order))
    }

    pub fn destroy_viewport(&mut self, handle: ViewportHandle) {
        self.viewports.remove(handle);
    }

    #[must_use]
    pub fn viewport(&self, handle: ViewportHandle) -> Option<&Viewport> {
        self.viewports.get(handle)
    }

    pub fn viewport_mut(&mut self, handle: ViewportHandle) -> Option<&mut Viewport> {
        self.viewports.get_mut(handle)
    }

    /// Returns every live viewport handle sorted ascending by z-order, ties
    /// broken by creation order — the order the presenter renders in.
    #[must_use]
    pub fn viewports_by_z_order(&self) -> Vec<ViewportHandle> {
        let mut handles: Vec<ViewportHandle> = self.viewports.keys().collect();
        handles.sort_by_key(|&h| {
            let vp = &self.viewports[h];
            (vp.z_order(), vp.creation_order())
        });
        handles
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewports_sort_by_z_order_then_creation_order() {
        let mut mgr = SceneManager::new();
        let a = mgr.create_viewport();
        let b = mgr.create_viewport();
        let c = mgr.create_viewport();
        mgr.viewport_mut(a).unwrap().set_z_order(1);
        mgr.viewport_mut(b).unwrap().set_z_order(0);
        mgr.viewport_mut(c).unwrap().set_z_order(1);

        assert_eq!(mgr.viewports_by_z_order(), vec![b, a, c]);
    }

    #[test]
    fn destroyed_scene_is_no_longer_live() {
        let mut mgr = SceneManager::new();
        let scene = mgr.create_scene();
        assert!(mgr.scene_is_live(scene));
        mgr.destroy_scene(scene);
        assert!(!mgr.scene_is_live(scene));
    }
}
