//! 2D affine transform with lazy world-matrix recomputation.

use glam::Affine2;

/// Local-to-world 2D transform, composed as `parent.world ∘ local`.
///
/// The world matrix is cached and only recomputed when [`Transform2::dirty`]
/// is set, matching the lazy-pull strategy: a query walks up to the nearest
/// clean ancestor and multiplies back down, caching each node it touches.
#[derive(Debug, Clone, Copy)]
pub struct Transform2 {
    local: Affine2,
    world: Affine2,
    dirty: bool,
}

impl Transform2 {
    /// Identity local transform, already clean.
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: Affine2::IDENTITY,
            world: Affine2::IDENTITY,
            dirty: false,
        }
    }

    /// The local (parent-relative) transform.
    #[inline]
    #[must_use]
    pub fn local(&self) -> Affine2 {
        self.local
    }

    /// Overwrites the local transform and marks this node dirty. Callers
    /// outside `Scene` should prefer `Scene::set_local_transform`, which
    /// also propagates dirtiness to descendants.
    #[inline]
    pub fn set_local(&mut self, local: Affine2) {
        self.local = local;
        self.dirty = true;
    }

    /// The cached world transform. Only meaningful when `!self.dirty()`.
    #[inline]
    #[must_use]
    pub fn world(&self) -> Affine2 {
        self.world
    }

    #[inline]
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Recomputes the cached world transform from a (already-resolved)
    /// parent world transform, then clears the dirty flag.
    #[inline]
    pub fn recompute_world(&mut self, parent_world: Affine2) {
        self.world = parent_world * self.local;
        self.dirty = false;
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn fresh_transform_is_clean_identity() {
        let t = Transform2::new();
        assert!(!t.dirty());
        assert_eq!(t.world(), Affine2::IDENTITY);
    }

    #[test]
    fn set_local_marks_dirty() {
        let mut t = Transform2::new();
        t.set_local(Affine2::from_translation(Vec2::new(1.0, 2.0)));
        assert!(t.dirty());
    }

    #[test]
    fn recompute_composes_parent_and_local() {
        let mut parent = Transform2::new();
        parent.set_local(Affine2::from_angle(FRAC_PI_2));
        parent.recompute_world(Affine2::IDENTITY);

        let mut child = Transform2::new();
        child.set_local(Affine2::from_translation(Vec2::new(10.0, 0.0)));
        child.recompute_world(parent.world());

        let translated = child.world().transform_point2(Vec2::ZERO);
        assert!((translated - Vec2::new(0.0, 10.0)).length() < 1e-4);
    }
}
