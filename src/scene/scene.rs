use std::any::{Any, TypeId};

use glam::Affine2;
use rustc_hash::FxHashMap;
use slotmap::{SecondaryMap, SlotMap};
use thiserror::Error;

use crate::scene::node::Node;
use crate::scene::NodeHandle;
use crate::utils::Identifier;

/// Errors returned by `Scene` hierarchy operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// The handle does not resolve to a live node in this scene.
    #[error("node handle does not resolve to a live node in this scene")]
    UnknownHandle,
    /// `set_parent` would make a node its own ancestor.
    #[error("reparenting would introduce a cycle")]
    ReparentCycle,
}

/// A per-type store: which nodes exist of type `T`, and their component
/// payloads. Type-erased so `Scene` can hold one of these per registered
/// type without knowing the concrete types up front.
struct TypeBucket {
    /// Handles of live nodes of this type, in creation order.
    members: Vec<NodeHandle>,
    /// `SecondaryMap<NodeHandle, T>`, type-erased.
    components: Box<dyn Any>,
}

/// Owns a flat node storage plus, for each node type ever created, a
/// contiguous bucket of handles and a parallel component store — the
/// presenter/pipelines iterate buckets directly rather than filtering the
/// whole scene.
pub struct Scene {
    nodes: SlotMap<NodeHandle, Node>,
    root: NodeHandle,
    buckets: FxHashMap<TypeId, TypeBucket>,
    /// Which bucket a live handle belongs to, so `destroy_node` can find
    /// and remove it in O(bucket size) without knowing `T`.
    bucket_of: SecondaryMap<NodeHandle, TypeId>,
}

impl Scene {
    /// Creates a scene containing only its implicit root (identity
    /// transform, no parent, untyped).
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(Identifier::NONE));
        Self {
            nodes,
            root,
            buckets: FxHashMap::default(),
            bucket_of: SecondaryMap::new(),
        }
    }

    /// The implicit root node. Every node created without an explicit
    /// parent is attached here.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Returns `true` if `handle` resolves to a live node in this scene.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    #[inline]
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Creates a node of component type `T`, attaches it under `parent`
    /// (the scene root if `None`), and stores `component` in `T`'s
    /// per-type map. The node's type-bucket entry is appended before this
    /// call returns.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is `Some` and does not resolve to a live node in
    /// this scene (an invalid handle at this call site is a programmer
    /// error, not a recoverable one).
    pub fn create_node<T: 'static>(
        &mut self,
        parent: Option<NodeHandle>,
        type_tag: Identifier,
        component: T,
    ) -> NodeHandle {
        let parent = parent.unwrap_or(self.root);
        assert!(
            self.nodes.contains_key(parent),
            "create_node: parent handle does not resolve to a live node"
        );

        let handle = self.nodes.insert(Node::new(type_tag));
        self.nodes[parent].children.push(handle);
        self.nodes[handle].parent = Some(parent);
        self.nodes[handle].transform.mark_dirty();

        let type_id = TypeId::of::<T>();
        let bucket = self.buckets.entry(type_id).or_insert_with(|| TypeBucket {
            members: Vec::new(),
            components: Box::new(SecondaryMap::<NodeHandle, T>::new()),
        });
        bucket.members.push(handle);
        bucket
            .components
            .downcast_mut::<SecondaryMap<NodeHandle, T>>()
            .expect("type bucket component map type mismatch")
            .insert(handle, component);
        self.bucket_of.insert(handle, type_id);

        handle
    }

    /// Returns the component of type `T` attached to `handle`, if any.
    #[must_use]
    pub fn component<T: 'static>(&self, handle: NodeHandle) -> Option<&T> {
        let bucket = self.buckets.get(&TypeId::of::<T>())?;
        bucket
            .components
            .downcast_ref::<SecondaryMap<NodeHandle, T>>()
            .expect("type bucket component map type mismatch")
            .get(handle)
    }

    /// Returns a mutable reference to the component of type `T` attached to
    /// `handle`, if any.
    pub fn component_mut<T: 'static>(&mut self, handle: NodeHandle) -> Option<&mut T> {
        let bucket = self.buckets.get_mut(&TypeId::of::<T>())?;
        bucket
            .components
            .downcast_mut::<SecondaryMap<NodeHandle, T>>()
            .expect("type bucket component map type mismatch")
            .get_mut(handle)
    }

    /// Iterates the live nodes of exactly type `T`, in stable-within-a-frame
    /// (creation) order. The presenter/pipelines use this instead of
    /// filtering the whole node storage.
    pub fn nodes_of_type<T: 'static>(&self) -> impl Iterator<Item = (NodeHandle, &T)> {
        let components = self.buckets.get(&TypeId::of::<T>()).map(|b| {
            b.components
                .downcast_ref::<SecondaryMap<NodeHandle, T>>()
                .expect("type bucket component map type mismatch")
        });
        let members: &[NodeHandle] = self
            .buckets
            .get(&TypeId::of::<T>())
            .map_or(&[], |b| b.members.as_slice());

        members.iter().filter_map(move |&h| {
            components.and_then(|c| c.get(h)).map(|c| (h, c))
        })
    }

    /// Destroys the subtree rooted at `handle`, depth-first. `handle`'s
    /// parent's child list is spliced and every destroyed node's
    /// type-bucket entry is removed.
    ///
    /// Destroying the root is a no-op (the root has no bucket membership
    /// and must always exist).
    pub fn destroy_node(&mut self, handle: NodeHandle) -> Result<(), SceneError> {
        if handle == self.root {
            return Ok(());
        }
        if !self.nodes.contains_key(handle) {
            return Err(SceneError::UnknownHandle);
        }

        if let Some(parent) = self.nodes[handle].parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&c| c != handle);
            }
        }

        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            let children = self.nodes[h].children.clone();
            stack.extend(children);

            if let Some(type_id) = self.bucket_of.remove(h) {
                if let Some(bucket) = self.buckets.get_mut(&type_id) {
                    bucket.members.retain(|&m| m != h);
                }
            }
            self.nodes.remove(h);
        }
        Ok(())
    }

    /// Overwrites `handle`'s local transform, marking it and every
    /// descendant dirty (cheap flag propagation; actual matrix recompute
    /// happens lazily on the next `world_transform` query).
    pub fn set_local_transform(&mut self, handle: NodeHandle, local: Affine2) -> Result<(), SceneError> {
        if !self.nodes.contains_key(handle) {
            return Err(SceneError::UnknownHandle);
        }
        self.nodes[handle].transform.set_local(local);
        self.mark_subtree_dirty(handle);
        Ok(())
    }

    fn mark_subtree_dirty(&mut self, handle: NodeHandle) {
        let children = self.nodes[handle].children.clone();
        for child in children {
            self.nodes[child].transform.mark_dirty();
            self.mark_subtree_dirty(child);
        }
    }

    /// Returns `handle`'s world transform, recomputing the dirty prefix of
    /// its ancestor chain (lazy pull: walk up to the nearest clean
    /// ancestor, then multiply back down, caching every node visited).
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not resolve to a live node.
    pub fn world_transform(&mut self, handle: NodeHandle) -> Affine2 {
        let mut dirty_chain = Vec::new();
        let mut cursor = Some(handle);
        while let Some(h) = cursor {
            let node = self
                .nodes
                .get(h)
                .expect("world_transform: stale node handle");
            if !node.transform.dirty() {
                break;
            }
            dirty_chain.push(h);
            cursor = node.parent;
        }

        for &h in dirty_chain.iter().rev() {
            let parent_world = self.nodes[h]
                .parent
                .map(|p| self.nodes[p].transform.world())
                .unwrap_or(Affine2::IDENTITY);
            self.nodes[h].transform.recompute_world(parent_world);
        }

        self.nodes[handle].transform.world()
    }

    /// Recomputes every dirty world transform in the scene.
    ///
    /// `RenderPipeline::collect_draw_calls` only gets `&Scene`, so it
    /// cannot drive the lazy-pull recompute itself; the engine
    /// calls this once per frame, before collection, so every node's
    /// `world_transform_cached()` is safe to read through a shared
    /// reference afterward.
    pub fn refresh_transforms(&mut self) {
        let handles: Vec<NodeHandle> = self.nodes.keys().collect();
        for handle in handles {
            self.world_transform(handle);
        }
    }

    /// Detaches `handle` from its current parent and attaches it to
    /// `new_parent`, marking `handle`'s subtree dirty. Rejects the
    /// operation, leaving the hierarchy unchanged, if `new_parent` is
    /// `handle` itself or a descendant of `handle` (which would introduce
    /// a cycle).
    pub fn set_parent(&mut self, handle: NodeHandle, new_parent: NodeHandle) -> Result<(), SceneError> {
        if !self.nodes.contains_key(handle) || !self.nodes.contains_key(new_parent) {
            return Err(SceneError::UnknownHandle);
        }
        if handle == new_parent || self.is_ancestor(handle, new_parent) {
            return Err(SceneError::ReparentCycle);
        }

        if let Some(old_parent) = self.nodes[handle].parent {
            self.nodes[old_parent].children.retain(|&c| c != handle);
        }
        self.nodes[new_parent].children.push(handle);
        self.nodes[handle].parent = Some(new_parent);
        self.nodes[handle].transform.mark_dirty();
        self.mark_subtree_dirty(handle);
        Ok(())
    }

    /// `true` if `candidate` is `root_of_subtree` or lies within its
    /// subtree.
    fn is_ancestor(&self, root_of_subtree: NodeHandle, candidate: NodeHandle) -> bool {
        if root_of_subtree == candidate {
            return true;
        }
        self.nodes[root_of_subtree]
            .children
            .iter()
            .any(|&c| self.is_ancestor(c, candidate))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::f32::consts::FRAC_PI_2;

    #[derive(Debug, PartialEq)]
    struct Marker(u32);

    #[test]
    fn create_node_appears_in_its_type_bucket() {
        let mut scene = Scene::new();
        let tag = Identifier::new("marker");
        let handle = scene.create_node(None, tag, Marker(7));
        let found: Vec<_> = scene.nodes_of_type::<Marker>().map(|(h, _)| h).collect();
        assert_eq!(found, vec![handle]);
    }

    #[test]
    fn destroy_node_removes_it_from_its_type_bucket() {
        let mut scene = Scene::new();
        let tag = Identifier::new("marker");
        let handle = scene.create_node(None, tag, Marker(1));
        scene.destroy_node(handle).unwrap();
        assert_eq!(scene.nodes_of_type::<Marker>().count(), 0);
        assert!(!scene.contains(handle));
    }

    #[test]
    fn destroy_node_cascades_to_children() {
        let mut scene = Scene::new();
        let tag = Identifier::new("marker");
        let parent = scene.create_node(None, tag, Marker(1));
        let child = scene.create_node(Some(parent), tag, Marker(2));
        scene.destroy_node(parent).unwrap();
        assert!(!scene.contains(parent));
        assert!(!scene.contains(child));
    }

    #[test]
    fn world_transform_composes_through_hierarchy() {
        let mut scene = Scene::new();
        let tag = Identifier::new("marker");
        let parent = scene.create_node(None, tag, Marker(1));
        let child = scene.create_node(Some(parent), tag, Marker(2));

        scene
            .set_local_transform(parent, Affine2::from_angle(FRAC_PI_2))
            .unwrap();
        scene
            .set_local_transform(child, Affine2::from_translation(Vec2::new(10.0, 0.0)))
            .unwrap();

        let world = scene.world_transform(child);
        let p = world.transform_point2(Vec2::ZERO);
        assert!((p - Vec2::new(0.0, 10.0)).length() < 1e-4);
    }

    #[test]
    fn reparenting_updates_world_transform() {
        let mut scene = Scene::new();
        let tag = Identifier::new("marker");
        let parent = scene.create_node(None, tag, Marker(1));
        let child = scene.create_node(Some(parent), tag, Marker(2));

        scene
            .set_local_transform(parent, Affine2::from_translation(Vec2::new(100.0, 0.0)))
            .unwrap();
        scene
            .set_local_transform(child, Affine2::from_translation(Vec2::new(10.0, 0.0)))
            .unwrap();
        let _ = scene.world_transform(child);

        scene
            .set_local_transform(parent, Affine2::from_translation(Vec2::new(5.0, 5.0)))
            .unwrap();
        let world = scene.world_transform(child);
        let p = world.transform_point2(Vec2::ZERO);
        assert!((p - Vec2::new(15.0, 5.0)).length() < 1e-4);
    }

    #[test]
    fn reparent_cycle_is_rejected_and_hierarchy_unchanged() {
        let mut scene = Scene::new();
        let tag = Identifier::new("marker");
        let parent = scene.create_node(None, tag, Marker(1));
        let child = scene.create_node(Some(parent), tag, Marker(2));

        let err = scene.set_parent(parent, child).unwrap_err();
        assert_eq!(err, SceneError::ReparentCycle);
        assert_eq!(scene.node(child).unwrap().parent(), Some(parent));
    }

    #[test]
    fn stale_handle_is_reported_as_unknown() {
        let mut scene = Scene::new();
        let tag = Identifier::new("marker");
        let handle = scene.create_node(None, tag, Marker(9));
        scene.destroy_node(handle).unwrap();
        assert_eq!(scene.destroy_node(handle), Err(SceneError::UnknownHandle));
    }
}
