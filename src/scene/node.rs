//! Core scene node: hierarchy and transform only.
//!
//! Type-specific data (geometry, sprite, camera, ...) lives in `Scene`'s
//! per-type component maps, not here — this keeps the hot traversal data
//! (parent, children, transform) small and contiguous.

use crate::scene::transform::Transform2;
use crate::scene::NodeHandle;
use crate::utils::Identifier;

/// A node's minimal hierarchy + transform payload.
///
/// Owned exclusively by a [`crate::scene::Scene`]; never constructed
/// directly by application code (use `Scene::create_node`).
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) transform: Transform2,
    pub(crate) type_tag: Identifier,
    pub visible: bool,
}

impl Node {
    pub(crate) fn new(type_tag: Identifier) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transform: Transform2::new(),
            type_tag,
            visible: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn type_tag(&self) -> Identifier {
        self.type_tag
    }

    #[inline]
    #[must_use]
    pub fn local_transform(&self) -> glam::Affine2 {
        self.transform.local()
    }

    #[inline]
    #[must_use]
    pub fn world_transform_cached(&self) -> glam::Affine2 {
        self.transform.world()
    }
}
