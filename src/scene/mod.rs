//! Scene Graph
//!
//! A hierarchical scene graph of typed nodes with transform propagation,
//! organized as a hierarchy module, a per-node-hot-data `Node` type, and a
//! `Scene` container. Node types are not hardcoded per-type component
//! fields; instead a `TypeId`-keyed registry lets arbitrary node types
//! register at runtime (see [`Scene::create_node`]).
//!
//! # Architecture
//!
//! - [`node::Node`] — hierarchy + transform, the data every traversal touches.
//! - [`transform::Transform2`] — the 2D affine + dirty-flag component.
//! - [`scene::Scene`] — owns nodes, per-type buckets, and per-type component
//!   storage.
//! - [`viewport::Viewport`] — binds a screen region and camera to a scene.
//! - [`geometry::Geometry`] — shared immutable vertex/index data.

pub mod geometry;
pub mod manager;
pub mod node;
pub mod scene;
pub mod transform;
pub mod viewport;

pub use geometry::{Geometry, Vertex};
pub use manager::{SceneHandle, SceneManager};
pub use node::Node;
pub use scene::{Scene, SceneError};
pub use transform::Transform2;
pub use viewport::{CameraLayout, ScreenLayout, Viewport, ViewportHandle};

use slotmap::new_key_type;

new_key_type! {
    /// Generational handle to a node within one `Scene`. Stale handles
    /// (from a destroyed node) resolve to `None` rather than aliasing
    /// whatever node is later allocated at the same slot.
    pub struct NodeHandle;
}
