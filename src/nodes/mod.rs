//! Built-in node types.
//!
//! A node type is just a plain component struct plus a
//! [`crate::render::RenderPipeline`] impl that knows how to turn live nodes
//! of that type into draw commands — see [`geometry_node`] and
//! [`sprite_node`]. Application code registers further node types the same
//! way, through [`crate::scene::Scene::create_node`] and
//! [`crate::render::PipelineManager::create_pipeline`]; nothing here is
//! privileged over a user-defined node type.

pub mod geometry_node;
pub mod sprite_node;

pub use geometry_node::{geometry_node_type_tag, GeometryNode, GeometryPipeline};
pub use sprite_node::{sprite_node_type_tag, SpriteNode, SpritePipeline};
