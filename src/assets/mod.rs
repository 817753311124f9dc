//! Asset loading, caching, and ref-counted handles.
//!
//! See [`handle`] for why `StrongHandle`/`WeakHandle` wrap `Arc`/`Weak`
//! directly instead of a key-plus-tracker pair.

pub mod handle;
pub mod server;
pub mod texture;

pub use handle::{StrongHandle, WeakHandle};
pub use server::{AssetLoadError, AssetServer};
pub use texture::{GpuTextureView, Texture};
