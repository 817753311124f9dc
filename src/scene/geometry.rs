//! Immutable, shareable vertex/index data.

use std::sync::{Arc, OnceLock};

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// One vertex: position and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec2,
    pub uv: Vec2,
}

/// An immutable, reference-counted bundle of vertices and indices. Shared
/// by every node instance that draws the same shape; freed when the last
/// `Arc` is dropped.
#[derive(Debug, Clone)]
pub struct Geometry {
    inner: Arc<GeometryData>,
}

#[derive(Debug)]
struct GeometryData {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Geometry {
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            inner: Arc::new(GeometryData { vertices, indices }),
        }
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.inner.vertices
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.inner.indices
    }

    /// Stable identity for this geometry's backing allocation, used as the
    /// batch key: pipelines batch draw calls by shared geometry identity.
    #[must_use]
    pub fn batch_key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// A unit quad centered on its pivot: four corners, two triangles,
    /// UV `(0,0)`..`(1,1)`. A process-lifetime shared value per spec §3 — every
    /// call returns a clone of the same `Arc`, so nodes built from this
    /// constructor batch together by `batch_key()`.
    #[must_use]
    pub fn rectangle() -> Self {
        static RECTANGLE: OnceLock<Geometry> = OnceLock::new();
        RECTANGLE
            .get_or_init(|| {
                let vertices = vec![
                    Vertex {
                        position: Vec2::new(-0.5, -0.5),
                        uv: Vec2::new(0.0, 1.0),
                    },
                    Vertex {
                        position: Vec2::new(0.5, -0.5),
                        uv: Vec2::new(1.0, 1.0),
                    },
                    Vertex {
                        position: Vec2::new(0.5, 0.5),
                        uv: Vec2::new(1.0, 0.0),
                    },
                    Vertex {
                        position: Vec2::new(-0.5, 0.5),
                        uv: Vec2::new(0.0, 0.0),
                    },
                ];
                let indices = vec![0, 1, 2, 0, 2, 3];
                Self::new(vertices, indices)
            })
            .clone()
    }

    /// A single unit triangle, apex up, base centered on the pivot. Also a
    /// process-lifetime shared value, see [`Geometry::rectangle`].
    #[must_use]
    pub fn triangle() -> Self {
        static TRIANGLE: OnceLock<Geometry> = OnceLock::new();
        TRIANGLE
            .get_or_init(|| {
                let vertices = vec![
                    Vertex {
                        position: Vec2::new(0.0, 0.5),
                        uv: Vec2::new(0.5, 0.0),
                    },
                    Vertex {
                        position: Vec2::new(-0.5, -0.5),
                        uv: Vec2::new(0.0, 1.0),
                    },
                    Vertex {
                        position: Vec2::new(0.5, -0.5),
                        uv: Vec2::new(1.0, 1.0),
                    },
                ];
                let indices = vec![0, 1, 2];
                Self::new(vertices, indices)
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_has_four_vertices_two_triangles() {
        let rect = Geometry::rectangle();
        assert_eq!(rect.vertices().len(), 4);
        assert_eq!(rect.indices().len(), 6);
    }

    #[test]
    fn clones_share_the_same_batch_key() {
        let rect = Geometry::rectangle();
        let clone = rect.clone();
        assert_eq!(rect.batch_key(), clone.batch_key());
    }

    #[test]
    fn repeated_built_in_calls_share_one_batch_key() {
        // `rectangle()`/`triangle()` are process-lifetime shared values
        // (spec §3), so every call returns the same backing allocation.
        let a = Geometry::rectangle();
        let b = Geometry::rectangle();
        assert_eq!(a.batch_key(), b.batch_key());
    }

    #[test]
    fn rectangle_and_triangle_have_distinct_batch_keys() {
        let rect = Geometry::rectangle();
        let tri = Geometry::triangle();
        assert_ne!(rect.batch_key(), tri.batch_key());
    }
}
