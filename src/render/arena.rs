//! Transient per-frame GPU buffer arena.
//!
//! One large host-visible `wgpu::Buffer` bump-allocated per frame and reset
//! once between frames. `wgpu` does not expose a safe, persistently-mapped
//! pointer usable as a bound vertex/index/uniform buffer across frames
//! without an unmap/remap cycle, so `TransientAllocation`'s logical
//! "mapped pointer" is realized as an immediate `queue.write_buffer` call
//! at the bumped offset rather than literal pointer exposure.

use crate::errors::VelaError;

const ALIGNMENT: u64 = 16;

/// A bump-allocated region of the transient arena's backing buffer.
#[derive(Debug, Clone, Copy)]
pub struct TransientAllocation {
    pub buffer_offset: u64,
    pub size: u64,
}

/// Per-frame bump allocator over one `wgpu::Buffer`. `allocate` uploads
/// immediately via `queue.write_buffer`; `reset` is only legal once the
/// presenter has confirmed no in-flight command buffer still references the
/// arena (enforced by waiting on the frame fence before recording).
pub struct TransientBufferArena {
    buffer: wgpu::Buffer,
    capacity: u64,
    cursor: u64,
}

impl TransientBufferArena {
    #[must_use]
    pub fn new(device: &wgpu::Device, capacity_bytes: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vela::transient_arena"),
            size: capacity_bytes,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            capacity: capacity_bytes,
            cursor: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    #[inline]
    #[must_use]
    pub fn bytes_used(&self) -> u64 {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub fn bytes_available(&self) -> u64 {
        self.capacity - self.cursor
    }

    /// Sub-allocates `size` bytes aligned to 16 bytes, uploads `data`
    /// through `queue.write_buffer` at the resulting offset, and returns
    /// the allocation. No freelist, no reuse within a frame.
    pub fn allocate(
        &mut self,
        queue: &wgpu::Queue,
        data: &[u8],
    ) -> Result<TransientAllocation, VelaError> {
        let size = data.len() as u64;
        let aligned_offset = align_up(self.cursor, ALIGNMENT);
        if aligned_offset + size > self.capacity {
            return Err(VelaError::TransientArenaExhausted {
                requested: size,
                available: self.bytes_available(),
            });
        }

        queue.write_buffer(&self.buffer, aligned_offset, data);
        self.cursor = aligned_offset + size;

        Ok(TransientAllocation {
            buffer_offset: aligned_offset,
            size,
        })
    }

    /// Resets the bump pointer to zero. Callers may not hold allocations
    /// across this call.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::align_up;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
    }
}
