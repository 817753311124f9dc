//! Texture asset: CPU pixel bytes plus a lazily-uploaded GPU side.
//!
//! Before [`Texture::upload`] runs, a texture is "CPU-only" and
//! [`Texture::gpu`] returns `None` — pipelines must not bind it into a draw
//! command yet. Once uploaded, the `wgpu` handles are released the moment
//! this `Texture` (and every strong handle to it) is dropped: `wgpu::Texture`
//! /`TextureView`/`Sampler` already queue their own GPU-side teardown on
//! `Drop`, so nothing here destroys them manually.

use crate::assets::server::AssetLoadError;

/// The uploaded GPU-side resource set for a [`Texture`].
pub struct GpuTextureView {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// A ref-counted image asset. See [`crate::assets::handle::StrongHandle`]
/// for the handle type wrapping this.
pub struct Texture {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    pixels: Vec<u8>,
    gpu: Option<GpuTextureView>,
}

impl Texture {
    /// Constructs a CPU-only texture from raw pixel bytes (`width * height *
    /// bytes-per-pixel` long, tightly packed, no mip chain).
    #[must_use]
    pub fn from_bytes(width: u32, height: u32, format: wgpu::TextureFormat, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            pixels,
            gpu: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    #[inline]
    #[must_use]
    pub fn gpu(&self) -> Option<&GpuTextureView> {
        self.gpu.as_ref()
    }

    /// Creates the backing `wgpu::Texture`/view/sampler and uploads pixel
    /// data. Idempotent: calling this again re-uploads the same bytes into
    /// a freshly created GPU texture.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let size = wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("vela::texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bytes_per_pixel = self.format.block_copy_size(None).unwrap_or(4);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &self.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * bytes_per_pixel),
                rows_per_image: Some(self.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        self.gpu = Some(GpuTextureView {
            texture,
            view,
            sampler,
        });
    }

    /// Decodes the engine's minimal built-in uncompressed format: an 8-byte
    /// little-endian `(width, height)` header followed by tightly packed
    /// RGBA8 pixel data (see DESIGN.md for why this rather than a codec
    /// dependency). Used by both [`crate::ffi::vela_load_asset`] and
    /// [`crate::engine::Engine::load_texture`].
    pub fn decode_native(bytes: &[u8]) -> Result<Self, AssetLoadError> {
        if bytes.len() < 8 {
            return Err(AssetLoadError::InvalidAssetFormat(
                "texture data shorter than the 8-byte width/height header".to_string(),
            ));
        }
        let width = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let height = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let pixels = &bytes[8..];
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(AssetLoadError::InvalidAssetFormat(format!(
                "expected {expected} bytes of RGBA8 pixel data for {width}x{height}, got {}",
                pixels.len()
            )));
        }
        Ok(Self::from_bytes(width, height, wgpu::TextureFormat::Rgba8Unorm, pixels.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_texture_is_cpu_only() {
        let tex = Texture::from_bytes(2, 2, wgpu::TextureFormat::Rgba8Unorm, vec![0u8; 16]);
        assert!(!tex.is_uploaded());
        assert!(tex.gpu().is_none());
    }
}
