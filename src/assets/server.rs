//! Centralized, path-keyed asset loading and caching.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::assets::handle::{StrongHandle, WeakHandle};
use crate::io::{FileStream, Stream};

/// Errors `AssetServer::load` can return.
#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("asset path is malformed: {0}")]
    BadAssetPath(String),
    #[error("asset data is not valid for the requested type: {0}")]
    InvalidAssetFormat(String),
    #[error("path resolves to more than one candidate asset")]
    AmbiguousAssetPath,
    #[error("no asset exists at this path")]
    AssetNotFound,
    #[error("asset at this path was already loaded as a different type")]
    AssetTypeMismatch,
    #[error(transparent)]
    Stream(#[from] crate::io::StreamError),
}

struct CacheEntry {
    type_id: TypeId,
    weak: Box<dyn Any + Send + Sync>,
}

/// Loads assets from a [`Stream`], caching the result by resolved path so
/// repeated loads of the same path return a new strong reference without
/// re-reading or re-decoding.
pub struct AssetServer {
    cache: HashMap<PathBuf, CacheEntry>,
}

impl AssetServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Loads (or returns a cached strong handle to) the asset at `path`,
    /// decoded by `decode`. A cache hit for the *same type* `T` returns a
    /// new strong reference with no I/O. A cache hit for a *different*
    /// type than the one originally cached at this path is rejected with
    /// [`AssetLoadError::AssetTypeMismatch`] rather than silently
    /// re-decoding.
    pub fn load<T: Send + Sync + 'static>(
        &mut self,
        path: impl AsRef<Path>,
        decode: impl FnOnce(Vec<u8>) -> Result<T, AssetLoadError>,
    ) -> Result<StrongHandle<T>, AssetLoadError> {
        let resolved = resolve_path(path.as_ref())?;

        if let Some(entry) = self.cache.get(&resolved) {
            if entry.type_id != TypeId::of::<T>() {
                return Err(AssetLoadError::AssetTypeMismatch);
            }
            let weak = entry
                .weak
                .downcast_ref::<WeakHandle<T>>()
                .expect("cache entry carries a WeakHandle<T> for its recorded TypeId");
            if let Some(strong) = weak.upgrade() {
                return Ok(strong);
            }
        }

        let mut stream = FileStream::open(&resolved).map_err(|_| AssetLoadError::AssetNotFound)?;
        let bytes = stream.read_all()?;
        let asset = decode(bytes)?;
        let strong = StrongHandle::new(asset);

        self.cache.insert(
            resolved,
            CacheEntry {
                type_id: TypeId::of::<T>(),
                weak: Box::new(strong.downgrade()),
            },
        );
        Ok(strong)
    }

    /// Drops the cache entry for `path`, if any, without affecting strong
    /// handles already held by callers. The next `load` for this path
    /// performs I/O again even if live handles remain.
    pub fn evict(&mut self, path: impl AsRef<Path>) {
        if let Ok(resolved) = resolve_path(path.as_ref()) {
            self.cache.remove(&resolved);
        }
    }

    /// Number of paths currently tracked in the cache (including entries
    /// whose weak handle has already expired).
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl Default for AssetServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves `path` to a concrete file. If `path` has no extension, scans
/// its parent directory for files sharing its stem; zero matches is
/// `AssetNotFound`, more than one is `AmbiguousAssetPath`.
fn resolve_path(path: &Path) -> Result<PathBuf, AssetLoadError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AssetLoadError::BadAssetPath(path.display().to_string()))?;

    if path.extension().is_some() {
        return Ok(path.to_path_buf());
    }

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let dir = dir.unwrap_or_else(|| Path::new("."));

    let mut candidates = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let candidate = entry.path();
            if candidate.file_stem().and_then(|s| s.to_str()) == Some(stem) {
                candidates.push(candidate);
            }
        }
    }

    match candidates.len() {
        0 => Err(AssetLoadError::AssetNotFound),
        1 => Ok(candidates.remove(0)),
        _ => Err(AssetLoadError::AmbiguousAssetPath),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn decode_as_string(bytes: Vec<u8>) -> Result<String, AssetLoadError> {
        String::from_utf8(bytes).map_err(|e| AssetLoadError::InvalidAssetFormat(e.to_string()))
    }

    #[test]
    fn missing_path_is_asset_not_found() {
        let mut server = AssetServer::new();
        let err = server
            .load("/nonexistent/path/does-not-exist.txt", decode_as_string)
            .unwrap_err();
        assert!(matches!(err, AssetLoadError::AssetNotFound));
    }

    #[test]
    fn repeated_load_of_same_path_hits_cache() {
        let dir = std::env::temp_dir().join("vela_asset_server_test_cache");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("asset.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();

        let mut server = AssetServer::new();
        let first = server.load(&path, decode_as_string).unwrap();
        let second = server.load(&path, decode_as_string).unwrap();
        assert!(StrongHandle::ptr_eq(&first, &second));
    }

    #[test]
    fn loading_same_path_as_different_type_is_type_mismatch() {
        let dir = std::env::temp_dir().join("vela_asset_server_test_mismatch");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("asset.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();

        let mut server = AssetServer::new();
        let _: StrongHandle<String> = server.load(&path, decode_as_string).unwrap();
        let err = server
            .load(&path, |bytes: Vec<u8>| -> Result<Vec<u8>, AssetLoadError> { Ok(bytes) })
            .unwrap_err();
        assert!(matches!(err, AssetLoadError::AssetTypeMismatch));
    }
}
