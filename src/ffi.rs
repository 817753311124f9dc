//! Stable C ABI surface exposed to host applications embedding the engine.
//!
//! A process-wide runtime exposed through `extern "C"` functions that take
//! no explicit context argument and return `#[repr(C)]` generational handle
//! structs *by value* rather than pointers: `VelaXHandle { index,
//! generation }` for anything owned by the one global [`Engine`], and a raw
//! pointer-sized integer for asset handles, which are ref-counted
//! independently of any scene.
//!
//! Every scene-owned handle (`VelaNodeHandle`) is meaningless without the
//! `VelaSceneHandle` it was created in, so operations on nodes take both: a
//! generational handle cannot implicitly carry its owning scene the way a
//! real pointer into that scene's storage would, so it is threaded through
//! explicitly here (see DESIGN.md).
//!
//! # Safety
//!
//! Every `extern "C"` function in this module is safe to call with any
//! handle value: operations on a stale or never-issued handle are no-ops
//! (destroy) or return a null/zeroed result (accessors), mirroring
//! `SceneManager`/`Scene`'s own stale-handle behavior. The only true
//! `unsafe` surface is `load_asset`'s `path` pointer, which must be a
//! valid, NUL-terminated C string for the duration of the call.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::OnceLock;

use glam::{Affine2, Vec2, Vec4};
use parking_lot::Mutex;
use slotmap::KeyData;

use crate::assets::{AssetLoadError, AssetServer, StrongHandle, Texture};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::nodes::{geometry_node_type_tag, sprite_node_type_tag, GeometryNode, SpriteNode};
use crate::scene::{CameraLayout, NodeHandle, SceneHandle, ScreenLayout, ViewportHandle};

fn runtime() -> &'static Mutex<Engine> {
    static RUNTIME: OnceLock<Mutex<Engine>> = OnceLock::new();
    RUNTIME.get_or_init(|| Mutex::new(Engine::new(EngineConfig::headless())))
}

fn assets() -> &'static Mutex<AssetServer> {
    static ASSETS: OnceLock<Mutex<AssetServer>> = OnceLock::new();
    ASSETS.get_or_init(|| Mutex::new(AssetServer::new()))
}

const NULL_INDEX: u32 = u32::MAX;

/// Generational handle to a [`crate::scene::Scene`] owned by the process-wide
/// engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelaSceneHandle {
    pub index: u32,
    pub generation: u32,
}

/// Generational handle to a [`crate::scene::Viewport`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelaViewportHandle {
    pub index: u32,
    pub generation: u32,
}

/// Generational handle to a node within one [`VelaSceneHandle`]'s scene.
/// `index == NULL_INDEX` denotes "no node" (a null parent, or a lookup
/// failure), mirroring [`crate::utils::Identifier::NONE`]'s sentinel shape.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelaNodeHandle {
    pub index: u32,
    pub generation: u32,
}

impl VelaNodeHandle {
    const NULL: Self = Self { index: NULL_INDEX, generation: 0 };

    fn is_null(self) -> bool {
        self.index == NULL_INDEX
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VelaVec2 {
    pub x: f32,
    pub y: f32,
}

/// `position`/`rotation`/`scale` decomposition of a node's local transform.
/// Converted to/from [`Affine2`] at the ABI boundary; the core itself only
/// ever stores the composed matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VelaTransform2 {
    pub position: VelaVec2,
    pub rotation: f32,
    pub scale: VelaVec2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VelaScreenLayout {
    pub position: VelaVec2,
    pub size: VelaVec2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VelaCameraLayout {
    pub position: VelaVec2,
    pub pivot: VelaVec2,
    pub rotation: f32,
    pub zoom: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VelaColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Errors [`vela_load_asset`] can report through its `out_error` parameter.
/// Mirrors [`crate::assets::AssetLoadError`]'s variant set exactly.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelaAssetLoadError {
    None = 0,
    BadAssetPath = 1,
    InvalidAssetFormat = 2,
    AmbiguousAssetPath = 3,
    AssetNotFound = 4,
    AssetTypeMismatch = 5,
}

impl From<&AssetLoadError> for VelaAssetLoadError {
    fn from(err: &AssetLoadError) -> Self {
        match err {
            AssetLoadError::BadAssetPath(_) => Self::BadAssetPath,
            AssetLoadError::InvalidAssetFormat(_) => Self::InvalidAssetFormat,
            AssetLoadError::AmbiguousAssetPath => Self::AmbiguousAssetPath,
            AssetLoadError::AssetNotFound => Self::AssetNotFound,
            AssetLoadError::AssetTypeMismatch => Self::AssetTypeMismatch,
            AssetLoadError::Stream(_) => Self::InvalidAssetFormat,
        }
    }
}

fn scene_key_to_ffi(handle: SceneHandle) -> VelaSceneHandle {
    let packed = slotmap::Key::data(&handle).as_ffi();
    VelaSceneHandle { index: packed as u32, generation: (packed >> 32) as u32 }
}

fn scene_key_from_ffi(handle: VelaSceneHandle) -> SceneHandle {
    let packed = u64::from(handle.index) | (u64::from(handle.generation) << 32);
    KeyData::from_ffi(packed).into()
}

fn viewport_key_to_ffi(handle: ViewportHandle) -> VelaViewportHandle {
    let packed = slotmap::Key::data(&handle).as_ffi();
    VelaViewportHandle { index: packed as u32, generation: (packed >> 32) as u32 }
}

fn viewport_key_from_ffi(handle: VelaViewportHandle) -> ViewportHandle {
    let packed = u64::from(handle.index) | (u64::from(handle.generation) << 32);
    KeyData::from_ffi(packed).into()
}

fn node_key_to_ffi(handle: NodeHandle) -> VelaNodeHandle {
    let packed = slotmap::Key::data(&handle).as_ffi();
    VelaNodeHandle { index: packed as u32, generation: (packed >> 32) as u32 }
}

fn node_key_from_ffi(handle: VelaNodeHandle) -> NodeHandle {
    let packed = u64::from(handle.index) | (u64::from(handle.generation) << 32);
    KeyData::from_ffi(packed).into()
}

/// Creates an empty scene owned by the engine.
#[no_mangle]
pub extern "C" fn vela_scene_create() -> VelaSceneHandle {
    let mut engine = runtime().lock();
    scene_key_to_ffi(engine.scenes_mut().create_scene())
}

/// Destroys a scene and every node within it. A stale handle is a no-op.
#[no_mangle]
pub extern "C" fn vela_scene_destroy(scene: VelaSceneHandle) {
    runtime().lock().scenes_mut().destroy_scene(scene_key_from_ffi(scene));
}

/// Creates a viewport bound to no scene, with a zero-size screen layout.
#[no_mangle]
pub extern "C" fn vela_viewport_create() -> VelaViewportHandle {
    let mut engine = runtime().lock();
    viewport_key_to_ffi(engine.scenes_mut().create_viewport())
}

#[no_mangle]
pub extern "C" fn vela_viewport_destroy(viewport: VelaViewportHandle) {
    runtime().lock().scenes_mut().destroy_viewport(viewport_key_from_ffi(viewport));
}

/// Binds `viewport` to render `scene`. Passing a stale/destroyed scene
/// handle is equivalent to clearing the binding: the viewport is skipped
/// at render time rather than treated as an error.
#[no_mangle]
pub extern "C" fn vela_viewport_set_scene(viewport: VelaViewportHandle, scene: VelaSceneHandle) {
    let mut engine = runtime().lock();
    let scene_handle = scene_key_from_ffi(scene);
    let live = engine.scenes().scene_is_live(scene_handle);
    if let Some(vp) = engine.scenes_mut().viewport_mut(viewport_key_from_ffi(viewport)) {
        vp.set_scene(live.then_some(scene_handle));
    }
}

#[no_mangle]
pub extern "C" fn vela_viewport_set_screen_layout(viewport: VelaViewportHandle, layout: VelaScreenLayout) {
    let mut engine = runtime().lock();
    if let Some(vp) = engine.scenes_mut().viewport_mut(viewport_key_from_ffi(viewport)) {
        vp.set_screen_layout(ScreenLayout::new(
            Vec2::new(layout.position.x, layout.position.y),
            Vec2::new(layout.size.x, layout.size.y),
        ));
    }
}

#[no_mangle]
pub extern "C" fn vela_viewport_set_camera_layout(viewport: VelaViewportHandle, layout: VelaCameraLayout) {
    let mut engine = runtime().lock();
    if let Some(vp) = engine.scenes_mut().viewport_mut(viewport_key_from_ffi(viewport)) {
        vp.set_camera_layout(CameraLayout {
            position: Vec2::new(layout.position.x, layout.position.y),
            pivot: Vec2::new(layout.pivot.x, layout.pivot.y),
            rotation: layout.rotation,
            zoom: layout.zoom,
        });
    }
}

/// Destroys `node` and its subtree within `scene`. A stale scene or node
/// handle, or destroying the scene's implicit root, is a no-op.
#[no_mangle]
pub extern "C" fn vela_node_destroy(scene: VelaSceneHandle, node: VelaNodeHandle) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        let _ = scene_ref.destroy_node(node_key_from_ffi(node));
    }
}

/// Overwrites `node`'s local transform, decomposed as position/rotation/scale.
#[no_mangle]
pub extern "C" fn vela_node_set_transform(scene: VelaSceneHandle, node: VelaNodeHandle, transform: VelaTransform2) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        let local = Affine2::from_scale_angle_translation(
            Vec2::new(transform.scale.x, transform.scale.y),
            transform.rotation,
            Vec2::new(transform.position.x, transform.position.y),
        );
        let _ = scene_ref.set_local_transform(node_key_from_ffi(node), local);
    }
}

fn resolve_parent(node: VelaNodeHandle) -> Option<NodeHandle> {
    if node.is_null() {
        None
    } else {
        Some(node_key_from_ffi(node))
    }
}

/// Creates a solid-color geometry node under `parent` (the scene root if
/// `parent.index == NULL_INDEX`). Returns [`VelaNodeHandle::NULL`] if
/// `scene` is stale.
#[no_mangle]
pub extern "C" fn vela_geometry_create(scene: VelaSceneHandle, parent: VelaNodeHandle) -> VelaNodeHandle {
    let mut engine = runtime().lock();
    let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) else {
        return VelaNodeHandle::NULL;
    };
    let handle = scene_ref.create_node(
        resolve_parent(parent),
        geometry_node_type_tag(),
        GeometryNode::rectangle([1.0, 1.0, 1.0, 1.0], Vec2::ZERO),
    );
    node_key_to_ffi(handle)
}

#[no_mangle]
pub extern "C" fn vela_geometry_set_color(scene: VelaSceneHandle, node: VelaNodeHandle, color: VelaColor) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        if let Some(component) = scene_ref.component_mut::<GeometryNode>(node_key_from_ffi(node)) {
            component.color = [color.r, color.g, color.b, color.a];
        }
    }
}

#[no_mangle]
pub extern "C" fn vela_geometry_set_pivot(scene: VelaSceneHandle, node: VelaNodeHandle, pivot: VelaVec2) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        if let Some(component) = scene_ref.component_mut::<GeometryNode>(node_key_from_ffi(node)) {
            component.pivot = Vec2::new(pivot.x, pivot.y);
        }
    }
}

#[no_mangle]
pub extern "C" fn vela_geometry_set_size(scene: VelaSceneHandle, node: VelaNodeHandle, size: VelaVec2) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        if let Some(component) = scene_ref.component_mut::<GeometryNode>(node_key_from_ffi(node)) {
            component.size = Vec2::new(size.x, size.y);
        }
    }
}

/// Creates a sprite node bound to `texture` under `parent`. Returns
/// [`VelaNodeHandle::NULL`] if `scene` is stale or `texture` does not
/// resolve to a live asset.
#[no_mangle]
pub extern "C" fn vela_sprite_create(
    scene: VelaSceneHandle,
    parent: VelaNodeHandle,
    texture: VelaAssetHandle,
) -> VelaNodeHandle {
    let Some(texture_handle) = asset_handle_from_ffi(texture) else {
        return VelaNodeHandle::NULL;
    };
    let mut engine = runtime().lock();
    let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) else {
        return VelaNodeHandle::NULL;
    };
    let handle = scene_ref.create_node(
        resolve_parent(parent),
        sprite_node_type_tag(),
        SpriteNode::new(texture_handle, Vec2::ZERO),
    );
    node_key_to_ffi(handle)
}

#[no_mangle]
pub extern "C" fn vela_sprite_set_texture(scene: VelaSceneHandle, node: VelaNodeHandle, texture: VelaAssetHandle) {
    let Some(texture_handle) = asset_handle_from_ffi(texture) else { return };
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        if let Some(component) = scene_ref.component_mut::<SpriteNode>(node_key_from_ffi(node)) {
            component.texture = texture_handle;
        }
    }
}

#[no_mangle]
pub extern "C" fn vela_sprite_set_tint(scene: VelaSceneHandle, node: VelaNodeHandle, tint: VelaColor) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        if let Some(component) = scene_ref.component_mut::<SpriteNode>(node_key_from_ffi(node)) {
            component.tint = [tint.r, tint.g, tint.b, tint.a];
        }
    }
}

#[no_mangle]
pub extern "C" fn vela_sprite_set_pivot(scene: VelaSceneHandle, node: VelaNodeHandle, pivot: VelaVec2) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        if let Some(component) = scene_ref.component_mut::<SpriteNode>(node_key_from_ffi(node)) {
            component.pivot = Vec2::new(pivot.x, pivot.y);
        }
    }
}

#[no_mangle]
pub extern "C" fn vela_sprite_set_size(scene: VelaSceneHandle, node: VelaNodeHandle, size: VelaVec2) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        if let Some(component) = scene_ref.component_mut::<SpriteNode>(node_key_from_ffi(node)) {
            component.size = Vec2::new(size.x, size.y);
        }
    }
}

#[no_mangle]
pub extern "C" fn vela_sprite_set_uv_rect(scene: VelaSceneHandle, node: VelaNodeHandle, uv_rect: [f32; 4]) {
    let mut engine = runtime().lock();
    if let Some(scene_ref) = engine.scenes_mut().scene_mut(scene_key_from_ffi(scene)) {
        if let Some(component) = scene_ref.component_mut::<SpriteNode>(node_key_from_ffi(node)) {
            component.uv_rect = Vec4::from_array(uv_rect);
        }
    }
}

/// Pointer-sized opaque handle to a loaded asset. `0` denotes "no asset":
/// a [`vela_load_asset`] failure leaves `out_error` set and returns a
/// handle callers must not pass to `release_asset`.
pub type VelaAssetHandle = usize;

fn asset_handle_from_ffi(handle: VelaAssetHandle) -> Option<StrongHandle<Texture>> {
    if handle == 0 {
        return None;
    }
    // SAFETY: non-zero `VelaAssetHandle` values are only ever produced by
    // `vela_load_asset` from `Box::into_raw`, and this function only
    // borrows through the raw pointer (never reconstructs the `Box`), so
    // the handle remains valid for `release_asset` to free later.
    let boxed: &StrongHandle<Texture> = unsafe { &*(handle as *const StrongHandle<Texture>) };
    Some(boxed.clone())
}

/// Loads the asset at `path` as a [`Texture`] (the only built-in asset
/// type), decoding the engine's native uncompressed format: an 8-byte
/// little-endian `(width: u32, height: u32)` header followed by tightly
/// packed RGBA8 pixel data. `out_error` receives [`VelaAssetLoadError::None`]
/// on success.
///
/// # Safety
///
/// `path` must point to a valid, NUL-terminated C string, and `out_error`,
/// if non-null, must point to a writable `VelaAssetLoadError`.
#[no_mangle]
pub unsafe extern "C" fn vela_load_asset(path: *const c_char, out_error: *mut VelaAssetLoadError) -> VelaAssetHandle {
    let set_error = |code: VelaAssetLoadError| {
        if !out_error.is_null() {
            unsafe { *out_error = code };
        }
    };

    if path.is_null() {
        set_error(VelaAssetLoadError::BadAssetPath);
        return 0;
    }
    let path_str = match unsafe { CStr::from_ptr(path) }.to_str() {
        Ok(s) => s,
        Err(_) => {
            set_error(VelaAssetLoadError::BadAssetPath);
            return 0;
        }
    };

    // Clone the process-wide engine's GPU handles (if attached) so a loaded
    // texture is uploaded immediately rather than staying CPU-only forever —
    // nothing else in this FFI surface ever calls `Texture::upload`.
    let gpu = runtime().lock().gpu_handles();
    let result = assets().lock().load::<Texture>(path_str, move |bytes| {
        let mut texture = Texture::decode_native(&bytes)?;
        if let Some((device, queue)) = &gpu {
            texture.upload(device, queue);
        }
        Ok(texture)
    });
    match result {
        Ok(handle) => {
            set_error(VelaAssetLoadError::None);
            Box::into_raw(Box::new(handle)) as VelaAssetHandle
        }
        Err(err) => {
            set_error(VelaAssetLoadError::from(&err));
            0
        }
    }
}

/// Releases a strong reference obtained from [`vela_load_asset`]. Passing
/// `0` is a no-op; passing the same non-zero handle twice is undefined
/// behavior (the second call frees memory the first already freed).
///
/// # Safety
///
/// `handle` must be `0` or a value previously returned by
/// [`vela_load_asset`] that has not already been passed to this function.
#[no_mangle]
pub unsafe extern "C" fn vela_release_asset(handle: VelaAssetHandle) {
    if handle == 0 {
        return;
    }
    // SAFETY: see function-level contract; reconstructing the `Box` here
    // and letting it drop releases the `StrongHandle`'s `Arc` reference.
    drop(unsafe { Box::from_raw(handle as *mut StrongHandle<Texture>) });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_and_viewport_lifecycle_round_trips_through_handles() {
        let scene = vela_scene_create();
        let viewport = vela_viewport_create();
        vela_viewport_set_scene(viewport, scene);
        vela_viewport_set_screen_layout(
            viewport,
            VelaScreenLayout { position: VelaVec2 { x: 0.0, y: 0.0 }, size: VelaVec2 { x: 800.0, y: 600.0 } },
        );

        let node = vela_geometry_create(scene, VelaNodeHandle::NULL);
        assert!(!node.is_null());
        vela_geometry_set_color(scene, node, VelaColor { r: 1.0, g: 0.0, b: 0.0, a: 1.0 });
        vela_geometry_set_size(scene, node, VelaVec2 { x: 32.0, y: 32.0 });

        vela_node_destroy(scene, node);
        vela_viewport_destroy(viewport);
        vela_scene_destroy(scene);
    }

    #[test]
    fn operations_on_a_destroyed_scene_are_harmless() {
        let scene = vela_scene_create();
        vela_scene_destroy(scene);
        // Already-destroyed scene: every setter below must no-op, not panic.
        let node = vela_geometry_create(scene, VelaNodeHandle::NULL);
        assert!(node.is_null());
        vela_node_destroy(scene, VelaNodeHandle::NULL);
    }

    #[test]
    fn load_asset_rejects_a_bad_path() {
        let c_path = std::ffi::CString::new("/nonexistent/vela-ffi-test.tex").unwrap();
        let mut error = VelaAssetLoadError::None;
        let handle = unsafe { vela_load_asset(c_path.as_ptr(), &mut error) };
        assert_eq!(handle, 0);
        assert_eq!(error, VelaAssetLoadError::AssetNotFound);
    }

    #[test]
    fn load_then_release_asset_round_trips() {
        let dir = std::env::temp_dir().join("vela_ffi_test_textures");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("swatch.tex");
        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 2 * 2 * 4]);
        std::fs::write(&path, &bytes).unwrap();

        let c_path = std::ffi::CString::new(path.to_str().unwrap()).unwrap();
        let mut error = VelaAssetLoadError::None;
        let handle = unsafe { vela_load_asset(c_path.as_ptr(), &mut error) };
        assert_ne!(handle, 0);
        assert_eq!(error, VelaAssetLoadError::None);

        unsafe { vela_release_asset(handle) };
    }
}
