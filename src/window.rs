//! The `Window` trait the presenter surface is built against.
//!
//! The window/input backend itself is out of scope; the core only consumes
//! a `Window` trait exposing size, native handle, and size-change events.
//! Everything else (input handling, event pumping) is the host
//! application's responsibility.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// A platform window able to host a `wgpu::Surface`.
///
/// Implementors must outlive any `wgpu::Surface` created from them, the
/// same contract `HasWindowHandle`/`HasDisplayHandle` already impose.
pub trait Window: HasWindowHandle + HasDisplayHandle {
    /// Current client-area size, in physical pixels. `(0, 0)` while
    /// minimized; the presenter treats this as a no-op frame.
    fn size(&self) -> (u32, u32);

    /// Registers a callback invoked whenever the window is resized.
    /// Implementations call it synchronously from their own event pump;
    /// there is no suspension point here.
    fn on_resize(&mut self, callback: Box<dyn FnMut(u32, u32) + Send>);
}

#[cfg(feature = "winit")]
pub use winit_backend::WinitWindow;

#[cfg(feature = "winit")]
mod winit_backend {
    use super::Window;
    use raw_window_handle::{
        DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
    };
    use winit::window::Window as WinitWindowHandle;

    /// Adapts a `winit::window::Window` to this crate's `Window` trait.
    /// Resize notification is driven by the owner forwarding
    /// `WindowEvent::Resized` into [`WinitWindow::notify_resize`]; winit has
    /// no resize-callback registration of its own.
    pub struct WinitWindow {
        inner: WinitWindowHandle,
        size: (u32, u32),
        on_resize: Option<Box<dyn FnMut(u32, u32) + Send>>,
    }

    impl WinitWindow {
        #[must_use]
        pub fn new(inner: WinitWindowHandle) -> Self {
            let physical = inner.inner_size();
            Self {
                inner,
                size: (physical.width, physical.height),
                on_resize: None,
            }
        }

        /// Forwards a `WindowEvent::Resized(size)` into this adapter,
        /// updating cached size and invoking the registered callback.
        pub fn notify_resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
            if let Some(callback) = self.on_resize.as_mut() {
                callback(width, height);
            }
        }
    }

    impl Window for WinitWindow {
        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn on_resize(&mut self, callback: Box<dyn FnMut(u32, u32) + Send>) {
            self.on_resize = Some(callback);
        }
    }

    impl HasWindowHandle for WinitWindow {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            self.inner.window_handle()
        }
    }

    impl HasDisplayHandle for WinitWindow {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            self.inner.display_handle()
        }
    }
}
