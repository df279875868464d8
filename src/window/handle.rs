//! Shared per-window state

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::backend::{WindowEvent, WindowId};

#[derive(Debug)]
struct WindowState {
    id: WindowId,
    close_requested: AtomicBool,
    /// Width in the high half, height in the low half, so readers never
    /// see a torn size
    size: AtomicU64,
}

fn pack(width: u32, height: u32) -> u64 {
    (u64::from(width) << 32) | u64::from(height)
}

/// Cheap, cloneable view of one window.
///
/// The window thread writes through [`WindowHandle::dispatch`]; any other
/// thread may read.
#[derive(Clone, Debug)]
pub struct WindowHandle {
    state: Arc<WindowState>,
}

impl WindowHandle {
    pub(crate) fn new(id: WindowId, width: u32, height: u32) -> Self {
        Self {
            state: Arc::new(WindowState {
                id,
                close_requested: AtomicBool::new(false),
                size: AtomicU64::new(pack(width, height)),
            }),
        }
    }

    pub fn id(&self) -> WindowId {
        self.state.id
    }

    /// Apply an event if it is addressed to this window
    pub fn dispatch(&self, event: &WindowEvent) {
        if event.window() != self.state.id {
            return;
        }
        match *event {
            WindowEvent::CloseRequested { .. } => {
                log::info!("Window {:?} close requested", self.state.id);
                self.request_close();
            }
            WindowEvent::Resized { width, height, .. } => {
                self.state.size.store(pack(width, height), Ordering::Release);
            }
        }
    }

    /// Whether the user (or anyone holding the handle) asked to close
    pub fn should_close(&self) -> bool {
        self.state.close_requested.load(Ordering::Acquire)
    }

    pub fn request_close(&self) {
        self.state.close_requested.store(true, Ordering::Release);
    }

    /// Last known inner size in physical pixels
    pub fn size(&self) -> (u32, u32) {
        let packed = self.state.size.load(Ordering::Acquire);
        ((packed >> 32) as u32, packed as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_filters_by_window() {
        let handle = WindowHandle::new(WindowId(1), 640, 360);
        handle.dispatch(&WindowEvent::CloseRequested { window: WindowId(2) });
        handle.dispatch(&WindowEvent::Resized { window: WindowId(2), width: 1, height: 1 });
        assert!(!handle.should_close());
        assert_eq!(handle.size(), (640, 360));

        handle.dispatch(&WindowEvent::Resized { window: WindowId(1), width: 1920, height: 1080 });
        assert_eq!(handle.size(), (1920, 1080));
        handle.dispatch(&WindowEvent::CloseRequested { window: WindowId(1) });
        assert!(handle.should_close());
    }

    #[test]
    fn test_clones_share_state() {
        let handle = WindowHandle::new(WindowId(7), u32::MAX, 1);
        let view = handle.clone();
        assert_eq!(view.size(), (u32::MAX, 1));
        handle.request_close();
        assert!(view.should_close());
        assert_eq!(view.id(), WindowId(7));
    }
}
