//! Platform windowing seam

use crate::core::error::Error;

/// Engine-side window identifier, unique per backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Events the engine tracks per window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    CloseRequested { window: WindowId },
    Resized { window: WindowId, width: u32, height: u32 },
}

impl WindowEvent {
    /// Window the event is addressed to
    pub fn window(&self) -> WindowId {
        match *self {
            WindowEvent::CloseRequested { window } => window,
            WindowEvent::Resized { window, .. } => window,
        }
    }
}

/// Native windowing backend.
///
/// Constructed on the window thread and only ever called from there, so
/// implementations do not need to be `Send`.
pub trait WindowBackend {
    /// Open a native window
    fn create(&mut self, title: &str, width: u32, height: u32) -> Result<WindowId, Error>;

    /// Close a native window. Unknown ids are ignored.
    fn destroy(&mut self, window: WindowId);

    /// Pump the platform queue and return everything that arrived since
    /// the previous call
    fn poll_events(&mut self) -> Vec<WindowEvent>;
}
