//! Window thread: native windows and the platform event pump
//!
//! Platform windowing APIs generally want one thread to own the event loop
//! and every window created from it. [`WindowWorker`] is that thread; the
//! rest of the engine talks to it through commands and reads per-window
//! state from [`WindowHandle`]s.

pub mod backend;
pub mod handle;
pub mod worker;
pub mod headless;
pub mod winit_backend;

pub use backend::{WindowBackend, WindowEvent, WindowId};
pub use handle::WindowHandle;
pub use worker::{WindowCommand, WindowWorker};
pub use headless::{HeadlessBackend, HeadlessEvents};
pub use winit_backend::WinitBackend;
