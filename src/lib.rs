//! Trellis - threaded engine runtime
//!
//! Window, render and physics subsystems each run on a dedicated thread.
//! The control thread feeds them through bounded queues and, once per
//! tick, meets the render thread at a sync point where streamed scene
//! data is published to the draw-indirect list.

pub mod core;
pub mod sync;
pub mod render;
pub mod window;
pub mod physics;
pub mod scene;
pub mod streaming;
pub mod engine;

pub use engine::Engine;
