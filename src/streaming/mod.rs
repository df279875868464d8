//! Asynchronous trunk streaming and draw-list republication
//!
//! Load/unload requests are processed by a background worker that only
//! flips trunk state in the scene table. The control thread later calls
//! `flush`, which is the single point where the indirect draw list is
//! rebuilt and completion callbacks fire.

pub mod draw_commands;
pub mod manager;

pub use draw_commands::{CpuDrawCommands, DrawCommandGenerator, DrawIndexedIndirectCommand};
pub use manager::{CompletionCallback, StreamingManager, StreamingTask, TaskKind};
