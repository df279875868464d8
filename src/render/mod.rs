//! Render thread and the resources it owns
//!
//! The render worker is the only thread that touches GPU-facing state.
//! Everything else reaches that state by queueing commands.

pub mod renderer;
pub mod command;
pub mod bindless;
pub mod worker;
pub mod indirect;
pub mod context;

pub use renderer::{NullRenderer, Renderer};
pub use command::{RenderCommand, RenderJob, RenderResources};
pub use bindless::{BindlessIndex, BindlessTable, MAX_BINDLESS_SAMPLERS, MAX_BINDLESS_TEXTURES};
pub use worker::{RenderStats, RenderWorker};
pub use indirect::IndirectDrawBuffer;
pub use context::{GpuContext, GpuRenderer};
