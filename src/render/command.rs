//! Commands executed by the render thread

use std::fmt;

use super::bindless::BindlessTable;
use super::renderer::Renderer;

/// State owned by the render thread.
///
/// There is no handle to this from any other thread; mutation requests
/// travel through the command queue as [`RenderCommand::Execute`] jobs and
/// run between the commands queued around them.
pub struct RenderResources {
    pub renderer: Box<dyn Renderer>,
    pub bindless: BindlessTable,
}

impl RenderResources {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        Self {
            renderer,
            bindless: BindlessTable::new(),
        }
    }
}

/// One-shot closure run on the render thread
pub type RenderJob = Box<dyn FnOnce(&mut RenderResources) + Send>;

/// Unit of work for the render thread, executed strictly in queue order
pub enum RenderCommand {
    /// Render one frame
    Draw,
    /// Resize swapchain-dependent state
    Resize { width: u32, height: u32 },
    /// Wait for the device, then park until the control thread releases
    SyncPoint,
    /// Mutate render-owned resources
    Execute(RenderJob),
    /// Shut the renderer down and end the thread
    Shutdown,
}

impl RenderCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draw => "Draw",
            Self::Resize { .. } => "Resize",
            Self::SyncPoint => "SyncPoint",
            Self::Execute(_) => "Execute",
            Self::Shutdown => "Shutdown",
        }
    }
}

impl fmt::Debug for RenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resize { width, height } => f
                .debug_struct("Resize")
                .field("width", width)
                .field("height", height)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}
