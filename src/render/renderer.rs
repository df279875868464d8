//! Renderer collaborator interface

use crate::core::error::Error;

/// Frame producer driven by the render thread.
///
/// Every method is called from the render thread only. Implementations
/// own their device, swapchain and pipelines; the runtime decides *when*
/// they run, never *how* a frame is drawn.
pub trait Renderer: Send {
    /// Record and submit one frame
    fn render_frame(&mut self) -> Result<(), Error>;

    /// Rebuild size-dependent state
    fn on_resize(&mut self, width: u32, height: u32) -> Result<(), Error>;

    /// Block until the device has finished all submitted work.
    ///
    /// Called on entry to every sync point.
    fn wait_idle(&mut self) {}

    /// Release GPU resources. The render thread exits afterwards.
    fn shutdown(&mut self);
}

/// Renderer that draws nothing, for headless runs
#[derive(Debug, Default)]
pub struct NullRenderer {
    frames: u64,
    size: (u32, u32),
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames "rendered" so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Last size passed to `on_resize`
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Renderer for NullRenderer {
    fn render_frame(&mut self) -> Result<(), Error> {
        self.frames += 1;
        log::trace!("NullRenderer: frame {}", self.frames);
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        self.size = (width, height);
        log::debug!("NullRenderer: resized to {}x{}", width, height);
        Ok(())
    }

    fn shutdown(&mut self) {
        log::info!("NullRenderer: shut down after {} frames", self.frames);
    }
}
