//! GPU device setup and a minimal wgpu-backed renderer
//!
//! The runtime does not encode draw calls. [`GpuRenderer`] only gives the
//! render thread a real submission timeline: each frame submits an empty
//! command buffer, and sync points block on the device.

use crate::core::error::Error;
use super::renderer::Renderer;

/// Device and queue without a presentation surface
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Request an adapter and device
    pub async fn new() -> Result<Self, Error> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;

        let device_desc = wgpu::DeviceDescriptor {
            label: Some("trellis_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: Default::default(),
            trace: Default::default(),
        };

        let (device, queue) = adapter
            .request_device(&device_desc)
            .await
            .map_err(|e| Error::Gpu(e.to_string()))?;

        log::info!("GPU adapter: {}", adapter.get_info().name);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// [`GpuContext::new`] on the calling thread
    pub fn new_blocking() -> Result<Self, Error> {
        pollster::block_on(Self::new())
    }
}

/// Renderer that drives a wgpu queue without drawing anything
pub struct GpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: (u32, u32),
}

impl GpuRenderer {
    pub fn new(context: &GpuContext, width: u32, height: u32) -> Self {
        Self {
            device: context.device.clone(),
            queue: context.queue.clone(),
            size: (width, height),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Renderer for GpuRenderer {
    fn render_frame(&mut self) -> Result<(), Error> {
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Err(Error::Gpu(format!("invalid surface size {}x{}", width, height)));
        }
        self.size = (width, height);
        Ok(())
    }

    fn wait_idle(&mut self) {
        if let Err(e) = self.device.poll(wgpu::PollType::Wait { submission_index: None, timeout: None }) {
            log::warn!("Device wait failed: {:?}", e);
        }
    }

    fn shutdown(&mut self) {
        self.wait_idle();
        log::info!("GPU renderer shut down");
    }
}
