//! GPU indirect-draw buffer fed by the streaming flush

use crate::core::error::Error;
use crate::streaming::{DrawCommandGenerator, DrawIndexedIndirectCommand};

/// Fixed-size `INDIRECT` buffer holding the current draw list.
///
/// Written with `Queue::write_buffer`, so the upload is ordered before any
/// later submission on the same queue. The renderer binds [`Self::buffer`]
/// and issues `multi_draw_indexed_indirect` with [`Self::command_count`].
pub struct IndirectDrawBuffer {
    queue: wgpu::Queue,
    buffer: wgpu::Buffer,
    max_commands: u32,
    count: u32,
}

impl IndirectDrawBuffer {
    /// Allocate room for `max_commands` indexed-indirect records
    pub fn new(device: &wgpu::Device, queue: wgpu::Queue, max_commands: u32) -> Result<Self, Error> {
        if max_commands == 0 {
            return Err(Error::Gpu("indirect buffer needs room for at least one command".into()));
        }

        let size = max_commands as u64 * std::mem::size_of::<DrawIndexedIndirectCommand>() as u64;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("indirect_draw_commands"),
            size,
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::debug!("Indirect draw buffer: {} commands, {} bytes", max_commands, size);

        Ok(Self {
            queue,
            buffer,
            max_commands,
            count: 0,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn max_commands(&self) -> u32 {
        self.max_commands
    }
}

impl DrawCommandGenerator for IndirectDrawBuffer {
    fn update_commands(&mut self, commands: &[DrawIndexedIndirectCommand]) -> Result<(), Error> {
        if commands.len() > self.max_commands as usize {
            return Err(Error::Gpu(format!(
                "{} draw commands exceed indirect buffer capacity {}",
                commands.len(),
                self.max_commands
            )));
        }

        self.count = commands.len() as u32;
        if !commands.is_empty() {
            self.queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(commands));
        }
        Ok(())
    }

    fn command_count(&self) -> u32 {
        self.count
    }
}
