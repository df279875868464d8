//! Indexed indirect draw records and their destination

use bytemuck::{Pod, Zeroable};

use crate::core::error::Error;
use crate::scene::MeshEntry;

/// One indexed draw as consumed by the GPU's indirect draw path.
///
/// Field order and widths match the `VkDrawIndexedIndirectCommand` /
/// `DrawIndexedIndirectArgs` layout (20 bytes, no padding).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl DrawIndexedIndirectCommand {
    /// Single-instance draw of one mesh slot
    pub fn from_mesh(entry: &MeshEntry) -> Self {
        Self {
            index_count: entry.index_count,
            instance_count: 1,
            first_index: entry.index_offset,
            vertex_offset: entry.vertex_offset as i32,
            first_instance: 0,
        }
    }
}

/// Destination of rebuilt draw lists.
///
/// Written only from `StreamingManager::flush` on the control thread.
pub trait DrawCommandGenerator {
    /// Replace the whole draw list
    fn update_commands(&mut self, commands: &[DrawIndexedIndirectCommand]) -> Result<(), Error>;

    /// Number of commands in the current list
    fn command_count(&self) -> u32;
}

/// Draw list kept in host memory, for headless runs and tests
#[derive(Debug, Default)]
pub struct CpuDrawCommands {
    commands: Vec<DrawIndexedIndirectCommand>,
    max_commands: Option<usize>,
    uploads: u64,
}

impl CpuDrawCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject uploads longer than `max_commands`, like a fixed GPU buffer
    pub fn with_capacity(max_commands: usize) -> Self {
        Self {
            max_commands: Some(max_commands),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[DrawIndexedIndirectCommand] {
        &self.commands
    }

    /// Successful uploads so far
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Raw bytes as they would be uploaded
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.commands)
    }
}

impl DrawCommandGenerator for CpuDrawCommands {
    fn update_commands(&mut self, commands: &[DrawIndexedIndirectCommand]) -> Result<(), Error> {
        if let Some(max) = self.max_commands {
            if commands.len() > max {
                return Err(Error::Streaming(format!(
                    "{} draw commands exceed capacity {}",
                    commands.len(),
                    max
                )));
            }
        }
        self.commands.clear();
        self.commands.extend_from_slice(commands);
        self.uploads += 1;
        Ok(())
    }

    fn command_count(&self) -> u32 {
        self.commands.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_gpu_record() {
        assert_eq!(std::mem::size_of::<DrawIndexedIndirectCommand>(), 20);
    }

    #[test]
    fn test_from_mesh() {
        let entry = MeshEntry::new(300, 24, 72, 36);
        let cmd = DrawIndexedIndirectCommand::from_mesh(&entry);
        assert_eq!(
            cmd,
            DrawIndexedIndirectCommand {
                index_count: 36,
                instance_count: 1,
                first_index: 72,
                vertex_offset: 300,
                first_instance: 0,
            }
        );
    }

    #[test]
    fn test_cpu_commands_replace_list() {
        let mut sink = CpuDrawCommands::new();
        let cmd = DrawIndexedIndirectCommand::from_mesh(&MeshEntry::new(0, 3, 0, 3));

        sink.update_commands(&[cmd, cmd]).unwrap();
        assert_eq!(sink.command_count(), 2);
        assert_eq!(sink.as_bytes().len(), 40);

        sink.update_commands(&[]).unwrap();
        assert_eq!(sink.command_count(), 0);
        assert_eq!(sink.uploads(), 2);
    }

    #[test]
    fn test_cpu_commands_capacity() {
        let mut sink = CpuDrawCommands::with_capacity(1);
        let cmd = DrawIndexedIndirectCommand::default();
        assert!(sink.update_commands(&[cmd]).is_ok());
        assert!(matches!(sink.update_commands(&[cmd, cmd]), Err(Error::Streaming(_))));
        // Failed upload leaves the previous list in place
        assert_eq!(sink.command_count(), 1);
    }
}
