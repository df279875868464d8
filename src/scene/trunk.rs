//! Scene trunks: independently loadable partitions of scene content

use std::sync::atomic::{AtomicBool, Ordering};

/// One mesh slot inside the global vertex/index buffers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MeshEntry {
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
}

impl MeshEntry {
    pub fn new(vertex_offset: u32, vertex_count: u32, index_offset: u32, index_count: u32) -> Self {
        Self {
            vertex_offset,
            vertex_count,
            index_offset,
            index_count,
        }
    }
}

/// Authoring-time description of a trunk: its id and the meshes it holds
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrunkTable {
    pub id: String,
    pub entries: Vec<MeshEntry>,
}

impl TrunkTable {
    pub fn new(id: impl Into<String>, entries: Vec<MeshEntry>) -> Self {
        Self {
            id: id.into(),
            entries,
        }
    }
}

/// A registered trunk. The mesh table is immutable; only the loaded flag
/// changes, and only from the streaming worker.
#[derive(Debug)]
pub struct SceneTrunk {
    table: TrunkTable,
    loaded: AtomicBool,
}

impl SceneTrunk {
    pub fn new(table: TrunkTable) -> Self {
        Self {
            table,
            loaded: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.table.id
    }

    pub fn entries(&self) -> &[MeshEntry] {
        &self.table.entries
    }

    pub fn table(&self) -> &TrunkTable {
        &self.table
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) fn set_loaded(&self, loaded: bool) {
        self.loaded.store(loaded, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trunk_starts_unloaded() {
        let trunk = SceneTrunk::new(TrunkTable::new("a", vec![MeshEntry::new(0, 36, 0, 36)]));
        assert_eq!(trunk.id(), "a");
        assert_eq!(trunk.entries().len(), 1);
        assert!(!trunk.is_loaded());

        trunk.set_loaded(true);
        assert!(trunk.is_loaded());
        trunk.set_loaded(false);
        assert!(!trunk.is_loaded());
    }
}
