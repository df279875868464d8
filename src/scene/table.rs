//! Registry of every scene trunk and its load state

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::trunk::{MeshEntry, SceneTrunk, TrunkTable};

/// Maps trunk id to trunk.
///
/// Ids are unique; registering an id again replaces the trunk with a fresh,
/// unloaded one. Load-state changes for unregistered ids are ignored. The
/// map is ordered by id so rebuilt draw lists come out in a stable order.
#[derive(Debug, Default)]
pub struct GlobalSceneTable {
    trunks: RwLock<BTreeMap<String, SceneTrunk>>,
}

impl GlobalSceneTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, SceneTrunk>> {
        self.trunks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, SceneTrunk>> {
        self.trunks.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a trunk. Must happen before load requests for it mean anything.
    pub fn register_trunk(&self, table: TrunkTable) {
        let id = table.id.clone();
        if self.write().insert(id.clone(), SceneTrunk::new(table)).is_some() {
            log::debug!("Scene table: replaced trunk '{}'", id);
        }
    }

    /// Mark a trunk loaded. Returns `false` for an unknown id.
    pub(crate) fn mark_loaded(&self, id: &str) -> bool {
        self.set_loaded(id, true)
    }

    /// Mark a trunk unloaded. Returns `false` for an unknown id.
    pub(crate) fn mark_unloaded(&self, id: &str) -> bool {
        self.set_loaded(id, false)
    }

    fn set_loaded(&self, id: &str, loaded: bool) -> bool {
        match self.read().get(id) {
            Some(trunk) => {
                trunk.set_loaded(loaded);
                true
            }
            None => false,
        }
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.read().get(id).is_some_and(SceneTrunk::is_loaded)
    }

    /// Every mesh entry of every loaded trunk
    pub fn loaded_entries(&self) -> Vec<MeshEntry> {
        self.read()
            .values()
            .filter(|trunk| trunk.is_loaded())
            .flat_map(|trunk| trunk.entries().iter().copied())
            .collect()
    }

    /// Ids of all registered trunks
    pub fn trunk_ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Mesh table of one trunk
    pub fn entries(&self, id: &str) -> Option<Vec<MeshEntry>> {
        self.read().get(id).map(|trunk| trunk.entries().to_vec())
    }

    /// Number of registered trunks
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(id: &str, count: u32) -> TrunkTable {
        let entries = (0..count)
            .map(|i| MeshEntry::new(i * 100, 24, i * 36, 36))
            .collect();
        TrunkTable::new(id, entries)
    }

    #[test]
    fn test_register_and_load() {
        let table = GlobalSceneTable::new();
        table.register_trunk(table_with("a", 2));
        table.register_trunk(table_with("b", 1));

        assert_eq!(table.len(), 2);
        assert!(table.loaded_entries().is_empty());

        assert!(table.mark_loaded("a"));
        assert!(table.is_loaded("a"));
        assert_eq!(table.loaded_entries().len(), 2);

        assert!(table.mark_loaded("b"));
        assert_eq!(table.loaded_entries().len(), 3);

        assert!(table.mark_unloaded("a"));
        assert_eq!(table.loaded_entries(), table_with("b", 1).entries);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let table = GlobalSceneTable::new();
        table.register_trunk(table_with("a", 1));

        assert!(!table.mark_loaded("missing"));
        assert!(!table.mark_unloaded("missing"));
        assert!(!table.is_loaded("missing"));
        assert!(table.entries("missing").is_none());
        assert!(table.loaded_entries().is_empty());
    }

    #[test]
    fn test_reregister_replaces_and_unloads() {
        let table = GlobalSceneTable::new();
        table.register_trunk(table_with("a", 1));
        table.mark_loaded("a");

        table.register_trunk(table_with("a", 3));
        assert_eq!(table.len(), 1);
        assert!(!table.is_loaded("a"));
        assert_eq!(table.entries("a").map(|e| e.len()), Some(3));
    }

    #[test]
    fn test_trunk_ids_sorted() {
        let table = GlobalSceneTable::new();
        for id in ["c", "a", "b"] {
            table.register_trunk(table_with(id, 1));
        }
        assert_eq!(table.trunk_ids(), vec!["a", "b", "c"]);
    }
}
