//! Scene partitioning into independently streamed trunks

pub mod trunk;
pub mod table;

pub use trunk::{MeshEntry, SceneTrunk, TrunkTable};
pub use table::GlobalSceneTable;
