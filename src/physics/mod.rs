//! Fixed-frequency physics thread

pub mod worker;

pub use worker::{PhysicsSystem, PhysicsWorker};
