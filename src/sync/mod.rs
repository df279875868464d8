//! Thread primitives shared by every worker
//!
//! - `BoundedQueue`: fixed-capacity single-producer/single-consumer ring
//! - `ManagedThread`: one OS thread with cooperative start/stop

pub mod bounded_queue;
pub mod managed_thread;

pub use bounded_queue::{bounded_queue, Consumer, Producer, SharedProducer};
pub use managed_thread::{ManagedThread, RunFlag};
