//! Core runtime types and utilities

pub mod error;
pub mod logging;
pub mod time;
pub mod config;

pub use error::Error;
pub use config::{RuntimeConfig, WindowConfig};
