//! Runtime configuration
//!
//! Plain `Default` structs, optionally persisted as JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;

/// Main window configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Trellis".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Configuration for the engine's worker threads
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Main window created at start-up
    pub window: WindowConfig,
    /// Slots in the render command ring
    pub render_queue_capacity: usize,
    /// Slots in the window command ring
    pub window_queue_capacity: usize,
    /// Sleep between window thread iterations
    pub window_poll_interval_ms: u64,
    /// Physics stepping frequency
    pub physics_hz: f32,
    /// Sleep between control-loop ticks
    pub tick_interval_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            render_queue_capacity: 1024,
            window_queue_capacity: 64,
            window_poll_interval_ms: 1,
            physics_hz: 60.0,
            tick_interval_ms: 8,
        }
    }
}

impl RuntimeConfig {
    /// Check values the workers cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.render_queue_capacity == 0 {
            return Err(Error::Config("render_queue_capacity must be at least 1".into()));
        }
        if self.window_queue_capacity == 0 {
            return Err(Error::Config("window_queue_capacity must be at least 1".into()));
        }
        if !self.physics_hz.is_finite() || self.physics_hz <= 0.0 {
            return Err(Error::Config(format!(
                "physics_hz must be positive, got {}",
                self.physics_hz
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }

    /// Sleep between window thread iterations
    pub fn window_poll_interval(&self) -> Duration {
        Duration::from_millis(self.window_poll_interval_ms)
    }

    /// Sleep between control-loop ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from file (sync) and validate.
    ///
    /// Missing fields fall back to their defaults.
    pub fn load_sync(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.render_queue_capacity, 1024);
        assert_eq!(config.window_queue_capacity, 64);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("runtime.json");

        let config = RuntimeConfig {
            physics_hz: 120.0,
            window: WindowConfig {
                title: "Test".into(),
                width: 800,
                height: 600,
            },
            ..Default::default()
        };
        config.save_sync(&path).unwrap();

        let loaded = RuntimeConfig::load_sync(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.json");
        std::fs::write(&path, r#"{ "physics_hz": 30.0 }"#).unwrap();

        let loaded = RuntimeConfig::load_sync(&path).unwrap();
        assert_eq!(loaded.physics_hz, 30.0);
        assert_eq!(loaded.render_queue_capacity, 1024);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = RuntimeConfig {
            render_queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = RuntimeConfig {
            physics_hz: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.json");
        std::fs::write(&path, r#"{ "window_queue_capacity": 0 }"#).unwrap();
        assert!(matches!(RuntimeConfig::load_sync(&path), Err(Error::Config(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(RuntimeConfig::load_sync(&path), Err(Error::Json(_))));
    }
}
