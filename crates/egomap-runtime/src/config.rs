//! Spatial system configuration – reads/writes a TOML file.
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! configuration.  `EGOMAP_*` environment variables override the file.

use std::fs;
use std::path::Path;

use egomap_memory::AttractivenessPolicy;
use egomap_memory::local_space::{DEFAULT_LOCATION_RADIUS, DEFAULT_MEMORY_RADIUS};
use egomap_types::SpatialError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpatialConfig {
    /// Distance under which two positions denote the same place.
    #[serde(default = "default_location_radius")]
    pub location_radius: f32,

    /// Places further than this from the agent are forgotten.
    #[serde(default = "default_memory_radius")]
    pub memory_radius: f32,

    /// Number of pixels in the visual ring.
    #[serde(default = "default_retina_resolution")]
    pub retina_resolution: usize,

    #[serde(default)]
    pub attractiveness: AttractivenessPolicy,
}

fn default_location_radius() -> f32 {
    DEFAULT_LOCATION_RADIUS
}
fn default_memory_radius() -> f32 {
    DEFAULT_MEMORY_RADIUS
}
fn default_retina_resolution() -> usize {
    12
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            location_radius: default_location_radius(),
            memory_radius: default_memory_radius(),
            retina_resolution: default_retina_resolution(),
            attractiveness: AttractivenessPolicy::default(),
        }
    }
}

impl SpatialConfig {
    /// Load the config from `path`.  Returns `None` if the file does not
    /// exist.  Environment overrides are applied to a loaded file.
    pub fn load_from(path: &Path) -> Result<Option<SpatialConfig>, SpatialError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).map_err(|e| {
            SpatialError::Config(format!("Failed to read config at {}: {}", path.display(), e))
        })?;
        let mut cfg: SpatialConfig = toml::from_str(&raw)
            .map_err(|e| SpatialError::Config(format!("Failed to parse config: {}", e)))?;
        cfg.apply_env_overrides();
        Ok(Some(cfg))
    }

    /// Load from `path`, falling back to defaults (plus environment
    /// overrides) when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<SpatialConfig, SpatialError> {
        match Self::load_from(path)? {
            Some(cfg) => Ok(cfg),
            None => {
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                Ok(cfg)
            }
        }
    }

    /// Apply `EGOMAP_*` environment variable overrides.  Unparseable values
    /// are ignored.
    ///
    /// | Variable | Config field |
    /// |---|---|
    /// | `EGOMAP_LOCATION_RADIUS` | `location_radius` |
    /// | `EGOMAP_MEMORY_RADIUS` | `memory_radius` |
    /// | `EGOMAP_RETINA_RESOLUTION` | `retina_resolution` |
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("EGOMAP_LOCATION_RADIUS")
            && let Ok(r) = v.parse::<f32>()
        {
            self.location_radius = r;
        }
        if let Ok(v) = std::env::var("EGOMAP_MEMORY_RADIUS")
            && let Ok(r) = v.parse::<f32>()
        {
            self.memory_radius = r;
        }
        if let Ok(v) = std::env::var("EGOMAP_RETINA_RESOLUTION")
            && let Ok(n) = v.parse::<usize>()
        {
            self.retina_resolution = n;
        }
    }

    /// Save the config to `path`, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), SpatialError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SpatialError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| SpatialError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, raw).map_err(|e| {
            SpatialError::Config(format!("Failed to write config at {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("egomap").join("config.toml");

        let cfg = SpatialConfig::default();
        cfg.save_to(&path).expect("save");

        let loaded = SpatialConfig::load_from(&path).expect("load ok").expect("some");
        assert!((loaded.location_radius - 0.5).abs() < 1e-5);
        assert!((loaded.memory_radius - 2.0).abs() < 1e-5);
        assert_eq!(loaded.retina_resolution, 12);
        assert_eq!(loaded.attractiveness, AttractivenessPolicy::default());
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = SpatialConfig::load_from(&dir.path().join("absent.toml")).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "memory_radius = 3.0\n[attractiveness]\nfood = 450\n").expect("write");

        let cfg = SpatialConfig::load_from(&path).expect("load ok").expect("some");
        assert!((cfg.memory_radius - 3.0).abs() < 1e-5);
        assert_eq!(cfg.attractiveness.food, 450);
        assert_eq!(cfg.attractiveness.hard, -300);
        assert_eq!(cfg.retina_resolution, 12);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "memory_radius = \"far\"").expect("write");
        let err = SpatialConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, SpatialError::Config(_)));
    }

    #[test]
    fn apply_env_overrides_changes_memory_radius() {
        // SAFETY: no other test reads this variable.
        unsafe { std::env::set_var("EGOMAP_MEMORY_RADIUS", "4.5") };
        let mut cfg = SpatialConfig::default();
        cfg.apply_env_overrides();
        assert!((cfg.memory_radius - 4.5).abs() < 1e-5);
        unsafe { std::env::remove_var("EGOMAP_MEMORY_RADIUS") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_resolution() {
        // SAFETY: no other test reads this variable.
        unsafe { std::env::set_var("EGOMAP_RETINA_RESOLUTION", "many") };
        let mut cfg = SpatialConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.retina_resolution, 12);
        unsafe { std::env::remove_var("EGOMAP_RETINA_RESOLUTION") };
    }
}
