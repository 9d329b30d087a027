//! Configuration system

pub use serde::{Serialize, Deserialize};

use crate::spatial::OctreeConfig;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Value out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tuning for the broad phase, re-insertion and mesh BVH builds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Octree root region and subdivision limits
    pub octree: OctreeConfig,

    /// Dynamic-queue entries retried per frame
    pub reinsert_budget: usize,

    /// Maximum triangles per BVH leaf
    pub bvh_max_leaf_size: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            octree: OctreeConfig::default(),
            reinsert_budget: 64,
            bvh_max_leaf_size: 4,
        }
    }
}

impl Config for CollisionConfig {}

impl CollisionConfig {
    /// Reject settings the collision structures cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let octree = &self.octree;
        if (0..3).any(|axis| octree.world_min[axis] >= octree.world_max[axis]) {
            return Err(ConfigError::Invalid(format!(
                "octree world_min {:?} must be below world_max {:?} on every axis",
                octree.world_min.as_slice(),
                octree.world_max.as_slice()
            )));
        }
        if octree.min_node_size.is_nan() || octree.min_node_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "octree min_node_size must be positive, got {}",
                octree.min_node_size
            )));
        }
        if self.bvh_max_leaf_size == 0 {
            return Err(ConfigError::Invalid("bvh_max_leaf_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_defaults_are_valid() {
        let config = CollisionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.octree.max_depth, 8);
        assert_eq!(config.reinsert_budget, 64);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: CollisionConfig = toml::from_str(
            "reinsert_budget = 8\n\n[octree]\nworld_min = [-50.0, -10.0, -50.0]\nworld_max = [50.0, 10.0, 50.0]\n",
        )
        .unwrap();

        assert_eq!(config.reinsert_budget, 8);
        assert_eq!(config.bvh_max_leaf_size, 4);
        assert_eq!(config.octree.world_min, Vec3::new(-50.0, -10.0, -50.0));
        assert_eq!(config.octree.max_depth, 8);
    }

    #[test]
    fn test_ron_file_round_trip() {
        let path = std::env::temp_dir().join("scene_collision_config_test.ron");
        let path = path.to_string_lossy().into_owned();
        let config = CollisionConfig { reinsert_budget: 3, ..CollisionConfig::default() };

        config.save_to_file(&path).unwrap();
        let loaded = CollisionConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut inverted = CollisionConfig::default();
        inverted.octree.world_max.y = inverted.octree.world_min.y;
        assert!(matches!(inverted.validate(), Err(ConfigError::Invalid(_))));

        let zero_leaf = CollisionConfig { bvh_max_leaf_size: 0, ..CollisionConfig::default() };
        assert!(zero_leaf.validate().is_err());

        let mut tiny_nodes = CollisionConfig::default();
        tiny_nodes.octree.min_node_size = 0.0;
        assert!(tiny_nodes.validate().is_err());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = CollisionConfig::default().save_to_file("collision.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
