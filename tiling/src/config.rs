use serde::{Deserialize, Serialize};

use common::normalize_string::NormalizeString;
use common::FileFormat;

use crate::grid::{GridResult, PartitionGrid};

/// Job-level grid geometry as read from a YAML or JSON job file.
///
/// This is the serialized form of the grid: workers receive the config with
/// the job and validate it into a `PartitionGrid` locally, so an invariant
/// cannot be smuggled past the factory through deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub partition_x: u32,
    pub partition_y: u32,
}

impl GridConfig {
    /// Loads and validates a config, with the format picked from the file
    /// extension.
    pub fn from_file(path: &str) -> anyhow::Result<GridConfig> {
        let format = FileFormat::from_file_name(path)?;
        let serialized = std::fs::read_to_string(path)?;
        let config: GridConfig = common::deserialize(&serialized, format)?;

        config.grid()?;

        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<GridConfig> {
        let config: GridConfig = common::deserialize(yaml, FileFormat::Yaml)?;

        config.grid()?;

        Ok(config)
    }

    pub fn to_yaml(&self) -> String {
        serde_yml::to_string(self)
            .expect("Failed to serialize grid config to YAML")
            .normalize()
    }

    /// Validates the geometry into the immutable grid value.
    pub fn grid(&self) -> GridResult<PartitionGrid> {
        PartitionGrid::from_config(self)
    }
}
