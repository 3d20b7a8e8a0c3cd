use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

use crate::config::GridConfig;
use crate::pixel::PixelRecord;

/// Canvas axis, named in configuration errors.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridConfigError {
    #[error(
        "partition count {partitions} does not evenly divide resolution {resolution} on the {axis} axis"
    )]
    UnevenSplit {
        axis: Axis,
        resolution: u32,
        partitions: u32,
    },
    #[error("resolution and partition count must be nonzero on the {axis} axis")]
    ZeroDimension { axis: Axis },
}

pub type GridResult<T> = std::result::Result<T, GridConfigError>;

/// Immutable canvas/tile geometry, constructed once per job and shared
/// read-only by every assignment call.
///
/// The canvas is `resolution_x * resolution_y` pixels, split into
/// `partition_x * partition_y` equally sized tiles. Each tile spans
/// `interval_x * interval_y` pixels, which is why both resolutions must be
/// evenly divisible by their partition counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionGrid {
    resolution_x: u32,
    resolution_y: u32,
    partition_x: u32,
    partition_y: u32,
    interval_x: u32,
    interval_y: u32,
}

impl PartitionGrid {
    pub fn new(
        resolution_x: u32,
        resolution_y: u32,
        partition_x: u32,
        partition_y: u32,
    ) -> GridResult<Self> {
        let axes = [
            (Axis::X, resolution_x, partition_x),
            (Axis::Y, resolution_y, partition_y),
        ];
        for (axis, resolution, partitions) in axes {
            if resolution == 0 || partitions == 0 {
                return Err(GridConfigError::ZeroDimension { axis });
            }
            if resolution % partitions != 0 {
                return Err(GridConfigError::UnevenSplit {
                    axis,
                    resolution,
                    partitions,
                });
            }
        }

        Ok(Self {
            resolution_x,
            resolution_y,
            partition_x,
            partition_y,
            interval_x: resolution_x / partition_x,
            interval_y: resolution_y / partition_y,
        })
    }

    pub fn from_config(config: &GridConfig) -> GridResult<Self> {
        Self::new(
            config.resolution_x,
            config.resolution_y,
            config.partition_x,
            config.partition_y,
        )
    }

    pub fn resolution_x(&self) -> u32 {
        self.resolution_x
    }

    pub fn resolution_y(&self) -> u32 {
        self.resolution_y
    }

    pub fn partition_x(&self) -> u32 {
        self.partition_x
    }

    pub fn partition_y(&self) -> u32 {
        self.partition_y
    }

    /// Width of one tile in pixels.
    pub fn interval_x(&self) -> u32 {
        self.interval_x
    }

    /// Height of one tile in pixels.
    pub fn interval_y(&self) -> u32 {
        self.interval_y
    }

    /// Size of the routing key space exposed to the shuffle layer.
    pub fn partition_count(&self) -> u32 {
        self.partition_x * self.partition_y
    }

    /// Routing key for a tagged record, always in `[0, partition_count())`.
    ///
    /// Pure accessor: the id is not (re)computed here, assignment must have
    /// happened first.
    pub fn partition_of(&self, record: &PixelRecord) -> u32 {
        record.partition_id
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.resolution_x && (y as u32) < self.resolution_y
    }
}
