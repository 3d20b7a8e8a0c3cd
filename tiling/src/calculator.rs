use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::PartitionGrid;

/// The calculator could not resolve a coordinate for a reason other than the
/// coordinate being off-canvas.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("partition id calculation failed at ({x}, {y}): {message}")]
pub struct CalculationError {
    pub x: i32,
    pub y: i32,
    pub message: String,
}

/// `Ok(None)` is the off-canvas answer: no tile owns the coordinate. It is
/// not an error; halo assignment uses it to prune offsets that reach past
/// the canvas edge.
pub type CalculationResult = std::result::Result<Option<u32>, CalculationError>;

/// Maps a canvas coordinate to the id of the partition that owns it.
///
/// Implementations must be pure per call: the same grid and coordinate give
/// the same answer, and resolved ids lie in `[0, grid.partition_count())`.
pub trait PartitionIdCalculator: Send + Sync {
    fn partition_id(&self, grid: &PartitionGrid, x: i32, y: i32) -> CalculationResult;
}

/// Row-major tile lookup over the grid's tile intervals. Never fails for
/// in-canvas coordinates.
#[derive(Debug, Default, Clone, Copy)]
pub struct GridCalculator;

impl PartitionIdCalculator for GridCalculator {
    fn partition_id(&self, grid: &PartitionGrid, x: i32, y: i32) -> CalculationResult {
        if !grid.contains(x, y) {
            return Ok(None);
        }

        let tile_x = x as u32 / grid.interval_x();
        let tile_y = y as u32 / grid.interval_y();

        Ok(Some(tile_y * grid.partition_x() + tile_x))
    }
}
