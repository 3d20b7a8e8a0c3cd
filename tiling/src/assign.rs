use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::calculator::{CalculationError, GridCalculator, PartitionIdCalculator};
use crate::grid::PartitionGrid;
use crate::pixel::{Pixel, PixelRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignError {
    #[error("pixel ({x}, {y}) lies outside the canvas")]
    OffCanvas { x: i32, y: i32 },
    #[error(transparent)]
    Calculation(#[from] CalculationError),
}

pub type AssignResult<T> = std::result::Result<T, AssignError>;

/// A coordinate whose partition id could not be calculated. The coordinate
/// was dropped; the rest of the window was still processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetFailure {
    pub x: i32,
    pub y: i32,
    pub error: CalculationError,
}

/// Output of one halo assignment: the tagged copies to route, plus the
/// offsets dropped because the calculator failed on them.
#[derive(Debug, Clone)]
pub struct HaloAssignment<V> {
    pub records: Vec<(PixelRecord, V)>,
    pub failures: Vec<OffsetFailure>,
}

impl<V> HaloAssignment<V> {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tags rasterized pixels with the tile that owns them, and replicates
/// boundary pixels into every neighboring tile whose filter window overlaps
/// them, so tile-local windowed operations never need to look across a tile
/// boundary.
///
/// Pure per input pixel; the surrounding engine is free to apply it to many
/// records concurrently against the same shared grid.
pub struct HaloAssigner<C = GridCalculator> {
    grid: PartitionGrid,
    calculator: C,
}

impl HaloAssigner<GridCalculator> {
    /// Assigner over the grid's own row-major tile lookup.
    pub fn new(grid: PartitionGrid) -> Self {
        Self::with_calculator(grid, GridCalculator)
    }
}

impl<C: PartitionIdCalculator> HaloAssigner<C> {
    pub fn with_calculator(grid: PartitionGrid, calculator: C) -> Self {
        Self { grid, calculator }
    }

    pub fn grid(&self) -> &PartitionGrid {
        &self.grid
    }

    /// Tags one pixel with its owning tile. No duplicates are produced.
    ///
    /// A calculator failure skips the emission and is returned to the
    /// caller; a partially-tagged record is never produced.
    pub fn assign<V>(&self, pixel: Pixel, value: V) -> AssignResult<(PixelRecord, V)> {
        match self.calculator.partition_id(&self.grid, pixel.x, pixel.y)? {
            Some(id) => Ok((PixelRecord::primary(pixel, id), value)),
            None => Err(AssignError::OffCanvas {
                x: pixel.x,
                y: pixel.y,
            }),
        }
    }

    /// Tags one pixel with its owning tile and emits one `duplicate` copy
    /// for every other tile whose `radius`-wide filter window can contain
    /// the pixel.
    ///
    /// The primary copy comes first, then duplicates in ascending
    /// `(dx, dy)` offset order. Each tile receives at most one copy of the
    /// source pixel; offsets past the canvas edge are pruned. A calculator
    /// failure drops only the affected offset and is recorded in the
    /// returned `failures`; the rest of the window and the other records
    /// of the job are unaffected.
    pub fn assign_with_halo<V: Clone>(
        &self,
        pixel: Pixel,
        value: &V,
        radius: u32,
    ) -> HaloAssignment<V> {
        let mut records = Vec::with_capacity(1);
        let mut failures = Vec::new();
        let mut seen: HashSet<u32> = HashSet::new();

        match self.calculator.partition_id(&self.grid, pixel.x, pixel.y) {
            Ok(Some(id)) => {
                seen.insert(id);
                records.push((PixelRecord::primary(pixel, id), value.clone()));
            }
            // An off-canvas pixel owns no tile; there is no primary to emit.
            Ok(None) => {}
            Err(error) => record_failure(&mut failures, pixel, error),
        }

        let radius = radius as i32;
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                // The primary lookup above already covered the zero offset.
                if dx == 0 && dy == 0 {
                    continue;
                }

                let neighbor = pixel.offset(dx, dy);
                match self.calculator.partition_id(&self.grid, neighbor.x, neighbor.y) {
                    Ok(Some(id)) => {
                        if seen.insert(id) {
                            records.push((PixelRecord::halo_copy(pixel, id), value.clone()));
                        }
                    }
                    // The window reaches past the canvas edge here.
                    Ok(None) => {}
                    Err(error) => record_failure(&mut failures, neighbor, error),
                }
            }
        }

        HaloAssignment { records, failures }
    }
}

fn record_failure(failures: &mut Vec<OffsetFailure>, at: Pixel, error: CalculationError) {
    warn!("Dropping halo offset ({}, {}): {}", at.x, at.y, error);
    failures.push(OffsetFailure {
        x: at.x,
        y: at.y,
        error,
    });
}

#[cfg(test)]
mod tests {
    use hashbrown::HashSet;
    use rand::Rng;

    use super::*;
    use crate::calculator::CalculationResult;

    fn grid_2x2() -> PartitionGrid {
        PartitionGrid::new(100, 100, 2, 2).unwrap()
    }

    /// Fails on one poisoned coordinate, otherwise defers to the row-major
    /// lookup.
    struct PoisonedCalculator {
        poisoned: Pixel,
    }

    impl PartitionIdCalculator for PoisonedCalculator {
        fn partition_id(&self, grid: &PartitionGrid, x: i32, y: i32) -> CalculationResult {
            if x == self.poisoned.x && y == self.poisoned.y {
                return Err(CalculationError {
                    x,
                    y,
                    message: "poisoned".to_string(),
                });
            }
            GridCalculator.partition_id(grid, x, y)
        }
    }

    #[test]
    fn single_assignment_tags_without_duplicates() -> anyhow::Result<()> {
        let assigner = HaloAssigner::new(grid_2x2());

        let (record, value) = assigner.assign(Pixel::new(49, 49), 0.5f64)?;
        assert_eq!(record.partition_id, 0);
        assert!(!record.duplicate);
        assert_eq!(value, 0.5);

        // Idempotent: the same pixel resolves to the same tile.
        let (again, _) = assigner.assign(Pixel::new(49, 49), 0.5f64)?;
        assert_eq!(again, record);

        Ok(())
    }

    #[test]
    fn single_assignment_reports_off_canvas() {
        let assigner = HaloAssigner::new(grid_2x2());

        let result = assigner.assign(Pixel::new(100, 3), 1u8);
        assert_eq!(
            result.unwrap_err(),
            AssignError::OffCanvas { x: 100, y: 3 }
        );
    }

    #[test]
    fn single_assignment_skips_on_calculator_failure() {
        let assigner = HaloAssigner::with_calculator(
            grid_2x2(),
            PoisonedCalculator {
                poisoned: Pixel::new(10, 10),
            },
        );

        let result = assigner.assign(Pixel::new(10, 10), 1u8);
        assert!(matches!(result, Err(AssignError::Calculation(_))));
    }

    #[test]
    fn zero_radius_yields_only_the_primary() {
        let assigner = HaloAssigner::new(grid_2x2());
        let pixel = Pixel::new(49, 49);

        let assignment = assigner.assign_with_halo(pixel, &1.0f64, 0);

        assert!(assignment.is_clean());
        assert_eq!(assignment.records.len(), 1);
        let (record, _) = &assignment.records[0];
        assert!(!record.duplicate);
        assert_eq!(
            record.partition_id,
            assigner.assign(pixel, ()).unwrap().0.partition_id
        );
    }

    #[test]
    fn corner_pixel_replicates_into_all_neighbor_tiles() {
        let assigner = HaloAssigner::new(grid_2x2());

        // (49, 49) sits in the corner of tile 0; a radius-1 window reaches
        // x, y in {48, 49, 50}, touching all four tiles.
        let assignment = assigner.assign_with_halo(Pixel::new(49, 49), &1.0f64, 1);

        assert!(assignment.is_clean());
        assert_eq!(assignment.records.len(), 4);

        let (primary, _) = &assignment.records[0];
        assert!(!primary.duplicate);
        assert_eq!(primary.partition_id, 0);

        let duplicate_ids: Vec<u32> = assignment.records[1..]
            .iter()
            .map(|(record, _)| {
                assert!(record.duplicate);
                assert_eq!(record.pixel(), Pixel::new(49, 49));
                record.partition_id
            })
            .collect();
        // Ascending (dx, dy) offset order: (-1,1) -> 2, (1,-1) -> 1, (1,1) -> 3.
        assert_eq!(duplicate_ids, vec![2, 1, 3]);
    }

    #[test]
    fn canvas_corner_prunes_outward_offsets() {
        let assigner = HaloAssigner::new(grid_2x2());

        // All in-canvas offsets of (0, 0) at radius 2 stay inside tile 0.
        let assignment = assigner.assign_with_halo(Pixel::new(0, 0), &1.0f64, 2);

        assert!(assignment.is_clean());
        assert_eq!(assignment.records.len(), 1);
        assert!(!assignment.records[0].0.duplicate);
        assert_eq!(assignment.records[0].0.partition_id, 0);
    }

    #[test]
    fn off_canvas_pixel_emits_nothing_at_zero_radius() {
        let assigner = HaloAssigner::new(grid_2x2());

        let assignment = assigner.assign_with_halo(Pixel::new(-5, 200), &1u8, 0);

        assert!(assignment.is_clean());
        assert!(assignment.records.is_empty());
    }

    #[test]
    fn interior_pixel_has_no_duplicates() {
        let assigner = HaloAssigner::new(grid_2x2());

        // (25, 25) is more than radius away from every tile border.
        let assignment = assigner.assign_with_halo(Pixel::new(25, 25), &1u8, 3);

        assert!(assignment.is_clean());
        assert_eq!(assignment.records.len(), 1);
    }

    #[test]
    fn each_value_copy_is_independent() {
        let assigner = HaloAssigner::new(grid_2x2());

        let value = vec![1u8, 2, 3];
        let assignment = assigner.assign_with_halo(Pixel::new(49, 49), &value, 1);

        assert_eq!(assignment.records.len(), 4);
        for (_, copy) in &assignment.records {
            assert_eq!(*copy, value);
        }
    }

    #[test]
    fn offset_failure_drops_only_that_offset() {
        let assigner = HaloAssigner::with_calculator(
            grid_2x2(),
            PoisonedCalculator {
                poisoned: Pixel::new(50, 49),
            },
        );

        let assignment = assigner.assign_with_halo(Pixel::new(49, 49), &1u8, 1);

        // The poisoned offset is dropped and recorded; tile 1 still receives
        // its copy through the earlier (50, 48) offset.
        assert_eq!(assignment.failures.len(), 1);
        assert_eq!(assignment.failures[0].x, 50);
        assert_eq!(assignment.failures[0].y, 49);

        let ids: Vec<u32> = assignment
            .records
            .iter()
            .map(|(record, _)| record.partition_id)
            .collect();
        assert_eq!(ids, vec![0, 2, 1, 3]);
        assert!(!assignment.records[0].0.duplicate);
    }

    #[test]
    fn primary_failure_is_skipped_and_reported() {
        let pixel = Pixel::new(49, 49);
        let assigner = HaloAssigner::with_calculator(
            grid_2x2(),
            PoisonedCalculator { poisoned: pixel },
        );

        let assignment = assigner.assign_with_halo(pixel, &1u8, 1);

        // No primary record, one recorded failure, duplicates still emitted.
        // With no primary id in the seen set, even the pixel's own tile 0
        // only receives a duplicate copy.
        assert_eq!(assignment.failures.len(), 1);
        assert_eq!(assignment.failures[0].x, pixel.x);
        assert_eq!(assignment.failures[0].y, pixel.y);
        assert!(assignment.records.iter().all(|(record, _)| record.duplicate));
        assert_eq!(assignment.records.len(), 4);
    }

    #[test]
    fn random_sweep_upholds_the_halo_guarantees() -> anyhow::Result<()> {
        let grid = PartitionGrid::new(96, 64, 6, 4)?;
        let assigner = HaloAssigner::new(grid);
        let mut rng = rand::rng();

        for _ in 0..1000 {
            let pixel = Pixel::new(rng.random_range(0..96), rng.random_range(0..64));
            let radius = rng.random_range(0..4u32);

            let assignment = assigner.assign_with_halo(pixel, &1u8, radius);
            assert!(assignment.is_clean());

            let window = 2 * radius + 1;
            let upper = (window * window).min(grid.partition_count());
            assert!(!assignment.records.is_empty());
            assert!(assignment.records.len() as u32 <= upper);

            let primaries = assignment
                .records
                .iter()
                .filter(|(record, _)| !record.duplicate)
                .count();
            assert_eq!(primaries, 1);

            let mut ids: HashSet<u32> = HashSet::new();
            for (record, _) in &assignment.records {
                assert_eq!(record.pixel(), pixel);
                assert!(record.partition_id < grid.partition_count());
                assert!(
                    ids.insert(grid.partition_of(record)),
                    "tile {} received two copies of {:?}",
                    record.partition_id,
                    pixel
                );
            }
        }

        Ok(())
    }
}
