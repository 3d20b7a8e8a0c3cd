use anyhow::Result;
use tracing::{info, warn};

use tiling::assign::HaloAssigner;
use tiling::config::GridConfig;
use tiling::pixel::Pixel;

const DEFAULT_RADIUS: u32 = 2;

/// Tags every pixel of the configured canvas with its halo copies and logs
/// how many records each worker tile would receive from the shuffle.
fn main() -> Result<()> {
    common::log_setup::setup_logging("tessellate", "info")?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => GridConfig::from_file(&path)?,
        None => GridConfig {
            resolution_x: 256,
            resolution_y: 256,
            partition_x: 4,
            partition_y: 4,
        },
    };
    let radius = match args.next() {
        Some(radius) => radius.parse()?,
        None => DEFAULT_RADIUS,
    };

    let grid = config.grid()?;
    info!(
        "Canvas {}x{}, {} tiles of {}x{}, filter radius {}",
        grid.resolution_x(),
        grid.resolution_y(),
        grid.partition_count(),
        grid.interval_x(),
        grid.interval_y(),
        radius
    );

    let assigner = HaloAssigner::new(grid);
    let mut per_tile = vec![0u64; grid.partition_count() as usize];
    let mut duplicates = 0u64;
    let mut failures = 0u64;

    for y in 0..grid.resolution_y() as i32 {
        for x in 0..grid.resolution_x() as i32 {
            let pixel = Pixel::new(x, y);
            let sample = (x + y) as f64;

            let assignment = assigner.assign_with_halo(pixel, &sample, radius);
            failures += assignment.failures.len() as u64;
            for (record, _) in &assignment.records {
                per_tile[grid.partition_of(record) as usize] += 1;
                duplicates += record.duplicate as u64;
            }
        }
    }

    for (tile, count) in per_tile.iter().enumerate() {
        info!("Tile {:>3}: {} records", tile, count);
    }
    info!(
        "{} source pixels, {} halo duplicates",
        grid.resolution_x() as u64 * grid.resolution_y() as u64,
        duplicates
    );
    if failures > 0 {
        warn!("{} offsets dropped by the id calculator", failures);
    }

    Ok(())
}
