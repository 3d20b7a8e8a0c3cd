use serde::{Deserialize, Serialize};

/// A canvas coordinate produced by the rasterizer.
///
/// Coordinates are signed so halo offsets can reach past the canvas edge;
/// whether a coordinate actually lands on a tile is decided by the
/// partition id calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
}

impl Pixel {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl From<(i32, i32)> for Pixel {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// A pixel tagged with the partition that should receive it.
///
/// `duplicate` marks halo copies: the pixel's owning tile receives the one
/// record with `duplicate == false`, neighboring tiles whose filter window
/// overlaps the pixel receive `duplicate == true` copies. Records are only
/// created by assignment, so a record always carries a resolved partition id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRecord {
    pub x: i32,
    pub y: i32,
    pub partition_id: u32,
    pub duplicate: bool,
}

impl PixelRecord {
    pub(crate) fn primary(pixel: Pixel, partition_id: u32) -> Self {
        Self {
            x: pixel.x,
            y: pixel.y,
            partition_id,
            duplicate: false,
        }
    }

    pub(crate) fn halo_copy(pixel: Pixel, partition_id: u32) -> Self {
        Self {
            x: pixel.x,
            y: pixel.y,
            partition_id,
            duplicate: true,
        }
    }

    pub fn pixel(&self) -> Pixel {
        Pixel {
            x: self.x,
            y: self.y,
        }
    }
}
