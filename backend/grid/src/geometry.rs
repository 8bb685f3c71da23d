//! World-meter extents of regions.

use regionhop_core::{RegionDescriptor, REGION_UNIT};

/// Axis-aligned extent of a region in world meters, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl Extent {
    pub fn of(region: &RegionDescriptor) -> Self {
        let min_x = region.loc_x as i64 * REGION_UNIT as i64;
        let min_y = region.loc_y as i64 * REGION_UNIT as i64;
        Self {
            min_x,
            min_y,
            max_x: min_x + region.size_x.max(1) as i64,
            max_y: min_y + region.size_y.max(1) as i64,
        }
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }
}

/// Distance between the facing edges of two extents on each axis; 0 when they touch or overlap.
pub fn edge_gap(a: &Extent, b: &Extent) -> (i64, i64) {
    let gx = (b.min_x - a.max_x).max(a.min_x - b.max_x).max(0);
    let gy = (b.min_y - a.max_y).max(a.min_y - b.max_y).max(0);
    (gx, gy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(x: i64, y: i64, size: i64) -> Extent {
        Extent { min_x: x, min_y: y, max_x: x + size, max_y: y + size }
    }

    #[test]
    fn touching_extents_have_no_gap() {
        assert_eq!(edge_gap(&extent(0, 0, 256), &extent(256, 0, 256)), (0, 0));
    }

    #[test]
    fn gap_is_symmetric() {
        let a = extent(0, 0, 256);
        let b = extent(768, 512, 256);
        assert_eq!(edge_gap(&a, &b), (512, 256));
        assert_eq!(edge_gap(&b, &a), (512, 256));
    }

    #[test]
    fn varregion_contains_far_corner() {
        let big = extent(0, 0, 512);
        assert!(big.contains(511, 511));
        assert!(!big.contains(512, 0));
    }
}
