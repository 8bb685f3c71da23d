//! Static grid: a fixed set of regions serving as directory and topology.
//!
//! Regions come from the `grid` config section and are indexed once at load.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use regionhop_config::GridSettings;
use regionhop_core::{GridCoords, NeighborTopology, RegionDescriptor, RegionDirectory, RegionId};

use crate::geometry::{edge_gap, Extent};

#[derive(Debug, Default)]
struct GridIndex {
    by_id: HashMap<RegionId, RegionDescriptor>,
    /// World-meter origin → region id
    by_origin: HashMap<(u32, u32), RegionId>,
}

impl GridIndex {
    fn build(regions: Vec<RegionDescriptor>) -> Self {
        let mut index = GridIndex::default();
        for region in regions {
            index.by_origin.insert(region.handle().world(), region.id);
            index.by_id.insert(region.id, region);
        }
        index
    }
}

/// Immutable, cheaply cloneable static grid.
#[derive(Debug, Clone)]
pub struct StaticGrid {
    index: Arc<GridIndex>,
    /// In regions, per axis.
    view_range: u32,
}

impl StaticGrid {
    pub fn new(regions: Vec<RegionDescriptor>, view_range: u32) -> Self {
        info!(regions = regions.len(), view_range, "Static grid loaded");
        Self {
            index: Arc::new(GridIndex::build(regions)),
            view_range,
        }
    }

    pub fn from_settings(settings: &GridSettings) -> Self {
        let regions = settings.regions.iter().map(|r| r.to_descriptor()).collect();
        Self::new(regions, settings.view_range())
    }

    pub fn region_by_name(&self, name: &str) -> Option<RegionDescriptor> {
        self.index
            .by_id
            .values()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.index.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.by_id.is_empty()
    }
}

#[async_trait]
impl RegionDirectory for StaticGrid {
    async fn region_by_position(&self, x: u32, y: u32) -> Result<Option<RegionDescriptor>> {
        let index = &self.index;
        if let Some(id) = index.by_origin.get(&(x, y)) {
            return Ok(index.by_id.get(id).cloned());
        }
        // Not an origin: find the region covering the point (varregions).
        Ok(index
            .by_id
            .values()
            .find(|r| Extent::of(r).contains(x as i64, y as i64))
            .cloned())
    }

    async fn region_by_id(&self, id: RegionId) -> Result<Option<RegionDescriptor>> {
        Ok(self.index.by_id.get(&id).cloned())
    }
}

#[async_trait]
impl NeighborTopology for StaticGrid {
    async fn neighbors(&self, region: &RegionDescriptor, radius: u32) -> Result<Vec<RegionDescriptor>> {
        let origin = Extent::of(region);
        // Adjacent regions share an edge (gap 0) and are always in reach.
        let reach = radius.max(1) as i64;
        let index = &self.index;
        let mut neighbors: Vec<RegionDescriptor> = index
            .by_id
            .values()
            .filter(|other| other.id != region.id)
            .filter(|other| {
                let (gx, gy) = edge_gap(&origin, &Extent::of(other));
                gx < reach && gy < reach
            })
            .cloned()
            .collect();
        neighbors.sort_by_key(|r| (r.loc_x, r.loc_y));
        debug!(region = %region.name, radius, count = neighbors.len(), "Resolved neighbors");
        Ok(neighbors)
    }

    fn is_outside_view(&self, root: GridCoords, other: GridCoords) -> bool {
        let range = self.view_range as i64;
        (root.x as i64 - other.x as i64).abs() > range || (root.y as i64 - other.y as i64).abs() > range
    }
}
