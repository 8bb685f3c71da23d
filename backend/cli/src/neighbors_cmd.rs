//! `regionhop neighbors`

use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;

use regionhop_config::load_and_prepare;
use regionhop_core::{NeighborTopology, RegionDescriptor};
use regionhop_grid::StaticGrid;

use crate::output::render_table;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NeighborRow {
    name: String,
    loc_x: i32,
    loc_y: i32,
    handle: u64,
    /// Children here survive a move into the origin region.
    in_view: bool,
}

fn rows(grid: &StaticGrid, origin: &RegionDescriptor, neighbors: &[RegionDescriptor]) -> Vec<NeighborRow> {
    neighbors
        .iter()
        .map(|n| NeighborRow {
            name: n.name.clone(),
            loc_x: n.loc_x,
            loc_y: n.loc_y,
            handle: n.handle().raw(),
            in_view: !grid.is_outside_view(origin.grid(), n.grid()),
        })
        .collect()
}

pub async fn run(config_path: &Path, region: &str, radius: Option<u32>, json: bool) -> Result<()> {
    let (config, report) = load_and_prepare(config_path).await?;
    if !report.is_valid() {
        bail!("{} has {} error(s); run check-config", config_path.display(), report.errors.len());
    }

    let grid = StaticGrid::from_settings(&config.grid.clone().unwrap_or_default());
    let Some(origin) = grid.region_by_name(region) else {
        bail!("no region named '{region}' in {}", config_path.display());
    };
    let radius = radius.unwrap_or_else(|| config.handoff_settings().default_draw_distance());
    let neighbors = grid.neighbors(&origin, radius).await?;
    debug!(region = %origin.name, radius, count = neighbors.len(), "Neighbor listing");
    let rows = rows(&grid, &origin, &neighbors);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Neighbors of {} at ({}, {}) within {radius} m:\n", origin.name, origin.loc_x, origin.loc_y);
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                format!("({}, {})", r.loc_x, r.loc_y),
                r.handle.to_string(),
                if r.in_view { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print!("{}", render_table(&["Region", "Grid", "Handle", "In view"], &table));
    Ok(())
}
