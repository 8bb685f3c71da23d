//! `regionhop-grid`: a static, config-driven grid.
//!
//! Implements `RegionDirectory` and `NeighborTopology` over a fixed region
//! list for standalone deployments and tooling.

pub mod geometry;
pub mod static_grid;

pub use static_grid::StaticGrid;
