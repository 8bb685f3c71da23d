//! Config defaults: applies default values to a parsed config.

use crate::schema::{GridSettings, HandoffSettings, LoggingConfig, RegionHopConfig};

/// Ceiling on waiting for an arrival callback (ms).
pub const DEFAULT_CALLBACK_TIMEOUT_MS: u64 = 10_000;

/// Delay letting the client finish its circuit handshake before establish-agent-communication (ms).
pub const DEFAULT_ESTABLISH_DELAY_MS: u64 = 300;

/// Child-agent radius in meters.
pub const DEFAULT_DRAW_DISTANCE: u32 = 256;

pub const DEFAULT_MAX_CONCURRENT_HANDOFFS: usize = 64;

pub const DEFAULT_BUS_BUFFER_SIZE: usize = 256;

/// View range in regions.
pub const DEFAULT_VIEW_RANGE: u32 = 1;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: RegionHopConfig) -> RegionHopConfig {
    let config = apply_handoff_defaults(config);
    let config = apply_grid_defaults(config);
    apply_logging_defaults(config)
}

fn apply_handoff_defaults(mut config: RegionHopConfig) -> RegionHopConfig {
    let handoff = config.handoff.get_or_insert_with(HandoffSettings::default);
    handoff.callback_timeout_ms.get_or_insert(DEFAULT_CALLBACK_TIMEOUT_MS);
    handoff.establish_delay_ms.get_or_insert(DEFAULT_ESTABLISH_DELAY_MS);
    handoff.default_draw_distance.get_or_insert(DEFAULT_DRAW_DISTANCE);
    handoff
        .max_concurrent_handoffs
        .get_or_insert(DEFAULT_MAX_CONCURRENT_HANDOFFS);
    handoff.bus_buffer_size.get_or_insert(DEFAULT_BUS_BUFFER_SIZE);
    config
}

/// Fill region sizes so every entry describes a full region.
fn apply_grid_defaults(mut config: RegionHopConfig) -> RegionHopConfig {
    let grid = config.grid.get_or_insert_with(GridSettings::default);
    grid.view_range.get_or_insert(DEFAULT_VIEW_RANGE);
    for region in &mut grid.regions {
        region.size_x.get_or_insert(regionhop_core::REGION_UNIT);
        region.size_y.get_or_insert(regionhop_core::REGION_UNIT);
    }
    config
}

fn apply_logging_defaults(mut config: RegionHopConfig) -> RegionHopConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
