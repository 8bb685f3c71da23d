//! regionhop configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every tunable is optional in the
//! file; `defaults::apply_all_defaults` fills the gaps after loading.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use regionhop_core::RegionDescriptor;

use crate::defaults::{
    DEFAULT_BUS_BUFFER_SIZE, DEFAULT_CALLBACK_TIMEOUT_MS, DEFAULT_DRAW_DISTANCE,
    DEFAULT_ESTABLISH_DELAY_MS, DEFAULT_MAX_CONCURRENT_HANDOFFS, DEFAULT_VIEW_RANGE,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for a regionhop coordinator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionHopConfig {
    /// Handoff timing and concurrency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffSettings>,

    /// Static grid layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridSettings>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl RegionHopConfig {
    /// Handoff settings, or the built-in defaults when the section is absent.
    pub fn handoff_settings(&self) -> HandoffSettings {
        self.handoff.clone().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Handoff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffSettings {
    /// Upper bound on waiting for a destination's arrival callback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_timeout_ms: Option<u64>,

    /// Pause between enable-simulator and establish-agent-communication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub establish_delay_ms: Option<u64>,

    /// Radius (meters) used for child-agent fan-out when the message carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_draw_distance: Option<u32>,

    /// Handoff requests processed at once across all agents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_handoffs: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus_buffer_size: Option<usize>,
}

impl HandoffSettings {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms.unwrap_or(DEFAULT_CALLBACK_TIMEOUT_MS))
    }

    pub fn establish_delay(&self) -> Duration {
        Duration::from_millis(self.establish_delay_ms.unwrap_or(DEFAULT_ESTABLISH_DELAY_MS))
    }

    pub fn default_draw_distance(&self) -> u32 {
        self.default_draw_distance.unwrap_or(DEFAULT_DRAW_DISTANCE)
    }

    pub fn max_concurrent_handoffs(&self) -> usize {
        self.max_concurrent_handoffs
            .unwrap_or(DEFAULT_MAX_CONCURRENT_HANDOFFS)
    }

    pub fn bus_buffer_size(&self) -> usize {
        self.bus_buffer_size.unwrap_or(DEFAULT_BUS_BUFFER_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    /// Regions further apart than this (in regions, on either axis) are out of view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_range: Option<u32>,

    #[serde(default)]
    pub regions: Vec<RegionEntry>,
}

impl GridSettings {
    pub fn view_range(&self) -> u32 {
        self.view_range.unwrap_or(DEFAULT_VIEW_RANGE)
    }
}

/// One statically configured region.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionEntry {
    pub id: Uuid,
    pub name: String,
    pub loc_x: i32,
    pub loc_y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_x: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_y: Option<u32>,
    pub endpoint: SocketAddr,
    pub server_uri: String,
    #[serde(default)]
    pub access: u8,
}

impl RegionEntry {
    pub fn to_descriptor(&self) -> RegionDescriptor {
        RegionDescriptor {
            id: self.id,
            name: self.name.clone(),
            loc_x: self.loc_x,
            loc_y: self.loc_y,
            size_x: self.size_x.unwrap_or(regionhop_core::REGION_UNIT),
            size_y: self.size_y.unwrap_or(regionhop_core::REGION_UNIT),
            endpoint: self.endpoint,
            server_uri: self.server_uri.clone(),
            access: self.access,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling NDJSON log file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}
