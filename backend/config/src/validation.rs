//! Config validation: schema checks with user-friendly error messages.

use std::collections::{HashMap, HashSet};

use crate::schema::RegionHopConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &RegionHopConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_handoff(config, &mut report);
    validate_grid(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_handoff(config: &RegionHopConfig, report: &mut ValidationReport) {
    let Some(handoff) = &config.handoff else { return };
    if handoff.callback_timeout_ms == Some(0) {
        report.error("handoff.callbackTimeoutMs", "callbackTimeoutMs must be > 0");
    }
    if let Some(delay) = handoff.establish_delay_ms {
        let timeout = handoff.callback_timeout().as_millis() as u64;
        if delay >= timeout {
            report.warn(
                "handoff.establishDelayMs",
                format!("establishDelayMs ({delay}) is not shorter than callbackTimeoutMs ({timeout})"),
            );
        }
    }
    if handoff.max_concurrent_handoffs == Some(0) {
        report.error("handoff.maxConcurrentHandoffs", "maxConcurrentHandoffs must be >= 1");
    }
    if handoff.bus_buffer_size == Some(0) {
        report.error("handoff.busBufferSize", "busBufferSize must be >= 1");
    }
}

fn validate_grid(config: &RegionHopConfig, report: &mut ValidationReport) {
    let Some(grid) = &config.grid else { return };
    if grid.regions.is_empty() {
        report.warn("grid.regions", "No regions configured; every lookup will fail");
    }

    let mut ids = HashSet::new();
    let mut positions: HashMap<(i32, i32), &str> = HashMap::new();
    for (i, region) in grid.regions.iter().enumerate() {
        let path = format!("grid.regions[{i}]");
        if region.name.trim().is_empty() {
            report.error(format!("{path}.name"), "Region name cannot be empty");
        }
        if !ids.insert(region.id) {
            report.error(format!("{path}.id"), format!("Duplicate region id {}", region.id));
        }
        if let Some(other) = positions.insert((region.loc_x, region.loc_y), region.name.as_str()) {
            report.error(
                format!("{path}.locX"),
                format!(
                    "Region '{}' overlaps '{other}' at ({}, {})",
                    region.name, region.loc_x, region.loc_y
                ),
            );
        }
        if region.loc_x < 0 || region.loc_y < 0 {
            report.error(format!("{path}.locX"), "Grid coordinates must be non-negative");
        }
        if region.server_uri.trim().is_empty() {
            report.error(format!("{path}.serverUri"), "serverUri is required");
        } else if !region.server_uri.starts_with("http://") && !region.server_uri.starts_with("https://") {
            report.warn(format!("{path}.serverUri"), "serverUri should be an http(s) URL");
        }
        for (axis, size) in [("sizeX", region.size_x), ("sizeY", region.size_y)] {
            if let Some(size) = size {
                if size == 0 || size % regionhop_core::REGION_UNIT != 0 {
                    report.error(
                        format!("{path}.{axis}"),
                        format!("{axis} must be a positive multiple of {}", regionhop_core::REGION_UNIT),
                    );
                }
            }
        }
    }
}

fn validate_logging(config: &RegionHopConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") && !level.contains('=') {
            report.warn("logging.level", format!("Unrecognized log level '{level}'"));
        }
    }
}
