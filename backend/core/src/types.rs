use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a connected agent (avatar session).
pub type AgentId = Uuid;

/// Stable identifier of a region in the grid directory.
pub type RegionId = Uuid;

/// Width of one grid cell in world meters.
pub const REGION_UNIT: u32 = 256;

/// Side-channel key carrying the destination's capability password.
pub const CAPS_PASSWORD_KEY: &str = "CapsPassword";

/// Integer grid coordinates of a region (in region units, not meters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoords {
    pub x: i32,
    pub y: i32,
}

impl GridCoords {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Routing handle of a region: its world-meter origin packed as `(x << 32) | y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionHandle(u64);

impl RegionHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Build a handle from a world-meter origin.
    pub fn from_world(x: u32, y: u32) -> Self {
        Self(((x as u64) << 32) | y as u64)
    }

    /// Build a handle from grid coordinates.
    pub fn from_grid(coords: GridCoords) -> Self {
        Self::from_world(
            (coords.x as u32).wrapping_mul(REGION_UNIT),
            (coords.y as u32).wrapping_mul(REGION_UNIT),
        )
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// World-meter origin encoded in this handle.
    pub fn world(self) -> (u32, u32) {
        ((self.0 >> 32) as u32, self.0 as u32)
    }

    /// Grid coordinates encoded in this handle.
    pub fn grid(self) -> GridCoords {
        let (x, y) = self.world();
        GridCoords::new((x / REGION_UNIT) as i32, (y / REGION_UNIT) as i32)
    }
}

impl fmt::Display for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.0, self.grid())
    }
}

/// Simple 3-component vector for region-local positions and velocities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Vector3) {
        *self = *self + rhs;
    }
}

/// Immutable snapshot of a region as reported by the grid directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDescriptor {
    pub id: RegionId,
    pub name: String,
    /// Grid coordinates, in region units.
    pub loc_x: i32,
    pub loc_y: i32,
    /// Size in meters.
    pub size_x: u32,
    pub size_y: u32,
    /// Endpoint the client connects its circuit to.
    pub endpoint: SocketAddr,
    /// Base URI of the region's HTTP services.
    pub server_uri: String,
    /// Maturity / access flags advertised to the client.
    #[serde(default)]
    pub access: u8,
}

impl RegionDescriptor {
    pub fn grid(&self) -> GridCoords {
        GridCoords::new(self.loc_x, self.loc_y)
    }

    pub fn handle(&self) -> RegionHandle {
        RegionHandle::from_grid(self.grid())
    }
}

/// Per-agent connection credentials handed to a destination region.
///
/// Always copied before being stamped for a particular destination: concurrent
/// handoffs to different neighbors must not share capability paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDescriptor {
    #[serde(rename = "AgentID")]
    pub agent_id: AgentId,
    #[serde(rename = "SessionID")]
    pub session_id: Uuid,
    #[serde(rename = "CapsPath", default)]
    pub caps_path: String,
    #[serde(rename = "OtherInformation", default)]
    pub other_information: HashMap<String, String>,
}

impl CircuitDescriptor {
    pub fn new(agent_id: AgentId, session_id: Uuid) -> Self {
        Self {
            agent_id,
            session_id,
            caps_path: String::new(),
            other_information: HashMap::new(),
        }
    }

    pub fn set_caps_password(&mut self, password: impl Into<String>) {
        self.other_information
            .insert(CAPS_PASSWORD_KEY.to_string(), password.into());
    }

    pub fn caps_password(&self) -> Option<&str> {
        self.other_information.get(CAPS_PASSWORD_KEY).map(String::as_str)
    }
}

/// Region-local position and velocity of an avatar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub position: Vector3,
    pub velocity: Vector3,
}

impl PositionSnapshot {
    pub fn new(position: Vector3, velocity: Vector3) -> Self {
        Self { position, velocity }
    }

    /// Re-express the position in the local frame of the region at `to`,
    /// given that it is currently local to the region at `from`.
    pub fn rebased(&self, from: GridCoords, to: GridCoords) -> Self {
        let unit = REGION_UNIT as f32;
        let offset = Vector3::new(
            (to.x - from.x) as f32 * unit,
            (to.y - from.y) as f32 * unit,
            0.0,
        );
        Self {
            position: self.position + offset,
            velocity: self.velocity,
        }
    }
}

/// Full agent state pushed to a destination when creating or updating a root agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    #[serde(rename = "AgentID")]
    pub agent_id: AgentId,
    #[serde(rename = "SessionID", default)]
    pub session_id: Uuid,
    #[serde(rename = "Position", default)]
    pub position: Vector3,
    #[serde(rename = "Velocity", default)]
    pub velocity: Vector3,
    #[serde(rename = "DrawDistance", default)]
    pub draw_distance: f32,
    /// Opaque appearance/attachment state, carried but never inspected.
    #[serde(rename = "Extra", default)]
    pub extra: serde_json::Value,
}

impl AgentData {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            session_id: Uuid::nil(),
            position: Vector3::ZERO,
            velocity: Vector3::ZERO,
            draw_distance: 0.0,
            extra: serde_json::Value::Null,
        }
    }
}

/// Lightweight position refresh sent to child agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPosition {
    #[serde(rename = "AgentID")]
    pub agent_id: AgentId,
    #[serde(rename = "SessionID", default)]
    pub session_id: Uuid,
    #[serde(rename = "Position", default)]
    pub position: Vector3,
    #[serde(rename = "Velocity", default)]
    pub velocity: Vector3,
    #[serde(rename = "DrawDistance", default)]
    pub draw_distance: f32,
}

/// Agent-state update accepted by the simulation transport.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentUpdate {
    Full(AgentData),
    Position(AgentPosition),
}

impl AgentUpdate {
    pub fn agent_id(&self) -> AgentId {
        match self {
            AgentUpdate::Full(data) => data.agent_id,
            AgentUpdate::Position(pos) => pos.agent_id,
        }
    }
}

/// Bit set of teleport flags forwarded untouched to the destination and client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeleportFlags(pub u32);

impl TeleportFlags {
    pub const DEFAULT: TeleportFlags = TeleportFlags(0);
    pub const VIA_LURE: TeleportFlags = TeleportFlags(1 << 2);
    pub const VIA_LANDMARK: TeleportFlags = TeleportFlags(1 << 3);
    pub const VIA_LOCATION: TeleportFlags = TeleportFlags(1 << 4);
    pub const VIA_HOME: TeleportFlags = TeleportFlags(1 << 5);

    pub fn contains(self, other: TeleportFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_round_trips_grid_coordinates() {
        let handle = RegionHandle::from_grid(GridCoords::new(1000, 1001));
        assert_eq!(handle.world(), (256_000, 256_256));
        assert_eq!(handle.grid(), GridCoords::new(1000, 1001));
    }

    #[test]
    fn rebase_crossing_east() {
        let snapshot = PositionSnapshot::new(Vector3::new(10.0, 128.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let rebased = snapshot.rebased(GridCoords::new(10, 10), GridCoords::new(11, 10));
        assert_eq!(rebased.position, Vector3::new(266.0, 128.0, 0.0));
        assert_eq!(rebased.velocity, snapshot.velocity);
    }

    #[test]
    fn rebase_crossing_south_west() {
        let snapshot = PositionSnapshot::new(Vector3::new(250.0, 3.0, 22.0), Vector3::ZERO);
        let rebased = snapshot.rebased(GridCoords::new(10, 10), GridCoords::new(9, 9));
        assert_eq!(rebased.position, Vector3::new(-6.0, -253.0, 22.0));
    }

    #[test]
    fn circuit_copy_does_not_share_side_channel() {
        let original = CircuitDescriptor::new(Uuid::new_v4(), Uuid::new_v4());
        let mut copy = original.clone();
        copy.caps_path = "abc".into();
        copy.set_caps_password("secret");
        assert!(original.caps_password().is_none());
        assert!(original.caps_path.is_empty());
        assert_eq!(copy.caps_password(), Some("secret"));
    }

    #[test]
    fn teleport_flags_contains() {
        let flags = TeleportFlags(TeleportFlags::VIA_LURE.0 | TeleportFlags::VIA_HOME.0);
        assert!(flags.contains(TeleportFlags::VIA_LURE));
        assert!(!flags.contains(TeleportFlags::VIA_LANDMARK));
    }
}
