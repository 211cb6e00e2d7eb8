//! Entity-facing value types shared by the brain and the world
//!
//! Snapshots are plain copies: behaviors and sensors never hold references
//! into the world across ticks, only `EntityId`s.

use glam::{DVec3, IVec3};
use mobsight_culling::Aabb;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for entities in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

impl EntityId {
    /// Allocate a fresh process-unique id
    pub fn new() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Rebuild an id from its raw value; later `new()` ids never collide with it.
    ///
    /// The allocator saturates at `u64::MAX`.
    pub fn from_raw(id: u64) -> Self {
        NEXT_ENTITY_ID.fetch_max(id.saturating_add(1), Ordering::Relaxed);
        EntityId(id)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Creaking,
    /// Any other living entity (animals, villagers, ...)
    Creature,
}

/// Read-only view of an entity as seen by other entities during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Feet position
    pub position: DVec3,
    /// Normalized look direction
    pub look_direction: DVec3,
    pub eye_height: f64,
    pub half_width: f64,
    pub height: f64,
    pub alive: bool,
    /// False for players that cannot be attacked (creative/spectator)
    pub attackable: bool,
    /// Rendered regardless of the frustum
    pub no_culling: bool,
}

impl EntitySnapshot {
    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.eye_height, 0.0)
    }

    pub fn block_position(&self) -> IVec3 {
        self.position.floor().as_ivec3()
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_feet(self.position, self.half_width, self.height)
    }

    /// Bounds handed to the renderer's frustum test
    pub fn culling_box(&self) -> Aabb {
        if self.no_culling {
            Aabb::INFINITE
        } else {
            self.bounding_box()
        }
    }

    pub fn distance_squared_to(&self, point: DVec3) -> f64 {
        self.position.distance_squared(point)
    }
}

/// Attribute values consulted by sensors and behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    /// Sensing radius in blocks
    pub follow_range: f64,
    /// Blocks per tick at speed modifier 1.0
    pub movement_speed: f64,
    pub attack_damage: f32,
    /// Horizontal melee reach in blocks
    pub attack_reach: f64,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            follow_range: 16.0,
            movement_speed: 0.25,
            attack_damage: 2.0,
            attack_reach: 2.0,
        }
    }
}
