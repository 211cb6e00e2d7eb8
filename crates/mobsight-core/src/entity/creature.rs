use glam::DVec3;
use mobsight_brain::{EntityId, EntityKind, EntitySnapshot};
use serde::{Deserialize, Serialize};

use super::health::Health;

/// A passive living entity without a brain of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub id: EntityId,
    pub position: DVec3,
    pub health: Health,
}

impl Creature {
    pub const EYE_HEIGHT: f64 = 0.9;
    pub const HALF_WIDTH: f64 = 0.45;
    pub const HEIGHT: f64 = 1.0;

    pub fn new(position: DVec3) -> Self {
        Creature {
            id: EntityId::new(),
            position,
            health: Health::new(10.0),
        }
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: EntityKind::Creature,
            position: self.position,
            look_direction: DVec3::NEG_Z,
            eye_height: Self::EYE_HEIGHT,
            half_width: Self::HALF_WIDTH,
            height: Self::HEIGHT,
            alive: !self.health.is_dead(),
            attackable: true,
            no_culling: false,
        }
    }
}
