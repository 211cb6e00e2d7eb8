use glam::DVec3;
use mobsight_brain::{EntityId, EntityKind, EntitySnapshot};
use serde::{Deserialize, Serialize};

use super::health::Health;

/// A player as seen by mobs: a position, a gaze and some health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: EntityId,
    /// Feet position
    pub position: DVec3,
    /// Normalized look direction
    pub look_direction: DVec3,
    pub health: Health,
    /// Creative/spectator players cannot be targeted
    pub attackable: bool,
}

impl Player {
    pub const EYE_HEIGHT: f64 = 1.62;
    pub const HALF_WIDTH: f64 = 0.3;
    pub const HEIGHT: f64 = 1.8;

    pub fn new(position: DVec3) -> Self {
        Self::with_id(EntityId::new(), position)
    }

    pub fn with_id(id: EntityId, position: DVec3) -> Self {
        Player {
            id,
            position,
            look_direction: DVec3::NEG_Z,
            health: Health::new(20.0),
            attackable: true,
        }
    }

    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, Self::EYE_HEIGHT, 0.0)
    }

    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Point the gaze at `target`; a target at the eye keeps the old direction
    pub fn look_at(&mut self, target: DVec3) {
        let direction = (target - self.eye_position()).normalize_or_zero();
        if direction != DVec3::ZERO {
            self.look_direction = direction;
        }
    }

    pub fn look_towards(&mut self, direction: DVec3) {
        let direction = direction.normalize_or_zero();
        if direction != DVec3::ZERO {
            self.look_direction = direction;
        }
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: EntityKind::Player,
            position: self.position,
            look_direction: self.look_direction,
            eye_height: Self::EYE_HEIGHT,
            half_width: Self::HALF_WIDTH,
            height: Self::HEIGHT,
            alive: self.is_alive(),
            attackable: self.attackable,
            no_culling: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_at_normalizes() {
        let mut player = Player::new(DVec3::ZERO);
        player.look_at(DVec3::new(10.0, Player::EYE_HEIGHT, 0.0));
        assert!((player.look_direction - DVec3::X).length() < 1e-9);
    }

    #[test]
    fn test_look_at_own_eye_keeps_direction() {
        let mut player = Player::new(DVec3::ZERO);
        let eye = player.eye_position();
        player.look_at(eye);
        assert_eq!(player.look_direction, DVec3::NEG_Z);
    }

    #[test]
    fn test_snapshot_reflects_health() {
        let mut player = Player::new(DVec3::new(1.0, 0.0, 2.0));
        assert!(player.snapshot().alive);
        player.health.take_damage(100.0);
        let snapshot = player.snapshot();
        assert!(!snapshot.alive);
        assert_eq!(snapshot.kind, EntityKind::Player);
        assert_eq!(snapshot.eye_position(), DVec3::new(1.0, 1.62, 2.0));
    }
}
