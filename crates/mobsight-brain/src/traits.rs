//! Trait abstractions between the brain and the world it runs in
//!
//! These traits decouple mobsight-brain from mobsight-core:
//! - `WorldQuery`: read-only entity/terrain queries for sensors and behaviors
//! - `Navigation`: path creation and following for a single mob
//! - `Mob`: the body a brain drives

use glam::{DVec3, IVec3};
use mobsight_culling::Aabb;
use serde::{Deserialize, Serialize};

use crate::types::{Attributes, EntityId, EntitySnapshot};

/// Read-only access to the world during one AI phase.
pub trait WorldQuery {
    /// Current game time in ticks
    fn game_time(&self) -> u64;

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot>;

    /// Entities whose bounding box intersects `region` and pass `filter`
    fn entities_in(
        &self,
        region: &Aabb,
        filter: &dyn Fn(&EntitySnapshot) -> bool,
    ) -> Vec<EntitySnapshot>;

    /// Eye-to-eye line of sight between two entities
    fn has_line_of_sight(&self, from: EntityId, to: EntityId) -> bool;

    /// Whether a mob can stand at this block
    fn is_walkable(&self, pos: IVec3) -> bool;
}

/// A computed route towards a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<IVec3>,
    pub target: IVec3,
    /// False for partial paths that stop short of `target`
    pub reaches_target: bool,
}

impl Path {
    pub fn end_node(&self) -> Option<IVec3> {
        self.nodes.last().copied()
    }

    pub fn can_reach(&self) -> bool {
        self.reaches_target
    }
}

/// Per-mob path finding and following.
pub trait Navigation {
    /// Path from `from` to within `reach` blocks of `target`
    fn create_path(&self, from: DVec3, target: DVec3, reach: u32) -> Option<Path>;

    /// Start following `path` at `speed` blocks per tick
    fn follow(&mut self, path: Path, speed: f64) -> bool;

    fn stop(&mut self);

    /// No path, or the current path has been walked to its end
    fn is_done(&self) -> bool;

    /// Following a path without making progress
    fn is_stuck(&self) -> bool;

    fn current_path(&self) -> Option<&Path>;
}

/// Side effects a behavior requests on other entities.
///
/// Applied by the world after every brain of the tick has run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MobAction {
    MeleeAttack {
        attacker: EntityId,
        target: EntityId,
        damage: f32,
    },
}

/// The body a [`crate::Brain`] drives.
pub trait Mob {
    type Nav: Navigation;

    fn snapshot(&self) -> EntitySnapshot;

    fn id(&self) -> EntityId {
        self.snapshot().id
    }

    fn position(&self) -> DVec3 {
        self.snapshot().position
    }

    fn block_position(&self) -> IVec3 {
        self.position().floor().as_ivec3()
    }

    fn attributes(&self) -> &Attributes;

    fn navigation(&self) -> &Self::Nav;

    fn navigation_mut(&mut self) -> &mut Self::Nav;

    fn is_in_water(&self) -> bool;

    fn jump(&mut self);

    fn look_at(&mut self, target: DVec3);

    fn swing(&mut self) {}

    fn push_action(&mut self, action: MobAction);

    fn can_attack_target(&self, target: &EntitySnapshot) -> bool {
        target.alive && target.attackable && target.id != self.id()
    }

    fn is_within_melee_range(&self, target: &EntitySnapshot) -> bool {
        let reach = self.attributes().attack_reach;
        let own = self.position();
        let horizontal = DVec3::new(target.position.x - own.x, 0.0, target.position.z - own.z);
        horizontal.length_squared() <= reach * reach
            && (target.position.y - own.y).abs() <= target.height.max(1.0)
    }
}
