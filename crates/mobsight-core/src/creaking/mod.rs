//! The Creaking: a mob that only moves while nobody is watching

pub mod ai;
mod body;

use std::sync::Arc;

use glam::DVec3;
use mobsight_brain::{Attributes, Brain, BrainConfig, BrainError, EntityId, Mob, MobAction};
use serde::{Deserialize, Serialize};

use crate::world::{StraightLineNavigation, Terrain, WorldSnapshot};

pub use body::CreakingBody;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreakingConfig {
    /// Blocks per tick at speed modifier 1.0
    pub movement_speed: f64,
    pub attack_damage: f32,
    pub follow_range: f64,
    pub attack_reach: f64,
    /// Ticks between two melee hits
    pub attack_cooldown: u64,
    /// A watching player closer than this activates the Creaking
    pub activation_distance: f64,
    /// Gaze counts when `dot(view, to_creaking) > 1 - look_tolerance`
    pub look_tolerance: f64,
    pub idle_speed: f64,
    pub chase_speed: f64,
    pub brain: BrainConfig,
}

impl Default for CreakingConfig {
    fn default() -> Self {
        Self {
            movement_speed: 0.4,
            attack_damage: 3.0,
            follow_range: 32.0,
            attack_reach: 1.5,
            attack_cooldown: 40,
            activation_distance: 12.0,
            look_tolerance: 0.5,
            idle_speed: 0.3,
            chase_speed: 1.0,
            brain: BrainConfig::default(),
        }
    }
}

impl CreakingConfig {
    pub fn attributes(&self) -> Attributes {
        Attributes {
            follow_range: self.follow_range,
            movement_speed: self.movement_speed,
            attack_damage: self.attack_damage,
            attack_reach: self.attack_reach,
        }
    }
}

pub struct Creaking {
    body: CreakingBody,
    brain: Brain<CreakingBody>,
}

impl Creaking {
    pub fn new(
        id: EntityId,
        position: DVec3,
        terrain: Arc<Terrain>,
        config: &CreakingConfig,
        seed: u64,
    ) -> Result<Self, BrainError> {
        let brain = ai::make_brain(config, seed)?;
        let navigation = StraightLineNavigation::new(terrain);
        let body = CreakingBody::new(id, position, config.attributes(), navigation);
        Ok(Self { body, brain })
    }

    pub fn id(&self) -> EntityId {
        self.body.id()
    }

    pub fn body(&self) -> &CreakingBody {
        &self.body
    }

    pub fn brain(&self) -> &Brain<CreakingBody> {
        &self.brain
    }

    pub fn brain_mut(&mut self) -> &mut Brain<CreakingBody> {
        &mut self.brain
    }

    /// One AI step: freeze check, brain tick, activity update.
    pub fn tick(&mut self, world: &WorldSnapshot, config: &CreakingConfig) {
        let in_water = world.terrain().is_water(self.body.block_position());
        self.body.set_in_water(in_water);

        let can_move = ai::check_can_move(&mut self.body, self.brain.memory_mut(), world, config);
        if can_move != self.body.can_move() {
            log::debug!(
                "{} {}",
                self.body.id(),
                if can_move { "unfroze" } else { "froze" }
            );
        }
        self.body.set_can_move(can_move);

        self.brain.tick(world, &mut self.body);
        ai::update_activity(&mut self.brain, world, &mut self.body);
    }

    /// Stop every running behavior before the Creaking leaves the world.
    pub fn shut_down(&mut self, world: &WorldSnapshot) {
        self.brain.stop_all(world, &mut self.body);
    }

    pub(crate) fn take_actions(&mut self) -> Vec<MobAction> {
        self.body.take_actions()
    }

    pub(crate) fn travel(&mut self, terrain: &Terrain) {
        self.body.travel(terrain);
    }
}
