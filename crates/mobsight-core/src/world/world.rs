//! Fixed-tick world: players, bystanders and Creakings

use std::sync::Arc;

use glam::DVec3;
use mobsight_brain::{BrainError, EntityId, EntitySnapshot, Mob, MobAction};
use mobsight_culling::Frustum;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use super::snapshot::WorldSnapshot;
use super::terrain::{Terrain, TerrainConfig};
use crate::creaking::{Creaking, CreakingConfig};
use crate::entity::{Creature, Player};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub terrain: TerrainConfig,
    pub creaking: CreakingConfig,
    /// Seeds every brain spawned into the world
    pub seed: u64,
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("cannot spawn at {0}: not a walkable block")]
    NotWalkable(DVec3),
    #[error("no entity {0}")]
    UnknownEntity(EntityId),
    #[error(transparent)]
    Brain(#[from] BrainError),
}

/// What happened during one [`World::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub game_time: u64,
    pub hits: SmallVec<[MobAction; 4]>,
    pub deaths: SmallVec<[EntityId; 2]>,
}

pub struct World {
    config: WorldConfig,
    terrain: Arc<Terrain>,
    game_time: u64,
    players: Vec<Player>,
    creatures: Vec<Creature>,
    creakings: Vec<Creaking>,
    rng: Xoshiro256PlusPlus,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let terrain = Arc::new(Terrain::new(config.terrain.clone()));
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        Self {
            config,
            terrain,
            game_time: 0,
            players: Vec::new(),
            creatures: Vec::new(),
            creakings: Vec::new(),
            rng,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn game_time(&self) -> u64 {
        self.game_time
    }

    fn walkable_spawn(&self, position: DVec3) -> Result<DVec3, WorldError> {
        let feet = DVec3::new(position.x, f64::from(self.terrain.floor_y()), position.z);
        if self.terrain.is_walkable(feet.floor().as_ivec3()) {
            Ok(feet)
        } else {
            Err(WorldError::NotWalkable(position))
        }
    }

    pub fn add_player(&mut self, player: Player) -> EntityId {
        let id = player.id;
        self.players.retain(|p| p.id != id);
        self.players.push(player);
        id
    }

    pub fn spawn_player(&mut self, position: DVec3) -> Result<EntityId, WorldError> {
        let feet = self.walkable_spawn(position)?;
        Ok(self.add_player(Player::new(feet)))
    }

    pub fn spawn_creature(&mut self, position: DVec3) -> Result<EntityId, WorldError> {
        let feet = self.walkable_spawn(position)?;
        let creature = Creature::new(feet);
        let id = creature.id;
        self.creatures.push(creature);
        Ok(id)
    }

    pub fn spawn_creaking(&mut self, position: DVec3) -> Result<EntityId, WorldError> {
        let feet = self.walkable_spawn(position)?;
        let seed = self.rng.gen::<u64>();
        let creaking = Creaking::new(
            EntityId::new(),
            feet,
            Arc::clone(&self.terrain),
            &self.config.creaking,
            seed,
        )?;
        let id = creaking.id();
        log::info!("Spawned creaking {} at {}", id, feet);
        self.creakings.push(creaking);
        Ok(id)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: EntityId) -> Result<&mut Player, WorldError> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(WorldError::UnknownEntity(id))
    }

    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    pub fn creakings(&self) -> &[Creaking] {
        &self.creakings
    }

    pub fn creaking(&self, id: EntityId) -> Option<&Creaking> {
        self.creakings.iter().find(|c| c.id() == id)
    }

    pub fn creaking_mut(&mut self, id: EntityId) -> Option<&mut Creaking> {
        self.creakings.iter_mut().find(|c| c.id() == id)
    }

    /// Take a Creaking out of the world, its brain shut down.
    pub fn remove_creaking(&mut self, id: EntityId) -> Result<Creaking, WorldError> {
        let index = self
            .creakings
            .iter()
            .position(|c| c.id() == id)
            .ok_or(WorldError::UnknownEntity(id))?;
        let snapshot = self.snapshot();
        let mut creaking = self.creakings.remove(index);
        creaking.shut_down(&snapshot);
        log::debug!("Removed {}", id);
        Ok(creaking)
    }

    pub fn entity_snapshots(&self) -> impl Iterator<Item = EntitySnapshot> + '_ {
        self.players
            .iter()
            .map(Player::snapshot)
            .chain(self.creatures.iter().map(Creature::snapshot))
            .chain(self.creakings.iter().map(|c| c.body().snapshot()))
    }

    /// Freeze the current state for one AI phase.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(self.game_time, Arc::clone(&self.terrain), self.entity_snapshots())
    }

    /// Advance one tick: every brain runs against the same snapshot, then
    /// queued actions are applied and bodies move.
    pub fn tick(&mut self) -> TickReport {
        let snapshot = self.snapshot();
        let mut report = TickReport {
            game_time: self.game_time,
            ..TickReport::default()
        };

        let mut actions = Vec::new();
        for creaking in &mut self.creakings {
            creaking.tick(&snapshot, &self.config.creaking);
            actions.extend(creaking.take_actions());
        }

        for action in actions {
            if let Some(dead) = self.apply(action) {
                report.deaths.push(dead);
            }
            report.hits.push(action);
        }

        for creaking in &mut self.creakings {
            creaking.travel(&self.terrain);
        }

        self.game_time += 1;
        report
    }

    /// Apply one action; returns the id of an entity it killed.
    fn apply(&mut self, action: MobAction) -> Option<EntityId> {
        match action {
            MobAction::MeleeAttack {
                attacker,
                target,
                damage,
            } => {
                let health = self
                    .players
                    .iter_mut()
                    .find(|p| p.id == target)
                    .map(|p| &mut p.health)
                    .or_else(|| {
                        self.creatures
                            .iter_mut()
                            .find(|c| c.id == target)
                            .map(|c| &mut c.health)
                    });
                let Some(health) = health else {
                    log::warn!("{} attacked missing entity {}", attacker, target);
                    return None;
                };
                if health.take_damage(damage) {
                    log::info!("{} killed {}", attacker, target);
                    Some(target)
                } else {
                    None
                }
            }
        }
    }

    /// Entities whose bounds pass the frustum test, in spawn order.
    pub fn visible_entities(&self, frustum: &Frustum) -> Vec<EntityId> {
        self.entity_snapshots()
            .filter(|e| frustum.is_visible(&e.culling_box()))
            .map(|e| e.id)
            .collect()
    }
}
