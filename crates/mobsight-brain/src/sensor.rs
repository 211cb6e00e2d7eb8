//! Periodic world sensing
//!
//! Each sensor owns a cadence and writes a fixed set of memories. Results are
//! sorted by squared distance and fully replace what the previous run wrote.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::memory::{MemoryKey, MemoryStore, MemoryValue};
use crate::nearest::{NearestVisibleLivingEntities, SensedEntity};
use crate::traits::{Mob, WorldQuery};
use crate::types::{EntityKind, EntitySnapshot};
use crate::BrainRng;

/// Default ticks between two runs of a sensor.
pub const DEFAULT_SCAN_RATE: u64 = 20;

/// Sensor cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub nearest_living_scan_rate: u64,
    pub nearest_players_scan_rate: u64,
    /// Spread each sensor's first run over its scan rate
    pub random_start_offset: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            nearest_living_scan_rate: DEFAULT_SCAN_RATE,
            nearest_players_scan_rate: DEFAULT_SCAN_RATE,
            random_start_offset: false,
        }
    }
}

impl SensorConfig {
    pub fn scan_rate(&self, kind: SensorKind) -> u64 {
        let rate = match kind {
            SensorKind::NearestLivingEntities => self.nearest_living_scan_rate,
            SensorKind::NearestPlayers => self.nearest_players_scan_rate,
        };
        rate.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    NearestLivingEntities,
    NearestPlayers,
}

impl SensorKind {
    pub const ALL: [SensorKind; 2] = [SensorKind::NearestLivingEntities, SensorKind::NearestPlayers];

    /// The sensor kind that writes `key`, if any sensor does
    pub fn writer_of(key: MemoryKey) -> Option<SensorKind> {
        Self::ALL.into_iter().find(|kind| kind.requires().contains(&key))
    }

    /// Memories this sensor writes
    pub fn requires(self) -> &'static [MemoryKey] {
        match self {
            SensorKind::NearestLivingEntities => &[
                MemoryKey::NearestLivingEntities,
                MemoryKey::NearestVisibleLivingEntities,
            ],
            SensorKind::NearestPlayers => &[
                MemoryKey::NearestPlayers,
                MemoryKey::NearestVisiblePlayer,
                MemoryKey::NearestVisibleAttackablePlayer,
                MemoryKey::NearestVisibleAttackablePlayers,
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sensor {
    kind: SensorKind,
    scan_rate: u64,
    time_to_tick: u64,
}

impl Sensor {
    /// Sensor that runs on the first brain tick, then every `scan_rate` ticks.
    pub fn new(kind: SensorKind, scan_rate: u64) -> Self {
        Self {
            kind,
            scan_rate: scan_rate.max(1),
            time_to_tick: 0,
        }
    }

    pub fn from_config(kind: SensorKind, config: &SensorConfig, rng: &mut BrainRng) -> Self {
        let mut sensor = Self::new(kind, config.scan_rate(kind));
        if config.random_start_offset {
            sensor.time_to_tick = rng.gen_range(0..sensor.scan_rate);
        }
        sensor
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn scan_rate(&self) -> u64 {
        self.scan_rate
    }

    pub fn requires(&self) -> &'static [MemoryKey] {
        self.kind.requires()
    }

    /// Count down and sense when due. Returns whether the sensor ran.
    pub fn tick<M: Mob>(&mut self, world: &dyn WorldQuery, mob: &M, memory: &mut MemoryStore) -> bool {
        if self.time_to_tick > 1 {
            self.time_to_tick -= 1;
            return false;
        }
        self.time_to_tick = self.scan_rate;
        match self.kind {
            SensorKind::NearestLivingEntities => sense_living_entities(world, mob, memory),
            SensorKind::NearestPlayers => sense_players(world, mob, memory),
        }
        true
    }
}

fn sense_living_entities<M: Mob>(world: &dyn WorldQuery, mob: &M, memory: &mut MemoryStore) {
    let me = mob.snapshot();
    let range = mob.attributes().follow_range;
    let region = me.bounding_box().inflate(range);

    let mut found = world.entities_in(&region, &|e: &EntitySnapshot| e.id != me.id && e.alive);
    found.sort_by(|a, b| {
        a.distance_squared_to(me.position)
            .total_cmp(&b.distance_squared_to(me.position))
    });

    let ids = found.iter().map(|e| e.id).collect();
    memory.set_sensed(MemoryKey::NearestLivingEntities, MemoryValue::Entities(ids));

    let sensed = found
        .into_iter()
        .map(|snapshot| {
            let distance_sq = snapshot.distance_squared_to(me.position);
            SensedEntity {
                snapshot,
                distance_sq,
                visible: distance_sq <= range * range && world.has_line_of_sight(me.id, snapshot.id),
            }
        })
        .collect();
    memory.set_sensed(
        MemoryKey::NearestVisibleLivingEntities,
        MemoryValue::NearestVisible(NearestVisibleLivingEntities::new(sensed)),
    );
}

fn sense_players<M: Mob>(world: &dyn WorldQuery, mob: &M, memory: &mut MemoryStore) {
    let me = mob.snapshot();
    let range = mob.attributes().follow_range;
    let region = me.bounding_box().inflate(range);

    let mut players = world.entities_in(&region, &|e: &EntitySnapshot| {
        e.kind == EntityKind::Player && e.alive && e.distance_squared_to(me.position) <= range * range
    });
    players.sort_by(|a, b| {
        a.distance_squared_to(me.position)
            .total_cmp(&b.distance_squared_to(me.position))
    });

    memory.set_sensed(
        MemoryKey::NearestPlayers,
        MemoryValue::Entities(players.iter().map(|p| p.id).collect()),
    );

    let visible: Vec<&EntitySnapshot> = players
        .iter()
        .filter(|p| world.has_line_of_sight(me.id, p.id))
        .collect();
    memory.set_or_erase(
        MemoryKey::NearestVisiblePlayer,
        visible.first().map(|p| MemoryValue::Entity(p.id)),
    );

    let attackable: Vec<_> = visible
        .iter()
        .filter(|p| mob.can_attack_target(p))
        .map(|p| p.id)
        .collect();
    memory.set_or_erase(
        MemoryKey::NearestVisibleAttackablePlayer,
        attackable.first().map(|id| MemoryValue::Entity(*id)),
    );
    memory.set_sensed(
        MemoryKey::NearestVisibleAttackablePlayers,
        MemoryValue::Entities(attackable),
    );
}
