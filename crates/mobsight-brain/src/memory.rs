//! Typed per-brain memory with expiry
//!
//! - `MemoryKey`: closed set of memory slots, each bound to one `MemoryKind`
//! - `MemoryStore`: registered slots, optionally holding an `ExpirableValue`
//! - `MemoryStatus`/`MemoryRequirement`: preconditions checked before a behavior starts

use ahash::HashMap;
use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

use crate::nearest::NearestVisibleLivingEntities;
use crate::traits::{Path, WorldQuery};
use crate::types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryKey {
    NearestLivingEntities,
    NearestVisibleLivingEntities,
    NearestPlayers,
    NearestVisiblePlayer,
    NearestVisibleAttackablePlayer,
    NearestVisibleAttackablePlayers,
    LookTarget,
    WalkTarget,
    CantReachWalkTargetSince,
    Path,
    AttackTarget,
    AttackCoolingDown,
}

/// Shape of the value a key may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    Flag,
    Tick,
    Entity,
    Entities,
    NearestVisible,
    Look,
    Walk,
    Path,
}

/// What a sensor does with an empty result for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Store the empty collection, the key stays present
    StoreEmpty,
    /// Erase the key
    Erase,
}

impl MemoryKey {
    pub fn kind(self) -> MemoryKind {
        match self {
            MemoryKey::NearestLivingEntities
            | MemoryKey::NearestPlayers
            | MemoryKey::NearestVisibleAttackablePlayers => MemoryKind::Entities,
            MemoryKey::NearestVisibleLivingEntities => MemoryKind::NearestVisible,
            MemoryKey::NearestVisiblePlayer
            | MemoryKey::NearestVisibleAttackablePlayer
            | MemoryKey::AttackTarget => MemoryKind::Entity,
            MemoryKey::LookTarget => MemoryKind::Look,
            MemoryKey::WalkTarget => MemoryKind::Walk,
            MemoryKey::CantReachWalkTargetSince => MemoryKind::Tick,
            MemoryKey::Path => MemoryKind::Path,
            MemoryKey::AttackCoolingDown => MemoryKind::Flag,
        }
    }

    pub fn empty_policy(self) -> EmptyPolicy {
        match self {
            MemoryKey::NearestLivingEntities
            | MemoryKey::NearestVisibleLivingEntities
            | MemoryKey::NearestPlayers
            | MemoryKey::NearestVisibleAttackablePlayers => EmptyPolicy::StoreEmpty,
            _ => EmptyPolicy::Erase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryStatus {
    Present,
    Absent,
    /// Declared, with or without a value
    Registered,
}

/// A (key, status) precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirement {
    pub key: MemoryKey,
    pub status: MemoryStatus,
}

impl MemoryRequirement {
    pub const fn present(key: MemoryKey) -> Self {
        Self { key, status: MemoryStatus::Present }
    }

    pub const fn absent(key: MemoryKey) -> Self {
        Self { key, status: MemoryStatus::Absent }
    }

    pub const fn registered(key: MemoryKey) -> Self {
        Self { key, status: MemoryStatus::Registered }
    }
}

/// Something a mob can look or walk at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionTracker {
    Entity {
        id: EntityId,
        line_of_sight_required: bool,
    },
    Block(IVec3),
}

impl PositionTracker {
    pub fn entity(id: EntityId) -> Self {
        PositionTracker::Entity {
            id,
            line_of_sight_required: true,
        }
    }

    /// Feet position of a tracked entity, or the bottom center of a block.
    pub fn position(&self, world: &dyn WorldQuery) -> Option<DVec3> {
        match self {
            PositionTracker::Entity { id, .. } => world.entity(*id).map(|e| e.position),
            PositionTracker::Block(pos) => Some(pos.as_dvec3() + DVec3::new(0.5, 0.0, 0.5)),
        }
    }

    /// Eye position of a tracked entity, or the center of a block.
    pub fn look_position(&self, world: &dyn WorldQuery) -> Option<DVec3> {
        match self {
            PositionTracker::Entity { id, .. } => world.entity(*id).map(|e| e.eye_position()),
            PositionTracker::Block(pos) => Some(pos.as_dvec3() + DVec3::splat(0.5)),
        }
    }

    pub fn block_position(&self, world: &dyn WorldQuery) -> Option<IVec3> {
        match self {
            PositionTracker::Entity { .. } => self.position(world).map(|p| p.floor().as_ivec3()),
            PositionTracker::Block(pos) => Some(*pos),
        }
    }

    /// Entity trackers need the target alive and, when required, in this
    /// tick's visible-entity snapshot. Block trackers are always visible.
    pub fn is_visible(&self, world: &dyn WorldQuery, memory: &MemoryStore) -> bool {
        match self {
            PositionTracker::Entity {
                id,
                line_of_sight_required,
            } => {
                let alive = world.entity(*id).is_some_and(|e| e.alive);
                alive
                    && (!line_of_sight_required
                        || memory.nearest_visible().is_some_and(|n| n.contains(*id)))
            }
            PositionTracker::Block(_) => true,
        }
    }

    pub fn tracked_entity(&self) -> Option<EntityId> {
        match self {
            PositionTracker::Entity { id, .. } => Some(*id),
            PositionTracker::Block(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkTarget {
    pub target: PositionTracker,
    pub speed_modifier: f64,
    /// Manhattan distance in blocks that counts as arrived
    pub close_enough: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    Flag,
    Tick(u64),
    Entity(EntityId),
    Entities(Vec<EntityId>),
    NearestVisible(NearestVisibleLivingEntities),
    Look(PositionTracker),
    Walk(WalkTarget),
    Path(Path),
}

impl MemoryValue {
    pub fn kind(&self) -> MemoryKind {
        match self {
            MemoryValue::Flag => MemoryKind::Flag,
            MemoryValue::Tick(_) => MemoryKind::Tick,
            MemoryValue::Entity(_) => MemoryKind::Entity,
            MemoryValue::Entities(_) => MemoryKind::Entities,
            MemoryValue::NearestVisible(_) => MemoryKind::NearestVisible,
            MemoryValue::Look(_) => MemoryKind::Look,
            MemoryValue::Walk(_) => MemoryKind::Walk,
            MemoryValue::Path(_) => MemoryKind::Path,
        }
    }

    fn is_empty_collection(&self) -> bool {
        match self {
            MemoryValue::Entities(ids) => ids.is_empty(),
            MemoryValue::NearestVisible(nearest) => nearest.is_empty(),
            _ => false,
        }
    }
}

/// A memory value with an optional time to live in ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpirableValue {
    value: MemoryValue,
    ttl: Option<u64>,
}

impl ExpirableValue {
    pub fn permanent(value: MemoryValue) -> Self {
        Self { value, ttl: None }
    }

    pub fn expiring(value: MemoryValue, ttl: u64) -> Self {
        Self {
            value,
            ttl: Some(ttl),
        }
    }

    pub fn value(&self) -> &MemoryValue {
        &self.value
    }

    pub fn ttl(&self) -> Option<u64> {
        self.ttl
    }

    fn tick(&mut self) {
        if let Some(ttl) = self.ttl.as_mut() {
            *ttl = ttl.saturating_sub(1);
        }
    }

    fn has_expired(&self) -> bool {
        self.ttl == Some(0)
    }
}

/// Registered memory slots of one brain.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<MemoryKey, Option<ExpirableValue>>,
}

impl MemoryStore {
    pub fn new(keys: impl IntoIterator<Item = MemoryKey>) -> Self {
        let mut store = Self::default();
        for key in keys {
            store.register(key);
        }
        store
    }

    pub fn register(&mut self, key: MemoryKey) {
        self.slots.entry(key).or_insert(None);
    }

    pub fn is_registered(&self, key: MemoryKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn registered_keys(&self) -> impl Iterator<Item = MemoryKey> + '_ {
        self.slots.keys().copied()
    }

    pub fn has_value(&self, key: MemoryKey) -> bool {
        matches!(self.slots.get(&key), Some(Some(_)))
    }

    /// Unregistered keys satisfy no status, not even `Absent`.
    pub fn check(&self, key: MemoryKey, status: MemoryStatus) -> bool {
        match self.slots.get(&key) {
            None => false,
            Some(slot) => match status {
                MemoryStatus::Registered => true,
                MemoryStatus::Present => slot.is_some(),
                MemoryStatus::Absent => slot.is_none(),
            },
        }
    }

    pub fn meets(&self, requirement: &MemoryRequirement) -> bool {
        self.check(requirement.key, requirement.status)
    }

    pub fn get(&self, key: MemoryKey) -> Option<&MemoryValue> {
        self.slots
            .get(&key)
            .and_then(|slot| slot.as_ref())
            .map(ExpirableValue::value)
    }

    /// Remaining ticks for an expiring value
    pub fn ttl(&self, key: MemoryKey) -> Option<u64> {
        self.slots
            .get(&key)
            .and_then(|slot| slot.as_ref())
            .and_then(ExpirableValue::ttl)
    }

    pub fn set(&mut self, key: MemoryKey, value: MemoryValue) {
        self.insert(key, ExpirableValue::permanent(value));
    }

    pub fn set_with_expiry(&mut self, key: MemoryKey, value: MemoryValue, ttl: u64) {
        self.insert(key, ExpirableValue::expiring(value, ttl));
    }

    /// Set when `Some`, erase when `None`.
    pub fn set_or_erase(&mut self, key: MemoryKey, value: Option<MemoryValue>) {
        match value {
            Some(value) => self.set(key, value),
            None => self.erase(key),
        }
    }

    /// Write a sensor result, honoring the key's [`EmptyPolicy`].
    pub fn set_sensed(&mut self, key: MemoryKey, value: MemoryValue) {
        if value.is_empty_collection() && key.empty_policy() == EmptyPolicy::Erase {
            self.erase(key);
        } else {
            self.set(key, value);
        }
    }

    pub fn erase(&mut self, key: MemoryKey) {
        if let Some(slot) = self.slots.get_mut(&key) {
            *slot = None;
        }
    }

    /// Tick every expiring value once and drop the ones that ran out.
    pub fn forget_outdated(&mut self) {
        for (key, slot) in self.slots.iter_mut() {
            if let Some(value) = slot.as_mut() {
                value.tick();
                if value.has_expired() {
                    log::trace!("Memory {:?} expired", key);
                    *slot = None;
                }
            }
        }
    }

    pub fn entity(&self, key: MemoryKey) -> Option<EntityId> {
        match self.get(key) {
            Some(MemoryValue::Entity(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn entities(&self, key: MemoryKey) -> Option<&[EntityId]> {
        match self.get(key) {
            Some(MemoryValue::Entities(ids)) => Some(ids),
            _ => None,
        }
    }

    pub fn tick_stamp(&self, key: MemoryKey) -> Option<u64> {
        match self.get(key) {
            Some(MemoryValue::Tick(tick)) => Some(*tick),
            _ => None,
        }
    }

    pub fn nearest_visible(&self) -> Option<&NearestVisibleLivingEntities> {
        match self.get(MemoryKey::NearestVisibleLivingEntities) {
            Some(MemoryValue::NearestVisible(nearest)) => Some(nearest),
            _ => None,
        }
    }

    pub fn look_target(&self) -> Option<PositionTracker> {
        match self.get(MemoryKey::LookTarget) {
            Some(MemoryValue::Look(tracker)) => Some(*tracker),
            _ => None,
        }
    }

    pub fn walk_target(&self) -> Option<WalkTarget> {
        match self.get(MemoryKey::WalkTarget) {
            Some(MemoryValue::Walk(target)) => Some(*target),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self.get(MemoryKey::Path) {
            Some(MemoryValue::Path(path)) => Some(path),
            _ => None,
        }
    }

    fn insert(&mut self, key: MemoryKey, value: ExpirableValue) {
        let Some(slot) = self.slots.get_mut(&key) else {
            log::trace!("Ignoring write to unregistered memory {:?}", key);
            return;
        };
        if value.value().kind() != key.kind() {
            log::error!(
                "Memory {:?} holds {:?} values, rejected {:?}",
                key,
                key.kind(),
                value.value().kind()
            );
            return;
        }
        *slot = Some(value);
    }
}
