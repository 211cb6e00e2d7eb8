//! In-memory world and mob doubles for unit tests

use std::cell::RefCell;
use std::rc::Rc;

use ahash::HashSet;
use glam::{DVec3, IVec3};
use mobsight_culling::{Aabb, BlockBox};

use crate::behavior::{Behavior, BehaviorContext, BehaviorControl, BehaviorStatus, Started};
use crate::memory::{MemoryKey, MemoryStore};
use crate::traits::{Mob, MobAction, Navigation, Path, WorldQuery};
use crate::types::{Attributes, EntityId, EntityKind, EntitySnapshot};
use crate::BrainRng;

pub fn snapshot(id: EntityId, kind: EntityKind, position: DVec3) -> EntitySnapshot {
    EntitySnapshot {
        id,
        kind,
        position,
        look_direction: DVec3::NEG_Z,
        eye_height: 1.6,
        half_width: 0.3,
        height: 1.8,
        alive: true,
        attackable: true,
        no_culling: false,
    }
}

#[derive(Default)]
pub struct TestWorld {
    pub game_time: u64,
    pub entities: Vec<EntitySnapshot>,
    pub sight_blocked: HashSet<EntityId>,
    /// `None` makes every block walkable
    pub walkable: Option<BlockBox>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_snapshot(&mut self, snapshot: EntitySnapshot) -> EntityId {
        self.entities.retain(|e| e.id != snapshot.id);
        self.entities.push(snapshot);
        snapshot.id
    }

    pub fn add_creature(&mut self, id: EntityId, position: DVec3) -> EntityId {
        self.add_snapshot(snapshot(id, EntityKind::Creature, position))
    }

    pub fn add_player(&mut self, id: EntityId, position: DVec3) -> EntityId {
        self.add_snapshot(snapshot(id, EntityKind::Player, position))
    }

    pub fn kill(&mut self, id: EntityId) {
        self.update(id, |e| e.alive = false);
    }

    pub fn set_attackable(&mut self, id: EntityId, attackable: bool) {
        self.update(id, |e| e.attackable = attackable);
    }

    pub fn move_entity(&mut self, id: EntityId, position: DVec3) {
        self.update(id, |e| e.position = position);
    }

    pub fn block_sight(&mut self, id: EntityId) {
        self.sight_blocked.insert(id);
    }

    fn update(&mut self, id: EntityId, f: impl FnOnce(&mut EntitySnapshot)) {
        if let Some(entity) = self.entities.iter_mut().find(|e| e.id == id) {
            f(entity);
        }
    }
}

impl WorldQuery for TestWorld {
    fn game_time(&self) -> u64 {
        self.game_time
    }

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.entities.iter().find(|e| e.id == id).copied()
    }

    fn entities_in(&self, region: &Aabb, filter: &dyn Fn(&EntitySnapshot) -> bool) -> Vec<EntitySnapshot> {
        self.entities
            .iter()
            .filter(|e| region.intersects(&e.bounding_box()) && filter(e))
            .copied()
            .collect()
    }

    fn has_line_of_sight(&self, from: EntityId, to: EntityId) -> bool {
        !self.sight_blocked.contains(&from) && !self.sight_blocked.contains(&to)
    }

    fn is_walkable(&self, pos: IVec3) -> bool {
        self.walkable.map_or(true, |bounds| bounds.contains(pos))
    }
}

#[derive(Default)]
pub struct TestNavigation {
    pub path: Option<Path>,
    pub speed: f64,
    pub unreachable: bool,
    pub stuck: bool,
    pub stops: u32,
}

impl Navigation for TestNavigation {
    fn create_path(&self, _from: DVec3, target: DVec3, _reach: u32) -> Option<Path> {
        if self.unreachable {
            return None;
        }
        let end = target.floor().as_ivec3();
        Some(Path {
            nodes: vec![end],
            target: end,
            reaches_target: true,
        })
    }

    fn follow(&mut self, path: Path, speed: f64) -> bool {
        self.path = Some(path);
        self.speed = speed;
        true
    }

    fn stop(&mut self) {
        self.path = None;
        self.stops += 1;
    }

    fn is_done(&self) -> bool {
        self.path.is_none()
    }

    fn is_stuck(&self) -> bool {
        self.stuck
    }

    fn current_path(&self) -> Option<&Path> {
        self.path.as_ref()
    }
}

pub struct TestMob {
    pub snapshot: EntitySnapshot,
    pub attributes: Attributes,
    pub navigation: TestNavigation,
    pub in_water: bool,
    pub can_move: bool,
    pub jumps: u32,
    pub swings: u32,
    pub looked_at: Option<DVec3>,
    pub actions: Vec<MobAction>,
}

impl TestMob {
    pub fn at(position: DVec3) -> Self {
        Self {
            snapshot: snapshot(EntityId::new(), EntityKind::Creaking, position),
            attributes: Attributes::default(),
            navigation: TestNavigation::default(),
            in_water: false,
            can_move: true,
            jumps: 0,
            swings: 0,
            looked_at: None,
            actions: Vec::new(),
        }
    }

    pub fn can_move(&self) -> bool {
        self.can_move
    }
}

impl Mob for TestMob {
    type Nav = TestNavigation;

    fn snapshot(&self) -> EntitySnapshot {
        self.snapshot
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn navigation(&self) -> &TestNavigation {
        &self.navigation
    }

    fn navigation_mut(&mut self) -> &mut TestNavigation {
        &mut self.navigation
    }

    fn is_in_water(&self) -> bool {
        self.in_water
    }

    fn jump(&mut self) {
        self.jumps += 1;
    }

    fn look_at(&mut self, target: DVec3) {
        self.looked_at = Some(target);
    }

    fn swing(&mut self) {
        self.swings += 1;
    }

    fn push_action(&mut self, action: MobAction) {
        self.actions.push(action);
    }
}

/// Drives a single behavior the way the brain does.
pub struct Harness {
    pub world: TestWorld,
    pub mob: TestMob,
    pub memory: MemoryStore,
    pub rng: BrainRng,
}

impl Harness {
    pub fn new(keys: &[MemoryKey]) -> Self {
        Self {
            world: TestWorld::new(),
            mob: TestMob::at(DVec3::ZERO),
            memory: MemoryStore::new(keys.iter().copied()),
            rng: crate::brain_rng(3),
        }
    }

    pub fn ctx(&mut self) -> BehaviorContext<'_, TestMob> {
        BehaviorContext {
            game_time: self.world.game_time,
            world: &self.world,
            mob: &mut self.mob,
            memory: &mut self.memory,
            rng: &mut self.rng,
        }
    }

    /// Start if stopped, then tick or stop if running, then advance time
    pub fn step(&mut self, behavior: &mut Behavior<TestMob>) {
        let mut ctx = self.ctx();
        if behavior.status() == BehaviorStatus::Stopped {
            behavior.try_start(&mut ctx);
        }
        if behavior.is_running() {
            behavior.tick_or_stop(&mut ctx);
        }
        self.world.game_time += 1;
    }
}

/// Shared log of behavior lifecycle events
pub type EventLog = Rc<RefCell<Vec<String>>>;

/// Runs until stopped and logs `start <label>` and `stop <label>`
pub struct Recorder {
    label: &'static str,
    events: EventLog,
}

impl Recorder {
    pub fn new(label: &'static str, events: &EventLog) -> Self {
        Self {
            label,
            events: Rc::clone(events),
        }
    }
}

impl<M: Mob> BehaviorControl<M> for Recorder {
    fn name(&self) -> &'static str {
        self.label
    }

    fn start(&mut self, _ctx: &mut BehaviorContext<'_, M>) -> Started {
        self.events.borrow_mut().push(format!("start {}", self.label));
        Started::Running
    }

    fn can_still_use(&self, _ctx: &BehaviorContext<'_, M>) -> bool {
        true
    }

    fn stop(&mut self, _ctx: &mut BehaviorContext<'_, M>) {
        self.events.borrow_mut().push(format!("stop {}", self.label));
    }
}
