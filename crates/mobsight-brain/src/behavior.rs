//! Behavior framework
//!
//! A behavior is a guarded action with memory preconditions:
//! - `BehaviorControl`: the capability set every concrete behavior implements
//! - `BehaviorKind`: closed sum of every behavior mobsight knows
//! - `Behavior`: status, duration, guard and stop-time memory erasure around a kind
//!
//! One-shot behaviors do all their work in `start` and report `Started::Finished`,
//! so they are stopped again before the brain moves on.

use rand::Rng;
use smallvec::SmallVec;

use crate::behaviors::{
    DoNothing, LookAtTargetSink, MeleeAttack, MoveToTargetSink, RandomStroll, RunOne,
    SetEntityLookTargetSometimes, SetWalkTargetFromAttackTargetIfTargetOutOfReach,
    SetWalkTargetFromLookTarget, StartAttacking, StopAttackingIfTargetInvalid, Swim,
};
use crate::memory::{MemoryKey, MemoryRequirement, MemoryStatus, MemoryStore};
use crate::traits::{Mob, WorldQuery};
use crate::BrainRng;

/// Start-time predicate on the mob's body.
pub type Guard<M> = fn(&M) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorStatus {
    Stopped,
    Running,
}

/// Outcome of `BehaviorControl::start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Started {
    Running,
    /// One-shot: the effect is complete, stop immediately
    Finished,
}

/// Everything a behavior may touch during one brain tick.
pub struct BehaviorContext<'a, M> {
    pub world: &'a dyn WorldQuery,
    pub mob: &'a mut M,
    pub memory: &'a mut MemoryStore,
    pub rng: &'a mut BrainRng,
    pub game_time: u64,
}

pub trait BehaviorControl<M: Mob> {
    fn name(&self) -> &'static str;

    /// Memory preconditions, all of which must hold before `start`
    fn requirements(&self) -> &'static [MemoryRequirement] {
        &[]
    }

    /// `(min, max)` run time in ticks; `None` never times out
    fn duration(&self) -> Option<(u64, u64)> {
        None
    }

    fn check_extra_start_conditions(&mut self, _ctx: &mut BehaviorContext<'_, M>) -> bool {
        true
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started;

    fn can_still_use(&self, _ctx: &BehaviorContext<'_, M>) -> bool {
        false
    }

    fn tick(&mut self, _ctx: &mut BehaviorContext<'_, M>) {}

    fn stop(&mut self, _ctx: &mut BehaviorContext<'_, M>) {}

    /// Every memory key this behavior (and any children) reads or writes
    fn collect_memory_keys(&self, keys: &mut Vec<MemoryKey>) {
        keys.extend(self.requirements().iter().map(|r| r.key));
    }
}

pub enum BehaviorKind<M> {
    Swim(Swim),
    LookAtTargetSink(LookAtTargetSink),
    MoveToTargetSink(MoveToTargetSink),
    StartAttacking(StartAttacking<M>),
    SetEntityLookTargetSometimes(SetEntityLookTargetSometimes),
    RandomStroll(RandomStroll),
    SetWalkTargetFromLookTarget(SetWalkTargetFromLookTarget),
    DoNothing(DoNothing),
    RunOne(RunOne<M>),
    SetWalkTargetFromAttackTargetIfTargetOutOfReach(SetWalkTargetFromAttackTargetIfTargetOutOfReach),
    MeleeAttack(MeleeAttack),
    StopAttackingIfTargetInvalid(StopAttackingIfTargetInvalid<M>),
    #[cfg(test)]
    Recorder(crate::testing::Recorder),
}

macro_rules! dispatch {
    ($kind:expr, $inner:ident => $body:expr) => {
        match $kind {
            BehaviorKind::Swim($inner) => $body,
            BehaviorKind::LookAtTargetSink($inner) => $body,
            BehaviorKind::MoveToTargetSink($inner) => $body,
            BehaviorKind::StartAttacking($inner) => $body,
            BehaviorKind::SetEntityLookTargetSometimes($inner) => $body,
            BehaviorKind::RandomStroll($inner) => $body,
            BehaviorKind::SetWalkTargetFromLookTarget($inner) => $body,
            BehaviorKind::DoNothing($inner) => $body,
            BehaviorKind::RunOne($inner) => $body,
            BehaviorKind::SetWalkTargetFromAttackTargetIfTargetOutOfReach($inner) => $body,
            BehaviorKind::MeleeAttack($inner) => $body,
            BehaviorKind::StopAttackingIfTargetInvalid($inner) => $body,
            #[cfg(test)]
            BehaviorKind::Recorder($inner) => $body,
        }
    };
}

macro_rules! impl_from_kind {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl<M: Mob> From<$ty> for BehaviorKind<M> {
                fn from(inner: $ty) -> Self {
                    BehaviorKind::$variant(inner)
                }
            }
        )*
    };
}

impl_from_kind! {
    Swim => Swim,
    LookAtTargetSink => LookAtTargetSink,
    MoveToTargetSink => MoveToTargetSink,
    StartAttacking => StartAttacking<M>,
    SetEntityLookTargetSometimes => SetEntityLookTargetSometimes,
    RandomStroll => RandomStroll,
    SetWalkTargetFromLookTarget => SetWalkTargetFromLookTarget,
    DoNothing => DoNothing,
    RunOne => RunOne<M>,
    SetWalkTargetFromAttackTargetIfTargetOutOfReach => SetWalkTargetFromAttackTargetIfTargetOutOfReach,
    MeleeAttack => MeleeAttack,
    StopAttackingIfTargetInvalid => StopAttackingIfTargetInvalid<M>,
}

#[cfg(test)]
impl_from_kind! {
    Recorder => crate::testing::Recorder,
}

impl<M: Mob> BehaviorControl<M> for BehaviorKind<M> {
    fn name(&self) -> &'static str {
        dispatch!(self, b => BehaviorControl::<M>::name(b))
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        dispatch!(self, b => BehaviorControl::<M>::requirements(b))
    }

    fn duration(&self) -> Option<(u64, u64)> {
        dispatch!(self, b => BehaviorControl::<M>::duration(b))
    }

    fn check_extra_start_conditions(&mut self, ctx: &mut BehaviorContext<'_, M>) -> bool {
        dispatch!(self, b => b.check_extra_start_conditions(ctx))
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        dispatch!(self, b => b.start(ctx))
    }

    fn can_still_use(&self, ctx: &BehaviorContext<'_, M>) -> bool {
        dispatch!(self, b => b.can_still_use(ctx))
    }

    fn tick(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        dispatch!(self, b => b.tick(ctx))
    }

    fn stop(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        dispatch!(self, b => b.stop(ctx))
    }

    fn collect_memory_keys(&self, keys: &mut Vec<MemoryKey>) {
        dispatch!(self, b => BehaviorControl::<M>::collect_memory_keys(b, keys))
    }
}

/// A schedulable behavior instance.
pub struct Behavior<M> {
    kind: BehaviorKind<M>,
    extra_requirements: SmallVec<[MemoryRequirement; 2]>,
    guard: Option<Guard<M>>,
    erase_on_stop: SmallVec<[MemoryKey; 2]>,
    duration: Option<(u64, u64)>,
    status: BehaviorStatus,
    end_time: u64,
    started_at: Option<u64>,
}

impl<M: Mob> Behavior<M> {
    pub fn new(kind: impl Into<BehaviorKind<M>>) -> Self {
        let kind = kind.into();
        let duration = kind.duration();
        Self {
            kind,
            extra_requirements: SmallVec::new(),
            guard: None,
            erase_on_stop: SmallVec::new(),
            duration,
            status: BehaviorStatus::Stopped,
            end_time: 0,
            started_at: None,
        }
    }

    /// Only start while `guard` holds for the mob.
    pub fn with_guard(mut self, guard: Guard<M>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a precondition on top of the kind's own requirements.
    pub fn requiring(mut self, requirement: MemoryRequirement) -> Self {
        self.extra_requirements.push(requirement);
        self
    }

    /// Erase `key` every time this behavior stops, whatever the outcome.
    pub fn erase_memory_when_stopped(mut self, key: MemoryKey) -> Self {
        self.erase_on_stop.push(key);
        self
    }

    pub fn with_duration(mut self, min: u64, max: u64) -> Self {
        self.duration = Some((min.min(max), max.max(min)));
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn kind(&self) -> &BehaviorKind<M> {
        &self.kind
    }

    pub fn status(&self) -> BehaviorStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == BehaviorStatus::Running
    }

    /// Game time of the most recent start
    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn has_required_memories(&self, memory: &MemoryStore) -> bool {
        self.kind
            .requirements()
            .iter()
            .chain(self.extra_requirements.iter())
            .all(|requirement| memory.meets(requirement))
    }

    /// Keys this behavior depends on, used for brain wiring validation.
    pub fn memory_keys(&self) -> Vec<MemoryKey> {
        let mut keys = Vec::new();
        self.kind.collect_memory_keys(&mut keys);
        keys.extend(self.extra_requirements.iter().map(|r| r.key));
        keys.extend(self.erase_on_stop.iter().copied());
        keys
    }

    /// Keys that must hold a value before this behavior (or one of its children) can start.
    pub fn required_present_keys(&self) -> Vec<MemoryKey> {
        let mut keys: Vec<MemoryKey> = self
            .kind
            .requirements()
            .iter()
            .chain(self.extra_requirements.iter())
            .filter(|requirement| requirement.status == MemoryStatus::Present)
            .map(|requirement| requirement.key)
            .collect();
        if let BehaviorKind::RunOne(run_one) = &self.kind {
            for child in run_one.children() {
                keys.extend(child.required_present_keys());
            }
        }
        keys
    }

    /// Start if stopped and every precondition holds. Returns whether it started.
    pub fn try_start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> bool {
        if self.status != BehaviorStatus::Stopped || !self.has_required_memories(ctx.memory) {
            return false;
        }
        if let Some(guard) = self.guard {
            if !guard(ctx.mob) {
                return false;
            }
        }
        if !self.kind.check_extra_start_conditions(ctx) {
            return false;
        }

        self.status = BehaviorStatus::Running;
        self.started_at = Some(ctx.game_time);
        self.end_time = match self.duration {
            Some((min, max)) => ctx.game_time.saturating_add(ctx.rng.gen_range(min..=max)),
            None => u64::MAX,
        };
        log::trace!("{} started {} at tick {}", ctx.mob.id(), self.name(), ctx.game_time);

        if self.kind.start(ctx) == Started::Finished {
            self.do_stop(ctx);
        }
        true
    }

    /// Tick while usable, otherwise stop.
    pub fn tick_or_stop(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        if self.status != BehaviorStatus::Running {
            return;
        }
        let timed_out = ctx.game_time > self.end_time;
        if timed_out || !self.kind.can_still_use(ctx) {
            self.do_stop(ctx);
            return;
        }

        self.kind.tick(ctx);

        // Gates end in the same tick their last running child did
        if matches!(self.kind, BehaviorKind::RunOne(_)) && !self.kind.can_still_use(ctx) {
            self.do_stop(ctx);
        }
    }

    pub fn do_stop(&mut self, ctx: &mut BehaviorContext<'_, M>) {
        self.status = BehaviorStatus::Stopped;
        self.kind.stop(ctx);
        for key in &self.erase_on_stop {
            ctx.memory.erase(*key);
        }
        log::trace!("{} stopped {} at tick {}", ctx.mob.id(), self.name(), ctx.game_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStatus, MemoryValue, PositionTracker, WalkTarget};
    use crate::testing::{Harness, TestMob};
    use crate::types::EntityId;
    use glam::IVec3;

    fn harness() -> Harness {
        Harness::new(&[
            MemoryKey::AttackTarget,
            MemoryKey::WalkTarget,
            MemoryKey::LookTarget,
            MemoryKey::CantReachWalkTargetSince,
        ])
    }

    fn walk_target() -> MemoryValue {
        MemoryValue::Walk(WalkTarget {
            target: PositionTracker::Block(IVec3::new(4, 0, 4)),
            speed_modifier: 1.0,
            close_enough: 1,
        })
    }

    fn gated_do_nothing() -> Behavior<TestMob> {
        Behavior::new(DoNothing::new(5, 5))
            .requiring(MemoryRequirement::present(MemoryKey::AttackTarget))
            .requiring(MemoryRequirement::absent(MemoryKey::WalkTarget))
    }

    #[test]
    fn test_requirements_gate_start() {
        let mut h = harness();
        let mut behavior = gated_do_nothing();

        // A absent
        h.step(&mut behavior);
        assert_eq!(behavior.status(), BehaviorStatus::Stopped);

        // A present, B present
        h.memory.set(MemoryKey::AttackTarget, MemoryValue::Entity(EntityId::from_raw(77)));
        h.memory.set(MemoryKey::WalkTarget, walk_target());
        h.step(&mut behavior);
        assert_eq!(behavior.status(), BehaviorStatus::Stopped);

        // A present, B absent
        h.memory.erase(MemoryKey::WalkTarget);
        h.step(&mut behavior);
        assert!(behavior.is_running());
    }

    #[test]
    fn test_with_duration_overrides_kind_duration() {
        let mut h = harness();
        h.memory.set(MemoryKey::AttackTarget, MemoryValue::Entity(EntityId::from_raw(79)));
        let mut behavior = gated_do_nothing().with_duration(2, 2);

        for _ in 0..3 {
            h.step(&mut behavior);
            assert!(behavior.is_running());
        }
        h.step(&mut behavior);
        assert_eq!(behavior.status(), BehaviorStatus::Stopped);

        let swapped: Behavior<TestMob> = Behavior::new(DoNothing::new(5, 5)).with_duration(4, 1);
        assert_eq!(swapped.duration, Some((1, 4)));
    }

    #[test]
    fn test_starts_once_until_continuation_fails() {
        let mut h = harness();
        h.memory.set(MemoryKey::AttackTarget, MemoryValue::Entity(EntityId::from_raw(78)));
        let mut behavior = gated_do_nothing();

        h.step(&mut behavior);
        let first_start = behavior.started_at();
        assert_eq!(first_start, Some(0));

        // Running for its fixed 5 tick duration without restarting
        for _ in 0..5 {
            h.step(&mut behavior);
            assert!(behavior.is_running());
            assert_eq!(behavior.started_at(), first_start);
        }

        // Tick 6 exceeds the end stamp: stopped, then eligible again next tick
        h.step(&mut behavior);
        assert_eq!(behavior.status(), BehaviorStatus::Stopped);
        h.step(&mut behavior);
        assert_eq!(behavior.started_at(), Some(7));
    }

    #[test]
    fn test_erase_on_stop_after_timeout() {
        let mut h = harness();
        let mut behavior = Behavior::new(DoNothing::new(2, 2)).erase_memory_when_stopped(MemoryKey::LookTarget);
        h.memory.set(MemoryKey::LookTarget, MemoryValue::Look(PositionTracker::Block(IVec3::ONE)));

        h.step(&mut behavior);
        h.step(&mut behavior);
        h.step(&mut behavior);
        assert!(behavior.is_running());
        assert!(h.memory.check(MemoryKey::LookTarget, MemoryStatus::Present));

        h.step(&mut behavior);
        assert_eq!(behavior.status(), BehaviorStatus::Stopped);
        assert!(h.memory.check(MemoryKey::LookTarget, MemoryStatus::Absent));
    }

    #[test]
    fn test_erase_on_stop_after_failed_continuation() {
        let mut h = harness();
        h.mob.in_water = true;
        let mut behavior = Behavior::new(Swim::new(1.0)).erase_memory_when_stopped(MemoryKey::WalkTarget);

        h.step(&mut behavior);
        assert!(behavior.is_running());
        assert!(h.mob.jumps > 0);

        h.memory.set(MemoryKey::WalkTarget, walk_target());
        h.mob.in_water = false;
        h.step(&mut behavior);
        assert_eq!(behavior.status(), BehaviorStatus::Stopped);
        assert!(h.memory.check(MemoryKey::WalkTarget, MemoryStatus::Absent));
    }

    #[test]
    fn test_guard_blocks_start() {
        let mut h = harness();
        h.mob.in_water = true;
        h.mob.can_move = false;
        let mut behavior = Behavior::new(Swim::new(0.8)).with_guard(TestMob::can_move);

        h.step(&mut behavior);
        assert_eq!(behavior.status(), BehaviorStatus::Stopped);

        h.mob.can_move = true;
        h.step(&mut behavior);
        assert!(behavior.is_running());
    }

    #[test]
    fn test_memory_keys_cover_requirements_and_erasure() {
        let behavior = gated_do_nothing().erase_memory_when_stopped(MemoryKey::LookTarget);
        let keys = behavior.memory_keys();
        assert!(keys.contains(&MemoryKey::AttackTarget));
        assert!(keys.contains(&MemoryKey::WalkTarget));
        assert!(keys.contains(&MemoryKey::LookTarget));
    }
}
