//! Target acquisition and melee behaviors

use crate::behavior::{BehaviorContext, BehaviorControl, Started};
use crate::memory::{MemoryKey, MemoryRequirement, MemoryStore, MemoryValue, PositionTracker, WalkTarget};
use crate::traits::{Mob, MobAction};
use crate::types::{EntityId, EntitySnapshot};

/// Ticks of `CantReachWalkTargetSince` after which an attacker gives up.
pub const TIMEOUT_TO_GET_WITHIN_ATTACK_RANGE: u64 = 200;

static START_ATTACKING_REQUIREMENTS: [MemoryRequirement; 2] = [
    MemoryRequirement::absent(MemoryKey::AttackTarget),
    MemoryRequirement::registered(MemoryKey::CantReachWalkTargetSince),
];

/// Promote a remembered candidate to `AttackTarget`.
pub struct StartAttacking<M> {
    can_attack: fn(&M) -> bool,
    find_target: fn(&MemoryStore) -> Option<EntityId>,
    candidate: Option<EntityId>,
}

impl<M: Mob> StartAttacking<M> {
    pub fn new(can_attack: fn(&M) -> bool, find_target: fn(&MemoryStore) -> Option<EntityId>) -> Self {
        Self {
            can_attack,
            find_target,
            candidate: None,
        }
    }
}

impl<M: Mob> BehaviorControl<M> for StartAttacking<M> {
    fn name(&self) -> &'static str {
        "StartAttacking"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &START_ATTACKING_REQUIREMENTS
    }

    fn check_extra_start_conditions(&mut self, ctx: &mut BehaviorContext<'_, M>) -> bool {
        self.candidate = None;
        if !(self.can_attack)(ctx.mob) {
            return false;
        }
        let Some(id) = (self.find_target)(ctx.memory) else {
            return false;
        };
        let attackable = ctx
            .world
            .entity(id)
            .is_some_and(|target| ctx.mob.can_attack_target(&target));
        if attackable {
            self.candidate = Some(id);
        }
        attackable
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        if let Some(id) = self.candidate.take() {
            ctx.memory.set(MemoryKey::AttackTarget, MemoryValue::Entity(id));
            ctx.memory.erase(MemoryKey::CantReachWalkTargetSince);
            log::debug!("{} started attacking {}", ctx.mob.id(), id);
        }
        Started::Finished
    }
}

static CHASE_REQUIREMENTS: [MemoryRequirement; 4] = [
    MemoryRequirement::registered(MemoryKey::WalkTarget),
    MemoryRequirement::registered(MemoryKey::LookTarget),
    MemoryRequirement::present(MemoryKey::AttackTarget),
    MemoryRequirement::registered(MemoryKey::NearestVisibleLivingEntities),
];

/// Walk at the attack target unless it is already within melee reach.
#[derive(Debug, Clone)]
pub struct SetWalkTargetFromAttackTargetIfTargetOutOfReach {
    speed_modifier: f64,
}

impl SetWalkTargetFromAttackTargetIfTargetOutOfReach {
    pub fn new(speed_modifier: f64) -> Self {
        Self { speed_modifier }
    }
}

impl<M: Mob> BehaviorControl<M> for SetWalkTargetFromAttackTargetIfTargetOutOfReach {
    fn name(&self) -> &'static str {
        "SetWalkTargetFromAttackTargetIfTargetOutOfReach"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &CHASE_REQUIREMENTS
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        let Some(target) = ctx
            .memory
            .entity(MemoryKey::AttackTarget)
            .and_then(|id| ctx.world.entity(id))
        else {
            return Started::Finished;
        };

        let visible = ctx.memory.nearest_visible().is_some_and(|n| n.contains(target.id));
        if visible && ctx.mob.is_within_melee_range(&target) {
            ctx.memory.erase(MemoryKey::WalkTarget);
        } else {
            ctx.memory.set(
                MemoryKey::LookTarget,
                MemoryValue::Look(PositionTracker::entity(target.id)),
            );
            ctx.memory.set(
                MemoryKey::WalkTarget,
                MemoryValue::Walk(WalkTarget {
                    target: PositionTracker::Entity {
                        id: target.id,
                        line_of_sight_required: false,
                    },
                    speed_modifier: self.speed_modifier,
                    close_enough: 0,
                }),
            );
        }
        Started::Finished
    }
}

static MELEE_REQUIREMENTS: [MemoryRequirement; 4] = [
    MemoryRequirement::registered(MemoryKey::LookTarget),
    MemoryRequirement::present(MemoryKey::AttackTarget),
    MemoryRequirement::absent(MemoryKey::AttackCoolingDown),
    MemoryRequirement::present(MemoryKey::NearestVisibleLivingEntities),
];

/// Hit the attack target when it is visible and in reach, then cool down.
#[derive(Debug, Clone)]
pub struct MeleeAttack {
    cooldown_ticks: u64,
    candidate: Option<EntityId>,
}

impl MeleeAttack {
    pub fn new(cooldown_ticks: u64) -> Self {
        Self {
            cooldown_ticks,
            candidate: None,
        }
    }
}

impl<M: Mob> BehaviorControl<M> for MeleeAttack {
    fn name(&self) -> &'static str {
        "MeleeAttack"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &MELEE_REQUIREMENTS
    }

    fn check_extra_start_conditions(&mut self, ctx: &mut BehaviorContext<'_, M>) -> bool {
        self.candidate = ctx
            .memory
            .entity(MemoryKey::AttackTarget)
            .and_then(|id| ctx.world.entity(id))
            .filter(|target| ctx.mob.is_within_melee_range(target))
            .filter(|target| ctx.memory.nearest_visible().is_some_and(|n| n.contains(target.id)))
            .map(|target| target.id);
        self.candidate.is_some()
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        let Some(target) = self.candidate.take() else {
            return Started::Finished;
        };
        ctx.memory
            .set(MemoryKey::LookTarget, MemoryValue::Look(PositionTracker::entity(target)));
        ctx.mob.swing();
        let attacker = ctx.mob.id();
        let damage = ctx.mob.attributes().attack_damage;
        ctx.mob.push_action(MobAction::MeleeAttack {
            attacker,
            target,
            damage,
        });
        ctx.memory.set_with_expiry(
            MemoryKey::AttackCoolingDown,
            MemoryValue::Flag,
            self.cooldown_ticks,
        );
        log::trace!("{} hit {} for {}", attacker, target, damage);
        Started::Finished
    }
}

static STOP_ATTACKING_REQUIREMENTS: [MemoryRequirement; 2] = [
    MemoryRequirement::present(MemoryKey::AttackTarget),
    MemoryRequirement::registered(MemoryKey::CantReachWalkTargetSince),
];

/// Drop `AttackTarget` once it is dead, gone, unattackable, unreachable for
/// too long, or rejected by the owner's predicate.
pub struct StopAttackingIfTargetInvalid<M> {
    is_invalid: fn(&M, &EntitySnapshot) -> bool,
    can_grow_tired: bool,
}

impl<M: Mob> StopAttackingIfTargetInvalid<M> {
    pub fn new() -> Self {
        Self {
            is_invalid: |_, _| false,
            can_grow_tired: true,
        }
    }

    pub fn when(mut self, is_invalid: fn(&M, &EntitySnapshot) -> bool) -> Self {
        self.is_invalid = is_invalid;
        self
    }

    pub fn never_tired(mut self) -> Self {
        self.can_grow_tired = false;
        self
    }
}

impl<M: Mob> Default for StopAttackingIfTargetInvalid<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_tired_of_trying_to_reach(memory: &MemoryStore, game_time: u64) -> bool {
    memory
        .tick_stamp(MemoryKey::CantReachWalkTargetSince)
        .is_some_and(|since| game_time.saturating_sub(since) > TIMEOUT_TO_GET_WITHIN_ATTACK_RANGE)
}

impl<M: Mob> BehaviorControl<M> for StopAttackingIfTargetInvalid<M> {
    fn name(&self) -> &'static str {
        "StopAttackingIfTargetInvalid"
    }

    fn requirements(&self) -> &'static [MemoryRequirement] {
        &STOP_ATTACKING_REQUIREMENTS
    }

    fn start(&mut self, ctx: &mut BehaviorContext<'_, M>) -> Started {
        let Some(id) = ctx.memory.entity(MemoryKey::AttackTarget) else {
            return Started::Finished;
        };
        let invalid = match ctx.world.entity(id) {
            None => true,
            Some(target) => {
                !target.alive
                    || !ctx.mob.can_attack_target(&target)
                    || (self.can_grow_tired && is_tired_of_trying_to_reach(ctx.memory, ctx.game_time))
                    || (self.is_invalid)(ctx.mob, &target)
            }
        };
        if invalid {
            ctx.memory.erase(MemoryKey::AttackTarget);
            log::debug!("{} stopped attacking {}", ctx.mob.id(), id);
        }
        Started::Finished
    }
}
