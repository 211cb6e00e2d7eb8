//! Concrete behaviors

mod combat;
mod look;
mod movement;
mod run_one;

pub use combat::{
    MeleeAttack, SetWalkTargetFromAttackTargetIfTargetOutOfReach, StartAttacking,
    StopAttackingIfTargetInvalid, TIMEOUT_TO_GET_WITHIN_ATTACK_RANGE,
};
pub use look::{LookAtTargetSink, SetEntityLookTargetSometimes, Ticker};
pub use movement::{
    MoveToTargetSink, RandomStroll, SetWalkTargetFromLookTarget, Swim, MAX_COOLDOWN_BEFORE_RETRYING,
};
pub use run_one::{weighted_order, DoNothing, RunOne};
