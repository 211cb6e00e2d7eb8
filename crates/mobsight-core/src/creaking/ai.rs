//! Creaking brain wiring and the "frozen while watched" rule

use glam::DVec3;
use mobsight_brain::behaviors::{
    DoNothing, LookAtTargetSink, MeleeAttack, MoveToTargetSink, RandomStroll, RunOne,
    SetEntityLookTargetSometimes, SetWalkTargetFromAttackTargetIfTargetOutOfReach,
    SetWalkTargetFromLookTarget, StartAttacking, StopAttackingIfTargetInvalid, Swim,
};
use mobsight_brain::{
    Activity, Behavior, Brain, BrainError, EntityId, EntityKind, EntitySnapshot, MemoryKey,
    MemoryStore, MemoryValue, Mob, Provider, SensorKind, WorldQuery,
};

use super::body::CreakingBody;
use super::CreakingConfig;

pub const MEMORY_TYPES: [MemoryKey; 12] = [
    MemoryKey::NearestLivingEntities,
    MemoryKey::NearestVisibleLivingEntities,
    MemoryKey::NearestVisiblePlayer,
    MemoryKey::NearestVisibleAttackablePlayer,
    MemoryKey::NearestVisibleAttackablePlayers,
    MemoryKey::NearestPlayers,
    MemoryKey::LookTarget,
    MemoryKey::WalkTarget,
    MemoryKey::CantReachWalkTargetSince,
    MemoryKey::Path,
    MemoryKey::AttackTarget,
    MemoryKey::AttackCoolingDown,
];

pub const SENSOR_TYPES: [SensorKind; 2] = [SensorKind::NearestLivingEntities, SensorKind::NearestPlayers];

pub fn provider() -> Provider {
    Provider::new(&MEMORY_TYPES, &SENSOR_TYPES)
}

fn core_behaviors() -> Vec<Behavior<CreakingBody>> {
    vec![
        Behavior::new(Swim::new(0.8)).with_guard(CreakingBody::can_move),
        Behavior::new(LookAtTargetSink::new(45, 90)),
        Behavior::new(MoveToTargetSink::default()),
    ]
}

fn nearest_visible_attackable_player(memory: &MemoryStore) -> Option<EntityId> {
    memory.entity(MemoryKey::NearestVisibleAttackablePlayer)
}

fn idle_behaviors(config: &CreakingConfig) -> Vec<Behavior<CreakingBody>> {
    vec![
        Behavior::new(StartAttacking::new(
            CreakingBody::is_active,
            nearest_visible_attackable_player,
        )),
        Behavior::new(SetEntityLookTargetSometimes::new(8.0, 30, 60)),
        Behavior::new(RunOne::new(vec![
            (Behavior::new(RandomStroll::new(config.idle_speed)), 2),
            (
                Behavior::new(SetWalkTargetFromLookTarget::new(config.idle_speed, 3)),
                2,
            ),
            (Behavior::new(DoNothing::new(30, 60)), 1),
        ])),
    ]
}

fn fight_behaviors(config: &CreakingConfig) -> Vec<Behavior<CreakingBody>> {
    vec![
        Behavior::new(SetWalkTargetFromAttackTargetIfTargetOutOfReach::new(config.chase_speed)),
        Behavior::new(MeleeAttack::new(config.attack_cooldown)).with_guard(CreakingBody::can_move),
        Behavior::new(
            StopAttackingIfTargetInvalid::new().when(|_: &CreakingBody, target| target.kind != EntityKind::Player),
        ),
    ]
}

/// Build a Creaking brain; fails if the behavior set and memory set disagree.
pub fn make_brain(config: &CreakingConfig, seed: u64) -> Result<Brain<CreakingBody>, BrainError> {
    provider()
        .make_brain(&config.brain, seed)
        .add_activity(Activity::Core, 0, core_behaviors())
        .add_activity(Activity::Idle, 10, idle_behaviors(config))
        .add_activity_and_remove_memory_when_stopped(
            Activity::Fight,
            10,
            fight_behaviors(config),
            MemoryKey::AttackTarget,
        )
        .core_activities(&[Activity::Core])
        .default_activity(Activity::Idle)
        .build()
}

/// Frozen Creakings idle; free ones fight when they have a target.
pub fn update_activity(brain: &mut Brain<CreakingBody>, world: &dyn WorldQuery, body: &mut CreakingBody) {
    if body.can_move() {
        brain.set_active_activity_to_first_valid(&[Activity::Fight, Activity::Idle], world, body);
    } else {
        brain.use_default_activity(world, body);
    }
}

/// Whether `player` is looking at `body` closely enough to freeze it.
///
/// The gaze is tested against the body's eye, feet and mid heights; any one
/// of them within `tolerance` counts, provided the player can see the body.
pub fn is_looked_at_by(body: &CreakingBody, player: &EntitySnapshot, world: &dyn WorldQuery, tolerance: f64) -> bool {
    let view = player.look_direction.normalize_or_zero();
    let eye = player.eye_position();
    let feet_y = body.position().y;
    let eye_y = body.eye_position().y;
    let heights = [eye_y, feet_y, (eye_y + feet_y) * 0.5];

    let gazed = heights.iter().any(|&y| {
        let to_body = DVec3::new(body.position().x, y, body.position().z) - eye;
        let distance = to_body.length();
        distance > f64::EPSILON && view.dot(to_body / distance) > 1.0 - tolerance
    });
    gazed && world.has_line_of_sight(player.id, body.id())
}

/// Recompute whether the body may move this tick, activating or
/// deactivating it as players come and go.
///
/// Reads `NearestPlayers` from the previous sensor run. A player within the
/// activation distance who looks at an inactive Creaking becomes its
/// `AttackTarget`, unless it already targets someone else.
pub fn check_can_move(
    body: &mut CreakingBody,
    memory: &mut MemoryStore,
    world: &dyn WorldQuery,
    config: &CreakingConfig,
) -> bool {
    let players: Vec<EntitySnapshot> = memory
        .entities(MemoryKey::NearestPlayers)
        .unwrap_or_default()
        .iter()
        .filter_map(|id| world.entity(*id))
        .collect();

    if players.is_empty() {
        if body.is_active() {
            deactivate(body);
        }
        return true;
    }

    let activation_distance_sq = config.activation_distance * config.activation_distance;
    let mut has_attackable_player = false;
    for player in &players {
        if !body.can_attack_target(player) {
            continue;
        }
        has_attackable_player = true;
        if !is_looked_at_by(body, player, world, config.look_tolerance) {
            continue;
        }
        if body.is_active() {
            return false;
        }
        // An existing target keeps the Creaking; other watchers do not steal it
        let targets_other = memory
            .entity(MemoryKey::AttackTarget)
            .is_some_and(|target| target != player.id);
        if !targets_other && player.distance_squared_to(body.position()) < activation_distance_sq {
            memory.set(MemoryKey::AttackTarget, MemoryValue::Entity(player.id));
            body.set_active(true);
            log::debug!("{} activated by {}", body.id(), player.id);
            return false;
        }
    }

    if !has_attackable_player && body.is_active() {
        deactivate(body);
    }
    true
}

fn deactivate(body: &mut CreakingBody) {
    body.set_active(false);
    log::debug!("{} deactivated", body.id());
}
