//! Integration tests for the Creaking driven through the full world tick
//!
//! These exercise sensors, brain scheduling, the gaze freeze and combat
//! together, so they live next to the World implementation.

use glam::{DVec3, IVec3};
use mobsight_brain::{Activity, EntityId, MemoryKey, MemoryStatus, MemoryValue, Mob};
use mobsight_core::creaking::ai;
use mobsight_core::world::TerrainConfig;
use mobsight_core::{CreakingConfig, World, WorldConfig};
use mobsight_culling::BlockBox;

const CREAKING_SPAWN: DVec3 = DVec3::new(0.5, 0.0, 0.5);
const PLAYER_SPAWN: DVec3 = DVec3::new(0.5, 0.0, 6.5);

fn world_with(terrain: TerrainConfig) -> World {
    World::new(WorldConfig {
        terrain,
        seed: 9,
        ..WorldConfig::default()
    })
}

/// A Creaking and a player six blocks south of it.
fn duel(terrain: TerrainConfig) -> (World, EntityId, EntityId) {
    let mut world = world_with(terrain);
    let creaking = world.spawn_creaking(CREAKING_SPAWN).expect("creaking spawns");
    let player = world.spawn_player(PLAYER_SPAWN).expect("player spawns");
    (world, creaking, player)
}

fn stare(world: &mut World, player: EntityId, creaking: EntityId) {
    let eye = world
        .creaking(creaking)
        .map(|c| c.body().eye_position())
        .expect("creaking exists");
    world.player_mut(player).expect("player exists").look_at(eye);
}

fn look_away(world: &mut World, player: EntityId) {
    world
        .player_mut(player)
        .expect("player exists")
        .look_towards(DVec3::Z);
}

// ============================================================================
// Brain Wiring Tests
// ============================================================================

#[test]
fn test_creaking_brain_builds_with_idle_default() {
    let brain = ai::make_brain(&CreakingConfig::default(), 1).expect("Creaking wiring is consistent");
    assert!(brain.is_active(Activity::Core));
    assert_eq!(brain.active_non_core_activity(), Some(Activity::Idle));
    assert_eq!(brain.sensors().len(), 2);
    for key in ai::MEMORY_TYPES {
        assert!(brain.memory().is_registered(key), "{:?} not registered", key);
    }
}

// ============================================================================
// Gaze Freeze Tests
// ============================================================================

#[test]
fn test_watching_player_activates_and_freezes() {
    let (mut world, creaking, player) = duel(TerrainConfig::default());
    stare(&mut world, player, creaking);

    // Tick 0 senses the player, tick 1 reacts to it
    world.tick();
    world.tick();

    let creaking = world.creaking(creaking).expect("creaking exists");
    assert!(creaking.body().is_active());
    assert!(!creaking.body().can_move());
    assert_eq!(creaking.brain().memory().entity(MemoryKey::AttackTarget), Some(player));
    assert_eq!(creaking.brain().active_non_core_activity(), Some(Activity::Idle));
}

#[test]
fn test_frozen_creaking_does_not_move() {
    let (mut world, creaking, player) = duel(TerrainConfig::default());
    stare(&mut world, player, creaking);
    world.tick();
    world.tick();
    let frozen_at = world.creaking(creaking).map(|c| c.body().position());

    for _ in 0..60 {
        stare(&mut world, player, creaking);
        world.tick();
    }
    assert_eq!(world.creaking(creaking).map(|c| c.body().position()), frozen_at);
    assert_eq!(
        world.player(player).map(|p| p.health.current),
        Some(20.0),
        "a watched creaking never attacks"
    );
}

#[test]
fn test_looking_away_releases_into_fight() {
    let (mut world, creaking, player) = duel(TerrainConfig::default());
    stare(&mut world, player, creaking);
    world.tick();
    world.tick();

    look_away(&mut world, player);
    world.tick();

    let creaking = world.creaking(creaking).expect("creaking exists");
    assert!(creaking.body().can_move());
    assert_eq!(creaking.brain().active_non_core_activity(), Some(Activity::Fight));
}

#[test]
fn test_creative_player_is_ignored() {
    let (mut world, creaking, player) = duel(TerrainConfig::default());
    world.player_mut(player).expect("player exists").attackable = false;
    stare(&mut world, player, creaking);

    for _ in 0..5 {
        world.tick();
    }
    let creaking = world.creaking(creaking).expect("creaking exists");
    assert!(!creaking.body().is_active());
    assert!(creaking.body().can_move());
    assert!(creaking
        .brain()
        .memory()
        .check(MemoryKey::AttackTarget, MemoryStatus::Absent));
}

#[test]
fn test_wall_blocks_the_gaze() {
    let wall = BlockBox::new(IVec3::new(-4, 0, 3), IVec3::new(4, 4, 3));
    let (mut world, creaking, player) = duel(TerrainConfig {
        walls: vec![wall],
        ..TerrainConfig::default()
    });
    stare(&mut world, player, creaking);

    for _ in 0..5 {
        world.tick();
    }
    let creaking = world.creaking(creaking).expect("creaking exists");
    assert!(!creaking.body().is_active());
}

#[test]
fn test_far_watcher_does_not_activate() {
    let mut world = world_with(TerrainConfig::default());
    let creaking = world.spawn_creaking(CREAKING_SPAWN).expect("creaking spawns");
    let player = world
        .spawn_player(DVec3::new(0.5, 0.0, 20.5))
        .expect("player spawns");
    stare(&mut world, player, creaking);

    for _ in 0..5 {
        world.tick();
    }
    let creaking = world.creaking(creaking).expect("creaking exists");
    assert!(!creaking.body().is_active());
    assert!(creaking.body().can_move());
}

#[test]
fn test_second_watcher_does_not_steal_target() {
    let (mut world, creaking, watcher) = duel(TerrainConfig::default());
    let hunted = world.spawn_player(DVec3::new(6.5, 0.0, 0.5)).expect("player spawns");
    world
        .player_mut(hunted)
        .expect("player exists")
        .look_towards(DVec3::X);
    stare(&mut world, watcher, creaking);
    world
        .creaking_mut(creaking)
        .expect("creaking exists")
        .brain_mut()
        .memory_mut()
        .set(MemoryKey::AttackTarget, MemoryValue::Entity(hunted));

    world.tick();
    world.tick();

    let creaking = world.creaking(creaking).expect("creaking exists");
    assert!(!creaking.body().is_active());
    assert_eq!(creaking.brain().memory().entity(MemoryKey::AttackTarget), Some(hunted));
}

// ============================================================================
// Combat Tests
// ============================================================================

#[test]
fn test_released_creaking_hunts_down_player() {
    let (mut world, creaking, player) = duel(TerrainConfig::default());
    stare(&mut world, player, creaking);
    world.tick();
    world.tick();
    look_away(&mut world, player);

    let mut hits = 0;
    let mut killed_at = None;
    for _ in 0..600 {
        let report = world.tick();
        hits += report.hits.len();
        if report.deaths.contains(&player) {
            killed_at = Some(report.game_time);
            break;
        }
    }

    assert!(killed_at.is_some(), "player survived {} hits", hits);
    assert_eq!(hits, 7);
    let player = world.player(player).expect("player still listed");
    assert!(!player.is_alive());
}

#[test]
fn test_target_dropped_after_kill() {
    let (mut world, creaking, player) = duel(TerrainConfig::default());
    stare(&mut world, player, creaking);
    world.tick();
    world.tick();
    look_away(&mut world, player);

    for _ in 0..800 {
        world.tick();
    }
    let creaking = world.creaking(creaking).expect("creaking exists");
    assert!(creaking
        .brain()
        .memory()
        .check(MemoryKey::AttackTarget, MemoryStatus::Absent));
    assert_eq!(creaking.brain().active_non_core_activity(), Some(Activity::Idle));
}

// ============================================================================
// Idle Tests
// ============================================================================

#[test]
fn test_idle_creaking_wanders() {
    let mut world = world_with(TerrainConfig::default());
    let creaking = world.spawn_creaking(CREAKING_SPAWN).expect("creaking spawns");

    let mut moved = false;
    for _ in 0..400 {
        world.tick();
        let position = world.creaking(creaking).map(|c| c.body().position());
        if position.is_some_and(|p| p.distance(CREAKING_SPAWN) > 0.5) {
            moved = true;
            break;
        }
    }
    assert!(moved);
}

#[test]
fn test_creaking_swims_in_water() {
    let pool = BlockBox::new(IVec3::new(-2, 0, -2), IVec3::new(2, 0, 2));
    let mut world = world_with(TerrainConfig {
        water: vec![pool],
        ..TerrainConfig::default()
    });
    let creaking = world.spawn_creaking(CREAKING_SPAWN).expect("creaking spawns");

    for _ in 0..10 {
        world.tick();
    }
    let jumps = world.creaking(creaking).map(|c| c.body().jumps());
    assert!(jumps.is_some_and(|j| j > 0));
}
