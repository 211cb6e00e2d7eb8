//! Scenario execution: scripted gazes, the world tick and per-player culling

use anyhow::{Context, Result};
use glam::{DVec3, Mat4, Vec3};
use mobsight_brain::{Activity, EntityId, Mob};
use mobsight_core::{Player, TickReport, World};
use mobsight_culling::{Frustum, SectionGrid};

use crate::config::{CameraConfig, RunnerConfig};
use crate::scenario::{Look, PlayerSetup, ScenarioDefinition};

/// State of one Creaking at a sample tick
#[derive(Debug, Clone)]
pub struct CreakingStatus {
    pub id: EntityId,
    pub position: DVec3,
    pub can_move: bool,
    pub active: bool,
    pub activity: Option<Activity>,
    pub running: Vec<&'static str>,
}

/// What one player's camera sees at a sample tick
#[derive(Debug, Clone)]
pub struct ViewStatus {
    pub player: EntityId,
    pub visible_sections: usize,
    /// Other entities inside the frustum
    pub visible_entities: Vec<EntityId>,
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub game_time: u64,
    pub creakings: Vec<CreakingStatus>,
    pub views: Vec<ViewStatus>,
}

/// Outcome of [`ScenarioRunner::run`]
#[derive(Debug, Clone)]
pub struct RunReport {
    pub scenario: String,
    pub ticks: u64,
    pub hits: usize,
    pub deaths: Vec<EntityId>,
    pub samples: Vec<Sample>,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} ticks | {} hits | {} deaths | {} samples",
            self.scenario,
            self.ticks,
            self.hits,
            self.deaths.len(),
            self.samples.len()
        )
    }
}

/// Camera frustum for an eye looking along `direction`.
pub fn camera_frustum(camera: &CameraConfig, eye: DVec3, direction: DVec3) -> Frustum {
    let forward = direction.normalize_or_zero().as_vec3();
    let forward = if forward == Vec3::ZERO { Vec3::NEG_Z } else { forward };
    // look_to needs an up vector that is not parallel to the view
    let up = if forward.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_to_rh(Vec3::ZERO, forward, up);
    let projection = Mat4::perspective_rh_gl(
        camera.fov_degrees.to_radians(),
        camera.aspect_ratio,
        camera.near,
        camera.far,
    );
    let mut frustum = Frustum::new(view, projection);
    frustum.prepare(eye);
    frustum
}

/// Drives a [`World`] built from a scenario
pub struct ScenarioRunner {
    name: String,
    config: RunnerConfig,
    world: World,
    players: Vec<(EntityId, PlayerSetup)>,
    grid: SectionGrid,
}

impl ScenarioRunner {
    pub fn new(scenario: &ScenarioDefinition, config: RunnerConfig) -> Result<Self> {
        let mut world_config = config.world.clone();
        world_config.terrain = scenario.terrain.clone();
        let mut world = World::new(world_config);

        let mut players = Vec::with_capacity(scenario.players.len());
        for (idx, setup) in scenario.players.iter().enumerate() {
            let id = world
                .spawn_player(setup.position)
                .with_context(|| format!("Failed to spawn player {}", idx))?;
            world.player_mut(id)?.attackable = setup.attackable;
            players.push((id, setup.clone()));
        }
        for (idx, position) in scenario.creakings.iter().enumerate() {
            world
                .spawn_creaking(*position)
                .with_context(|| format!("Failed to spawn creaking {}", idx))?;
        }
        for (idx, position) in scenario.creatures.iter().enumerate() {
            world
                .spawn_creature(*position)
                .with_context(|| format!("Failed to spawn creature {}", idx))?;
        }

        log::info!(
            "Scenario '{}': {} players, {} creakings, {} creatures",
            scenario.name,
            players.len(),
            world.creakings().len(),
            world.creatures().len()
        );

        let grid = SectionGrid::new(config.culling.clone());
        Ok(Self {
            name: scenario.name.clone(),
            config,
            world,
            players,
            grid,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Point every scripted player's camera for the coming tick.
    fn apply_scripts(&mut self) {
        let tick = self.world.game_time();
        for (id, setup) in &self.players {
            let Some(look) = setup.look_at_tick(tick) else {
                continue;
            };
            let Some(eye) = self.world.player(*id).map(Player::eye_position) else {
                continue;
            };
            let nearest = self
                .world
                .creakings()
                .iter()
                .map(|c| c.body().eye_position())
                .min_by(|a, b| a.distance_squared(eye).total_cmp(&b.distance_squared(eye)));

            let Ok(player) = self.world.player_mut(*id) else {
                continue;
            };
            match (look, nearest) {
                (Look::AtNearestCreaking, Some(target)) => player.look_at(target),
                (Look::AwayFromNearestCreaking, Some(target)) => {
                    // Level gaze, so a Creaking underfoot is not seen either
                    let away = eye - target;
                    player.look_towards(DVec3::new(away.x, 0.0, away.z));
                }
                (Look::Direction(direction), _) => player.look_towards(direction),
                (_, None) => {}
            }
        }
    }

    /// One scripted world tick.
    pub fn step(&mut self) -> TickReport {
        self.apply_scripts();
        self.world.tick()
    }

    pub fn view_of(&self, player: &Player) -> ViewStatus {
        let frustum = camera_frustum(&self.config.camera, player.eye_position(), player.look_direction);
        let visible_sections = self.grid.visible_sections(&frustum).len();
        let visible_entities = self
            .world
            .visible_entities(&frustum)
            .into_iter()
            .filter(|id| *id != player.id)
            .collect();
        ViewStatus {
            player: player.id,
            visible_sections,
            visible_entities,
        }
    }

    pub fn sample(&self) -> Sample {
        let creakings = self
            .world
            .creakings()
            .iter()
            .map(|c| CreakingStatus {
                id: c.id(),
                position: c.body().position(),
                can_move: c.body().can_move(),
                active: c.body().is_active(),
                activity: c.brain().active_non_core_activity(),
                running: c.brain().running_behavior_names(),
            })
            .collect();
        let views = self.world.players().iter().map(|p| self.view_of(p)).collect();
        Sample {
            game_time: self.world.game_time(),
            creakings,
            views,
        }
    }

    pub fn run(&mut self, ticks: u64) -> RunReport {
        let mut report = RunReport {
            scenario: self.name.clone(),
            ticks,
            hits: 0,
            deaths: Vec::new(),
            samples: Vec::new(),
        };

        for _ in 0..ticks {
            let tick = self.step();
            report.hits += tick.hits.len();
            report.deaths.extend(tick.deaths.iter().copied());

            let every = self.config.sample_every;
            if every > 0 && tick.game_time % every == 0 {
                let sample = self.sample();
                log_sample(&sample);
                report.samples.push(sample);
            }
        }

        log::info!("{}", report.summary());
        report
    }
}

fn log_sample(sample: &Sample) {
    for creaking in &sample.creakings {
        log::info!(
            "t={} {} at ({:.1}, {:.1}) {} {} [{}]",
            sample.game_time,
            creaking.id,
            creaking.position.x,
            creaking.position.z,
            if creaking.can_move { "moving" } else { "frozen" },
            creaking.activity.map_or_else(|| "-".to_string(), |a| a.to_string()),
            creaking.running.join(", ")
        );
    }
    for view in &sample.views {
        log::debug!(
            "t={} {} sees {} sections, {} entities",
            sample.game_time,
            view.player,
            view.visible_sections,
            view.visible_entities.len()
        );
    }
}
