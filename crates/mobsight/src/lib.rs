//! mobsight - headless scenario runner
//!
//! Loads a RON scenario, builds a [`mobsight_core::World`] from it and steps
//! it while scripted players watch (or ignore) their Creakings.

pub mod config;
pub mod runner;
pub mod scenario;

pub use config::{CameraConfig, RunnerConfig};
pub use runner::{camera_frustum, RunReport, ScenarioRunner};
pub use scenario::{Look, LookCommand, PlayerSetup, ScenarioDefinition};
