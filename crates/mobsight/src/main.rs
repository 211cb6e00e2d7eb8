use clap::Parser;
use mobsight::{RunnerConfig, ScenarioDefinition, ScenarioRunner};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RON scenario to run (defaults to the built-in demo)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Number of ticks to simulate (overrides scenario and config)
    #[arg(long)]
    ticks: Option<u64>,

    /// World seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the built-in demo scenario as RON and exit
    #[arg(long)]
    list_demo: bool,

    /// Write the built-in demo scenario to a RON file and exit
    #[arg(long)]
    write_demo: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Handle --list-demo flag
    if args.list_demo {
        println!("{}", ScenarioDefinition::demo().to_ron()?);
        return Ok(());
    }

    // Handle --write-demo flag
    if let Some(path) = args.write_demo {
        ScenarioDefinition::demo().to_file(&path)?;
        log::info!("Wrote demo scenario to {}", path.display());
        return Ok(());
    }

    let mut config = RunnerConfig::load()?;
    if let Some(seed) = args.seed {
        config.world.seed = seed;
    }

    let scenario = match &args.scenario {
        Some(path) => ScenarioDefinition::from_file(path)?,
        None => ScenarioDefinition::demo(),
    };
    let ticks = args.ticks.or(scenario.ticks).unwrap_or(config.ticks);

    let mut runner = ScenarioRunner::new(&scenario, config)?;
    let report = runner.run(ticks);
    println!("{}", report.summary());

    Ok(())
}
