//! Skirmish - headless combat scenario runner
//!
//! Loads a scenario JSON file, runs the simulation to completion and prints
//! a summary. See `assets/` and the library docs for the config format.

use skirmish::cli;
use skirmish::headless::config::ScenarioConfig;
use skirmish::headless::runner::run_scenario;

fn main() {
    let args = cli::parse_args();

    let mut config = match ScenarioConfig::load_from_file(&args.scenario) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading scenario: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(output) = args.output {
        config.output_path = Some(output.to_string_lossy().into_owned());
    }
    if let Some(max_ticks) = args.max_ticks {
        config.max_ticks = max_ticks;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    match run_scenario(config) {
        Ok(result) => {
            println!(
                "Scenario finished: {} after {} ticks ({} events)",
                result.outcome.as_str(),
                result.ticks_run,
                result.event_count
            );
            for actor in &result.actors {
                println!(
                    "  {} ({}): {}/{} hp, dealt {}, took {}{}",
                    actor.name,
                    actor.kind.name(),
                    actor.final_health,
                    actor.max_health,
                    actor.damage_dealt,
                    actor.damage_taken,
                    if actor.survived { "" } else { " [dead]" }
                );
            }
        }
        Err(e) => {
            eprintln!("Scenario failed: {}", e);
            std::process::exit(1);
        }
    }
}
