//! flowpick command-line tool
//!
//! Loads a backend configuration and inspects how flows map onto it.

use clap::Parser;
use flowpick::cli::{self, Cli, Command};
use flowpick::config::Config;
use flowpick::flow::{FlowHasher, FlowKey};
use flowpick::{WeightedSelector, simulate, telemetry};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Template generation does not need an existing config
    if let Some(Command::Config { output }) = &cli.command {
        let template = cli::generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(path, template)?;
                eprintln!("Wrote configuration template to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let config = Config::from_file(&cli.config)?;
    telemetry::init(&config.observability.log_level);

    let backends = config.backends();
    let selector = WeightedSelector::new(&backends);

    tracing::info!(
        config = %cli.config,
        backends = backends.len(),
        sequence_length = selector.len(),
        "Loaded backends"
    );

    match cli.command.unwrap_or(Command::Table) {
        // Written before the config was loaded
        Command::Config { .. } => {}
        Command::Table => print!("{}", cli::render_table(&backends, &selector)),
        Command::Select { hash, flow } => {
            let selected = match (hash, flow) {
                (Some(hash), _) => selector.select_signed(hash),
                (None, Some(flow)) => {
                    let flow: FlowKey = flow.parse()?;
                    let hash = config.flow_hasher().hash_flow(&flow);
                    tracing::debug!(flow = %flow, hash, "Hashed flow");
                    selector.select(hash)
                }
                (None, None) => None,
            };

            match selected {
                Some(backend) => println!("{}", backend.name()),
                None => println!("none"),
            }
        }
        Command::Simulate { flows, seed, json } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let report = simulate::simulate(&selector, &config.flow_hasher(), flows, &mut rng);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", cli::render_report(&report));
            }
        }
    }

    Ok(())
}
