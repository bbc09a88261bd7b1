use std::io::Read;
use std::process::ExitCode;

use clap::Parser;

mod config;
mod machine;
mod peripherals;
mod quirk;
mod runner;
mod scope;

use config::Config;
use runner::Runner;

/// Run field reads and writes against simulated region spaces
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML file describing peripherals, regions and the steps to run
    #[arg(value_parser)]
    config: clio::Input,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(input: &mut clio::Input) -> Result<usize, String> {
    let mut text = String::new();
    input
        .read_to_string(&mut text)
        .map_err(|e| format!("Could not read {} ({e})", input.path()))?;

    let config = Config::parse(&text)?;
    let mut runner = Runner::new(&config)?;
    log::debug!("Running {} steps", config.steps.len());

    Ok(runner.run(&config.steps))
}

fn main() -> ExitCode {
    let mut args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(&mut args.config) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(n) => {
            log::error!("{n} step(s) failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
