use std::process::ExitCode;

use anyhow::{Context, Result};
use rand::Rng;

use pnsim::config::SimConfig;
use pnsim::net::io::read_descriptor;
use pnsim::net::{Net, StepResult};
use pnsim::options::Options;
use pnsim::scenario::{run_replicas, seeds_from};

fn init_logger() {
    let env = env_logger::Env::new()
        .filter_or("PN_LOG", "warn")
        .write_style("PN_LOG_STYLE");
    env_logger::init_from_env(env);
}

fn trace_step(net: &Net, result: &StepResult) {
    println!(
        "step {:>5} t={:<10.4} fired=[{}] phase2=[{}]",
        net.step_num(),
        result.time,
        result.fired.join(", "),
        result.fired_phase2.join(", ")
    );
}

fn run(options: Options) -> Result<()> {
    let config = options.apply(SimConfig::load_from_file(&options.config)?);
    log::debug!("pn-sim config: {:?}", config);

    let descriptor = read_descriptor(&options.net)
        .with_context(|| format!("Failed to load net descriptor: {:?}", options.net))?;
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());

    if config.replicas > 1 {
        let seeds = seeds_from(seed, config.replicas);
        let replicas = run_replicas(&descriptor, &seeds, config.limit())?;
        for replica in replicas {
            println!(
                "seed {}: steps={} time={} ended={}",
                replica.seed, replica.summary.steps, replica.summary.time, replica.summary.ended
            );
            for (name, count) in &replica.summary.fire_counts {
                println!("  {name}: {count}");
            }
        }
        return Ok(());
    }

    let mut net = Net::with_seed(&descriptor, seed)?;
    log::info!("conflict groups: {}", net.conflict_groups_str());

    let summary = if config.trace {
        net.run_with(config.limit(), trace_step)?
    } else {
        net.run(config.limit())?
    };

    println!(
        "seed {}: steps={} time={} ended={}",
        seed, summary.steps, summary.time, summary.ended
    );
    print!("{net}");

    if let Some(dot) = &options.dot {
        net.write_dot(dot)
            .with_context(|| format!("Failed to write DOT file: {:?}", dot))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logger();

    let options = match Options::parse_from_args(std::env::args_os().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                clap_err.exit();
            }
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
