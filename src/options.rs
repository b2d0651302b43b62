//! Parsing Options.
//! `pn-sim <NET> [--config FILE] [--seed N] [--steps N] [--until T] [--replicas N] [--dot FILE] [--trace]`

use clap::{Arg, ArgAction, Command, value_parser};
use std::error::Error;
use std::path::PathBuf;

use crate::config::SimConfig;

fn make_options_parser() -> clap::Command {
    Command::new("pn-sim")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Step a token-flow network and report its final marking")
        .arg(
            Arg::new("net")
                .value_name("NET")
                .help("Net descriptor (.json or .ron)")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML simulation config")
                .default_value("pn-sim.toml")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .help("Random seed; replicas use consecutive seeds")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("steps")
                .short('n')
                .long("steps")
                .help("Maximum number of steps per run")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("until")
                .short('u')
                .long("until")
                .help("Stop once the simulation clock reaches this time")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("replicas")
                .short('r')
                .long("replicas")
                .help("Number of independent runs executed in parallel")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the final net as Graphviz DOT")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("trace")
                .short('t')
                .long("trace")
                .help("Log every step")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub net: PathBuf,
    pub config: PathBuf,
    pub seed: Option<u64>,
    pub steps: Option<u64>,
    pub until: Option<f64>,
    pub replicas: Option<usize>,
    pub dot: Option<PathBuf>,
    pub trace: bool,
}

impl Options {
    pub fn parse_from_args<I, T>(flags: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = make_options_parser().try_get_matches_from(flags)?;
        let net = matches
            .get_one::<PathBuf>("net")
            .cloned()
            .ok_or("missing net descriptor")?;
        let config = matches
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("pn-sim.toml"));

        Ok(Options {
            net,
            config,
            seed: matches.get_one::<u64>("seed").copied(),
            steps: matches.get_one::<u64>("steps").copied(),
            until: matches.get_one::<f64>("until").copied(),
            replicas: matches.get_one::<usize>("replicas").copied(),
            dot: matches.get_one::<PathBuf>("dot").cloned(),
            trace: matches.get_flag("trace"),
        })
    }

    /// 命令行参数覆盖配置文件中的值。
    pub fn apply(&self, mut config: SimConfig) -> SimConfig {
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(steps) = self.steps {
            config = config.with_max_steps(steps);
        }
        if let Some(until) = self.until {
            config = config.with_max_time(until);
        }
        if let Some(replicas) = self.replicas {
            config = config.with_replicas(replicas);
        }
        if self.trace {
            config = config.with_trace(true);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requires_net() {
        let options = Options::parse_from_args(["--seed", "3"]);
        assert!(options.is_err());
    }

    #[test]
    fn test_parse_from_args() {
        let options =
            Options::parse_from_args(["net.json", "-s", "7", "--until", "2.5", "-t"]).unwrap();
        assert_eq!(options.net, PathBuf::from("net.json"));
        assert_eq!(options.config, PathBuf::from("pn-sim.toml"));
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.until, Some(2.5));
        assert!(options.trace);
        assert_eq!(options.dot, None);
    }

    #[test]
    fn test_cli_overrides_config() {
        let options = Options::parse_from_args(["net.ron", "-n", "50", "-r", "4"]).unwrap();
        let config = options.apply(SimConfig::default().with_seed(1).with_max_steps(5));
        assert_eq!(config.seed, Some(1));
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.replicas, 4);
        assert!(!config.trace);
    }

    #[test]
    fn test_parse_rejects_bad_number() {
        assert!(Options::parse_from_args(["net.json", "--steps", "many"]).is_err());
    }
}
