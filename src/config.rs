use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::net::RunLimit;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimConfig {
    /// 缺省时每次运行随机取种子
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    #[serde(default)]
    pub max_time: Option<f64>,
    #[serde(default)]
    pub trace: bool,
    #[serde(default = "default_replicas")]
    pub replicas: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_steps: default_max_steps(),
            max_time: None,
            trace: false,
            replicas: default_replicas(),
        }
    }
}

impl SimConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: SimConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_time(mut self, max_time: f64) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas.max(1);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn limit(&self) -> RunLimit {
        RunLimit {
            max_steps: self.max_steps,
            max_time: self.max_time,
        }
    }
}

fn default_max_steps() -> u64 {
    1000
}

fn default_replicas() -> usize {
    1
}
