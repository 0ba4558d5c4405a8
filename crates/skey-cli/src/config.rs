//! Key settings from an optional TOML file, with command-line overrides on top.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use skey_engine::{KeyConfig, Rc6Schedule};

/// Values given on the command line; each one replaces the file's value.
#[derive(Debug, Default)]
pub struct Overrides {
    pub schedule: Option<Rc6Schedule>,
    pub resource: Option<u64>,
    pub seed: Option<u64>,
}

pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<KeyConfig> {
    let mut config = match path {
        Some(path) => {
            let contents =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            parse(&contents).with_context(|| format!("parse {}", path.display()))?
        }
        None => KeyConfig::default(),
    };
    if let Some(schedule) = overrides.schedule {
        config = config.with_rc6_schedule(schedule);
    }
    if let Some(resource) = overrides.resource {
        config = config.with_resource(resource);
    }
    if let Some(seed) = overrides.seed {
        config = config.with_seed(seed);
    }
    tracing::debug!(?config, "key configuration");
    Ok(config)
}

fn parse(contents: &str) -> Result<KeyConfig> {
    Ok(toml::from_str(contents)?)
}
