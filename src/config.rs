use crate::image_reference::validate_registry;
use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use std::env::{self, VarError};
use std::{fs, path::Path};
use tracing::{debug, info};

/// Repository the installer pushes its own images to. Third-party images are only
/// rewritten when a different repository is configured.
pub static DEFAULT_REPOSITORY: &str = "eu.gcr.io/gitpod-core-dev/build";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub repository: Option<String>,
    pub output: OutputFormat,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl Config {
    /// Configured registry mirror, if it differs from the installer's default repository.
    pub fn mirror(&self) -> Option<&str> {
        self.repository
            .as_deref()
            .map(|r| r.trim_end_matches('/'))
            .filter(|r| !r.is_empty() && *r != DEFAULT_REPOSITORY)
    }

    /// Registry a third-party image is pulled from: the configured mirror, or `original`
    /// when no mirror (or the installer's default repository) is configured.
    pub fn third_party_registry<'a>(&'a self, original: &'a str) -> &'a str {
        match self.mirror() {
            Some(mirror) => {
                debug!("Mirroring third-party registry {} to {}", original, mirror);
                mirror
            }
            None => original,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(mirror) = self.mirror() {
            validate_registry(mirror)
                .with_context(|| format!("Invalid registry mirror in repository: {}", mirror))?;
        }
        Ok(())
    }
}

/// Loads the config file named by the environment variable `var`, or the defaults
/// when it is unset.
pub fn load_config_from_env(var: &str) -> Result<Config> {
    match env::var(var) {
        Ok(path) => load_config(path),
        Err(VarError::NotPresent) => {
            info!("{} not set, using default configuration", var);
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read environment variable {}", var)),
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    info!("Loading config from file {}", path.as_ref().display());
    let yaml_str = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

    let expanded = expand_env_vars(&yaml_str)?;

    let config: Config = serde_yaml_ng::from_str(&expanded)
        .context("Failed to parse YAML config after environment variable expansion")?;
    config.validate()?;

    Ok(config)
}

/// Replaces `${VAR}` placeholders with environment variables values.
/// Returns an error naming the first missing variable.
fn expand_env_vars(input: &str) -> Result<String> {
    let re =
        Regex::new(r"\$\{([^}]+)}").context("Invalid regex pattern for env var substitution")?;

    for caps in re.captures_iter(input) {
        let var_name = &caps[1];
        if env::var(var_name).is_err() {
            bail!("Missing environment variable: {}", var_name);
        }
    }

    let result = re.replace_all(input, |caps: &regex::Captures| {
        env::var(&caps[1]).unwrap_or_default()
    });

    Ok(result.into_owned())
}
