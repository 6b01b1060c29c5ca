/// `load_config` module: loads a static YAML deployment config into the core [`DeployConfig`].
///
/// The YAML file never holds secrets. Credentials are read later from the
/// environment snapshot, using the variable templates configured here.
///
/// # Responsibilities
/// - Parse the user-supplied YAML into the strongly-typed core config
/// - Fill every omitted field from [`DeployConfig::default`]
/// - Validate the result so a broken config fails before any git or ossutil call
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use oss_deploy_core::config::DeployConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Loads and validates a deployment config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DeployConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config = parse_config(&config_content)?;
    config.trace_loaded();
    Ok(config)
}

/// Parses YAML text; an empty document yields the defaults.
pub fn parse_config(yaml: &str) -> Result<DeployConfig> {
    let config: DeployConfig = if yaml.trim().is_empty() {
        DeployConfig::default()
    } else {
        match serde_yaml::from_str(yaml) {
            Ok(conf) => conf,
            Err(e) => {
                error!(error = ?e, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    config
        .validate()
        .context("Invalid deployment configuration")?;
    Ok(config)
}

/// Config file if given, built-in defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<DeployConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            info!("No config file given, using built-in defaults");
            let config = DeployConfig::default();
            config.trace_loaded();
            Ok(config)
        }
    }
}
