//! `load_config` module: reads the optional YAML settings file and merges it
//! with the environment into a [`ResolvedConfig`].
//!
//! The file holds the persisted configuration keys for both platforms. Any
//! field may be overridden by its environment variable, so a run driven
//! entirely by `.env` needs no file at all.
//!
//! # Errors
//! All errors in this module use `anyhow::Error` for context-rich diagnostics,
//! and are surfaced at the CLI boundary.

use crate::config::{resolve, ResolvedConfig, Settings};
use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Loads persisted settings. `None` means no settings file: every field then
/// has to come from the environment.
pub fn load_settings<P: AsRef<Path>>(path: Option<P>) -> Result<Settings> {
    let Some(path) = path else {
        info!("No config file given, using environment only");
        return Ok(Settings::default());
    };
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

    // An empty file deserialises to null, which serde_yaml rejects for a struct.
    if config_content.trim().is_empty() {
        return Ok(Settings::default());
    }

    match serde_yaml::from_str::<Settings>(&config_content) {
        Ok(settings) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(settings)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Loads settings from `path` (if any) and resolves them against the environment.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<ResolvedConfig> {
    let settings = load_settings(path)?;
    let resolved = resolve(&settings);
    resolved.trace_loaded();
    Ok(resolved)
}
