mod schema;

pub use schema::{ColorMode, Config, LeaderboardConfig};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the config directory path (~/.config/boulder-tally/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("boulder-tally"))
}

/// Get the default config file path (~/.config/boulder-tally/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path
///   and falls back to defaults when that file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("Config file not found at {}", p.display());
            }
            p
        }
        None => {
            let p = get_config_path()?;
            if !p.exists() {
                return Ok(Config::default());
            }
            p
        }
    };

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    Ok(config)
}

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref data_file) = config.data_file {
        if data_file.trim().is_empty() {
            errors.push("data_file: must not be empty".to_string());
        } else if data_file.ends_with('/') {
            errors.push(format!("data_file: '{}' is a directory, expected a file path", data_file));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Resolve the state file path: explicit override, then config, then default.
/// A leading `~/` is expanded to the home directory.
pub fn resolve_data_path(config: &Config, cli_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_override {
        return Ok(path);
    }
    match config.data_file.as_deref() {
        Some(raw) => match raw.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir().context("Could not determine home directory")?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(raw)),
        },
        None => crate::store::get_state_path(),
    }
}
