//! Subcommand implementations.

pub mod batch;
pub mod config;
pub mod parse;

use std::path::{Path, PathBuf};

use tracing::debug;

use poconf_core::{HybridParser, PoconfConfig};

/// `<config dir>/poconf/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poconf")
        .join("config.json")
}

/// Load the explicit config file, else the default one if it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PoconfConfig> {
    let default_path = default_config_path();
    let config = match config_path {
        Some(path) => PoconfConfig::from_file(Path::new(path))?,
        None if default_path.exists() => {
            debug!("Loading configuration from {}", default_path.display());
            PoconfConfig::from_file(&default_path)?
        }
        None => PoconfConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Build the parser, leaving the completion service out when `no_llm` is set.
pub fn build_parser(config: &PoconfConfig, no_llm: bool) -> anyhow::Result<HybridParser> {
    if no_llm || !config.llm.enabled {
        return Ok(HybridParser::new(config.extraction.clone()));
    }
    Ok(HybridParser::from_config(config)?)
}
