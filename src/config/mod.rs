mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./submerge.toml",
        "./config.toml",
        "~/.config/submerge/config.toml",
        "/etc/submerge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let config = Config::default();
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration.
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if !config.providers.opensubtitles.enabled && !config.providers.podnapisi.enabled {
        anyhow::bail!("At least one subtitle provider must be enabled");
    }

    if config.search.max_results == 0 {
        anyhow::bail!("search.max_results cannot be 0");
    }

    if config.cache.results_ttl_secs == 0 || config.cache.resolution_ttl_secs == 0 {
        anyhow::bail!("Cache TTLs cannot be 0");
    }

    if config.providers.opensubtitles.enabled
        && config
            .providers
            .opensubtitles
            .api_key
            .as_deref()
            .unwrap_or("")
            .is_empty()
    {
        tracing::warn!(
            "OpenSubtitles is enabled but has no API key; the provider will be skipped"
        );
    }

    Ok(())
}
