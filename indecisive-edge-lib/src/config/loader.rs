use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{EdgeError, Result};
use crate::locale::LocaleSettings;

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| EdgeError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| EdgeError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.upstream.address.trim().is_empty() {
        return Err(EdgeError::Config("upstream address cannot be empty".into()));
    }

    // Locale names are normalized the same way the runtime settings see them.
    LocaleSettings::from_config(&cfg.locale, cfg.production).map_err(|e| match e {
        EdgeError::Locale(msg) => EdgeError::Config(msg),
        other => other,
    })?;
    if cfg.locale.cookie_name.trim().is_empty() {
        return Err(EdgeError::Config("locale cookie_name cannot be empty".into()));
    }

    if cfg.rate_limit.enabled && cfg.rate_limit.sweep_interval_secs == 0 {
        return Err(EdgeError::Config("sweep_interval_secs must be > 0".into()));
    }
    for route in &cfg.rate_limit.routes {
        if !route.prefix.starts_with('/') {
            return Err(EdgeError::Config(format!(
                "Rate limit prefix must start with '/': {}",
                route.prefix
            )));
        }
        if route.limit == 0 {
            return Err(EdgeError::Config(format!(
                "Rate limit for {} must be > 0",
                route.prefix
            )));
        }
        if route.window_ms == 0 {
            return Err(EdgeError::Config(format!(
                "Rate limit window for {} must be > 0",
                route.prefix
            )));
        }
    }

    if cfg.timeout.upstream_ms == 0 {
        return Err(EdgeError::Config("upstream_ms must be > 0".into()));
    }

    Ok(())
}
