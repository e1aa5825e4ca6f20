// src/config/validate.rs

use crate::config::model::{DaemonConfig, RawDaemonConfig};
use crate::errors::{Result, WavebuildError};

impl TryFrom<RawDaemonConfig> for DaemonConfig {
    type Error = crate::errors::WavebuildError;

    fn try_from(raw: RawDaemonConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(DaemonConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawDaemonConfig) -> Result<()> {
    validate_project(cfg)?;
    validate_watch(cfg)?;
    validate_pools(cfg)?;
    Ok(())
}

fn validate_project(cfg: &RawDaemonConfig) -> Result<()> {
    let name = cfg.project.definition_filename.trim();
    if name.is_empty() {
        return Err(WavebuildError::ConfigError(
            "[project].definition_filename must not be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(WavebuildError::ConfigError(format!(
            "[project].definition_filename must be a plain file name (got '{}')",
            name
        )));
    }
    Ok(())
}

fn validate_watch(cfg: &RawDaemonConfig) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(WavebuildError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_pools(cfg: &RawDaemonConfig) -> Result<()> {
    let pools = &cfg.pools;
    for (key, value) in [
        ("default_workers", Some(pools.default_workers)),
        ("wave_workers", pools.wave_workers),
        ("source_workers", pools.source_workers),
    ] {
        if value == Some(0) {
            return Err(WavebuildError::ConfigError(format!(
                "[pools].{key} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}
