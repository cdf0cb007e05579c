//! Configuration file adapter.
//!
//! Loads a [`HalConfig`] from a JSON document on disk. Missing fields take
//! their defaults; out-of-range values are rejected, not clamped.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::config::HalConfig;

pub fn load(path: impl AsRef<Path>) -> Result<HalConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = HalConfig::from_json(&text)
        .with_context(|| format!("loading config {}", path.display()))?;
    info!("HAL: config loaded from {}", path.display());
    Ok(config)
}

/// Like [`load`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<HalConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("HAL: no config at {}, using defaults", path.display());
        return Ok(HalConfig::default());
    }
    load(path)
}
