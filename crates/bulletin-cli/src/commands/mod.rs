pub mod classes;
pub mod compare;
pub mod generate;
pub mod init;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;

use bulletin_store::{load_config_from, BulletinConfig};

/// Load `bulletin.toml` and apply a `--dataset` override.
pub(crate) fn load_settings(
    config_path: Option<&Path>,
    dataset: Option<PathBuf>,
) -> Result<BulletinConfig> {
    let mut config = load_config_from(config_path)?;
    if let Some(dataset) = dataset {
        config.store.dataset = dataset;
    }
    Ok(config)
}

/// Split a comma-separated list, dropping blanks.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
