//! Application configuration (`bulletin.toml`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use bulletin_core::config::{EngineConfig, EngineSettings};
use bulletin_core::error::ConfigError;
use bulletin_core::traits::GradeRepository;

use crate::file::FileRepository;
use crate::sink::JsonDirectorySink;

/// Where grades come from and where batches go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Dataset file (JSON or TOML).
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,
    /// Root directory for stored batches.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_dataset() -> PathBuf {
    PathBuf::from("./dataset.json")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./bulletins")
}
fn default_parallelism() -> usize {
    4
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            output_dir: default_output_dir(),
        }
    }
}

/// Top-level bulletin configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletinConfig {
    #[serde(default)]
    pub store: StoreSettings,
    /// Engine settings; validated by [`BulletinConfig::engine_config`].
    #[serde(default)]
    pub engine: EngineSettings,
    /// Max classes generated concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            engine: EngineSettings::default(),
            parallelism: default_parallelism(),
        }
    }
}

impl BulletinConfig {
    /// Validated engine configuration.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        EngineConfig::try_from(self.engine.clone())
    }

    pub fn open_repository(&self) -> Result<Arc<dyn GradeRepository>> {
        Ok(Arc::new(FileRepository::new(&self.store.dataset)?))
    }

    pub fn open_sink(&self) -> JsonDirectorySink {
        JsonDirectorySink::new(&self.store.output_dir)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `bulletin.toml` in the current directory
/// 2. `~/.config/bulletin/config.toml`
///
/// Environment variable overrides: `BULLETIN_DATASET`, `BULLETIN_OUTPUT_DIR`.
pub fn load_config_from(path: Option<&Path>) -> Result<BulletinConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("bulletin.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => BulletinConfig::default(),
    };

    // Apply env var overrides
    if let Ok(dataset) = std::env::var("BULLETIN_DATASET") {
        config.store.dataset = PathBuf::from(dataset);
    }
    if let Ok(output_dir) = std::env::var("BULLETIN_OUTPUT_DIR") {
        config.store.output_dir = PathBuf::from(output_dir);
    }

    tracing::debug!(
        source = ?config_path,
        dataset = %config.store.dataset.display(),
        "configuration loaded"
    );

    Ok(config)
}

/// Parse a `bulletin.toml` document and resolve `${VAR}` references.
pub fn parse_config_str(content: &str) -> Result<BulletinConfig> {
    let mut config: BulletinConfig = toml::from_str(content)?;
    config.store.dataset = resolve_path(&config.store.dataset);
    config.store.output_dir = resolve_path(&config.store.output_dir);
    config.engine.school_year = resolve_env_vars(&config.engine.school_year);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("bulletin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
parallelism = 2

[store]
dataset = "${_BULLETIN_TEST_ROOT}/dataset.toml"
output_dir = "out"

[engine]
school_year = "2024-2025"

[[engine.trimesters]]
number = 1
start = "2024-09-01"
end = "2025-01-01"

[[engine.mentions]]
min = 10.0
mention = "Passable"

[[engine.mentions]]
min = 0.0
mention = "Insuffisant"
"#;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_BULLETIN_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_BULLETIN_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_BULLETIN_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no vars"), "no vars");
        assert_eq!(resolve_env_vars("open ${ end"), "open ${ end");
        std::env::remove_var("_BULLETIN_TEST_VAR");
    }

    #[test]
    fn substituted_value_is_not_expanded_again() {
        std::env::set_var("_BULLETIN_TEST_NESTED", "${_BULLETIN_TEST_NESTED}/x");
        assert_eq!(
            resolve_env_vars("a/${_BULLETIN_TEST_NESTED}/b"),
            "a/${_BULLETIN_TEST_NESTED}/x/b"
        );
        std::env::remove_var("_BULLETIN_TEST_NESTED");
    }

    #[test]
    fn default_config() {
        let config = BulletinConfig::default();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.store.output_dir, PathBuf::from("./bulletins"));
        // No calendar configured: the engine refuses to start.
        assert_eq!(config.engine_config(), Err(ConfigError::MissingMentions));
    }

    #[test]
    fn parse_sample_config() {
        std::env::set_var("_BULLETIN_TEST_ROOT", "/srv/school");
        let config = parse_config_str(SAMPLE).unwrap();
        std::env::remove_var("_BULLETIN_TEST_ROOT");

        assert_eq!(config.parallelism, 2);
        assert_eq!(config.store.dataset, PathBuf::from("/srv/school/dataset.toml"));
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.school_year, "2024-2025");
        assert_eq!(engine.trimesters.len(), 1);
        assert_eq!(engine.mentions.bands().len(), 2);
    }

    #[test]
    fn missing_trimesters_is_config_error() {
        let config = parse_config_str(
            "[engine]\nschool_year = \"2024-2025\"\n[[engine.mentions]]\nmin = 0.0\nmention = \"Insuffisant\"\n",
        )
        .unwrap();
        assert_eq!(config.engine_config(), Err(ConfigError::MissingTrimesters));
    }

    #[test]
    fn explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_from(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn explicit_path_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bulletin.toml");
        std::fs::write(&path, "[store]\ndataset = \"grades.json\"\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        if std::env::var("BULLETIN_DATASET").is_err() {
            assert_eq!(config.store.dataset, PathBuf::from("grades.json"));
        }
    }
}
