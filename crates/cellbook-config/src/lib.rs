use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Where the active notebooks root came from, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    Argument,
    ConfigFile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub notebooks_path: PathBuf,
}

impl Config {
    pub fn new(notebooks_path: impl Into<PathBuf>) -> Self {
        Self {
            notebooks_path: notebooks_path.into(),
        }
    }

    /// Resolve the notebooks root for a session: an explicit argument wins
    /// over the config file. Tilde and shell variables are expanded either
    /// way, so `cellbook-cli '~/notebooks'` and a config entry behave alike.
    pub fn resolve_notebooks_path(
        arg: Option<&str>,
    ) -> Result<Option<(PathBuf, PathSource)>, ConfigError> {
        if let Some(arg) = arg {
            let path = expand_path(Path::new(arg)).unwrap_or_else(|| PathBuf::from(arg));
            return Ok(Some((path, PathSource::Argument)));
        }
        Ok(Self::load()?.map(|config| (config.notebooks_path, PathSource::ConfigFile)))
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.notebooks_path =
            expand_path(&config.notebooks_path).unwrap_or(config.notebooks_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/cellbook");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}

/// Expand tilde and shell variables in a path, `None` if expansion fails
/// (e.g. an unset variable).
fn expand_path(path: &Path) -> Option<PathBuf> {
    let path_str = path.to_string_lossy();
    shellexpand::full(&path_str)
        .ok()
        .map(|expanded| PathBuf::from(expanded.as_ref()))
}
