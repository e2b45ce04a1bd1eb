use crate::config::schema::PreparationConfig;
use crate::edit::write_creating_dirs;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        match self {
            ConfigError::Json { path: None, source } => ConfigError::Json {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to access preparation config {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse preparation config JSON ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse preparation config JSON: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PreparationConfig, ConfigError> {
    serde_json::from_str(input).map_err(|source| ConfigError::Json { path: None, source })
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PreparationConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Render a config as pretty JSON with a trailing newline.
pub fn to_json_string(config: &PreparationConfig) -> Result<String, ConfigError> {
    let mut json = serde_json::to_string_pretty(config)
        .map_err(|source| ConfigError::Json { path: None, source })?;
    json.push('\n');
    Ok(json)
}

/// Write a config atomically, creating parent directories as needed.
pub fn save_to_path(config: &PreparationConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let json = to_json_string(config).map_err(|error| error.with_path(path))?;
    write_creating_dirs(path, json.as_bytes()).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
