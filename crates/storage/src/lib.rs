//! Editor preferences on disk. Annotation state is never persisted.

use directories::ProjectDirs;
use pagemark_model::EditorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_SCHEMA_VERSION: u32 = 1;
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u32,
    config: EditorConfig,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "PageMark", "PageMark")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Stored config, or the defaults when nothing was saved yet.
    pub fn load_config(&self) -> Result<EditorConfig, StorageError> {
        let path = self.config_path();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(EditorConfig::default());
        }

        load_config_file(&path)
    }

    pub fn save_config(&self, config: &EditorConfig) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope = ConfigEnvelope { version: CONFIG_SCHEMA_VERSION, config: config.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.config_path(), bytes)?;
        Ok(())
    }
}

/// Reads a config file written by [`Storage::save_config`] or a bare
/// `EditorConfig` JSON object. Missing fields take their defaults.
///
/// A top-level `version` key marks an envelope, which then has to parse in
/// full. It is never reread as a bare config.
pub fn load_config_file(path: &Path) -> Result<EditorConfig, StorageError> {
    let bytes = fs::read(path)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;

    let Some(version) = value.get("version") else {
        return Ok(serde_json::from_value(value)?);
    };

    let found: u32 = serde_json::from_value(version.clone())?;
    if found > CONFIG_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found,
            supported: CONFIG_SCHEMA_VERSION,
        });
    }

    let envelope: ConfigEnvelope = serde_json::from_value(value)?;
    Ok(envelope.config)
}
