//! Data directory layout and config file loading.
//!
//! ```text
//! ~/.dreamsig/
//! ├── dreams.db
//! └── dreamsig.toml   (optional)
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use dream_core::Config;

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DATA_DIR_ENV: &str = "DREAMSIG_DATA_DIR";
pub const DB_FILE: &str = "dreams.db";
pub const CONFIG_FILE: &str = "dreamsig.toml";

fn default_base_dir() -> PathBuf {
    dirs_home().join(".dreamsig")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolved data directory. Priority: explicit path, then
/// `DREAMSIG_DATA_DIR`, then `~/.dreamsig`.
#[derive(Clone, Debug)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve and create the directory.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = explicit
            .map(PathBuf::from)
            .or_else(|| {
                env::var_os(DATA_DIR_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(default_base_dir);
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::Config(format!("failed to create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(DB_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn open_store(&self) -> Result<Store> {
        Store::open(&self.db_path())
    }

    /// Load `dreamsig.toml`, falling back to defaults when absent. The
    /// result is validated; an invalid file is an error, never ignored.
    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_path();
        let config = match fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!("loading config from {}", path.display());
                parse_config(&content)
                    .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(StoreError::Config(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(config)
    }
}

/// Parse and validate TOML config text.
pub fn parse_config(content: &str) -> std::result::Result<Config, String> {
    let config: Config = toml::from_str(content).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
