//! Versioned JSON export of one user's profile.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dream_core::{DreamRecord, UserAggregate, UserStats};

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const EXPORT_VERSION: &str = "1";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileExport {
    pub version: String,
    pub user_id: String,
    pub aggregate: UserAggregate,
    pub stats: UserStats,
    pub dreams: Vec<DreamRecord>,
}

/// Snapshot a user's aggregate, stats and full history.
pub fn export_profile(store: &Store, user_id: &str) -> Result<ProfileExport> {
    let (aggregate, dreams) = store.read_snapshot(|| {
        let aggregate = store.load_aggregate(user_id)?.unwrap_or_default();
        Ok::<_, StoreError>((aggregate, store.user_dreams(user_id, None)?))
    })?;
    aggregate
        .validate()
        .map_err(|e| StoreError::InvalidData(format!("user '{user_id}': {e}")))?;
    Ok(ProfileExport {
        version: EXPORT_VERSION.to_string(),
        user_id: user_id.to_string(),
        stats: UserStats::from_aggregate(&aggregate),
        aggregate,
        dreams,
    })
}

pub fn export_json(store: &Store, user_id: &str) -> Result<String> {
    let profile = export_profile(store, user_id)?;
    serde_json::to_string_pretty(&profile)
        .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
}

impl Store {
    /// Write a user's profile export to `path`.
    pub fn export_json_file(&self, user_id: &str, path: &Path) -> Result<()> {
        let json = export_json(self, user_id)?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }
}
