//! Persisted record of which projects have been downloaded.
//!
//! Stored as a JSON object mapping project id to a boolean. The whole
//! document is read and rewritten on every update.

use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DownloadRegistry {
    path: PathBuf,
}

impl DownloadRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the whole registry. A missing file is an empty registry.
    pub fn load(&self) -> Result<BTreeMap<String, bool>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, entries: &BTreeMap<String, bool>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }

    pub fn mark_downloaded(&self, project_id: u64) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(project_id.to_string(), true);
        self.save(&entries)?;
        tracing::debug!(project_id, "recorded download");
        Ok(())
    }

    pub fn is_downloaded(&self, project_id: u64) -> Result<bool> {
        Ok(self
            .load()?
            .get(&project_id.to_string())
            .copied()
            .unwrap_or(false))
    }

    /// Ids of every project recorded as downloaded.
    pub fn downloaded_ids(&self) -> Result<Vec<u64>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|(_, downloaded)| *downloaded)
            .filter_map(|(id, _)| id.parse().ok())
            .collect())
    }
}
