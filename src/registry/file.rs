// src/registry/file.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{Provider, ProviderRegistry, Snapshot};

/// Sites that are always present, even if the db file forgets them.
pub fn default_sites() -> Vec<Provider> {
    vec![Provider::new(
        "ffzy",
        "非凡影视",
        "https://api.ffzyapi.com/api.php/provide/vod",
        true,
    )]
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SitesDb {
    #[serde(default)]
    sites: Vec<Provider>,
}

/// JSON-file registry (`{ "sites": [...] }`). Re-read on every snapshot so edits made by
/// whatever manages the file show up on the next request.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the db file seeded with [`default_sites`] if it does not exist yet.
    pub fn init(path: impl Into<PathBuf>) -> Result<Self> {
        let reg = Self::new(path);
        if !reg.path.exists() {
            if let Some(dir) = reg.path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating registry dir {}", dir.display()))?;
            }
            let seed = SitesDb {
                sites: default_sites(),
            };
            let body = serde_json::to_string_pretty(&seed)?;
            fs::write(&reg.path, body)
                .with_context(|| format!("seeding registry {}", reg.path.display()))?;
            tracing::info!(target: "registry", path = %reg.path.display(), "seeded provider db");
        }
        Ok(reg)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_sites(&self) -> Result<Vec<Provider>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading registry {}", self.path.display()))?;
        let db: SitesDb = serde_json::from_str(&raw)
            .with_context(|| format!("parsing registry {}", self.path.display()))?;
        Ok(db.sites)
    }
}

/// Append every default site whose key is missing.
fn merge_defaults(mut sites: Vec<Provider>) -> Vec<Provider> {
    for def in default_sites() {
        if !sites.iter().any(|s| s.key == def.key) {
            sites.push(def);
        }
    }
    sites
}

impl ProviderRegistry for FileRegistry {
    fn snapshot_all(&self) -> Snapshot {
        match self.read_sites() {
            Ok(sites) => Snapshot::new(merge_defaults(sites)),
            Err(e) => {
                tracing::warn!(target: "registry", error = ?e, "registry unreadable; using defaults");
                Snapshot::new(default_sites())
            }
        }
    }
}
