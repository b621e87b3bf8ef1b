// src/registry/mod.rs
//! Provider registry seam.
//!
//! The registry owns the list of upstream collection sites. The fan-out engine never reads it
//! mid-operation: each operation takes one [`Snapshot`] up front and works on that copy.

pub mod file;

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

pub use file::FileRegistry;

/// One upstream collection-site API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub key: String,
    pub name: String,
    /// Base query endpoint, e.g. `https://api.example.com/api.php/provide/vod`.
    #[serde(rename = "api")]
    pub endpoint: String,
    #[serde(default)]
    pub active: bool,
}

impl Provider {
    pub fn new(key: &str, name: &str, endpoint: &str, active: bool) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            active,
        }
    }
}

/// Immutable, request-scoped copy of the registry, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    providers: Vec<Provider>,
}

impl Snapshot {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn find(&self, key: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.key == key)
    }

    pub fn active(&self) -> Vec<Provider> {
        self.providers.iter().filter(|p| p.active).cloned().collect()
    }

    /// Providers whose key is in `keys`, keeping registry order (not allow-list order).
    /// The active flag is deliberately not consulted.
    pub fn allow_listed(&self, keys: &[String]) -> Vec<Provider> {
        self.providers
            .iter()
            .filter(|p| keys.iter().any(|k| k == &p.key))
            .cloned()
            .collect()
    }
}

/// Source of provider snapshots. Implementations must be cheap enough to call once per request.
///
/// `snapshot_all` is synchronous and may block on I/O (see [`FileRegistry`]); async callers
/// run it on the blocking pool rather than on a runtime worker.
pub trait ProviderRegistry: Send + Sync {
    /// Every registered provider, active or not.
    fn snapshot_all(&self) -> Snapshot;

    fn snapshot_active(&self) -> Snapshot {
        Snapshot::new(self.snapshot_all().active())
    }

    fn find_by_key(&self, key: &str) -> Option<Provider> {
        self.snapshot_all().find(key).cloned()
    }
}

/// In-memory registry. Used by tests, the probe tool, and anything that wants to swap the
/// provider list at runtime.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    inner: RwLock<Vec<Provider>>,
}

impl MemoryRegistry {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self {
            inner: RwLock::new(providers),
        }
    }

    /// Swap the whole list. Snapshots already handed out are unaffected.
    pub fn replace(&self, providers: Vec<Provider>) {
        match self.inner.write() {
            Ok(mut g) => *g = providers,
            Err(poisoned) => *poisoned.into_inner() = providers,
        }
    }
}

impl ProviderRegistry for MemoryRegistry {
    fn snapshot_all(&self) -> Snapshot {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        Snapshot::new(guard.clone())
    }
}
