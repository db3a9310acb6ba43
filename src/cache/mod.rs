//! Durable id→text store of provider responses.
//!
//! Records live in a [`DashMap`] so stage workers can write distinct ids
//! concurrently; the whole map is loaded from and flushed to one JSON index
//! file. A record's `images` field is tracked separately from its JSON entry
//! so the two can be updated without clobbering each other.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache asset not found: {0}")]
    NotFound(String),
    #[error("cache file I/O failed for {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache file is not valid JSON: {}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One persisted record.
///
/// An empty `json_entry` or `Some("")` images value is a valid "confirmed no
/// data" sentinel, distinct from an absent record or `None` images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheAsset {
    #[serde(default)]
    pub json_entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<String>,
    #[serde(skip)]
    used: bool,
}

#[derive(Debug, Default)]
pub struct CacheStore {
    path: Option<PathBuf>,
    assets: DashMap<String, CacheAsset>,
}

impl CacheStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the index at `path`; a missing file yields an empty store bound to that path.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let assets = DashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let stored: BTreeMap<String, CacheAsset> =
                    serde_json::from_str(&text).map_err(|source| CacheError::Serialize {
                        path: path.clone(),
                        source,
                    })?;
                for (id, asset) in stored {
                    assets.insert(id, asset);
                }
                info!(entries = assets.len(), path = %path.display(), "Cache loaded");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No cache file found, starting empty");
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        }

        Ok(Self {
            path: Some(path),
            assets,
        })
    }

    /// Creates or overwrites the record for `id` with a fresh JSON entry.
    pub fn add_asset(&self, id: &str, text: &str) {
        self.assets.insert(
            id.to_string(),
            CacheAsset {
                json_entry: text.to_string(),
                images: None,
                used: true,
            },
        );
    }

    /// Returns the JSON entry stored for `id`.
    pub fn get_asset(&self, id: &str) -> Result<String, CacheError> {
        let mut asset = self
            .assets
            .get_mut(id)
            .ok_or_else(|| CacheError::NotFound(id.to_string()))?;
        asset.used = true;
        Ok(asset.json_entry.clone())
    }

    pub fn contains_key(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    /// Serialized images stored for `id`; `Some("")` means the provider had none.
    pub fn get_images(&self, id: &str) -> Option<String> {
        let mut asset = self.assets.get_mut(id)?;
        asset.used = true;
        asset.images.clone()
    }

    /// Overwrites only the images field, creating the record if needed.
    pub fn update_asset_images(&self, id: &str, text: &str) {
        let mut asset = self.assets.entry(id.to_string()).or_default();
        asset.images = Some(text.to_string());
        asset.used = true;
    }

    /// Overwrites only the JSON entry, creating the record if needed.
    pub fn update_asset_json_entry(&self, id: &str, text: &str) {
        let mut asset = self.assets.entry(id.to_string()).or_default();
        asset.json_entry = text.to_string();
        asset.used = true;
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Drops records not read or written since the store was loaded.
    pub fn prune_unused(&self) -> usize {
        let before = self.assets.len();
        self.assets.retain(|_, asset| asset.used);
        let removed = before - self.assets.len();
        debug!(removed, remaining = self.assets.len(), "Pruned unused cache entries");
        removed
    }

    /// Writes the store to its index file (temp file + rename). No-op for in-memory stores.
    pub async fn flush(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot: BTreeMap<String, CacheAsset> = self
            .assets
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let text = serde_json::to_string(&snapshot).map_err(|source| CacheError::Serialize {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("tmp");
        let io_err = |source| CacheError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&tmp, text).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        info!(entries = snapshot.len(), path = %path.display(), "Cache flushed");
        Ok(())
    }
}
