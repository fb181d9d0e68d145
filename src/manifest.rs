use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

const MANIFEST_VERSION: &str = "1.0";

/// Per-file record tracking the last processed content version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// SHA-256 hex digest of the file contents, used purely for change
    /// detection.
    pub fingerprint: String,
    pub chunk_count: usize,
    pub char_count: usize,
    pub processed_at: DateTime<Utc>,
}

/// Durable map from ingested file path to its last-processed fingerprint.
///
/// The ingestion pipeline consults this to skip unchanged files; it is
/// persisted once per load batch regardless of per-file failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub processed_files: BTreeMap<String, ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            processed_files: BTreeMap::new(),
        }
    }
}

impl Manifest {
    /// Load the manifest, treating a missing or unreadable file as empty.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(Error::from))
        {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to load manifest, starting fresh");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| Error::Persistence {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whether a file was already processed with this exact content.
    pub fn is_unchanged(&self, relative_path: &str, fingerprint: &str) -> bool {
        self.processed_files
            .get(relative_path)
            .is_some_and(|entry| entry.fingerprint == fingerprint)
    }
}
