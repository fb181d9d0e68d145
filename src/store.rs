//! The memory store engine.
//!
//! A [`MemoryStore`] owns one flat inner-product index plus two parallel
//! arrays (raw content and entry metadata). Position `i` in the index
//! corresponds exactly to `documents[i]` and `metadata[i]`; every mutation
//! preserves `index.len() == documents.len() == metadata.len()`.
//!
//! All namespaces share the single physical index; a namespace is a filter
//! value on the metadata, not a partition. The whole store is re-serialized
//! to disk on every mutation — durability is prioritized over write
//! throughput. An append-only log with periodic compaction is the obvious
//! upgrade path if write volume ever matters.
//!
//! Mutating operations take `&mut self`; callers are responsible for
//! serializing access, which the borrow checker enforces in-process.

use std::{collections::BTreeMap, path::PathBuf, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    data_dir::DataDir,
    embedding::{EmbeddingProvider, embed_normalized},
    error::{Error, Result},
    vector_index::{FlatIpIndex, NO_MATCH},
};

/// Factor applied to the requested result count when a namespace filter may
/// drop neighbors after retrieval.
const OVER_FETCH_FACTOR: usize = 3;

/// Logical partition tag for entries sharing the physical index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Conversational memories.
    Memory,
    /// Ingested document chunks.
    Knowledge,
}

impl Namespace {
    /// Attribution label used by unified search results.
    pub fn source_type(self) -> &'static str {
        match self {
            Namespace::Memory => "MEMORY",
            Namespace::Knowledge => "KNOWLEDGE",
        }
    }

    /// Default utility score for entries added without an explicit one.
    pub fn default_utility_score(self) -> f32 {
        match self {
            Namespace::Memory => 0.50,
            Namespace::Knowledge => 0.75,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Memory => write!(f, "memory"),
            Namespace::Knowledge => write!(f, "knowledge"),
        }
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(Namespace::Memory),
            "knowledge" => Ok(Namespace::Knowledge),
            other => Err(Error::Config(format!(
                "unknown namespace: {other} (expected memory or knowledge)"
            ))),
        }
    }
}

/// Priority label derived from an entry's utility score.
///
/// Informational only: nothing currently evicts by tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum Tier {
    Sacred,
    Active,
    Archival,
}

impl Tier {
    /// Derive a tier from a utility score.
    pub fn from_utility_score(score: f32) -> Self {
        if score >= 0.8 {
            Tier::Sacred
        } else if score >= 0.3 {
            Tier::Active
        } else {
            Tier::Archival
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Sacred => write!(f, "Sacred"),
            Tier::Active => write!(f, "Active"),
            Tier::Archival => write!(f, "Archival"),
        }
    }
}

/// Metadata record stored alongside each document.
///
/// The embedding vector itself lives only in the index, addressed by the
/// entry's ordinal position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub namespace: Namespace,
    pub timestamp: DateTime<Utc>,
    pub content_length: usize,
    pub utility_score: f32,
    pub tier: Tier,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    /// Caller-supplied extension fields (chunk provenance lands here).
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Optional per-entry fields supplied at insertion.
#[derive(Debug, Clone, Default)]
pub struct EntryAttributes {
    /// Overrides the namespace default utility score.
    pub utility_score: Option<f32>,
    /// Overrides the tier computed from the utility score.
    pub tier: Option<Tier>,
    /// Open string-keyed extension fields carried on the entry.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub score: f32,
    pub namespace: Namespace,
    /// Attribution label (MEMORY / KNOWLEDGE) derived from the namespace.
    pub source_type: &'static str,
    /// Snapshot of the entry metadata after the access-stat bump.
    pub entry: MemoryEntry,
}

/// Aggregate counts reported by [`MemoryStore::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_entries: usize,
    pub memory_count: usize,
    pub knowledge_count: usize,
    pub tier_counts: TierCounts,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TierCounts {
    pub sacred: usize,
    pub active: usize,
    pub archival: usize,
}

/// Durable, namespace-tagged semantic store shared by all callers.
pub struct MemoryStore {
    data_dir: DataDir,
    embedder: Box<dyn EmbeddingProvider>,
    index: FlatIpIndex,
    documents: Vec<String>,
    metadata: Vec<MemoryEntry>,
}

impl MemoryStore {
    /// Open the store, loading an existing snapshot if one is present.
    ///
    /// An unreadable, partially written, or out-of-sync snapshot is not
    /// fatal: it is discarded with a warning and the store starts empty.
    pub fn open(
        data_dir: DataDir,
        embedder: Box<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let dimension = embedder.dimension();
        if dimension == 0 {
            return Err(Error::Config(
                "embedding provider reports a zero dimension".into(),
            ));
        }

        let mut store = Self {
            index: FlatIpIndex::new(dimension)?,
            documents: Vec::new(),
            metadata: Vec::new(),
            data_dir,
            embedder,
        };
        store.load_snapshot();

        info!(entries = store.documents.len(), "memory store ready");
        Ok(store)
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Read-only view of the stored entry metadata, in insertion order.
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.metadata
    }

    /// Embed and store a new entry, returning its id.
    ///
    /// The tier is derived from the utility score unless either is supplied
    /// in `attributes`. The full snapshot is persisted synchronously; a
    /// persistence failure is logged but does not roll back the in-memory
    /// insertion.
    pub fn add(
        &mut self,
        content: &str,
        namespace: Namespace,
        attributes: EntryAttributes,
    ) -> Result<String> {
        let vector = embed_normalized(self.embedder.as_ref(), content)?;
        self.index.add(&vector)?;

        let ordinal = self.documents.len();
        let now = Utc::now();
        let id = format!("{namespace}_{ordinal}_{}", now.timestamp());

        let utility_score = attributes
            .utility_score
            .unwrap_or_else(|| namespace.default_utility_score());
        let tier = attributes
            .tier
            .unwrap_or_else(|| Tier::from_utility_score(utility_score));

        self.metadata.push(MemoryEntry {
            id: id.clone(),
            namespace,
            timestamp: now,
            content_length: content.len(),
            utility_score,
            tier,
            access_count: 0,
            last_accessed: None,
            attributes: attributes.extra,
        });
        self.documents.push(content.to_string());

        self.persist_or_log("add");
        info!(%id, %namespace, "added entry");
        Ok(id)
    }

    /// Semantic search, optionally filtered to one namespace.
    ///
    /// Over-fetches `limit * 3` neighbors to compensate for entries dropped
    /// by the filter. Every surfaced hit has its access stats bumped; the
    /// updated stats are persisted if any hit was returned.
    pub fn search(
        &mut self,
        query: &str,
        namespace: Option<Namespace>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let k = limit
            .saturating_mul(OVER_FETCH_FACTOR)
            .min(self.documents.len());
        self.search_inner(query, namespace, limit, k)
    }

    /// Semantic search across every namespace.
    ///
    /// Requests exactly `limit` neighbors (nothing is filtered out, so no
    /// over-fetch is needed). Hits carry the source_type of their namespace.
    pub fn search_all(
        &mut self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let k = limit.min(self.documents.len());
        self.search_inner(query, None, limit, k)
    }

    fn search_inner(
        &mut self,
        query: &str,
        namespace: Option<Namespace>,
        limit: usize,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        if self.documents.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embed_normalized(self.embedder.as_ref(), query)?;
        let neighbors = self.index.search(&query_vector, k)?;

        let mut hits = Vec::new();
        for (score, id) in neighbors {
            if id == NO_MATCH {
                continue;
            }
            let idx = id as usize;

            if let Some(filter) = namespace
                && self.metadata[idx].namespace != filter
            {
                continue;
            }

            let entry = &mut self.metadata[idx];
            entry.access_count += 1;
            entry.last_accessed = Some(Utc::now());

            hits.push(SearchHit {
                id: entry.id.clone(),
                content: self.documents[idx].clone(),
                score,
                namespace: entry.namespace,
                source_type: entry.namespace.source_type(),
                entry: entry.clone(),
            });

            if hits.len() >= limit {
                break;
            }
        }

        if !hits.is_empty() {
            self.persist_or_log("search access update");
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits)
    }

    /// Number of entries, optionally filtered by namespace.
    pub fn count(&self, namespace: Option<Namespace>) -> usize {
        match namespace {
            None => self.documents.len(),
            Some(ns) => self
                .metadata
                .iter()
                .filter(|m| m.namespace == ns)
                .count(),
        }
    }

    /// Aggregate per-namespace and per-tier counts.
    pub fn stats(&self) -> StoreStats {
        let mut tier_counts = TierCounts::default();
        for entry in &self.metadata {
            match entry.tier {
                Tier::Sacred => tier_counts.sacred += 1,
                Tier::Active => tier_counts.active += 1,
                Tier::Archival => tier_counts.archival += 1,
            }
        }

        StoreStats {
            total_entries: self.documents.len(),
            memory_count: self.count(Some(Namespace::Memory)),
            knowledge_count: self.count(Some(Namespace::Knowledge)),
            tier_counts,
            data_dir: self.data_dir.root().to_path_buf(),
        }
    }

    /// Remove entries, either everything or one namespace.
    ///
    /// The index has no targeted removal, so clearing a namespace repacks
    /// the retained vectors into a fresh index in their original relative
    /// order. Already-computed embeddings are copied as-is, never
    /// re-derived, so the operation is O(remaining) memcpy and does not
    /// touch the embedding provider.
    pub fn clear(&mut self, namespace: Option<Namespace>) -> Result<()> {
        let Some(ns) = namespace else {
            self.index = FlatIpIndex::new(self.embedder.dimension())?;
            self.documents.clear();
            self.metadata.clear();
            self.persist_or_log("clear");
            info!("cleared all entries");
            return Ok(());
        };

        let keep: Vec<usize> = self
            .metadata
            .iter()
            .enumerate()
            .filter(|(_, m)| m.namespace != ns)
            .map(|(i, _)| i)
            .collect();

        if keep.len() == self.metadata.len() {
            info!(namespace = %ns, "no entries to clear");
            return Ok(());
        }

        let index = self.index.retain_rows(&keep)?;
        let mut documents = Vec::with_capacity(keep.len());
        let mut metadata = Vec::with_capacity(keep.len());
        for i in keep {
            documents.push(self.documents[i].clone());
            metadata.push(self.metadata[i].clone());
        }

        self.index = index;
        self.documents = documents;
        self.metadata = metadata;
        self.persist_or_log("clear");
        info!(namespace = %ns, remaining = self.documents.len(), "cleared namespace");
        Ok(())
    }

    /// Load the three-file snapshot if all files are present.
    ///
    /// Any failure leaves the store empty; partial snapshots (e.g. from a
    /// crash between file writes) are discarded, not repaired.
    fn load_snapshot(&mut self) {
        let index_path = self.data_dir.index_file();
        let metadata_path = self.data_dir.metadata_file();
        let documents_path = self.data_dir.documents_file();

        if !(index_path.exists()
            && metadata_path.exists()
            && documents_path.exists())
        {
            return;
        }

        match self.try_load_snapshot() {
            Ok((index, metadata, documents)) => {
                self.index = index;
                self.metadata = metadata;
                self.documents = documents;
                info!(entries = self.documents.len(), "loaded existing snapshot");
            }
            Err(e) => {
                warn!(error = %e, "failed to load existing snapshot, starting fresh");
            }
        }
    }

    fn try_load_snapshot(
        &self,
    ) -> Result<(FlatIpIndex, Vec<MemoryEntry>, Vec<String>)> {
        let index = FlatIpIndex::load(&self.data_dir.index_file())?;
        let metadata: Vec<MemoryEntry> = serde_json::from_str(
            &std::fs::read_to_string(self.data_dir.metadata_file())?,
        )?;
        let documents: Vec<String> = serde_json::from_str(
            &std::fs::read_to_string(self.data_dir.documents_file())?,
        )?;

        if index.dimension() != self.embedder.dimension() {
            return Err(Error::Config(format!(
                "snapshot dimension {} does not match provider dimension {}",
                index.dimension(),
                self.embedder.dimension()
            )));
        }
        if index.len() != metadata.len() || metadata.len() != documents.len()
        {
            return Err(Error::Config(format!(
                "snapshot arrays out of sync: {} vectors, {} metadata, {} documents",
                index.len(),
                metadata.len(),
                documents.len()
            )));
        }

        Ok((index, metadata, documents))
    }

    /// Write the full snapshot: index, metadata, documents.
    fn save_snapshot(&self) -> Result<()> {
        self.index.save(&self.data_dir.index_file())?;

        let metadata_path = self.data_dir.metadata_file();
        let metadata = serde_json::to_string_pretty(&self.metadata)?;
        std::fs::write(&metadata_path, metadata).map_err(|source| {
            Error::Persistence {
                path: metadata_path.clone(),
                source,
            }
        })?;

        let documents_path = self.data_dir.documents_file();
        let documents = serde_json::to_string_pretty(&self.documents)?;
        std::fs::write(&documents_path, documents).map_err(|source| {
            Error::Persistence {
                path: documents_path.clone(),
                source,
            }
        })?;

        Ok(())
    }

    /// Persist after a mutation. Failures are logged and swallowed: the
    /// in-memory state is already updated and stays authoritative.
    fn persist_or_log(&self, operation: &str) {
        if let Err(e) = self.save_snapshot() {
            error!(error = %e, operation, "failed to persist snapshot");
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.documents.len())
            .field("dimension", &self.index.dimension())
            .finish_non_exhaustive()
    }
}
