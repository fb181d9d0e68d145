//! Document ingestion pipeline.
//!
//! Converts files under a watched knowledge directory into
//! knowledge-namespace entries exactly once per content version: discover,
//! fingerprint, parse, chunk, insert, and record in the manifest. One file's
//! failure never blocks the rest of the batch; the returned summary is the
//! sole error-reporting channel for a load.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::{
    chunking::{self, Chunk, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
    error::{Error, Result},
    extract,
    manifest::{Manifest, ManifestEntry},
    store::{EntryAttributes, MemoryStore, Namespace, Tier},
    walker::{self, DiscoveredFile},
};

/// Manifest file name inside the knowledge directory. Hidden, so the walker
/// never ingests it.
const MANIFEST_FILE: &str = ".mnemo_manifest.json";

/// Tunables for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Utility score assigned to newly ingested chunks.
    pub initial_utility_score: f32,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            initial_utility_score: 0.75,
        }
    }
}

/// Outcome of one load batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub chunks_created: usize,
    pub errors: Vec<String>,
    pub processed_files: Vec<String>,
}

/// Manifest-derived statistics about the ingested knowledge base.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeStats {
    pub knowledge_dir: PathBuf,
    pub supported_formats: Vec<String>,
    pub files_processed: usize,
    pub total_chunks: usize,
    pub total_characters: usize,
}

enum FileOutcome {
    Processed { chunks: usize },
    Skipped,
}

/// Loads and processes documents from the knowledge directory into the
/// knowledge namespace of an explicitly supplied [`MemoryStore`].
pub struct KnowledgeLoader {
    knowledge_dir: PathBuf,
    options: LoaderOptions,
    manifest_path: PathBuf,
    manifest: Manifest,
}

impl KnowledgeLoader {
    /// Create a loader for the given knowledge directory, creating the
    /// directory if needed and loading any existing manifest.
    pub fn new(knowledge_dir: &Path, options: LoaderOptions) -> Result<Self> {
        if options.chunk_size == 0
            || options.chunk_overlap >= options.chunk_size
        {
            return Err(Error::Config(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                options.chunk_overlap, options.chunk_size
            )));
        }

        std::fs::create_dir_all(knowledge_dir)
            .map_err(|_| Error::DataDir(knowledge_dir.to_path_buf()))?;

        let manifest_path = knowledge_dir.join(MANIFEST_FILE);
        let manifest = Manifest::load(&manifest_path);

        Ok(Self {
            knowledge_dir: knowledge_dir.to_path_buf(),
            options,
            manifest_path,
            manifest,
        })
    }

    /// Find all supported documents under the knowledge directory,
    /// deduplicated and deterministically ordered.
    pub fn discover(&self) -> Result<Vec<DiscoveredFile>> {
        walker::discover_files(&self.knowledge_dir)
    }

    /// Process every discovered file into the knowledge namespace.
    ///
    /// Unchanged files (matching fingerprint in the manifest) are skipped
    /// unless `force_reload` is set. A file's manifest entry is updated only
    /// after all of its chunks were stored; per-file failures are collected
    /// in the summary without aborting the batch. The manifest is persisted
    /// once at the end, regardless of partial failures.
    pub fn load(
        &mut self,
        store: &mut MemoryStore,
        force_reload: bool,
    ) -> Result<LoadSummary> {
        let files = self.discover()?;

        let mut summary = LoadSummary {
            files_discovered: files.len(),
            ..Default::default()
        };
        info!(
            count = files.len(),
            dir = %self.knowledge_dir.display(),
            "discovered documents"
        );

        for file in &files {
            let relative = file.relative_path.to_string_lossy().to_string();
            match self.process_file(store, file, &relative, force_reload) {
                Ok(FileOutcome::Skipped) => {
                    summary.files_skipped += 1;
                }
                Ok(FileOutcome::Processed { chunks }) => {
                    summary.files_processed += 1;
                    summary.chunks_created += chunks;
                    summary.processed_files.push(relative);
                }
                Err(e) => {
                    error!(path = %relative, error = %e, "failed to process file");
                    summary.errors.push(format!("{relative}: {e}"));
                }
            }
        }

        if let Err(e) = self.manifest.save(&self.manifest_path) {
            error!(error = %e, "failed to persist ingestion manifest");
        }

        Ok(summary)
    }

    fn process_file(
        &mut self,
        store: &mut MemoryStore,
        file: &DiscoveredFile,
        relative: &str,
        force_reload: bool,
    ) -> Result<FileOutcome> {
        let fingerprint = fingerprint_file(&file.absolute_path)?;

        if !force_reload && self.manifest.is_unchanged(relative, &fingerprint)
        {
            debug!(path = %relative, "skipping unchanged file");
            return Ok(FileOutcome::Skipped);
        }

        info!(path = %relative, "processing file");
        let Some(text) = extract::extract_text(&file.absolute_path)? else {
            return Ok(FileOutcome::Skipped);
        };

        if text.trim().is_empty() {
            return Err(Error::parse(&file.absolute_path, "no text extracted"));
        }

        let chunks = chunking::chunk_text(
            &text,
            self.options.chunk_size,
            self.options.chunk_overlap,
        );
        if chunks.is_empty() {
            return Err(Error::parse(&file.absolute_path, "no chunks created"));
        }

        let total_chunks = chunks.len();
        for chunk in &chunks {
            store.add(
                &chunk.content,
                Namespace::Knowledge,
                chunk_attributes(
                    chunk,
                    relative,
                    total_chunks,
                    self.options.initial_utility_score,
                ),
            )?;
        }

        self.manifest.processed_files.insert(
            relative.to_string(),
            ManifestEntry {
                fingerprint,
                chunk_count: total_chunks,
                char_count: text.len(),
                processed_at: Utc::now(),
            },
        );

        info!(path = %relative, chunks = total_chunks, "processed file");
        Ok(FileOutcome::Processed {
            chunks: total_chunks,
        })
    }

    /// Manifest-derived statistics for the knowledge base.
    pub fn stats(&self) -> KnowledgeStats {
        let processed = &self.manifest.processed_files;
        KnowledgeStats {
            knowledge_dir: self.knowledge_dir.clone(),
            supported_formats: extract::SUPPORTED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            files_processed: processed.len(),
            total_chunks: processed.values().map(|e| e.chunk_count).sum(),
            total_characters: processed.values().map(|e| e.char_count).sum(),
        }
    }

    /// Remove all knowledge entries from the store and reset the manifest.
    pub fn clear_knowledge(&mut self, store: &mut MemoryStore) -> Result<()> {
        store.clear(Some(Namespace::Knowledge))?;
        self.manifest = Manifest::default();
        self.manifest.save(&self.manifest_path)?;
        info!("knowledge base cleared");
        Ok(())
    }
}

impl std::fmt::Debug for KnowledgeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeLoader")
            .field("knowledge_dir", &self.knowledge_dir)
            .field("tracked_files", &self.manifest.processed_files.len())
            .finish_non_exhaustive()
    }
}

/// SHA-256 hex digest of a file's raw bytes.
fn fingerprint_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn chunk_attributes(
    chunk: &Chunk,
    source_file: &str,
    total_chunks: usize,
    utility_score: f32,
) -> EntryAttributes {
    let mut extra = BTreeMap::new();
    extra.insert("source_file".to_string(), source_file.into());
    extra.insert("chunk_index".to_string(), chunk.chunk_index.into());
    extra.insert("total_chunks".to_string(), total_chunks.into());
    extra.insert("char_start".to_string(), chunk.char_start.into());
    extra.insert("char_end".to_string(), chunk.char_end.into());

    EntryAttributes {
        utility_score: Some(utility_score),
        tier: Some(Tier::Active),
        extra,
    }
}
