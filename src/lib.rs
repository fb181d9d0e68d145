//! mnemo - a persistent, embedding-backed semantic memory store.
//!
//! mnemo keeps two logical namespaces - conversational "memory" and ingested
//! "knowledge" - in a single flat inner-product vector index, persisted as a
//! three-file snapshot. A document ingestion pipeline chunks PDF, DOCX,
//! markdown and plain-text files into the knowledge namespace, skipping
//! unchanged files via a fingerprint manifest.
//!
//! The embedding model is consumed as a capability through the
//! [`embedding::EmbeddingProvider`] trait; the shipped implementation talks
//! to an OpenAI-compatible `/v1/embeddings` endpoint.
//!
//! # Quick start
//!
//! ```no_run
//! use mnemo::{DataDir, KnowledgeLoader, MemoryStore};
//! use mnemo::embedding_openai::OpenAiEmbeddingProvider;
//! use mnemo::loader::LoaderOptions;
//! use mnemo::store::{EntryAttributes, Namespace};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let embedder = OpenAiEmbeddingProvider::new("sk-...".into());
//! let mut store = MemoryStore::open(data_dir, Box::new(embedder)).unwrap();
//!
//! store
//!     .add("prefers short answers", Namespace::Memory, EntryAttributes::default())
//!     .unwrap();
//!
//! let mut loader =
//!     KnowledgeLoader::new("knowledge".as_ref(), LoaderOptions::default()).unwrap();
//! let summary = loader.load(&mut store, false).unwrap();
//! println!("{} chunks created", summary.chunks_created);
//!
//! for hit in store.search_all("answer style", 5).unwrap() {
//!     println!("[{:.3}] ({}) {}", hit.score, hit.source_type, hit.content);
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod data_dir;
pub mod embedding;
pub mod embedding_openai;
pub mod error;
pub mod extract;
pub mod loader;
pub mod manifest;
pub mod store;
pub mod vector_index;
pub mod walker;

pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use loader::KnowledgeLoader;
pub use store::MemoryStore;
pub use vector_index::FlatIpIndex;
