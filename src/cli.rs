use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "mnemo",
    about = "A persistent semantic memory store with document ingestion"
)]
pub struct Cli {
    /// Override the data directory holding the store snapshot
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory scanned for knowledge documents
    #[arg(long, global = true, default_value = "knowledge")]
    pub knowledge_dir: PathBuf,

    /// Override the embeddings endpoint base URL (or MNEMO_EMBED_URL)
    #[arg(long, global = true)]
    pub embed_url: Option<String>,

    /// Override the embedding model name (or MNEMO_EMBED_MODEL)
    #[arg(long, global = true)]
    pub embed_model: Option<String>,

    /// Output dimension of the embedding model
    #[arg(long, global = true, default_value_t = 1536)]
    pub embed_dim: usize,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a new entry
    Add(AddArgs),
    /// Semantic search, optionally within one namespace
    Search(SearchArgs),
    /// Semantic search across all namespaces with source attribution
    SearchAll(SearchAllArgs),
    /// Count stored entries
    Count {
        /// Restrict the count to one namespace (memory or knowledge)
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Show store statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove entries from the store
    Clear {
        /// Clear only this namespace (memory or knowledge); omit for all
        #[arg(long)]
        namespace: Option<String>,
        /// Actually perform the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Ingest documents from the knowledge directory
    Load {
        /// Reprocess files even when their fingerprint is unchanged
        #[arg(long)]
        force: bool,
    },
    /// List the documents the ingestion pipeline would consider
    Discover,
    /// Show ingestion statistics from the manifest
    KnowledgeStats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove all knowledge entries and reset the ingestion manifest
    ClearKnowledge {
        /// Actually perform the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, clap::Args)]
pub struct AddArgs {
    /// Entry content
    pub content: String,

    /// Target namespace (memory or knowledge)
    #[arg(long, default_value = "memory")]
    pub namespace: String,

    /// Override the namespace default utility score
    #[arg(long)]
    pub utility_score: Option<f32>,
}

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Restrict results to one namespace (memory or knowledge)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Maximum number of results
    #[arg(short = 'n', long, default_value_t = 5)]
    pub count: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct SearchAllArgs {
    /// Search query
    pub query: String,

    /// Maximum number of results
    #[arg(short = 'n', long, default_value_t = 5)]
    pub count: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
