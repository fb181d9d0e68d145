use clap::Parser;
use tracing_subscriber::EnvFilter;

use mnemo::{
    DataDir, KnowledgeLoader, MemoryStore,
    cli::{AddArgs, Cli, Command, SearchAllArgs, SearchArgs},
    embedding::EmbeddingProvider,
    embedding_openai::OpenAiEmbeddingProvider,
    error,
    loader::LoaderOptions,
    store::{EntryAttributes, Namespace, SearchHit},
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("MNEMO_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn build_embedder(cli: &Cli) -> Box<dyn EmbeddingProvider> {
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let mut provider = OpenAiEmbeddingProvider::new(api_key);

    let base_url = cli
        .embed_url
        .clone()
        .or_else(|| std::env::var("MNEMO_EMBED_URL").ok());
    if let Some(url) = base_url {
        provider = provider.with_base_url(&url);
    }

    let model = cli
        .embed_model
        .clone()
        .or_else(|| std::env::var("MNEMO_EMBED_MODEL").ok());
    if let Some(model) = model {
        provider = provider.with_model(model, cli.embed_dim);
    }

    Box::new(provider)
}

fn parse_namespace(value: Option<&str>) -> error::Result<Option<Namespace>> {
    value.map(str::parse).transpose()
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let embedder = build_embedder(&cli);
    let mut store = MemoryStore::open(data_dir, embedder)?;

    match &cli.command {
        Command::Add(args) => cmd_add(&mut store, args)?,
        Command::Search(args) => cmd_search(&mut store, args)?,
        Command::SearchAll(args) => cmd_search_all(&mut store, args)?,
        Command::Count { namespace } => {
            let namespace = parse_namespace(namespace.as_deref())?;
            println!("{}", store.count(namespace));
        }
        Command::Stats { json } => cmd_stats(&store, *json)?,
        Command::Clear { namespace, yes } => {
            let namespace = parse_namespace(namespace.as_deref())?;
            if !*yes {
                eprintln!("Refusing to clear without --yes.");
                return Ok(());
            }
            store.clear(namespace)?;
            println!("Cleared.");
        }
        Command::Load { force } => {
            let mut loader = KnowledgeLoader::new(
                &cli.knowledge_dir,
                LoaderOptions::default(),
            )?;
            let summary = loader.load(&mut store, *force)?;
            println!(
                "{} discovered, {} processed, {} skipped, {} chunks created",
                summary.files_discovered,
                summary.files_processed,
                summary.files_skipped,
                summary.chunks_created,
            );
            for error in &summary.errors {
                eprintln!("  error: {error}");
            }
        }
        Command::Discover => {
            let loader = KnowledgeLoader::new(
                &cli.knowledge_dir,
                LoaderOptions::default(),
            )?;
            let files = loader.discover()?;
            for file in &files {
                println!("{}", file.relative_path.display());
            }
            eprintln!("{} file(s)", files.len());
        }
        Command::KnowledgeStats { json } => {
            let loader = KnowledgeLoader::new(
                &cli.knowledge_dir,
                LoaderOptions::default(),
            )?;
            let stats = loader.stats();
            if *json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("knowledge dir:    {}", stats.knowledge_dir.display());
                println!("files processed:  {}", stats.files_processed);
                println!("total chunks:     {}", stats.total_chunks);
                println!("total characters: {}", stats.total_characters);
            }
        }
        Command::ClearKnowledge { yes } => {
            if !*yes {
                eprintln!("Refusing to clear without --yes.");
                return Ok(());
            }
            let mut loader = KnowledgeLoader::new(
                &cli.knowledge_dir,
                LoaderOptions::default(),
            )?;
            loader.clear_knowledge(&mut store)?;
            println!("Knowledge base cleared.");
        }
    }

    Ok(())
}

fn cmd_add(store: &mut MemoryStore, args: &AddArgs) -> error::Result<()> {
    let namespace: Namespace = args.namespace.parse()?;
    let id = store.add(
        &args.content,
        namespace,
        EntryAttributes {
            utility_score: args.utility_score,
            ..Default::default()
        },
    )?;
    println!("{id}");
    Ok(())
}

fn cmd_search(store: &mut MemoryStore, args: &SearchArgs) -> error::Result<()> {
    let namespace = parse_namespace(args.namespace.as_deref())?;
    let hits = store.search(&args.query, namespace, args.count)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        format_human(&hits);
    }
    Ok(())
}

fn cmd_search_all(
    store: &mut MemoryStore,
    args: &SearchAllArgs,
) -> error::Result<()> {
    let hits = store.search_all(&args.query, args.count)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        format_human(&hits);
    }
    Ok(())
}

fn cmd_stats(store: &MemoryStore, json: bool) -> error::Result<()> {
    let stats = store.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("total entries: {}", stats.total_entries);
        println!("  memory:      {}", stats.memory_count);
        println!("  knowledge:   {}", stats.knowledge_count);
        println!("tiers:");
        println!("  Sacred:      {}", stats.tier_counts.sacred);
        println!("  Active:      {}", stats.tier_counts.active);
        println!("  Archival:    {}", stats.tier_counts.archival);
        println!("data dir:      {}", stats.data_dir.display());
    }
    Ok(())
}

/// Format results for human-readable terminal output.
fn format_human(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, hit) in hits.iter().enumerate() {
        let preview: String = hit.content.chars().take(120).collect();
        println!(
            "{:>3}. [{:.3}] ({}) {}",
            i + 1,
            hit.score,
            hit.source_type,
            preview
        );
    }
    println!("\n{} result(s)", hits.len());
}
