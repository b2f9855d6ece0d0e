use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use minirag_core::config::{Config, EmbeddingProvider};
use minirag_core::rag::{self, DEFAULT_TOP_K};
use minirag_core::{create_embedding_function, create_vector_store, demo, detection};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minirag")]
#[command(about = "Store sample documents in a vector collection and query them", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Ingest the sample documents and run the configured query (default)")]
    Run,

    #[command(about = "Query the configured collection")]
    Query {
        #[arg(required = true, help = "One or more query texts")]
        texts: Vec<String>,

        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K, help = "Matches per query")]
        top_k: usize,
    },

    #[command(about = "List collections and their document counts")]
    Collections,

    #[command(about = "Show current configuration")]
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("minirag_core=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_demo(&config).await,
        Commands::Query { texts, top_k } => run_query(&config, &texts, top_k).await,
        Commands::Collections => list_collections(&config).await,
        Commands::Show => {
            show_config(&config);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

async fn ensure_embedding_backend(config: &Config) -> Result<()> {
    if config.embedding.provider == EmbeddingProvider::Ollama {
        detection::detect_ollama(&config.embedding.base_url, &config.embedding.model)
            .await
            .context("Embedding backend unavailable")?;
    }
    Ok(())
}

async fn run_demo(config: &Config) -> Result<()> {
    ensure_embedding_backend(config).await?;

    let store = create_vector_store(&config.storage)
        .await
        .context("Failed to open vector store")?;
    let embedding_function = create_embedding_function(&config.embedding);

    let outcome = demo::run(config, store.as_ref(), embedding_function)
        .await
        .context("Demo run failed")?;

    print!("{}", outcome);
    Ok(())
}

async fn run_query(config: &Config, texts: &[String], top_k: usize) -> Result<()> {
    ensure_embedding_backend(config).await?;

    let store = create_vector_store(&config.storage)
        .await
        .context("Failed to open vector store")?;
    let embedding_function = create_embedding_function(&config.embedding);

    let collection = rag::get_or_create_collection(
        store.as_ref(),
        &config.storage.collection_name,
        embedding_function,
    )
    .await
    .context("Failed to open collection")?;

    let results = rag::query_collection(collection.as_ref(), texts, top_k)
        .await
        .context("Query failed")?;

    for (text, matches) in texts.iter().zip(results.iter()) {
        println!("{} {}", "Query:".bold().green(), text);
        if matches.is_empty() {
            println!("  {}", "No results found.".yellow());
        }
        for (i, m) in matches.iter().enumerate() {
            println!(
                "  {} {} {}",
                format!("{}.", i + 1).cyan(),
                m.document,
                format!("({:.4}, {})", m.distance, m.id).dimmed()
            );
        }
        println!();
    }

    Ok(())
}

async fn list_collections(config: &Config) -> Result<()> {
    let store = create_vector_store(&config.storage)
        .await
        .context("Failed to open vector store")?;

    let names = store
        .list_collections()
        .await
        .context("Failed to list collections")?;

    if names.is_empty() {
        println!("{}", format!("No collections in {}", config.storage.path).yellow());
        return Ok(());
    }

    let embedding_function = create_embedding_function(&config.embedding);

    println!("{}", "Collections:".bold().green());
    println!();
    for name in names {
        // Collections bound to another embedding function cannot be opened with this one
        match store.get_or_create_collection(&name, embedding_function.clone()).await {
            Ok(collection) => {
                let count = collection.count().await.context("Failed to count documents")?;
                println!("  {} {} ({} documents)", "•".cyan(), name.bold(), count);
            }
            Err(e) => println!("  {} {} ({})", "•".cyan(), name.bold(), e.to_string().dimmed()),
        }
    }

    Ok(())
}

fn show_config(config: &Config) {
    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "Embedding:".bold());
    println!("  Provider:   {}", config.embedding.provider.as_str().cyan());
    println!("  Model:      {}", config.embedding.model.cyan());
    println!("  Base URL:   {}", config.embedding.base_url);
    println!("  Dimension:  {}", config.embedding.dimension);
    println!();
    println!("{}", "Storage:".bold());
    println!("  Path:       {}", config.storage.path);
    println!("  Collection: {}", config.storage.collection_name.cyan());
    println!("  Distance:   {}", config.storage.distance);
    println!();
    println!("{}", "Demo:".bold());
    println!("  Query:      {}", config.demo.query);
    println!("  Top K:      {}", config.demo.top_k);
}
