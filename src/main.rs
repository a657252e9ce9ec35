use clap::{Parser, Subcommand};
use docs_companion::Result;
use docs_companion::commands::{
    ask, build_index, embed_docs, interactive_search, run_pipeline, search_once, show_store_info,
};
use docs_companion::config::{Config, run_interactive_config, show_config};
use docs_companion::search::SearchMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docs-companion")]
#[command(about = "Search, chat and pipeline tooling for a documentation site")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedder, pipeline API and chat webhook
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the static keyword search index
    BuildIndex {
        /// Directory of markdown pages (defaults to the configured docs dir)
        #[arg(long)]
        docs: Option<PathBuf>,
        /// Where to write the index JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Chunk and embed the docs into the semantic search store
    Embed {
        #[arg(long)]
        docs: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print details of the existing store instead of regenerating it
        #[arg(long)]
        info: bool,
    },
    /// Search the docs
    Search {
        /// Query text (omit with --interactive)
        query: Option<String>,
        /// Rank by embedding similarity instead of keywords
        #[arg(long)]
        semantic: bool,
        /// Maximum number of results
        #[arg(long)]
        top_k: Option<usize>,
        /// Read queries from stdin
        #[arg(long, short)]
        interactive: bool,
    },
    /// Ask the docs assistant a question
    Ask {
        question: String,
    },
    /// Execute a pipeline definition and wait for its results
    Run {
        /// Pipeline definition JSON file
        pipeline: PathBuf,
        /// Write the results JSON here
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::BuildIndex { docs, output } => {
            let config = Config::load_default()?;
            let docs = docs.unwrap_or_else(|| config.paths.docs_dir.clone());
            let output = output.unwrap_or_else(|| config.paths.keyword_index_file.clone());
            build_index(&docs, &output)?;
        }
        Commands::Embed { docs, output, info } => {
            let config = Config::load_default()?;
            let output = output.unwrap_or_else(|| config.paths.embeddings_file.clone());
            if info {
                show_store_info(&output).await?;
            } else {
                let docs = docs.unwrap_or_else(|| config.paths.docs_dir.clone());
                embed_docs(&config, &docs, &output).await?;
            }
        }
        Commands::Search {
            query,
            semantic,
            top_k,
            interactive,
        } => {
            let config = Config::load_default()?;
            let mode = if semantic {
                SearchMode::Semantic
            } else {
                SearchMode::Keyword
            };
            if interactive {
                interactive_search(&config, mode).await?;
            } else {
                search_once(&config, query.as_deref().unwrap_or_default(), mode, top_k).await?;
            }
        }
        Commands::Ask { question } => {
            let config = Config::load_default()?;
            ask(&config, &question).await?;
        }
        Commands::Run { pipeline, output } => {
            let config = Config::load_default()?;
            run_pipeline(&config, &pipeline, output.as_deref()).await?;
        }
    }

    Ok(())
}
