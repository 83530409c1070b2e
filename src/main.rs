use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wiki_rag::Result;
use wiki_rag::commands::{ask, chunk_directory, ingest, show_status};
use wiki_rag::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "wiki-rag")]
#[command(about = "A retrieval-augmented question answering system for game wikis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama, reranker, and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk a directory of markdown wiki pages into JSON chunk files
    Chunk {
        /// Directory containing markdown pages
        input_dir: PathBuf,
        /// Where to write chunk files (defaults to the configured chunks directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Prepend an LLM-generated situating description to each chunk
        #[arg(long)]
        contextualize: bool,
    },
    /// Embed chunk files and load them into the vector store
    Ingest {
        /// Directory of chunk files (defaults to the configured chunks directory)
        #[arg(long)]
        chunks_dir: Option<PathBuf>,
    },
    /// Answer a question from the indexed wiki
    Ask {
        /// The question to answer
        query: String,
        /// How many chunks to hand to the language model
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },
    /// Show connectivity and index status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
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
        Commands::Chunk {
            input_dir,
            output_dir,
            contextualize,
        } => {
            chunk_directory(input_dir, output_dir, contextualize).await?;
        }
        Commands::Ingest { chunks_dir } => {
            ingest(chunks_dir).await?;
        }
        Commands::Ask { query, top_k } => {
            ask(query, top_k).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
