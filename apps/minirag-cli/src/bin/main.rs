use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use minirag_cli::{error_kind, exit_code, init_tracing};
use minirag_core::config::Config;
use minirag_core::loader;
use minirag_core::types::{Document, QueryOutcome};
use minirag_pipeline::RagPipeline;

#[derive(Parser)]
#[command(name = "minirag")]
#[command(about = "Ingest documents and ask questions answered from them, with citations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file (.txt, .md, .pdf) or inline text
    Ingest {
        /// File to ingest
        #[arg(required_unless_present = "text", conflicts_with = "text")]
        path: Option<PathBuf>,
        /// Inline text to ingest instead of a file
        #[arg(long)]
        text: Option<String>,
        /// Source label for inline text
        #[arg(long, default_value = "inline")]
        source: String,
    },
    /// Ask a question
    Query {
        question: String,
    },
    /// Delete records by chunk id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Number of records in the index
    Count,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let pipeline = RagPipeline::from_settings(&settings).await.context("failed to initialise pipeline")?;

    match cli.command {
        Commands::Ingest { path, text, source } => {
            let document = match (path, text) {
                (Some(path), _) => loader::load_path(&path).with_context(|| format!("failed to load {}", path.display()))?,
                (None, Some(text)) => Document::new(source, text),
                (None, None) => anyhow::bail!(minirag_core::Error::InvalidInput("nothing to ingest".into())),
            };
            let report = pipeline.ingest(document).await?;
            println!("✅ Ingested {} ({} chunks)", report.source, report.chunk_count);
        }
        Commands::Query { question } => match pipeline.query(&question).await? {
            QueryOutcome::Answered(answer) => {
                println!("{}", answer.text);
                if !answer.citations.is_empty() {
                    println!("\nSources:");
                    for c in &answer.citations {
                        println!("  [{}] {}", c.source_id, c.descriptor);
                    }
                }
            }
            QueryOutcome::NoAnswerFound => println!("No answer found in the ingested documents."),
        },
        Commands::Delete { ids } => {
            pipeline.delete(&ids).await?;
            println!("🗑️  Deleted {} records", ids.len());
        }
        Commands::Count => println!("{}", pipeline.count().await?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(error_kind(&e)))
        }
    }
}
