use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use minirag_cli::{error_kind, exit_code, init_tracing};
use minirag_core::config::{expand_path, Config};
use minirag_core::loader;
use minirag_pipeline::RagPipeline;

/// Bulk-ingest every supported document under a directory
#[derive(Parser)]
#[command(name = "minirag-indexer")]
struct Args {
    /// Directory to ingest (defaults to ingest.docs_dir)
    dir: Option<PathBuf>,
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let data_dir = args.dir.unwrap_or_else(|| expand_path(&settings.ingest.docs_dir));
    println!("minirag indexer\n===============");
    println!("Data directory: {}", data_dir.display());
    if !data_dir.is_dir() {
        anyhow::bail!(minirag_core::Error::InvalidInput(format!("{} is not a directory", data_dir.display())));
    }

    let files = loader::discover(&data_dir);
    if files.is_empty() {
        println!("No supported documents found");
        return Ok(());
    }
    let pipeline = RagPipeline::from_settings(&settings).await?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let (mut chunks, mut failed) = (0usize, Vec::new());
    for path in &files {
        pb.set_message(path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
        let result = match loader::load_path(path) {
            Ok(document) => pipeline.ingest(document).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(report) => chunks += report.chunk_count,
            Err(e) => {
                pb.println(format!("⚠️  {}: {}", path.display(), e));
                failed.push(path.clone());
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    println!("\n✅ Indexing completed");
    println!("📊 Ingested {} of {} files into {} chunks", files.len() - failed.len(), files.len(), chunks);
    if !failed.is_empty() {
        println!("⚠️  {} files skipped", failed.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(error_kind(&e)))
        }
    }
}
