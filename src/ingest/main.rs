//! Seed CSV ingest pipeline.
//!
//! Reads point seed files, bulk-indexes them into Elasticsearch, and
//! optionally removes stale documents left over from previous imports of
//! the same file.

mod config;
mod seed;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tamarack::elasticsearch::{create_index, BulkIndexer, EsClient, EsConfig};

use crate::config::Manifest;
use crate::seed::read_seed_records;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Ingest point seed CSVs into Elasticsearch")]
struct Args {
    /// Seed CSV file to import (plain or gzipped)
    #[arg(short, long, required_unless_present = "manifest")]
    file: Option<PathBuf>,

    /// TOML manifest importing several datasets in one run
    #[arg(long, conflicts_with = "file")]
    manifest: Option<PathBuf>,

    /// Elasticsearch base URL
    #[arg(long, default_value = "http://localhost:9200")]
    es_url: String,

    /// Target index name
    #[arg(long, default_value = "points")]
    index: String,

    /// Remove documents left by earlier imports of the same file
    #[arg(long)]
    refresh: bool,

    /// Drop and recreate the index before importing
    #[arg(long)]
    create_index: bool,

    /// Documents per bulk request
    #[arg(long, default_value = "1000")]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Tamarack ingest pipeline");

    match (&args.manifest, &args.file) {
        (Some(manifest_path), _) => {
            let manifest = Manifest::load_from_file(manifest_path)?;
            let es_config = EsConfig {
                url: manifest.global.es_url.clone(),
                index: manifest.global.index.clone(),
            };
            info!("Manifest lists {} datasets", manifest.datasets.len());

            for (i, dataset) in manifest.datasets.iter().enumerate() {
                info!("Importing dataset '{}'", dataset.name);
                // Recreating the index only makes sense before the first dataset
                run_import(&es_config, &dataset.path, &args, args.create_index && i == 0).await?;
            }
        }
        (None, Some(file)) => {
            let es_config = EsConfig {
                url: args.es_url.clone(),
                index: args.index.clone(),
            };
            run_import(&es_config, file, &args, args.create_index).await?;
        }
        (None, None) => anyhow::bail!("either --file or --manifest is required"),
    }

    Ok(())
}

/// Import one seed file into the index.
async fn run_import(es_config: &EsConfig, path: &Path, args: &Args, create: bool) -> Result<()> {
    let es_client = EsClient::connect(es_config).context("Failed to connect to Elasticsearch")?;
    if !es_client.health_check().await? {
        anyhow::bail!("Elasticsearch at {} is unavailable", es_config.url);
    }

    if create {
        create_index(&es_client, true).await?;
    }

    // Stale document queries match on this name
    let source_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string();

    let import_start = Utc::now();

    info!("Reading seed file: {}", path.display());
    let records = read_seed_records(path)?;
    info!("Parsed {} seed records", records.len());

    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
        .progress_chars("#>-");
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(style);

    let mut indexer = BulkIndexer::new(es_client.clone(), args.batch_size);
    for record in records {
        indexer.add(record.into_point(&source_file)).await?;
        pb.inc(1);
    }
    pb.finish_with_message("Indexing complete");

    let (indexed, failed) = indexer.finish().await?;
    info!("Indexed {} documents ({} failed)", indexed, failed);

    if args.refresh {
        let removed = es_client.delete_stale(&source_file, import_start).await?;
        info!("Removed {} stale documents for {}", removed, source_file);
    }

    info!(
        "Index {} now holds {} documents",
        es_client.index,
        es_client.doc_count().await?
    );

    Ok(())
}
