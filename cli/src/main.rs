use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nugget_kernel::buffer::BatchBuffer;
use nugget_kernel::config::NuggetConfig;
use nugget_kernel::record::Record;
use nugget_kernel::store::{request_count, InMemoryStore};

/// Nugget batch writer CLI
#[derive(Parser, Debug)]
#[command(name = "nugget")]
#[command(about = "Batch records into a key-value store (in-memory dry run)", long_about = None)]
struct Cli {
    /// Path to config JSON
    #[arg(long)]
    config: Option<String>,

    /// Path to a JSON array of records
    #[arg(long)]
    records: String,

    /// Write each record on its own instead of batching
    #[arg(long)]
    immediate: bool,
}

/// Wrapper for JSON output
#[derive(Debug, Serialize)]
struct CliOutput {
    records: usize,
    items_per_table: BTreeMap<String, usize>,
    batch_calls: usize,
    put_calls: usize,
    unprocessed_batches: usize,
    unprocessed_requests: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nugget=info,nugget_kernel=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = run(&cli)?;

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn run(cli: &Cli) -> Result<CliOutput> {
    // ----------------------------
    // Load config
    // ----------------------------
    let config = match &cli.config {
        Some(path) => NuggetConfig::from_path(path)
            .with_context(|| format!("loading config from {path}"))?,
        None => NuggetConfig::default_config(),
    };

    // ----------------------------
    // Load records
    // ----------------------------
    let data = fs::read_to_string(&cli.records)
        .with_context(|| format!("reading records from {}", cli.records))?;
    let records: Vec<Record> = serde_json::from_str(&data)?;
    info!(records = records.len(), "loaded records");

    // ----------------------------
    // Provision tables
    // ----------------------------
    let buffer = BatchBuffer::with_config(InMemoryStore::new(), &config.buffer);

    for table in &config.tables {
        buffer.create_table(&table.schema, table.read_capacity, table.write_capacity)?;
    }

    // ----------------------------
    // Write
    // ----------------------------
    for record in &records {
        if cli.immediate {
            buffer.save_immediately(record)?;
        } else {
            buffer.enqueue_and_maybe_flush(record)?;
        }
    }
    buffer.flush()?;

    // ----------------------------
    // Output
    // ----------------------------
    let store = buffer.store();
    let unprocessed = buffer.unprocessed_items();

    Ok(CliOutput {
        records: records.len(),
        items_per_table: store
            .tables()
            .into_iter()
            .map(|t| {
                let count = store.item_count(&t);
                (t, count)
            })
            .collect(),
        batch_calls: store.batch_write_calls().len(),
        put_calls: store.put_item_calls(),
        unprocessed_batches: unprocessed.len(),
        unprocessed_requests: unprocessed.iter().map(request_count).sum(),
    })
}
