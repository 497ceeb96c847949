//! Benchmark driver for the `laminar-core` index.
//!
//! Generates random vectors, builds an index (sequentially or via the
//! batch façade), runs a top-k search, optionally saves the result, and
//! prints a single JSON record with timings and resident memory.

use anyhow::{Context, Result};
use clap::Parser;
use laminar_core::config::{HnswParams, SearchConfig};
use laminar_core::distance::{Cosine, Euclidean, Metric};
use laminar_core::Index;
use rand::Rng;
use serde::Serialize;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Random-vector HNSW benchmark driver.
#[derive(Parser, Debug)]
#[command(name = "laminar", version, about)]
struct Args {
    /// Vector dimension.
    #[arg(short = 'd', long, default_value_t = 128)]
    dim: usize,

    /// Number of vectors to insert.
    #[arg(short = 'n', long, default_value_t = 10_000)]
    count: usize,

    /// Per-level degree cap (M).
    #[arg(short = 'm', long, default_value_t = 16)]
    m: usize,

    /// Layer-0 degree cap (Mmax).
    #[arg(long = "mmax", default_value_t = 32)]
    mmax: usize,

    /// Construction-time candidate-list width.
    #[arg(long, default_value_t = 200)]
    ef: usize,

    /// Number of neighbors to retrieve.
    #[arg(short = 'k', long, default_value_t = 10)]
    k: usize,

    /// Use Euclidean distance instead of cosine.
    #[arg(long = "euclidean", default_value_t = false)]
    euclidean: bool,

    /// Path to save the built index to.
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Batch size for construction; 0 means sequential insert.
    #[arg(long, default_value_t = 0)]
    batch: usize,
}

#[derive(Serialize)]
struct BenchmarkReport {
    dim: usize,
    count: usize,
    metric: &'static str,
    build_ms: f64,
    search_ms: f64,
    result_ids: Vec<u64>,
    resident_memory_bytes: u64,
    saved_to: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!(?args, "starting benchmark");

    let report = if args.euclidean {
        run::<Euclidean>(&args)?
    } else {
        run::<Cosine>(&args)?
    };

    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn run<M: Metric>(args: &Args) -> Result<BenchmarkReport> {
    let params = HnswParams::custom(args.m, args.mmax, args.ef);
    let index: Index<M> = Index::new(args.dim, params).context("constructing index")?;

    let mut rng = rand::thread_rng();
    let vectors: Vec<(u64, Vec<f64>)> = (0..args.count as u64)
        .map(|id| {
            let v = (0..args.dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
            (id, v)
        })
        .collect();

    let build_start = Instant::now();
    if args.batch > 0 {
        let stats = index.batch_insert(vectors);
        tracing::info!(inserted = stats.inserted, failed = stats.failed, "batch build complete");
    } else {
        for (id, vector) in vectors {
            index.insert(id, vector).context("inserting vector")?;
        }
    }
    let build_ms = build_start.elapsed().as_secs_f64() * 1000.0;

    let query: Vec<f64> = (0..args.dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let search_start = Instant::now();
    let result_ids = if args.batch > 0 {
        index
            .batch_search(&[query], args.k, SearchConfig::default_search_config())
            .into_iter()
            .next()
            .unwrap_or_default()
    } else {
        index.search(&query, args.k)
    };
    let search_ms = search_start.elapsed().as_secs_f64() * 1000.0;

    let saved_to = if let Some(path) = &args.output {
        index.save(path).context("saving index")?;
        Some(path.clone())
    } else {
        None
    };

    let mut system = sysinfo::System::new();
    system.refresh_process(sysinfo::get_current_pid().expect("current pid"));
    let resident_memory_bytes = system
        .process(sysinfo::get_current_pid().expect("current pid"))
        .map(|p| p.memory())
        .unwrap_or(0);

    Ok(BenchmarkReport {
        dim: args.dim,
        count: args.count,
        metric: index.metric_name(),
        build_ms,
        search_ms,
        result_ids,
        resident_memory_bytes,
        saved_to,
    })
}
