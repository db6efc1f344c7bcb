//! ElementalDB Script Binary
//!
//! Runs a script file against a data directory.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use elementaldb::script::ScriptRunner;
use elementaldb::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// ElementalDB script runner
#[derive(Parser, Debug)]
#[command(name = "elementaldb-script")]
#[command(about = "Run an ElementalDB script against a data directory")]
#[command(version)]
struct Args {
    /// Script file, one command per line
    #[arg(short, long)]
    run: PathBuf,

    /// Data directory
    #[arg(short, long, default_value = "./elementaldb_data")]
    data_dir: PathBuf,

    /// Number of shard files (must match an existing data directory)
    #[arg(short, long, default_value = "3")]
    shards: usize,

    /// Buffered records per shard before an automatic flush
    #[arg(short, long, default_value = "500")]
    batch_size: usize,

    /// Continue past failing lines
    #[arg(short, long)]
    keep_going: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,elementaldb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("ElementalDB v{}", elementaldb::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    let text = match fs::read_to_string(&args.run) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", args.run.display(), e);
            std::process::exit(1);
        }
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .shard_count(args.shards)
        .batch_size(args.batch_size)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let runner = ScriptRunner::new(&engine);
    let result = runner.run_script(&text, args.keep_going, |_, outcome| println!("{}", outcome));
    let mut failed = match result {
        Ok(summary) => {
            for (line, e) in &summary.failures {
                eprintln!("line {}: {}", line, e);
            }
            tracing::info!(
                "{} statements executed, {} failed",
                summary.executed,
                summary.failures.len()
            );
            !summary.failures.is_empty()
        }
        Err(e) => {
            eprintln!("{}", e);
            true
        }
    };

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        failed = true;
    }

    if failed {
        std::process::exit(1);
    }
}
