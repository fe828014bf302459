// vosmem: replay a memory workload and report heap/shed usage

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vos_memory::config::ReplayConfig;
use vos_memory::replay::{parse_script, Replayer};

fn main() -> Result<()> {
    let config = ReplayConfig::parse();
    setup_logging(&config);

    let source = fs::read_to_string(&config.script)
        .with_context(|| format!("failed to read script '{}'", config.script.display()))?;

    let statements = parse_script(&source)
        .with_context(|| format!("failed to parse '{}'", config.script.display()))?;
    tracing::info!(
        script = %config.script.display(),
        statements = statements.len(),
        "script parsed"
    );

    let mut replayer = Replayer::from_config(&config);
    let result = replayer.run(&statements);

    // Print whatever ran, even if the snapshot budget stopped the replay early
    for snapshot in replayer.snapshots().iter() {
        println!("[{:>3}] {}", snapshot.line, snapshot.command);
        for line in snapshot.output.lines() {
            println!("      {}", line);
        }
        if config.history {
            for line in snapshot.report.to_string().lines() {
                println!("      | {}", line);
            }
        }
    }

    let report = replayer.registry().check_memory(None);
    println!();
    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
        let scratch = replayer.scratch().heap_usage();
        println!(
            "scratch: {} cells | {} used | {} free | {} blocks",
            scratch.capacity, scratch.used, scratch.free, scratch.blocks
        );
    }

    result.context("replay stopped early")?;
    Ok(())
}

fn setup_logging(config: &ReplayConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
