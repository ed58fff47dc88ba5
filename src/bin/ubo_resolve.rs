//! CLI collaborator that wires C2→C3→C4→C5 into a runnable resolve.
//! No HTML/PDF rendering — that belongs to an external caller.

use std::collections::HashMap;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ubo_resolver::config::{RegistryClientConfig, ResolveConfig};
use ubo_resolver::registry::RegistryClient;
use ubo_resolver::types::{ManualOverrides, WarningKind};
use ubo_resolver::{tree_resolver, ubo_evaluator};

#[derive(Parser)]
#[command(name = "ubo_resolve", about = "Beneficial-ownership discovery over the ARES VR registry")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a beneficial-ownership tree for a registry ID.
    Resolve(ResolveConfig),
    /// Remove the local registry cache file.
    CacheClear {
        #[arg(long, default_value = "ares_vr_cache.sqlite")]
        cache_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Resolve(cfg) => run_resolve(cfg).await,
        Command::CacheClear { cache_path } => {
            if std::path::Path::new(&cache_path).exists() {
                std::fs::remove_file(&cache_path).with_context(|| format!("removing cache file {cache_path}"))?;
                println!("removed {cache_path}");
            } else {
                println!("no cache file at {cache_path}");
            }
            Ok(())
        }
    }
}

async fn run_resolve(cfg: ResolveConfig) -> anyhow::Result<()> {
    let client = RegistryClient::new(&cfg.cache_path, RegistryClientConfig::default())
        .await
        .context("constructing registry client")?;

    let manual_overrides: ManualOverrides = HashMap::new();
    let resolved = tree_resolver::resolve(&client, &cfg.root_id, cfg.max_depth, &manual_overrides, cfg.force_refresh).await;

    println!("--- trace ---");
    for line in &resolved.trace {
        let indent = "  ".repeat(line.depth as usize);
        match line.effective_pct {
            Some(pct) => println!("{indent}{} [{:.2}%]", line.text, pct),
            None => println!("{indent}{}", line.text),
        }
    }

    if !resolved.warnings.is_empty() {
        println!("--- warnings ---");
        for w in &resolved.warnings {
            println!("{:?} {} {}: {}", w.kind, w.ico, w.name, w.text);
        }
    }

    let evaluation = ubo_evaluator::evaluate(
        &resolved.trace,
        cfg.threshold,
        &HashMap::new(),
        &[],
        &[],
        &HashMap::new(),
    );

    println!("--- UBOs (threshold {:.2}%) ---", cfg.threshold * 100.0);
    for ubo in &evaluation.ubos {
        println!(
            "{}: cap={:.2}% vote={:.2}% [{}]",
            ubo.name,
            ubo.ownership * 100.0,
            ubo.voting * 100.0,
            ubo.reasons.join("; ")
        );
    }

    println!(
        "--- sums --- Σcap={:.4} (within tolerance: {}) Σvote={:.4} (within tolerance: {})",
        evaluation.sum_report.sum_cap,
        evaluation.sum_report.cap_within_tolerance,
        evaluation.sum_report.sum_vote,
        evaluation.sum_report.vote_within_tolerance,
    );

    let fatal = resolved.warnings.iter().any(|w| w.kind == WarningKind::Error);
    if fatal {
        std::process::exit(1);
    }
    Ok(())
}
