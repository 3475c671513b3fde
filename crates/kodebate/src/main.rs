use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kodebate::agents::InferenceBudget;
use kodebate::AnalysisInput;
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kodebate", about = "Multi-persona debate engine for trade decisions")]
struct Cli {
    /// Path to configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read AnalysisInput JSON from a file instead of stdin. Repeatable.
    #[arg(short, long)]
    input: Vec<PathBuf>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<AnalysisInput>> {
    if paths.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        return kodebate::parse_inputs(&buf);
    }

    let mut inputs = Vec::new();
    for path in paths {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input: {}", path.display()))?;
        inputs.extend(
            kodebate::parse_inputs(&json)
                .with_context(|| format!("Invalid input: {}", path.display()))?,
        );
    }
    Ok(inputs)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = kodebate::load_config(cli.config.as_deref())?;
    let inputs = read_inputs(&cli.input)?;
    info!(count = inputs.len(), "Loaded analysis inputs");

    // One budget for every request in this process.
    let budget = Arc::new(InferenceBudget::from_config(&config.budget));
    let orchestrator = Arc::new(kodebate::build_orchestrator(&config, budget));

    let mut tasks = JoinSet::new();
    for (index, input) in inputs.into_iter().enumerate() {
        let orchestrator = Arc::clone(&orchestrator);
        tasks.spawn(async move { (index, kodebate::analyze(&orchestrator, input).await) });
    }

    let mut decisions = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        decisions.push(joined.context("Analysis task panicked")?);
    }
    decisions.sort_by_key(|(index, _)| *index);

    // Output one decision per line to stdout, in input order
    for (_, decision) in decisions {
        let output = if cli.pretty {
            serde_json::to_string_pretty(&decision)?
        } else {
            serde_json::to_string(&decision)?
        };
        println!("{output}");
    }

    Ok(())
}
