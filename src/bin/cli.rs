//! sharpgraph CLI - C# code model and class-diagram graph engine.
//!
//! Usage:
//!   sharpgraph graph             # Full node/link payload as JSON
//!   sharpgraph stats             # Scan + graph statistics
//!   sharpgraph regen <key>       # Regenerated source for one type
//!   sharpgraph watch             # Stream per-file updates as JSON lines

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sharpgraph::cli::{Cli, Commands};
use sharpgraph::config::LinkConfig;
use sharpgraph::protocol::ModelMessage;
use sharpgraph::service::ModelService;
use sharpgraph::workspace::scan;
use sharpgraph::{graph, regen, watcher};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root.canonicalize().unwrap_or(cli.root.clone());
    let config = match &cli.config {
        Some(path) => LinkConfig::load(path)?,
        None => LinkConfig::load(&root.join("sharpgraph.toml"))?,
    };

    match cli.command {
        Commands::Graph => {
            let (model, _) = scan::scan_workspace(&root);
            let payload = graph::build(model.types(), &config).payload();
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }

        Commands::Stats => {
            let (model, scan_stats) = scan::scan_workspace(&root);
            let graph_stats = graph::build(model.types(), &config).stats();
            eprintln!("{scan_stats}");
            println!("{}", serde_json::to_string_pretty(&graph_stats)?);
        }

        Commands::Regen { key } => {
            let (model, _) = scan::scan_workspace(&root);
            let Some(decl) = model.types().iter().find(|t| t.type_key() == key) else {
                bail!("no type with key '{key}'");
            };
            print!("{}", regen::to_source_text(decl));
        }

        Commands::Watch => watch(root, config)?,
    }

    Ok(())
}

fn watch(root: PathBuf, config: LinkConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (model, scan_stats) = scan::scan_workspace(&root);
        eprintln!("{scan_stats}");

        let (service, mut updates) = ModelService::spawn(model, config);
        let _watcher = watcher::start(&root, service.clone())?;

        let payload = service.full_payload().await?;
        println!(
            "{}",
            serde_json::to_string(&ModelMessage::FullResult { payload })?
        );

        while let Some(message) = updates.recv().await {
            println!("{}", serde_json::to_string(&message)?);
        }
        Ok(())
    })
}
