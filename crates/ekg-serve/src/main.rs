mod tools;
mod transport;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ekg_lib::{config::ServiceConfig, pipeline::Analyzer};
use env_logger::Env;
use log::{error, info};
use serde_json::json;
use std::{fs, path::PathBuf, sync::Arc};

use crate::tools::ToolRegistry;

#[derive(Parser)]
#[command(author, version, about = "ekg-serve analysis front end", long_about = None)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Transport to expose (stdio only for now)
    #[arg(long, default_value = "stdio")]
    transport: String,

    /// TOML service configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model bundle; overrides `model_path` from the configuration
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory for rendered images; overrides `artifact_dir`
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Serve requests over the configured transport (default)
    Serve,
    /// Print the methods this instance can answer
    Capabilities,
    /// Invoke one method by name (JSON params) and print the reply
    RunTool {
        /// Method name (e.g., analyze)
        #[arg(long)]
        name: String,
        /// Optional JSON file for parameters
        #[arg(long)]
        params: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let mut args = Cli::parse();
    let command = args.command.take().unwrap_or(Command::Serve);

    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    info!(
        "Starting ekg-serve with transport={} and log_level={}",
        args.transport, args.log_level
    );

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(model) = args.model.take() {
        config.model_path = Some(model);
    }
    if let Some(dir) = args.artifact_dir.take() {
        config.artifact_dir = dir;
    }

    // The model is loaded exactly once; a failure here disables `analyze`
    // for the lifetime of the process.
    let analyzer = match Analyzer::from_config(&config) {
        Ok(analyzer) => Ok(Arc::new(analyzer)),
        Err(err) => {
            error!("analysis disabled: {}", err);
            Err(err)
        }
    };
    let registry = ToolRegistry::new(analyzer);
    registry.log_summary();

    match command {
        Command::Serve => {
            info!("Starting transport server ({})", args.transport);
            transport::run(&registry, &args.transport)?;
        }
        Command::Capabilities => {
            let reply = registry.execute("capabilities", None)?;
            println!("{}", serde_json::to_string_pretty(&reply.body)?);
        }
        Command::RunTool { name, params } => {
            let json_params = if let Some(path) = params {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("parsing {}", path.display()))?
            } else {
                json!({})
            };
            let reply = registry.execute(&name, Some(json_params))?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
    }

    Ok(())
}
