use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use loopgraph_core::config::AppConfig;
use loopgraph_core::definition::GraphDefinition;
use loopgraph_core::error::LoopgraphError;
use loopgraph_core::types::RunId;
use loopgraph_core::value::{Fields, Value};
use loopgraph_engine::WorkflowEngine;
use loopgraph_steps::StepRegistry;

#[derive(Parser)]
#[command(name = "loopgraph", version, about = "Workflow graph engine with conditional loops")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "loopgraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Address to bind (overrides [gateway] bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create and run a graph locally with the built-in steps
    Run {
        /// Graph definition file (.json, otherwise TOML)
        definition: PathBuf,
        /// JSON file holding the initial state object
        #[arg(long)]
        state: Option<PathBuf>,
        /// Initial field, as key=value (value parsed as JSON, else text)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Step budget for this run (overrides [engine] max_steps)
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// Validate a graph definition and print the compiled graph
    Validate {
        /// Graph definition file (.json, otherwise TOML)
        definition: PathBuf,
    },
    /// List registered steps
    Steps,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "loopgraph", &mut std::io::stdout());
        return Ok(());
    }

    let (config, config_missing) = match AppConfig::load(&cli.config) {
        Ok(config) => (config, false),
        Err(LoopgraphError::ConfigNotFound(_)) => (AppConfig::default(), true),
        Err(e) => return Err(e).context("failed to load config"),
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .init();

    if config_missing {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Serve { bind } => {
            let mut gateway_config = config.gateway.clone();
            if let Some(bind) = bind {
                gateway_config.bind = bind;
            }

            let engine = Arc::new(WorkflowEngine::new(
                Arc::new(StepRegistry::with_builtins()),
                &config.engine,
            ));
            info!(
                bind = %gateway_config.bind,
                max_steps = engine.max_steps(),
                "Starting gateway"
            );
            let server = loopgraph_gateway::GatewayServer::new(gateway_config, engine);
            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Commands::Run {
            definition,
            state,
            set,
            max_steps,
        } => {
            let def = load_definition(&definition)?;
            let initial = initial_fields(state.as_deref(), &set)?;

            let mut engine_config = config.engine.clone();
            if let Some(max_steps) = max_steps {
                anyhow::ensure!(max_steps > 0, "--max-steps must be at least 1");
                engine_config.max_steps = max_steps;
            }
            let engine = WorkflowEngine::new(Arc::new(StepRegistry::with_builtins()), &engine_config);

            let graph_id = engine.create(&def)?;
            let run_id = RunId::new();
            match engine.run_with_id(&graph_id, run_id.clone(), initial) {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome.state)?);
                }
                Err(e) => {
                    eprintln!("Run {} failed: {}", run_id, e);
                    if let Ok(cp) = engine.checkpoint(&run_id) {
                        eprintln!("Last checkpoint:");
                        eprintln!("{}", serde_json::to_string_pretty(&cp)?);
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Validate { definition } => {
            let def = load_definition(&definition)?;
            let graph = loopgraph_engine::validate(&def)?;
            println!("{}", serde_json::to_string_pretty(&graph)?);

            let registry = StepRegistry::with_builtins();
            for node in graph.node_names() {
                if let Some(step) = graph.step_for(node) {
                    if !registry.contains(step) {
                        warn!(node, step, "Step is not a built-in; runs will fail here");
                    }
                }
            }
        }
        Commands::Steps => {
            let registry = StepRegistry::with_builtins();
            for name in registry.list() {
                let description = registry
                    .get(name)
                    .map(|s| s.description().to_string())
                    .unwrap_or_default();
                println!("{:<20} {}", name, description);
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

/// Read a graph definition: JSON for `.json` files, TOML otherwise.
fn load_definition(path: &Path) -> anyhow::Result<GraphDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let def = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON definition in {}", path.display()))?
    } else {
        toml::from_str(&content)
            .with_context(|| format!("invalid TOML definition in {}", path.display()))?
    };
    Ok(def)
}

/// Initial run fields from an optional JSON state file plus `key=value`
/// overrides, applied in order.
fn initial_fields(state: Option<&Path>, set: &[String]) -> anyhow::Result<Fields> {
    let mut fields = match state {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<Fields>(&content)
                .with_context(|| format!("{} must hold a JSON object", path.display()))?
        }
        None => Fields::new(),
    };

    for pair in set {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("expected key=value, got '{}'", pair))?;
        fields.insert(key.to_string(), parse_set_value(raw));
    }
    Ok(fields)
}

fn parse_set_value(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::Text(raw.to_string()))
}
