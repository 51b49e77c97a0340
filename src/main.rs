// Workflow Bridge — HTTP gateway to an external multi-agent workflow runner
// License: Apache-2.0

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use workflow_bridge::bridge::{WorkflowBridge, WorkflowRequest};
use workflow_bridge::config::{Config, RunnerKind};
use workflow_bridge::credentials::Provider;
use workflow_bridge::runner::VariableSet;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "workflow-bridge",
    about = "Workflow Bridge — HTTP gateway to an external multi-agent workflow runner",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a single workflow and print the response as JSON
    Run {
        /// Workflow file name or absolute path
        #[arg(short, long)]
        workflow: String,
        /// Task prompt
        #[arg(short, long)]
        prompt: String,
        /// Workflow variable as KEY=VALUE (VALUE is parsed as JSON when possible)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Show configuration, runner and credential status
    Status {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Show version information
    Version,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    // .env is optional
    let dotenv = dotenvy::dotenv();
    workflow_bridge::logger::init();
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { config, host, port }) => {
            serve_cmd(config, host, port).await;
        }
        Some(Commands::Run {
            workflow,
            prompt,
            vars,
            config,
        }) => {
            run_cmd(workflow, prompt, vars, config).await;
        }
        Some(Commands::Status { config }) => {
            status_cmd(config);
        }
        Some(Commands::Version) => {
            version_cmd();
        }
        None => {
            serve_cmd(None, None, None).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Serve command
// ---------------------------------------------------------------------------

async fn serve_cmd(config_path: Option<String>, host: Option<String>, port: Option<u16>) {
    let mut cfg = load_config(config_path.as_deref());
    if let Some(h) = host {
        cfg.server.host = h;
    }
    if let Some(p) = port {
        cfg.server.port = p;
    }

    ensure_output_dir(&cfg);
    let bridge = WorkflowBridge::from_config(&cfg);

    let addr = match tokio::net::lookup_host((cfg.server.host.as_str(), cfg.server.port))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
    {
        Some(addr) => addr,
        None => {
            eprintln!(
                "Invalid bind address: {}:{}",
                cfg.server.host, cfg.server.port
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = workflow_bridge::web::start_server(addr, bridge).await {
        eprintln!("Server error: {:#}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Run command (one-shot)
// ---------------------------------------------------------------------------

async fn run_cmd(workflow: String, prompt: String, vars: Vec<String>, config_path: Option<String>) {
    let variables = match parse_vars(&vars) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let cfg = load_config(config_path.as_deref());
    ensure_output_dir(&cfg);
    let bridge = WorkflowBridge::from_config(&cfg);

    let response = bridge
        .run(WorkflowRequest {
            workflow_yaml: workflow,
            task_prompt: prompt,
            variables: (!variables.is_empty()).then_some(variables),
        })
        .await;

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode response: {}", e),
    }

    if !response.is_success() {
        std::process::exit(1);
    }
}

/// Parse `KEY=VALUE` pairs. Values that are valid JSON keep their type,
/// anything else is taken as a string.
fn parse_vars(raw: &[String]) -> Result<VariableSet, String> {
    let mut vars = VariableSet::new();
    for item in raw {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| format!("Invalid variable '{}', expected KEY=VALUE", item))?;
        if key.is_empty() {
            return Err(format!("Invalid variable '{}', empty key", item));
        }
        let value = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::from(value));
        vars.insert(key.to_string(), value);
    }
    Ok(vars)
}

// ---------------------------------------------------------------------------
// Status / version
// ---------------------------------------------------------------------------

fn status_cmd(config_path: Option<String>) {
    println!("Workflow Bridge Status\n");

    let path = resolve_config_path(config_path.as_deref());
    if path.exists() {
        println!("  Config:     ✅ {}", path.display());
    } else {
        println!("  Config:     ⏭️  {} (not found, using defaults)", path.display());
    }

    let cfg = load_config(config_path.as_deref());

    let workflows = cfg.workflows_path();
    if workflows.is_dir() {
        println!("  Workflows:  ✅ {}", workflows.display());
    } else {
        println!("  Workflows:  ❌ {} (missing)", workflows.display());
    }

    let output = cfg.output_path();
    if output.is_dir() {
        println!("  Output:     ✅ {}", output.display());
    } else {
        println!("  Output:     ⏭️  {} (created on start)", output.display());
    }

    match cfg.runner.kind {
        RunnerKind::Disabled => println!("  Runner:     ❌ disabled"),
        kind => match workflow_bridge::runner::factory::load_runner(&cfg.runner) {
            Ok(_) => println!("  Runner:     ✅ {}", kind),
            Err(e) => println!("  Runner:     ❌ {} ({})", kind, e),
        },
    }

    for provider in [Provider::OpenAi, Provider::Gemini, Provider::Deepseek] {
        let state = if provider.api_key(&cfg.credentials).is_some() {
            "✅ key configured"
        } else {
            "❌ no key"
        };
        println!("  {:<11} {}", format!("{}:", provider), state);
    }
    println!("  Base URL:   {}", cfg.credentials.base_url);
}

fn version_cmd() {
    println!("Workflow Bridge v{}", workflow_bridge::VERSION);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_config_path(path: Option<&str>) -> PathBuf {
    if let Some(p) = path {
        PathBuf::from(p)
    } else {
        Config::default_path().unwrap_or_else(|_| PathBuf::from("config.json"))
    }
}

fn load_config(path: Option<&str>) -> Config {
    let config_path = resolve_config_path(path);
    Config::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        let mut cfg = Config::default();
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg
    })
}

fn ensure_output_dir(cfg: &Config) {
    match cfg.ensure_output_dir() {
        Ok(output) => tracing::debug!(path = %output.display(), "Output directory ready"),
        Err(e) => {
            eprintln!(
                "Failed to create output directory {}: {}",
                cfg.output_path().display(),
                e
            );
            std::process::exit(1);
        }
    }
}
