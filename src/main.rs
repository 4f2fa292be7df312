use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use termgate::config::{LevelSelector, PolicyLoader, ServerConfig};
use termgate::validation::{EnvSnapshot, ValidatorCache, env_input, fixed_input};
use termgate::{
    BoundaryGuard, ExecOptions, Executor, ProcessSpawner, SharedExecutor, ToolRegistry,
};

#[derive(Parser)]
#[command(name = "termgate")]
#[command(about = "Policy-gated shell command execution for tool-calling agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Security level or policy document path (overrides COMMAND_VALIDATION)
    #[arg(long, global = true)]
    level: Option<String>,

    /// Directory that directory changes may not leave (overrides BOUNDARY_DIR)
    #[arg(long, global = true)]
    boundary_dir: Option<PathBuf>,

    /// Disable the boundary check
    #[arg(long, global = true)]
    boundary_escape: bool,

    /// Directory with policy overrides (overrides TERMGATE_POLICY_DIR)
    #[arg(long, global = true)]
    policy_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tool calls as JSON lines on stdin/stdout
    Serve,
    /// Validate and run one command
    Exec {
        /// Working directory
        #[arg(long)]
        cwd: Option<String>,

        /// Timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Extra environment variable, KEY=VALUE
        #[arg(long = "env", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        command: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Validate one command without running it
    Check {
        command: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List the commands the active level allows
    Commands,
    /// Show terminal and security status
    Info,
    /// Print the tool definitions as JSON
    Tools,
}

/// One line of input in `serve` mode
#[derive(Debug, Deserialize)]
struct ToolCall {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// One line of output in `serve` mode
#[derive(Debug, Serialize)]
struct ToolReply {
    ok: bool,
    text: String,
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn server_config(cli: &Cli) -> ServerConfig {
    let mut config = ServerConfig::from_env();
    if let Some(level) = &cli.level {
        config.selector = Some(level.clone());
    }
    if let Some(dir) = &cli.boundary_dir {
        config.boundary.root_directory = dir.clone();
    }
    if cli.boundary_escape {
        config.boundary.escape_enabled = true;
    }
    if let Some(dir) = &cli.policy_dir {
        config.policy_dir = Some(dir.clone());
    }
    config
}

fn create_executor(cli: &Cli) -> Result<Executor> {
    let config = server_config(cli);
    let working_dir = std::env::current_dir().context("failed to read working directory")?;

    info!(
        selector = ?config.selector,
        boundary = %config.boundary.root_directory.display(),
        escape = config.boundary.escape_enabled,
        policy_dir = ?config.policy_dir,
        "termgate starting"
    );

    // A selector given on the command line is fixed; otherwise it is re-read per request.
    let input = match &cli.level {
        Some(level) => fixed_input(Some(level.clone())),
        None => env_input(),
    };
    let cache = ValidatorCache::new(
        LevelSelector::new(config.install_root.clone(), working_dir),
        input,
        PolicyLoader::new(config.policy_dir.clone()),
        EnvSnapshot::capture(),
    );
    let guard = BoundaryGuard::new(config.boundary);

    Ok(Executor::new(cache, guard, Arc::new(ProcessSpawner)).with_process_chdir(true))
}

async fn serve(tools: &ToolRegistry) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!(tools = ?tools.names(), "serving tool calls on stdin");

    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => {
                debug!(tool = %call.tool, "tool call received");
                match tools.call(&call.tool, call.arguments).await {
                    Ok(text) => ToolReply { ok: true, text },
                    Err(e) => {
                        error!(tool = %call.tool, error = %e, "tool call failed");
                        ToolReply {
                            ok: false,
                            text: e.to_string(),
                        }
                    }
                }
            }
            Err(e) => ToolReply {
                ok: false,
                text: format!("invalid request: {}", e),
            },
        };

        let mut encoded = serde_json::to_string(&reply).context("failed to encode reply")?;
        encoded.push('\n');
        stdout
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write reply")?;
        stdout.flush().await.context("failed to flush reply")?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}

fn tool_definitions(tools: &ToolRegistry) -> Value {
    Value::Array(
        tools
            .all()
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.schema(),
                })
            })
            .collect(),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut executor = create_executor(&cli)?;

    match cli.command {
        Commands::Serve => {
            let shared: SharedExecutor = Arc::new(tokio::sync::Mutex::new(executor));
            let tools = ToolRegistry::terminal(shared);
            serve(&tools).await?;
        }
        Commands::Exec {
            cwd,
            timeout,
            env,
            command,
            args,
        } => {
            let options = ExecOptions {
                cwd,
                timeout,
                env: (!env.is_empty()).then(|| env.into_iter().collect::<BTreeMap<_, _>>()),
            };
            match executor.execute_command(&command, &args, options).await {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    error!(error = %e, "command not executed");
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Check { command, args } => {
            let outcome = executor.check(&command, &args);
            match outcome.command_line() {
                Some(line) => println!("accepted: {}", line),
                None => {
                    println!("rejected: {}", outcome.error().unwrap_or_default());
                    std::process::exit(1);
                }
            }
        }
        Commands::Commands => println!("{}", executor.allowed_commands()),
        Commands::Info => println!("{}", executor.terminal_info()),
        Commands::Tools => {
            let shared: SharedExecutor = Arc::new(tokio::sync::Mutex::new(executor));
            let tools = ToolRegistry::terminal(shared);
            let definitions = serde_json::to_string_pretty(&tool_definitions(&tools))
                .context("failed to encode tool definitions")?;
            println!("{}", definitions);
        }
    }

    Ok(())
}
