//! TaskFlow
//!
//! Personal task manager service: an HTTP JSON API with a conversational
//! assistant, plus an MCP stdio surface over the same task operations.

use anyhow::{Result, bail};
use clap::Parser;
use rmcp::{ServiceExt, transport::io::stdio};
use std::sync::Arc;
use taskflow::api::{AppState, start_server};
use taskflow::chat::Assistant;
use taskflow::cli::{Cli, Command};
use taskflow::config::{Config, ConfigLoader};
use taskflow::db::Database;
use taskflow::llm::{OpenAiClient, ReasoningService, Unconfigured};
use taskflow::logging::{self, LogTarget};
use taskflow::mcp::TaskFlowMcpServer;
use taskflow::store::TaskStore;
use taskflow::tools::ToolHandler;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let log_target = LogTarget::parse(&cli.log);
    if matches!(cli.command, Some(Command::Mcp { .. })) && log_target == LogTarget::Stdout {
        bail!("--log stdout would corrupt the MCP stdio transport; use stderr or a file");
    }
    logging::init(&log_target, cli.verbose)?;

    // If explicit config path given, set it as env var for ConfigLoader to pick up
    // SAFETY: no other thread reads or writes the environment at this point
    if let Some(config_path) = &cli.config {
        // Use unsafe block for set_var which is required in Rust 2024 edition
        unsafe {
            std::env::set_var("TASKFLOW_CONFIG_PATH", config_path);
        }
    }
    let mut loader = ConfigLoader::load()?;
    if let Some(path) = loader.config_path() {
        info!(path = %path.display(), "Loaded configuration");
    }

    // Override settings from CLI arguments
    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = loader.into_config();

    config.ensure_db_dir()?;
    let db = Arc::new(Database::open(&config.server.db_path)?);
    info!(path = %config.server.db_path.display(), "Database ready");
    let store = Arc::new(TaskStore::new(db));

    match cli.command {
        Some(Command::Mcp { user }) => run_mcp(config, store, user).await?,
        Some(Command::Serve) | None => run_server(config, store).await?,
    }

    Ok(())
}

fn reasoning_service(config: &Config) -> Result<Arc<dyn ReasoningService>> {
    match config.assistant.resolve_api_key() {
        Some(key) => {
            info!(model = %config.assistant.model, api_base = %config.assistant.api_base, "Assistant configured");
            Ok(Arc::new(OpenAiClient::new(&config.assistant, key)?))
        }
        None => {
            warn!(
                env = %config.assistant.api_key_env,
                "No API key configured; only local chat commands will work"
            );
            Ok(Arc::new(Unconfigured))
        }
    }
}

async fn run_server(config: Config, store: Arc<TaskStore>) -> Result<()> {
    let service = reasoning_service(&config)?;
    let assistant = Arc::new(Assistant::from_config(Arc::clone(&store), service, &config));
    let state = AppState::new(store, assistant, config.server.session_ttl());
    start_server(state, &config.server.host, config.server.port).await
}

async fn run_mcp(config: Config, store: Arc<TaskStore>, user: String) -> Result<()> {
    if store.db().get_user(&user)?.is_none() {
        bail!("Unknown user '{}'. Register it through POST /api/users first.", user);
    }

    let tools = Arc::new(ToolHandler::new(store, &config.assistant));
    let server = TaskFlowMcpServer::new(tools, user.clone());

    // Run the stdio server
    info!(user = %user, "MCP server ready, listening on stdio");
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
