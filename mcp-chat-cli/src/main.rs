mod cli;
mod repl;

use clap::Parser;
use cli::Cli;
use mcp_chat_core::ChatController;
use mcp_chat_core::config::AppConfig;
use std::error::Error;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);
    info!("Starting mcp-chat");
    debug!(config = ?cli.config, model = ?cli.model, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path or defaults");
    }
    apply_cli_overrides(&cli, &mut config);

    let mut controller = ChatController::from_config(&config)?;
    let summary = controller.rediscover_tools().await;
    info!(
        servers = summary.total_servers,
        tools = summary.tools_mapped,
        "Initial tool discovery finished"
    );

    repl::run(&mut controller).await?;
    info!("Client execution finished");
    Ok(())
}

fn apply_cli_overrides(cli: &Cli, config: &mut AppConfig) {
    if let Some(model) = &cli.model {
        info!(%model, "Overriding model based on CLI flag");
        config.model = model.clone();
    }
    if let Some(system) = &cli.system {
        config.system_prompt = Some(system.clone());
    }
}

fn init_tracing(quiet: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = if quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
