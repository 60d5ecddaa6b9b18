use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use ransomware_mcp::config::Config;
use ransomware_mcp::dispatch::{ToolCallRequest, ToolDispatcher};
use ransomware_mcp::server::McpServer;
use ransomware_mcp::tools::{ToolCatalog, ToolDefinition, TtlClass};
use ransomware_mcp::upstream::RansomwareLiveClient;

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ransomware-mcp")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("ransomware-mcp.log");

    // Stdout carries the protocol, so logs go to a file
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let level = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_dispatcher(config: &Config) -> Result<Arc<ToolDispatcher>> {
    let api_key = config.resolve_api_key().context("Failed to resolve API key")?;
    let client = RansomwareLiveClient::new(config.client_settings(api_key)).context("Failed to create API client")?;
    let catalog = ToolCatalog::ransomware_live().context("Failed to build tool catalog")?;

    Ok(Arc::new(ToolDispatcher::new(
        Arc::new(catalog),
        Arc::new(client),
        config.dispatcher_settings(),
    )))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::Serve => handle_serve_command(config).await,
        Commands::Tools { json } => handle_tools_command(json),
        Commands::Call { tool, args } => handle_call_command(&tool, &args, config).await,
        Commands::Validate => handle_validate_command(config).await,
    }
}

async fn handle_serve_command(config: &Config) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let server = Arc::new(McpServer::new(dispatcher));
    server.serve_stdio().await.context("MCP server failed")?;
    info!("stdin closed, shutting down");
    Ok(())
}

fn handle_tools_command(json: bool) -> Result<()> {
    let catalog = ToolCatalog::ransomware_live()?;

    if json {
        let summaries: Vec<_> = catalog.list_all().collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for class in TtlClass::ALL {
        let tools = catalog.by_ttl_class(class);
        if tools.is_empty() {
            continue;
        }
        println!("{} {}", class.as_str().yellow().bold(), format!("({} tools)", tools.len()).dimmed());
        for tool in tools {
            print_tool(tool);
        }
        println!();
    }
    println!("{} tools", catalog.len());
    Ok(())
}

fn print_tool(tool: &ToolDefinition) {
    println!("  {}", tool.name.green().bold());
    println!("    {}", tool.description);
    for param in &tool.params {
        let marker = if param.required { "*".red().to_string() } else { " ".to_string() };
        println!(
            "      {}{} {} - {}",
            marker,
            param.name.cyan(),
            param.param_type.as_str().dimmed(),
            param.description
        );
    }
}

async fn handle_call_command(tool: &str, args: &str, config: &Config) -> Result<()> {
    let arguments: Value = serde_json::from_str(args).context("--args must be a JSON object")?;
    let dispatcher = build_dispatcher(config)?;

    let result = dispatcher.dispatch(ToolCallRequest::new(tool, arguments)).await;
    println!("{}", serde_json::to_string_pretty(&result.to_envelope())?);

    if !result.is_success() {
        return Err(eyre::eyre!("tool '{}' failed", tool));
    }
    Ok(())
}

async fn handle_validate_command(config: &Config) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let result = dispatcher
        .dispatch(ToolCallRequest::new("validate-api-connectivity", Value::Null))
        .await;

    let envelope = result.to_envelope();
    if result.is_success() {
        println!("{} {}", "API key accepted:".green(), config.api.base_url);
        if let Some(payload) = envelope.payload {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Ok(())
    } else {
        println!(
            "{} {}",
            format!("{}:", result.error_kind().map(|k| k.as_str()).unwrap_or("error")).red(),
            envelope.message.unwrap_or_default()
        );
        Err(eyre::eyre!("API connectivity check failed"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    setup_logging(&config, cli.is_verbose()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> Config {
        let mut config = Config::default();
        config.api.api_key = Some("test-key".to_string());
        config
    }

    #[tokio::test]
    async fn test_call_unknown_tool_returns_error() {
        let err = handle_call_command("get-weather", "{}", &config_with_key()).await.unwrap_err();
        assert!(err.to_string().contains("get-weather"));
    }

    #[tokio::test]
    async fn test_call_rejects_non_json_args() {
        assert!(handle_call_command("get-stats", "not json", &config_with_key()).await.is_err());
    }
}
