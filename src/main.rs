use clap::{Parser, Subcommand};
use simple_mcp_server::Result;
use simple_mcp_server::commands::{list_tools, serve};
use simple_mcp_server::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "simple-mcp-server")]
#[command(about = "A minimal MCP tool server over HTTP with SSE notifications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default). HOST and PORT override the config file.
    Serve {
        /// Optional TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the advertised tool list as JSON
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { config: None }) {
        Commands::Serve { config } => {
            let config = Config::load(config.as_deref())?;
            serve(config).await?;
        }
        Commands::Tools => {
            list_tools()?;
        }
    }

    Ok(())
}
