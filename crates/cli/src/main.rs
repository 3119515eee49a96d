//! Parlance CLI — the main entry point.
//!
//! Commands:
//! - `serve` — Start the HTTP gateway
//! - `tools` — List the built-in tools

use clap::{Parser, Subcommand};
use parlance_config::AppConfig;

#[derive(Parser)]
#[command(
    name = "parlance",
    about = "Parlance — conversational session gateway",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the listen host
        #[arg(long)]
        host: Option<String>,
    },

    /// List the built-in tools and their functions
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port, host } => {
            let mut config = AppConfig::load()?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            parlance_gateway::start(config).await?;
        }
        Commands::Tools => {
            for tool in parlance_tools::default_registry().list() {
                println!("{} — {}", tool.name, tool.description);
                for function in &tool.functions {
                    println!("    {} — {}", function.name, function.description);
                }
            }
        }
    }

    Ok(())
}
