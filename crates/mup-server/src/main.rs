//! MUP Server entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use mup_server::config::{load_config, resolve_config_path, ServerConfig};
use mup_server::context::ServerContext;
use mup_server::protocol::ProtocolHandler;

#[derive(Parser)]
#[command(
    name = "mup-server",
    about = "MUP session engine: capability negotiation, event dispatch and batch operations",
    version
)]
struct Cli {
    /// Configuration file path (falls back to $MUP_SERVER_CONFIG).
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MUP over WebSocket (default).
    #[cfg(feature = "ws")]
    Serve {
        /// Listen host, overriding the config file.
        #[arg(long)]
        host: Option<String>,

        /// Listen port, overriding the config file.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serve a single MUP connection over stdin/stdout.
    #[cfg(feature = "stdio")]
    ServeStdio,

    /// Print server capabilities as JSON.
    Info,

    /// Load and validate the configuration, then print it.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = load_config(config_path.as_deref())?;

    // Initialize logging
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.server.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or_else(default_command) {
        #[cfg(feature = "ws")]
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr = config.listen_addr()?;
            let handler = ProtocolHandler::new(Arc::new(ServerContext::new(&config)));
            let transport =
                mup_server::transport::WebSocketTransport::new(handler, config.server.path.clone());
            transport.run(addr).await?;
        }

        #[cfg(feature = "stdio")]
        Commands::ServeStdio => {
            let handler = ProtocolHandler::new(Arc::new(ServerContext::new(&config)));
            let transport = mup_server::transport::StdioTransport::new(handler);
            transport.run().await?;
        }

        Commands::Info => {
            let context = ServerContext::new(&config);
            let info = serde_json::json!({
                "server": mup_server::types::ServerInfo::current(),
                "capabilities": context.capabilities.as_ref(),
                "handler_count": context.dispatch.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::CheckConfig => {
            config.validate()?;
            match &config_path {
                Some(path) => println!("Valid config: {}", path.display()),
                None => println!("No config file; using defaults"),
            }
            print_config(&config)?;
        }
    }

    Ok(())
}

fn default_command() -> Commands {
    #[cfg(feature = "ws")]
    {
        Commands::Serve {
            host: None,
            port: None,
        }
    }
    #[cfg(not(feature = "ws"))]
    {
        Commands::Info
    }
}

fn print_config(config: &ServerConfig) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
