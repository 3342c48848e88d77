//! ChatHub Server Binary
//!
//! Headless chat hub: accepts clients, fans chat lines out, logs what an
//! operator display would show.

use chathub::config::ServerConfig;
use chathub::server::{ChatServer, TracingSink};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chathub-server")]
#[command(about = "Line-oriented TCP chat hub")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/server.toml")]
    config: PathBuf,

    /// Address to bind on
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if args.verbose {
            "chathub=debug,info"
        } else {
            "chathub=info,warn,error"
        })
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting ChatHub Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = if args.config.exists() {
        ServerConfig::from_file(&args.config)?
    } else {
        info!("Config file not found, using defaults");
        ServerConfig::default()
    };

    // Override config with CLI arguments
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    config.validate()?;
    info!("Listening on {}", config.server.listen_addr());

    let server = ChatServer::new(config, Arc::new(TracingSink))?;
    if let Err(e) = server.start().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");

    server.stop().await;
    info!("ChatHub Server stopped");
    Ok(())
}
