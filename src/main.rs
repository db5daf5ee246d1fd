use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use primerserver::{api, config, pipeline::workspace};

#[derive(Parser)]
#[command(name = "primerserver")]
#[command(about = "Web backend for primer design and specificity checking")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load the configuration and report missing tools
    CheckConfig,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "primerserver=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Periodically delete job workspaces older than `retention`.
fn spawn_workspace_sweep(root: PathBuf, retention: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = workspace::sweep_expired(&root, retention).await {
                tracing::warn!("Workspace sweep failed: {}", e);
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let mut config = config::Config::load(&config_path)?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            for (key, path) in config.missing_tools() {
                tracing::warn!("{} not found: {}", key, path.display());
            }
            std::fs::create_dir_all(&config.paths.work)?;
            if let Some(hours) = config.paths.workspace_retention_hours {
                let retention = Duration::from_secs(hours * 3600);
                spawn_workspace_sweep(config.paths.work.clone(), retention);
            }

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let app = api::create_router(config);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("primerserver listening on http://{}", addr);

            axum::serve(listener, app).await?;
        }
        Commands::CheckConfig => {
            println!("Configuration: {}", config_path.display());
            let missing = config.missing_tools();
            if missing.is_empty() {
                println!("All tools and directories found.");
            } else {
                for (key, path) in &missing {
                    println!("  missing {}: {}", key, path.display());
                }
                anyhow::bail!("{} configured path(s) not found", missing.len());
            }
        }
    }

    Ok(())
}
