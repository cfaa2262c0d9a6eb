use std::fs;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use atelier::config::ServerConfig;
use atelier::github::{GitHubClient, SyncService};
use atelier::server::{AppState, create_router};
use atelier::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "A portfolio CMS backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// GitHub access token for repository synchronization. Falls back
        /// to the GITHUB_ACCESS_TOKEN environment variable; when neither
        /// is set the GitHub endpoints are disabled.
        #[arg(long)]
        github_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("atelier=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
            github_token,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                github_token: github_token.or_else(|| std::env::var("GITHUB_ACCESS_TOKEN").ok()),
            };

            fs::create_dir_all(&config.data_dir)?;

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            let store: Arc<dyn Store> = Arc::new(store);

            let github = match &config.github_token {
                Some(token) => {
                    let client = GitHubClient::connect(token).await?;
                    info!("GitHub integration enabled");
                    Some(Arc::new(SyncService::new(
                        Arc::new(client),
                        store.clone(),
                    )))
                }
                None => {
                    info!("No GitHub token configured; sync endpoints disabled");
                    None
                }
            };

            let state = Arc::new(AppState { store, github });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
