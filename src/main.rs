//! Taskboard entry point: CLI parsing, logging setup, and server startup.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskboard::config::Config;
use taskboard::db::Database;
use taskboard::web;

/// Multi-user to-do list web application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create an administrator account
    CreateAdmin {
        /// Username for the new administrator
        #[arg(short, long)]
        username: String,
        /// Password for the new administrator
        #[arg(short, long)]
        password: String,
    },
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("taskboard={},tower_http=info", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };

    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let mut config = load_config(&cli)?;
    config.ensure_db_dir()?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }

            let db = Arc::new(Database::open(&config.server.db_path)?);
            info!("opened database at {}", config.server.db_path.display());

            let (shutdown_tx, addr) =
                web::start_server(db, config.server.port, config.session_ttl_ms()).await?;
            info!("serving on http://{}", addr);

            tokio::signal::ctrl_c().await?;
            shutdown_tx.send(()).ok();
        }
        Commands::CreateAdmin { username, password } => {
            let db = Database::open(&config.server.db_path)?;
            let user = db
                .create_user_with_role(&username, &password, true)
                .map_err(anyhow::Error::new)?;
            println!("created administrator '{}' (id {})", user.username, user.id);
        }
    }

    Ok(())
}
