//! `shardhaven-server`: serves the haven layout API.
//!
//! Commands:
//! - `serve` - run the HTTP API (default)
//! - `seed` - create a small demo haven and print its id
//! - `ascii <haven-id>` - print a haven's text map
use clap::{Parser, Subcommand};
use shardhaven_engine::Engine;
use shardhaven_server::ServerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shardhaven-server")]
#[command(about = "Haven layout store and HTTP API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// YAML config file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the sqlite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address, e.g. 127.0.0.1:39444
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Create a demo haven with a few rooms and catalog entries
    Seed,
    /// Print a haven's text map
    Ascii { haven_id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match cli.command.unwrap_or(Commands::Serve { addr: None }) {
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                config.addr = addr;
            }
            tracing::info!(db = %config.db_path.display(), "starting");
            shardhaven_server::serve(config).await
        }
        Commands::Seed => {
            let engine = Engine::new(config.db_path);
            let haven = shardhaven_server::seed_demo(&engine)?;
            println!("{haven}");
            Ok(())
        }
        Commands::Ascii { haven_id } => {
            let engine = Engine::new(config.db_path);
            print!("{}", engine.ascii_map(haven_id)?);
            Ok(())
        }
    }
}
