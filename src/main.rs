//! CLI entry point for spacetraveling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacetraveling::generator::Generator;
use spacetraveling::server::{self, AppState};
use spacetraveling::Site;

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(version)]
#[command(about = "Blog front-end for a Prismic content repository", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Serve content from a JSON dump instead of the API
        #[arg(short, long)]
        fixtures: Option<PathBuf>,
    },

    /// Start the server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Serve content from a JSON dump instead of the API
        #[arg(short, long)]
        fixtures: Option<PathBuf>,

        /// Generate pages on first request only
        #[arg(long)]
        no_prebuild: bool,
    },

    /// Clean the public folder
    Clean,

    /// List posts of the content repository
    List {
        /// Serve content from a JSON dump instead of the API
        #[arg(short, long)]
        fixtures: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling=debug,tower_http=debug,info"
    } else {
        "spacetraveling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Generate { fixtures } => {
            let site = Site::new(&base_dir)?;
            let client = site.content_client(fixtures.as_deref())?;
            tracing::info!("Generating static files...");
            site.generate(client.as_ref()).await?;
            println!("Generated successfully!");
        }

        Commands::Serve {
            port,
            ip,
            fixtures,
            no_prebuild,
        } => {
            let site = Site::new(&base_dir)?;
            let client = site.content_client(fixtures.as_deref())?;
            let state = AppState::new(Generator::new(&site)?, client);

            tracing::info!("Starting server at http://{}:{}", ip, port);
            server::start(state, &ip, port, !no_prebuild).await?;
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { fixtures } => {
            let site = Site::new(&base_dir)?;
            let client = site.content_client(fixtures.as_deref())?;
            spacetraveling::commands::list::run(&site, client.as_ref()).await?;
        }

        Commands::Version => {
            println!("spacetraveling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
