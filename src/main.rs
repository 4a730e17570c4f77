//! CLI entry point for spacetraveling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(version)]
#[command(about = "A static blog generator for posts stored in a headless CMS", long_about = None)]
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
    /// Initialize a new blog
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Read posts from a JSON file instead of the content API
        #[arg(short, long)]
        fixture: Option<PathBuf>,
    },

    /// Generate the site and start a preview server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Read posts from a JSON file instead of the content API
        #[arg(short, long)]
        fixture: Option<PathBuf>,
    },

    /// Clean the public folder
    Clean,

    /// List every post
    List {
        /// Read posts from a JSON file instead of the content API
        #[arg(short, long)]
        fixture: Option<PathBuf>,
    },

    /// Show a post's details and reading time
    Show {
        /// Uid of the post
        uid: String,

        /// Read posts from a JSON file instead of the content API
        #[arg(short, long)]
        fixture: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling=debug,info"
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
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing blog in {:?}", target_dir);
            spacetraveling::commands::init::init_site(&target_dir)?;
            println!("Initialized blog in {:?}", target_dir);
        }

        Commands::Generate { fixture } => {
            let blog = spacetraveling::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            blog.generate(fixture.as_deref()).await?;
            println!("Generated successfully!");
        }

        Commands::Server { port, ip, fixture } => {
            let blog = spacetraveling::Blog::new(&base_dir)?;

            // Generate first
            tracing::info!("Generating static files...");
            blog.generate(fixture.as_deref()).await?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            let loader = blog.loader(fixture.as_deref())?;
            spacetraveling::server::start(&blog, loader, &ip, port).await?;
        }

        Commands::Clean => {
            let blog = spacetraveling::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { fixture } => {
            let blog = spacetraveling::Blog::new(&base_dir)?;
            spacetraveling::commands::list::run(&blog, fixture.as_deref()).await?;
        }

        Commands::Show { uid, fixture } => {
            let blog = spacetraveling::Blog::new(&base_dir)?;
            spacetraveling::commands::show::run(&blog, &uid, fixture.as_deref()).await?;
        }

        Commands::Version => {
            println!("spacetraveling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
