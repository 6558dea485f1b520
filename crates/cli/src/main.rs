//! Hydra CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Ask the support agent, once or interactively
//! - `serve`: Start the HTTP gateway
//! - `seed`: Load the demo catalog and orders
//! - `tools`: List the tools the model can call

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hydra", about = "Hydra: AI support agent for the Arctic store", version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the support agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Act as this logged-in user (enables profile tools)
        #[arg(long, env = "HYDRA_USER_ID")]
        user_id: Option<String>,

        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load the demo product catalog and sample orders
    Seed {
        /// Insert even when products already exist
        #[arg(long)]
        force: bool,
    },

    /// List the tools exposed to the model
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            user_id,
            conversation,
        } => commands::chat::run(message, user_id, conversation).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Seed { force } => commands::seed::run(force).await?,
        Commands::Tools => commands::tools::run(),
    }

    Ok(())
}
