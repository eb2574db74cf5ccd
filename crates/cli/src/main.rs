//! repoloop CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive session (the default)
//! - `ask`     — Run a single turn and exit
//! - `info`    — List the tools and resources of the tool provider
//! - `onboard` — Write a starter config

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "repoloop",
    about = "repoloop — chat with a model that can browse, search and clone repositories",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Print each completion whole instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// Use the in-process tools instead of the MCP server
        #[arg(long)]
        local: bool,
    },

    /// Send a single message and print the answer
    Ask {
        message: String,

        #[arg(long)]
        no_stream: bool,

        #[arg(long)]
        local: bool,
    },

    /// Show the tools, resources and templates the tool provider publishes
    Info {
        #[arg(long)]
        local: bool,
    },

    /// Initialize configuration
    Onboard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the transcript
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or(Commands::Chat {
        no_stream: false,
        local: false,
    });

    match command {
        Commands::Chat { no_stream, local } => commands::chat::run(no_stream, local).await?,
        Commands::Ask {
            message,
            no_stream,
            local,
        } => commands::ask::run(&message, no_stream, local).await?,
        Commands::Info { local } => commands::info::run(local).await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
