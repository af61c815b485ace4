use anyhow::Result;
use clap::{Parser, Subcommand};
use decor_studio::transport::{self, cli::SessionOptions};
use decor_studio::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "decor")]
#[command(author, version, about = "Decor Studio - AI interior redesign gateway and studio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (/api/chat, /api/suggestions, /api/image, /api/sample-room)
    Serve {
        /// Port to listen on (default from config: 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (default from config: 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
    },

    /// Chat with the design consultant; interactive without a message
    Chat {
        /// Message to send
        message: Option<String>,

        #[command(flatten)]
        session: SessionOptions,
    },

    /// Get three structured design suggestions
    Suggest {
        #[command(flatten)]
        session: SessionOptions,

        /// Print the raw JSON reply
        #[arg(long)]
        json: bool,
    },

    /// Generate a redesign proposal for a room photo
    Render {
        #[command(flatten)]
        session: SessionOptions,

        /// Write the generated image to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the whole session state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a proposal and print the client presentation
    Present {
        #[command(flatten)]
        session: SessionOptions,

        /// Write the generated image to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a photo of an undecorated room to start from
    SampleRoom {
        #[command(flatten)]
        session: SessionOptions,

        /// Write the generated image to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "decor_studio=debug,decor=debug"
    } else {
        "decor_studio=info,decor=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { port, host } => {
            let mut config = Config::load()?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            tracing::info!(
                "Starting HTTP server on {}:{}",
                config.server.host,
                config.server.port
            );
            transport::http::run_http_server(config).await?;
        }
        Commands::Chat { message, session } => {
            transport::cli::run_chat(message, &session).await?;
        }
        Commands::Suggest { session, json } => {
            transport::cli::run_suggest(&session, json).await?;
        }
        Commands::Render {
            session,
            output,
            json,
        } => {
            transport::cli::run_render(&session, output, json, false).await?;
        }
        Commands::Present { session, output } => {
            transport::cli::run_render(&session, output, false, true).await?;
        }
        Commands::SampleRoom { session, output } => {
            transport::cli::run_sample_room(&session, output).await?;
        }
    }

    Ok(())
}
