//! # quillpress CLI
//!
//! Command-line interface for the quillpress blog generator.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quillpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "quillpress.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build post pages, the index page and the RSS feed
    Build {
        /// Number of concurrent page builds (defaults to the configured limit)
        #[arg(long)]
        jobs: Option<usize>,
    },

    /// Search the published feed
    Search {
        /// Search query
        query: String,

        /// Maximum results to return
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Return JSON for machine consumption
        #[arg(long)]
        json: bool,

        /// Feed file path or http(s) URL (defaults to the built rss.xml)
        #[arg(long)]
        feed: Option<String>,
    },

    /// List tags with post counts
    Tags,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build { jobs } => commands::build_site(&cli.config, jobs),
        Commands::Search {
            query,
            limit,
            json,
            feed,
        } => {
            let opts = commands::SearchOptions { limit, json, feed };
            commands::search_feed(&cli.config, &query, opts).await
        }
        Commands::Tags => commands::list_tags(&cli.config),
    }
}
