//! Celesta CLI - operator tools for the festival site.
//!
//! # Usage
//!
//! ```bash
//! # Show how the sponsor carousel pages at a given viewport width
//! celesta-cli sponsors --width 900
//!
//! # Fetch the merchandise catalog from the backend
//! celesta-cli catalog
//!
//! # Parse every event and workshop page and report problems
//! celesta-cli content check --dir crates/storefront/content
//! ```
//!
//! # Commands
//!
//! - `sponsors` - Preview the sponsor carousel layout
//! - `catalog` - Dump the backend catalog as JSON
//! - `content check` - Validate markdown content

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "celesta-cli")]
#[command(author, version, about = "Celesta festival site tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the sponsor carousel pages
    Sponsors {
        /// Viewport width in CSS pixels
        #[arg(short, long, default_value_t = celesta_core::carousel::DEFAULT_VIEWPORT_WIDTH)]
        width: u32,
    },
    /// Fetch the merchandise catalog from the backend
    Catalog,
    /// Work with event and workshop content
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },
}

#[derive(Subcommand)]
enum ContentAction {
    /// Parse all content files and report the ones that fail
    Check {
        /// Content directory
        #[arg(short, long, default_value = celesta_storefront::CONTENT_DIR)]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Sponsors { width } => commands::sponsors::preview(width)?,
        Commands::Catalog => commands::catalog::dump().await?,
        Commands::Content { action } => match action {
            ContentAction::Check { dir } => commands::content::check(&dir)?,
        },
    }
    Ok(())
}
