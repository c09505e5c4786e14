// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Alexandria daemon and admin CLI
//!
//! - `alexandria serve` — run the HTTP/SSE server with background sweepers
//! - `alexandria library create|list` — library administration
//! - `alexandria reindex <library-id>` — rebuild a library's vector index
//! - `alexandria trash sweep` — purge expired trash items now

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

mod bootstrap;
mod commands;

#[derive(Parser)]
#[command(name = "alexandria")]
#[command(version, about = "Alexandria document library service", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server daemon.
    Serve {
        /// Listen address, e.g. 0.0.0.0:8181
        #[arg(long, env = "ALEXANDRIA_BIND_ADDR")]
        bind: Option<String>,
        /// Expose Prometheus metrics on this port.
        #[arg(long, env = "ALEXANDRIA_METRICS_PORT")]
        metrics_port: Option<u16>,
    },
    /// Library administration.
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
    /// Rebuild the vector index of one library.
    Reindex {
        library_id: Uuid,
    },
    /// Trash maintenance.
    Trash {
        #[command(subcommand)]
        command: TrashCommand,
    },
}

#[derive(Subcommand)]
enum LibraryCommand {
    /// Create a library owned by a user.
    Create {
        name: String,
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        description: Option<String>,
    },
    /// List all libraries.
    List,
}

#[derive(Subcommand)]
enum TrashCommand {
    /// Permanently delete everything past its retention window.
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { bind, metrics_port } => commands::serve(bind, metrics_port).await,
        Command::Library { command } => match command {
            LibraryCommand::Create { name, owner, description } => {
                commands::create_library(name, owner, description).await
            }
            LibraryCommand::List => commands::list_libraries().await,
        },
        Command::Reindex { library_id } => commands::reindex(library_id).await,
        Command::Trash { command } => match command {
            TrashCommand::Sweep => commands::trash_sweep().await,
        },
    }
}
