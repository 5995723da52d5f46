//! Agency CLI - Database migrations and access management.
//!
//! # Usage
//!
//! ```bash
//! # Run back-office database migrations
//! agency-cli migrate
//!
//! # List pending access requests
//! agency-cli access requests --status pending
//!
//! # Show a principal's stored profile and capabilities
//! agency-cli access show --email author@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use agency_core::RequestStatus;

mod commands;

#[derive(Parser)]
#[command(name = "agency-cli")]
#[command(author, version, about = "Agency back-office CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run back-office database migrations
    Migrate,
    /// Inspect access requests and profiles
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },
}

#[derive(Subcommand)]
enum AccessAction {
    /// List access requests, newest first
    Requests {
        /// Only show requests in this state (`pending`, `approved`, `rejected`)
        #[arg(short, long)]
        status: Option<RequestStatus>,
    },
    /// Show the stored profile and derived capabilities for an email
    Show {
        /// Principal's email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate => commands::migrate::backoffice().await?,
        Commands::Access { action } => match action {
            AccessAction::Requests { status } => commands::access::list_requests(status).await?,
            AccessAction::Show { email } => commands::access::show(&email).await?,
        },
    }
    Ok(())
}
