//! SkyCart CLI - Provisioning and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create collections, indexes, and the admin user (one-shot)
//! skycart provision
//!
//! # Print the DDL without connecting
//! skycart provision --dry-run
//!
//! # Create a user (password from SKYCART_NEW_USER_PASSWORD)
//! skycart admin create -e jo@example.com -n "Jo" -r admin
//!
//! # Check the post-provisioning invariants
//! skycart verify
//!
//! # Probe the service health endpoint (container HEALTHCHECK)
//! skycart health --url http://127.0.0.1:8000/health
//! ```
//!
//! # Commands
//!
//! - `provision` - Run the provisioning plan
//! - `admin create` - Create users
//! - `verify` - Verify the seeded admin
//! - `health` - HTTP health probe

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser)]
#[command(name = "skycart")]
#[command(author, version, about = "SkyCart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create collections, indexes, and the admin user
    Provision {
        /// Print the SQL plan instead of executing it
        #[arg(long)]
        dry_run: bool,

        /// Schema holding the collections (overrides `SKYCART_DB_NAMESPACE`)
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Manage users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Verify that exactly one admin exists with the expected email
    Verify {
        /// Expected admin email (defaults to `ADMIN_EMAIL` or admin@Skycart.com)
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Probe the service health endpoint
    Health {
        /// Health endpoint URL
        #[arg(long, default_value = commands::health::DEFAULT_URL)]
        url: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`user`, `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing; progress is logged at info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Provision { dry_run, namespace } => {
            if dry_run {
                commands::provision::dry_run(namespace.as_deref(), &mut std::io::stdout().lock())?;
            } else {
                commands::provision::run(namespace.as_deref()).await?;
            }
        }
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name, role } => {
                commands::admin::create_user(&email, &name, &role).await?;
            }
        },
        Commands::Verify { email } => commands::verify::run(email.as_deref()).await?,
        Commands::Health { url, timeout } => commands::health::probe(&url, timeout).await?,
    }
    Ok(())
}
