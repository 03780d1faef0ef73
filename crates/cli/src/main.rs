//! TechMart CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (application tables and session store)
//! techmart-cli migrate
//!
//! # Create an admin account
//! techmart-cli admin create -e admin@example.com -u admin -p 'long password' --phone 0788000000
//!
//! # Load catalog products from a YAML file
//! techmart-cli seed catalog.yaml
//! ```
//!
//! Every command reads `TECHMART_DATABASE_URL` (or `DATABASE_URL`), loading
//! a `.env` file first if present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "techmart-cli")]
#[command(author, version, about = "TechMart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load catalog products from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin username
        #[arg(short, long)]
        username: String,

        /// Admin password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Contact phone number
        #[arg(long)]
        phone: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                username,
                password,
                phone,
            } => {
                commands::admin::create(&email, &username, &password, &phone).await?;
            }
        },
        Commands::Seed { file } => commands::seed::run(&file).await?,
    }
    Ok(())
}
