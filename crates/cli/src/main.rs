//! Opsdesk CLI - database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! opsdesk-cli migrate
//!
//! # Bootstrap the first administrator
//! opsdesk-cli user grant --user-id 6f1c... --email ops@example.com --name "Ops Lead" --role admin
//!
//! # List users and their roles
//! opsdesk-cli user list
//!
//! # Print the role → section policy
//! opsdesk-cli roles
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "opsdesk-cli")]
#[command(author, version, about = "Opsdesk operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user roles
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Print which sections each role may open
    Roles,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create or update a user's profile with the given role
    Grant {
        /// Identity id issued by the identity service
        #[arg(short, long)]
        user_id: Uuid,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `accountant`, `hr_admin`, `project_manager`, `user`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// List users, newest first
    List,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Grant {
                user_id,
                email,
                name,
                role,
            } => {
                commands::users::grant(user_id, &email, &name, &role).await?;
            }
            UserAction::List => commands::users::list().await?,
        },
        Commands::Roles => commands::roles::print_policy(),
    }
    Ok(())
}
