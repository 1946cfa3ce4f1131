//! # Dairy Drop CLI
//!
//! Database and account management for the Dairy Drop backend.
//!
//! ## Usage
//!
//! ```bash
//! # Apply migrations
//! dairydrop migrate
//!
//! # Seed the admin account and sample catalog
//! dairydrop seed
//!
//! # Promote an existing user
//! dairydrop admin promote --email owner@example.com
//! ```
//!
//! ## Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Create or promote the admin and insert sample products
//! - `admin promote` - Grant the admin role to an existing account

use clap::{Parser, Subcommand};
use dairydrop_cli::commands::{self, seed::AdminSeed};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "dairydrop")]
#[command(author, version, about = "Dairy Drop database and admin tools")]
struct Cli {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        /// Only report migration status
        #[arg(long)]
        status: bool,
    },
    /// Seed the admin account and sample products
    Seed {
        /// Admin email; the admin step is skipped when unset
        #[arg(long, env = "ADMIN_EMAIL")]
        admin_email: Option<String>,

        /// Phone for a newly created admin
        #[arg(long, env = "ADMIN_PHONE")]
        admin_phone: Option<String>,

        /// Admin password; generated when unset
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,

        /// Skip the sample catalog
        #[arg(long)]
        skip_products: bool,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Debug, Subcommand)]
enum AdminAction {
    /// Promote an existing user to admin
    Promote {
        /// Email of the account to promote
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dairydrop=info,dairydrop_cli=info,dairydrop_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Migrate { status } => {
            if status {
                commands::migrate::status(&cli.database_url).await?;
            } else {
                commands::migrate::run(&cli.database_url).await?;
            }
        }
        Commands::Seed {
            admin_email,
            admin_phone,
            admin_password,
            skip_products,
        } => {
            let pool = commands::connect(&cli.database_url).await?;
            let seed = admin_email.map(|email| AdminSeed {
                email,
                phone: admin_phone,
                password: admin_password,
            });

            commands::seed::seed_admin(&pool, seed).await?;
            if !skip_products {
                commands::seed::seed_products(&pool).await?;
            }

            pool.close().await;
            tracing::info!("Seeding completed");
        }
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                let pool = commands::connect(&cli.database_url).await?;
                commands::admin::promote(&pool, &email).await?;
                pool.close().await;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_promote() {
        let cli = Cli::try_parse_from([
            "dairydrop",
            "--database-url",
            "postgresql://localhost/dairydrop",
            "admin",
            "promote",
            "-e",
            "owner@example.com",
        ])
        .unwrap();

        match cli.command {
            Commands::Admin {
                action: AdminAction::Promote { email },
            } => assert_eq!(email, "owner@example.com"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_migrate_status() {
        let cli = Cli::try_parse_from([
            "dairydrop",
            "--database-url",
            "postgresql://localhost/dairydrop",
            "migrate",
            "--status",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Migrate { status: true }));
    }
}
