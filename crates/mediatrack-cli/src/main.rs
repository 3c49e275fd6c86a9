//! mediatrack: track books, podcasts and anything else in user-defined
//! categories, with field renames and deletes carried into every item.

mod commands;
mod config;
mod logging;
mod seed;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use mediatrack_db::{Database, PoolConfig};

use crate::commands::{CategoryCommand, Context, FieldCommand, ItemCommand, UserCommand};
use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "mediatrack")]
#[command(author, version, about = "Personal media tracker with schema-aware categories")]
#[command(propagate_version = true)]
struct Cli {
    /// Acting user (defaults to MEDIATRACK_USER)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },

    /// Manage fields; renames and deletes migrate item data
    Field {
        #[command(subcommand)]
        command: FieldCommand,
    },

    /// Manage items
    Item {
        #[command(subcommand)]
        command: ItemCommand,
    },

    /// Load the demo reading list
    Seed,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = logging::init(&config.log);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(core) = e.downcast_ref::<mediatrack_core::Error>() {
                if core.is_retryable() {
                    eprintln!("The operation can be re-run safely to finish it.");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let pool_config = PoolConfig::new().max_connections(config.max_connections);
    let db = Database::connect_with_config(&config.database_url, pool_config).await?;
    info!(subsystem = "cli", op = "connect", "Connected to database");
    mediatrack_db::log_pool_metrics(db.pool());

    let catalog = db.catalog();

    match cli.command {
        Commands::Migrate => {
            db.migrate().await?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::User {
            command: UserCommand::Add { username },
        } => {
            let user = catalog.register_user(&username).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("{}  {}", user.id, user.username);
            }
            Ok(())
        }
        Commands::Seed => {
            let username = cli
                .user
                .or(config.default_user)
                .unwrap_or_else(|| seed::DEMO_USER.to_string());
            let principal = catalog.ensure_principal(&username).await?;
            let summary = seed::seed(&catalog, &db.migrator(), &principal).await?;
            println!(
                "Seeded {} categories, {} fields and {} items for {}",
                summary.categories, summary.fields, summary.items, principal.username
            );
            Ok(())
        }
        Commands::Category { command } => {
            let ctx = context(&db, cli.user, config.default_user, cli.json).await?;
            commands::category(&ctx, command).await
        }
        Commands::Field { command } => {
            let ctx = context(&db, cli.user, config.default_user, cli.json).await?;
            commands::field(&ctx, command).await
        }
        Commands::Item { command } => {
            let ctx = context(&db, cli.user, config.default_user, cli.json).await?;
            commands::item(&ctx, command).await
        }
    }
}

/// Resolve the acting user; it must already be registered.
async fn context(
    db: &Database,
    user: Option<String>,
    default_user: Option<String>,
    json: bool,
) -> Result<Context> {
    let username = commands::require_user(user, default_user)?;
    let catalog = db.catalog();
    Ok(Context {
        principal: catalog.principal(&username).await?,
        migrator: db.migrator(),
        catalog,
        json,
    })
}
