//! Leave CLI - administrative commands
//!
//! Usage:
//!   leave migrate
//!   leave create-manager --name <name> --email <email> --department <dept> --joining-date <YYYY-MM-DD> --password <password>
//!   leave sweep-tokens

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use leave_api::auth::{PasswordConfig, PasswordHasher};
use leave_core::{AccountRepository, AppConfig, NewAccount, PgStore, RefreshTokenRepository, Role};

#[derive(Parser)]
#[command(name = "leave")]
#[command(about = "Leave manager administration CLI")]
#[command(version)]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Create a manager account (self-registration only creates employees)
    CreateManager {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        department: String,
        /// Joining date, YYYY-MM-DD
        #[arg(long)]
        joining_date: NaiveDate,
        #[arg(long)]
        password: String,
    },
    /// Delete expired refresh tokens once
    SweepTokens,
}

fn load_config(path: Option<String>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    let store = PgStore::new(&config.database.url, 2)
        .await
        .context("connecting to database")?;

    match cli.command {
        Commands::Migrate => {
            store.migrate().await?;
            println!("Migrations applied");
        }
        Commands::CreateManager {
            name,
            email,
            department,
            joining_date,
            password,
        } => {
            let hasher = PasswordHasher::new(&PasswordConfig::from(&config.auth))?;
            let password_hash = hasher.hash(&password)?;

            let account = store
                .create_account(NewAccount {
                    name,
                    email,
                    department,
                    joining_date,
                    leave_balance: config.leave.default_balance,
                    password_hash,
                    role: Role::Manager,
                })
                .await?;
            tracing::info!(account_id = account.id, email = %account.email, "Manager created");
            println!("Created manager {} ({})", account.id, account.email);
        }
        Commands::SweepTokens => {
            let removed = store.delete_expired_refresh_tokens(Utc::now()).await?;
            println!("Removed {removed} expired refresh tokens");
        }
    }

    Ok(())
}
