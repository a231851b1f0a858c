pub mod commands;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgRecordStore, RecordStore};

#[derive(Parser)]
#[command(name = "site")]
#[command(about = "Site CLI - database maintenance for the firm site API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Load bundled content into the database")]
    Seed {
        #[command(subcommand)]
        cmd: commands::seed::SeedCommands,
    },

    #[command(about = "Admin account management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Database handles shared by every command.
pub struct CliContext {
    pub config: AppConfig,
    pub database: DatabaseManager,
    pub store: Arc<dyn RecordStore>,
}

impl CliContext {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let database = DatabaseManager::connect_lazy(&config.database).context("cannot configure database")?;
        let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(database.pool().clone()));
        Ok(Self { config, database, store })
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let context = CliContext::from_env()?;

    let result = match cli.command {
        Commands::Migrate => commands::migrate::handle(&context, output_format).await,
        Commands::Seed { cmd } => commands::seed::handle(cmd, &context, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, &context, output_format).await,
    };

    context.database.close().await;
    result
}
