use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{CliContext, OutputFormat};
use crate::services::{AuditLogger, StaticContent, TranslationResolver};

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Copy the static locale files into ui_translations")]
    Translations {
        #[arg(long, help = "Locale directory (defaults to CONTENT_STATIC_DIR)")]
        dir: Option<PathBuf>,

        #[arg(long, help = "Replace rows that already exist")]
        overwrite: bool,
    },
}

pub async fn handle(cmd: SeedCommands, context: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SeedCommands::Translations { dir, overwrite } => {
            let dir = dir.unwrap_or_else(|| context.config.content.static_dir.clone());
            let resolver = TranslationResolver::new(
                context.store.clone(),
                StaticContent::new(&dir),
                AuditLogger::new(context.store.clone()),
            );

            let report = resolver.seed_all(overwrite).await?;
            output_success(
                &output_format,
                &format!("Seeded translations from {}", dir.display()),
                Some(json!({ "seeded": report.seeded, "skipped": report.skipped })),
            )
        }
    }
}
