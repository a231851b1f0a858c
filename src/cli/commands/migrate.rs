use crate::cli::utils::output_success;
use crate::cli::{CliContext, OutputFormat};

pub async fn handle(context: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    context.database.migrate().await?;
    output_success(&output_format, "Migrations applied", None)
}
