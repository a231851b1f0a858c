use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{CliContext, OutputFormat};
use crate::services::users::NewUserInput;
use crate::services::{AuditLogger, UserService};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an admin account (no session required)")]
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "editor", help = "dev, admin or editor")]
        role: String,
        #[arg(long, env = "SITE_USER_PASSWORD", help = "Initial password (at least 8 characters)")]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, context: &CliContext, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Create {
            email,
            name,
            role,
            password,
        } => {
            let users = UserService::new(
                context.store.clone(),
                AuditLogger::new(context.store.clone()),
                context.config.security.password_cost,
            );
            let user = users
                .bootstrap(NewUserInput {
                    email,
                    name,
                    password,
                    role,
                    permissions: Vec::new(),
                })
                .await?
                .into_inner();

            output_success(
                &output_format,
                &format!("Created user {}", user.email),
                Some(json!({ "id": user.id, "role": user.role })),
            )
        }
    }
}
