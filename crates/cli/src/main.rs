//! expensegate - command-line client for the expense approval API.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod client;
mod token_file;

use client::{ApiClient, ApiFailure, LoginResponse};

/// expensegate - submit and approve expenses
#[derive(Parser, Debug)]
#[command(name = "expensegate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the expensegate API
    #[arg(long, env = "EXPENSEGATE_URL", default_value = "http://localhost:8000")]
    base_url: String,

    /// File holding the bearer token between invocations
    #[arg(long, default_value = "bearer_token.txt")]
    token_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // === Session ===
    /// Log in and store the bearer token
    Login { username: String, password: String },

    /// Revoke the stored token and remove it
    Logout,

    // === Own expenses ===
    /// List expenses you created
    Expenses,

    /// Show one of your expenses
    Expense { id: String },

    /// Create a draft expense
    Create {
        title: String,
        description: String,
        amount: f64,
    },

    /// Submit a draft for approval
    Submit { id: String },

    /// Delete a draft
    Delete { id: String },

    // === Approver ===
    /// List expenses assigned to you for approval
    Approvals,

    /// Show one expense assigned to you
    Approval { id: String },

    /// Accept a submitted expense
    Approve { id: String },

    /// Reject a submitted expense
    Reject { id: String, reason: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ApiFailure>() {
                Some(failure) => eprintln!("error ({}): {}", failure.status, failure.body),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let api = ApiClient::new(&cli.base_url);
    let token_path = cli.token_file.as_path();
    let token = || token_file::load(token_path);

    let output = match cli.command {
        Commands::Login { username, password } => {
            let body = api.login(&username, &password).await?;
            let session = LoginResponse::from_json(&body)?;
            token_file::store(token_path, &session.access_token)?;
            tracing::debug!(token_type = %session.token_type, path = %token_path.display(), "token stored");
            body
        }
        Commands::Logout => {
            let body = api.logout(&token()?).await?;
            token_file::remove(token_path)?;
            body
        }
        Commands::Expenses => api.my_expenses(&token()?).await?,
        Commands::Expense { id } => api.my_expense(&token()?, &id).await?,
        Commands::Create {
            title,
            description,
            amount,
        } => api.create(&token()?, &title, &description, amount).await?,
        Commands::Submit { id } => api.submit(&token()?, &id).await?,
        Commands::Delete { id } => api.delete(&token()?, &id).await?,
        Commands::Approvals => api.approvals(&token()?).await?,
        Commands::Approval { id } => api.approval(&token()?, &id).await?,
        Commands::Approve { id } => api.approve(&token()?, &id).await?,
        Commands::Reject { id, reason } => api.reject(&token()?, &id, &reason).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_point_at_local_server() {
        let cli = Cli::try_parse_from(["expensegate", "expenses"]).unwrap();
        assert_eq!(cli.base_url, "http://localhost:8000");
        assert_eq!(cli.token_file, PathBuf::from("bearer_token.txt"));
        assert!(matches!(cli.command, Commands::Expenses));
    }

    #[test]
    fn create_parses_decimal_amount() {
        let cli = Cli::try_parse_from([
            "expensegate",
            "create",
            "Office Supplies",
            "Printer paper and toner",
            "75.50",
        ])
        .unwrap();
        match cli.command {
            Commands::Create { title, amount, .. } => {
                assert_eq!(title, "Office Supplies");
                assert_eq!(amount, 75.5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn reject_requires_a_reason() {
        assert!(Cli::try_parse_from(["expensegate", "reject", "EID01"]).is_err());
    }
}
