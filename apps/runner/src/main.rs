//! Command-line runner for role change simulations.

#![forbid(unsafe_code)]

mod commands;
mod config;

use std::sync::Arc;
use std::time::Duration;

use authsim_application::{AuthObjectCatalog, SimulationGateway, SimulationSession};
use authsim_core::{AppError, AppResult};
use authsim_infrastructure::HttpSimulationBackend;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::commands::Runner;
use crate::config::RunnerConfig;

#[derive(Debug, Parser)]
#[command(name = "authsim", about = "Stage role edits and simulate their license impact")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List roles, optionally filtered by wildcard search and classification.
    Roles {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "")]
        classification: String,
    },
    /// Show the rows of one role merged with its drafted edits.
    Objects {
        role: String,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Record an action on one row: Add, Change, Remove or none.
    Stage {
        role: String,
        row_id: u64,
        action: String,
        /// Replacement value for `Change`.
        #[arg(long)]
        value: Option<String>,
    },
    /// Append a new `Add` row to a role.
    Add {
        role: String,
        #[arg(long)]
        object: String,
        #[arg(long)]
        field: String,
        #[arg(long)]
        value_low: Option<String>,
    },
    /// Discard the drafted edits of one role.
    Reset { role: String },
    /// Show the roles holding drafted edits and the resulting change-set.
    Pending,
    /// Submit every drafted edit as one simulation.
    Submit {
        /// Wait until the run finishes.
        #[arg(long)]
        follow: bool,
    },
    /// List simulation runs with their FUE savings.
    Runs,
    /// Discard every drafted edit of the session.
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = RunnerConfig::load()?;
    let mut runner = build_runner(&config).await?;

    info!(
        scope = %config.scope,
        api_base_url = %config.api_base_url,
        draft_store = ?config.draft_store,
        "authsim-runner started"
    );

    let result = dispatch(&mut runner, cli.command).await;
    runner.close().await;
    result
}

async fn build_runner(config: &RunnerConfig) -> AppResult<Runner> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let backend = Arc::new(HttpSimulationBackend::new(
        http_client,
        config.api_base_url.as_str(),
    )?);
    let catalog: Arc<dyn AuthObjectCatalog> = backend.clone();
    let gateway: Arc<dyn SimulationGateway> = backend;
    let store = config.build_draft_store().await?;

    let session = SimulationSession::open(
        config.scope.clone(),
        Arc::clone(&catalog),
        gateway,
        store,
        config.poller_config(),
    )
    .await;

    Ok(Runner::new(catalog, session))
}

async fn dispatch(runner: &mut Runner, command: Command) -> AppResult<()> {
    match command {
        Command::Roles {
            search,
            classification,
        } => runner.roles(search.as_str(), classification.as_str()).await,
        Command::Objects { role, search } => {
            runner.objects(role.as_str(), search.as_str()).await
        }
        Command::Stage {
            role,
            row_id,
            action,
            value,
        } => {
            runner
                .stage(role.as_str(), row_id, action.as_str(), value)
                .await
        }
        Command::Add {
            role,
            object,
            field,
            value_low,
        } => runner.add(role.as_str(), object, field, value_low).await,
        Command::Reset { role } => runner.reset(role.as_str()).await,
        Command::Pending => runner.pending(),
        Command::Submit { follow } => runner.submit(follow).await,
        Command::Runs => runner.runs().await,
        Command::Clear => runner.clear().await,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
