use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use formstore_cli::args::Cli;
use formstore_cli::catalog::load_catalog;
use formstore_cli::commands;
use formstore_cli::state::AppState;
use formstore_db::StoreConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // stdout carries the command's JSON, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formstore_cli=info,formstore_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = StoreConfig::from_env()?;
    let catalog = load_catalog(&cli.catalog)?;
    tracing::info!(
        database = %config.database_path.display(),
        catalog = %cli.catalog.display(),
        entities = catalog.len(),
        "Loaded configuration"
    );

    // --- Store ---
    let mut state = AppState::open(&config, catalog).await?;
    if let (Some(user), Some(password)) = (&cli.user, &cli.user_password) {
        state.login(user, password).await?;
    }

    let output = commands::run(&mut state, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
