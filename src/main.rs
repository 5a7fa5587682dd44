use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use dotenvy::dotenv;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    cli::{Cli, Commands, MigrateCommand},
    config::app_config::{AppConfig, LogConfig, LogFormat, Runtime},
    models::{
        app_state::AppState,
        error::{StartupError, error_chain},
        migration::MigrationReport,
    },
    service::migrator::MigrationRunner,
};

mod api;
mod cli;
mod config;
mod db;
mod migrations;
mod models;
mod service;
#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize .env
    dotenv().ok();

    let cli = Cli::parse();

    // Configuration problems are fatal before any connection is attempted
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LogConfig::default());
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.log);
    debug!("Loaded {} config: {:?}", Runtime::from_env(), config);

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, state).await,
        Commands::Migrate { action } => migrate(state.get_migrator(), action).await,
    };

    if let Err(e) = result {
        error!("{}", error_chain(&e));
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);

    match log.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

async fn serve(config: &AppConfig, state: Arc<AppState>) -> Result<(), StartupError> {
    if config.migration.on_startup {
        info!(
            "Running migrations before serving ({})",
            state.get_migrator().policy()
        );
        state.get_migrator().run_with_policy().await?;
    }

    let app = api::app(state.clone());

    // Initialize webserver
    let listener =
        tokio::net::TcpListener::bind((config.server.address.as_str(), config.server.port))
            .await?;

    info!("Server listening on address: {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, closing database sessions");
    state.get_sessions().close().await;

    if config.migration.on_shutdown {
        info!("Running migrations after shutdown");
        state.get_migrator().run_with_policy().await?;
    }

    Ok(())
}

async fn migrate(runner: &MigrationRunner, action: MigrateCommand) -> Result<(), StartupError> {
    match action {
        MigrateCommand::Up { target } => print_report(&runner.upgrade(&target).await?),
        MigrateCommand::Down { target } => print_report(&runner.downgrade(&target).await?),
        MigrateCommand::Current => {
            println!("{}", runner.current().await?.unwrap_or_else(|| "base".into()));
        }
        MigrateCommand::History => {
            for status in runner.history().await? {
                let marker = if status.current {
                    "(current)"
                } else if status.applied {
                    "(applied)"
                } else {
                    ""
                };
                println!(
                    "{} -> {} {} {}",
                    status.down_revision.as_deref().unwrap_or("<base>"),
                    status.id,
                    status.description,
                    marker
                );
            }
        }
    }

    Ok(())
}

fn print_report(report: &MigrationReport) {
    if report.is_noop() {
        println!("Nothing to {}", report.direction);
        return;
    }

    println!(
        "{}d {} -> {} ({})",
        report.direction,
        report.from.as_deref().unwrap_or("base"),
        report.to.as_deref().unwrap_or("base"),
        report.applied.join(", ")
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
