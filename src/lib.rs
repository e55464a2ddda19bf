pub mod cli;
pub mod clients;
pub mod config;
pub mod domain;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod store;

use clap::{CommandFactory, Parser};
use tokio::signal;

use cli::{Cli, Commands};
pub use config::Config;
use scheduler::Scheduler;
use services::TaskScope;
use state::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run(config: Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let (plain_layer, json_layer) = if config.general.log_json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if matches!(command, Commands::Init) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists.");
        }
        return Ok(());
    }

    let state = AppState::new(config)?;

    match command {
        Commands::Register {
            email,
            name,
            password,
        } => cli::cmd_register(&state, &email, &name, password).await,
        Commands::Login { email, password } => cli::cmd_login(&state, &email, password).await,
        Commands::Logout => cli::cmd_logout(&state).await,
        Commands::Whoami => cli::cmd_whoami(&state).await,
        Commands::Add(args) => cli::cmd_add(&state, &args).await,
        Commands::Remove { source_id } => cli::cmd_remove(&state, &source_id).await,
        Commands::RemoveEntry { collection_id } => {
            cli::cmd_remove_entry(&state, &collection_id).await
        }
        Commands::Watch {
            media_id,
            unwatched,
        } => cli::cmd_watch(&state, &media_id, !unwatched).await,
        Commands::List => cli::cmd_list(&state).await,
        Commands::Media { media_id } => cli::cmd_media(&state, &media_id).await,
        Commands::Collected { source_id } => cli::cmd_collected(&state, &source_id).await,
        Commands::Reconcile { dry_run } => cli::cmd_reconcile(&state, dry_run).await,
        Commands::Daemon => run_daemon(state).await,
        Commands::Init => Ok(()),
    }
}

async fn run_daemon(state: AppState) -> anyhow::Result<()> {
    info!(
        "DramaTracker v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    match state.auth.current_user_id().await {
        Ok(Some(user_id)) => info!(user_id = %user_id, "Session active"),
        Ok(None) => info!("No active session, running reconciliation only"),
        Err(e) => error!(error = %e, "Failed to check session"),
    }

    let scheduler = Scheduler::new(state.reconciler.clone(), state.config.scheduler.clone());

    let mut tasks = TaskScope::new("daemon");
    let background = scheduler.clone();
    tasks.spawn(async move {
        if let Err(e) = background.start().await {
            error!("Scheduler error: {}", e);
        }
    });

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;
    tasks.cancel_all();
    info!("Daemon stopped");

    Ok(())
}
