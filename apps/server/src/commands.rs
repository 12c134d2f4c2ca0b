//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use onboarding_core::Onboarder;
use onboarding_idmap::HubKey;
use onboarding_shared::{
    ASSET_ENTITY_TYPE, AppConfig, CONFIG_FILE_NAME, HubIdentity, init_config, load_config,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::{AppState, build_router};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Onboarding service for the permissions hub.
#[derive(Parser)]
#[command(
    name = "onboarding",
    version,
    about = "Transform asset data into RDF, mint hub keys, and store it in a repository.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the config file.
    #[arg(long, env = "ONBOARDING_CONFIG", default_value = CONFIG_FILE_NAME, global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the HTTP service.
    Serve {
        /// Override the configured listen port.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the hub key this hub would mint for an entity.
    HubKey {
        /// Repository the entity lives in.
        #[arg(long)]
        repository: String,

        /// Entity id as assigned by the transformation service.
        #[arg(long)]
        entity_id: String,

        #[arg(long, default_value = ASSET_ENTITY_TYPE)]
        entity_type: String,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "onboarding=info,tower_http=info",
        1 => "onboarding=debug,tower_http=debug",
        _ => "onboarding=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { port } => cmd_serve(&cli.config, port).await,
        Command::HubKey {
            repository,
            entity_id,
            entity_type,
        } => cmd_hub_key(&cli.config, &repository, &entity_type, &entity_id),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&cli.config),
            ConfigAction::Show => cmd_config_show(&cli.config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(config_path: &std::path::Path, port: Option<u16>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let onboarder = Onboarder::from_config(&config)?;
    let router = build_router(AppState::new(onboarder, &config));

    let listener = TcpListener::bind((config.server.bind.as_str(), config.server.port))
        .await
        .map_err(|e| {
            eyre!(
                "cannot listen on {}:{}: {e}",
                config.server.bind,
                config.server.port
            )
        })?;
    let addr = listener.local_addr()?;

    info!(
        %addr,
        hub_id = %config.hub.hub_id,
        max_post_body_size = config.limits.max_post_body_size,
        "onboarding service listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("onboarding service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for shutdown signal");
    }
}

fn cmd_hub_key(
    config_path: &std::path::Path,
    repository_id: &str,
    entity_type: &str,
    entity_id: &str,
) -> Result<()> {
    let config = load_config(config_path)?;
    let identity = HubIdentity::from(&config);
    println!(
        "{}",
        HubKey::new(&identity, repository_id, entity_type, entity_id)
    );
    Ok(())
}

fn cmd_config_init(path: &std::path::Path) -> Result<()> {
    init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: &std::path::Path) -> Result<()> {
    let config: AppConfig = load_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
