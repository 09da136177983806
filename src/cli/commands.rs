use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{error, info};

use crate::cli::Args;
use crate::config::{CoinConfig, Config, InstanceConfig};
use crate::mock::{MockBackend, MockUserManager};
use crate::{Listener, Manager};

pub async fn execute(args: Args) -> Result<()> {
    setup_logging(&args)?;

    match args.command {
        crate::cli::Commands::Start { bind } => start_server(args.config, bind).await,
        crate::cli::Commands::Config { file, show } => validate_config(file, show).await,
        crate::cli::Commands::Init { output, force } => init_config(output, force),
    }
}

async fn start_server(config_path: Option<std::path::PathBuf>, bind: Option<String>) -> Result<()> {
    info!("Starting pool frontend");

    let mut config = match config_path {
        Some(path) => Config::load_from_file(path)?,
        None => example_config(),
    };

    if let Some(bind) = bind {
        config.server.bind_address = bind
            .parse::<SocketAddr>()
            .context("invalid bind address")?;
    }

    config.validate()?;
    info!("Configuration validated successfully");

    // The accounting and user services are external; this binary wires the
    // in-memory stand-ins so the frontend can run on its own.
    let users = Arc::new(MockUserManager::new());
    let backends = config
        .coins
        .iter()
        .map(|coin| MockBackend::from_config(coin).into_arc())
        .collect();

    let manager = Arc::new(Manager::new(Arc::new(config), users, backends));
    let listener = Listener::new(manager).await?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = listener.accept().await {
            error!("Server error: {}", e);
        }
    });

    info!("Pool frontend started successfully");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            if let Err(e) = result {
                error!("Server task failed: {}", e);
            }
        }
    }

    info!("Server shutdown completed");
    Ok(())
}

async fn validate_config(file: std::path::PathBuf, show: bool) -> Result<()> {
    info!("Validating configuration file: {}", file.display());

    let config = Config::load_from_file(file)?;
    config.validate()?;

    info!("Configuration is valid");

    if show {
        println!("Effective configuration:");
        println!("{:#?}", config);
    }

    Ok(())
}

fn init_config(output: std::path::PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            output.display()
        );
    }

    let rendered =
        toml::to_string_pretty(&example_config()).context("failed to render configuration")?;
    std::fs::write(&output, rendered)?;

    info!("Wrote example configuration to {}", output.display());
    Ok(())
}

fn example_config() -> Config {
    let mut config = Config::default();
    config.coins = vec![
        CoinConfig {
            name: "BTC".to_string(),
            full_name: "Bitcoin".to_string(),
            address_prefix: "1".to_string(),
            default_payout_threshold: "0.01".to_string(),
        },
        CoinConfig {
            name: "LTC".to_string(),
            full_name: "Litecoin".to_string(),
            address_prefix: "L".to_string(),
            default_payout_threshold: "0.1".to_string(),
        },
    ];
    config.instances = vec![InstanceConfig {
        name: "stratum-main".to_string(),
        kind: "stratum".to_string(),
        protocol: "stratum1".to_string(),
        backends: vec!["BTC".to_string(), "LTC".to_string()],
    }];
    config
}

fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_level = match args.verbose {
        0 => args.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match args.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
