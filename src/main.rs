use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{self, EnvFilter};

use fedifeeder::config::Config;
use fedifeeder::error::{ErrorRecovery, FeederError};
use fedifeeder::mastodon::MastodonClient;
use fedifeeder::scheduler::CycleScheduler;
use fedifeeder::server;
use fedifeeder::status::StatusReporter;
use fedifeeder::sync::bootstrap::FollowBootstrap;
use fedifeeder::sync::{shared_state, ReconciliationCycle};

#[derive(Parser)]
#[command(name = "fedifeeder")]
#[command(about = "Follows every author seen on a remote Mastodon instance's public timelines")]
#[command(version)]
struct Cli {
    /// Path to configuration file (can also be set via FEDIFEEDER_CONFIG env var)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Enable verbose logging (equivalent to --log-level debug)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Get config path from CLI arg or FEDIFEEDER_CONFIG environment variable
    fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var("FEDIFEEDER_CONFIG").ok().map(PathBuf::from))
    }
}

/// Pick the log level from CLI args, then config. Debug mode never logs below debug.
fn resolve_log_level(config: &Config, cli: &Cli) -> Result<String, FeederError> {
    let requested = if cli.verbose {
        "debug".to_string()
    } else if let Some(ref level) = cli.log_level {
        level.to_lowercase()
    } else {
        config
            .logging
            .level
            .as_deref()
            .unwrap_or("info")
            .to_lowercase()
    };

    let level = match requested.as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => {
            return Err(FeederError::InvalidData(format!(
                "Invalid log level: {requested}. Valid levels are: error, warn, info, debug, trace"
            )));
        }
    };

    if config.server.debug && level < Level::DEBUG {
        return Ok("debug".to_string());
    }

    Ok(requested)
}

/// Initialize structured logging
fn init_logging(config: &Config, cli: &Cli) -> Result<(), FeederError> {
    let log_level = resolve_log_level(config, cli)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log_level))
        .map_err(|e| FeederError::InvalidData(format!("Failed to create log filter: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    debug!("Logging initialized with level: {}", log_level);
    Ok(())
}

/// Log an application error and decide whether it ends the process
fn handle_error(error: FeederError) -> Result<(), FeederError> {
    match &error {
        FeederError::Config(_) => {
            error!("Configuration error: {}", error);
            error!("Please check your configuration file and MS_* environment variables");
        }
        FeederError::Bootstrap(_) => {
            error!("{}", error);
            error!("Refusing to start without the current follow list");
        }
        FeederError::Mastodon(_) => {
            error!("Mastodon API error: {}", error);
            if ErrorRecovery::is_recoverable(&error) {
                info!("Mastodon error is recoverable");
            }
        }
        _ => {
            error!("Application error: {}", error);
            debug!("Error details: {:?}", error);
        }
    }

    if ErrorRecovery::should_shutdown(&error) {
        error!("Fatal error encountered, shutting down application");
        return Err(error);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), FeederError> {
    let cli = Cli::parse();

    let config = match Config::load(cli.config_path()) {
        Ok(config) => config,
        Err(e) => {
            // Basic logging so the configuration error is visible
            tracing_subscriber::fmt().init();
            handle_error(FeederError::Config(e))?;
            return Err(FeederError::Shutdown);
        }
    };

    if let Err(e) = init_logging(&config, &cli) {
        eprintln!("Failed to initialize logging: {e}");
        return Err(e);
    }

    info!("Starting fedifeeder v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration file path: {:?}", cli.config_path());
    info!("Source instance: {}", config.source.server);
    info!("Target instance: {}", config.target_url());
    info!(
        "Debug endpoint: {}",
        if config.server.debug {
            "enabled"
        } else {
            "disabled"
        }
    );

    match run_application(config).await {
        Ok(()) => {
            info!("Application shutdown complete");
            Ok(())
        }
        Err(e) => {
            handle_error(e)?;
            Err(FeederError::Shutdown)
        }
    }
}

/// Bootstrap the follow set, then run the scheduler and the status server
/// until a shutdown signal arrives.
async fn run_application(config: Config) -> Result<(), FeederError> {
    info!("Initializing application components");

    let source = MastodonClient::new(config.source_connection())?;
    let target = MastodonClient::new(config.target_connection())?;

    info!("Loading existing follows from {}", target.instance_url());
    let follows = FollowBootstrap::load(&target, &config.target.host).await?;

    let state = shared_state(follows);
    let reporter = StatusReporter::new(state.clone());
    let cycle = ReconciliationCycle::new(source, target, state);

    info!("Starting reconciliation scheduler");
    let scheduler = CycleScheduler::new(cycle, config.sync_interval()).start();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let router = server::create_router(reporter, config.server.debug);
    let served = server::serve(addr, router, shutdown_signal()).await;

    info!("Stopping reconciliation scheduler");
    scheduler.stop().await?;

    served
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        use signal::unix::{signal as unix_signal, SignalKind};

        match (
            unix_signal(SignalKind::terminate()),
            unix_signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, initiating graceful shutdown");
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                    }
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to register signal handlers, falling back to Ctrl+C: {}", e);
            }
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(e) => error!("Failed to listen for Ctrl+C, shutting down: {}", e),
    }
}
