// # portmapd - Docker port-mapper plugin
//
// A THIN integration layer around `portmap_core::PortMapper`:
// - DO NOT add mapping, DNS or tunnel logic here
// - All mapping logic lives in portmap-core
// - Configuration is via environment variables ONLY
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering the Cloudflare backend
// 4. Serving the plugin protocol on `<plugin_dir>/<driver>.sock`
// 5. Draining in-flight calls on SIGTERM/SIGINT
//
// ## Example
//
// ```bash
// export CLOUDFLARE_ACCOUNT_ID=0123456789abcdef
// export CLOUDFLARE_API_TOKEN=your_token
//
// portmapd
// ```
//
// See `config.rs` for every variable.

mod config;
mod plugin;
mod server;

use anyhow::Result;
use config::Config;
use plugin::PluginState;
use portmap_core::{PortMapper, ProviderRegistry};
use server::{PluginSocket, ShutdownSignals};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// How long in-flight calls may keep running after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum PortmapExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<PortmapExitCode> for ExitCode {
    fn from(code: PortmapExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return PortmapExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return PortmapExitCode::ConfigError.into();
    }

    let log_level = match config.level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return PortmapExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PortmapExitCode::ConfigError.into();
    }

    info!("Starting portmapd");
    info!("Configuration loaded: {:?}", config);

    let mapper = match build_mapper(&config) {
        Ok(mapper) => mapper,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return PortmapExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return PortmapExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config, mapper).await {
            error!("Daemon error: {:#}", e);
            PortmapExitCode::RuntimeError
        } else {
            PortmapExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Register backends and build the mapper
fn build_mapper(config: &Config) -> Result<PortMapper> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare backend");
        portmap_provider_cloudflare::register(&registry);
    }

    let backend = registry.create_backend(&config.provider_config())?;
    Ok(PortMapper::new(backend, config.mapper_config())?)
}

/// Serve the plugin protocol until a shutdown signal arrives
async fn run_daemon(config: Config, mapper: PortMapper) -> Result<()> {
    let signals = ShutdownSignals::install()?;
    let (socket, listener) = PluginSocket::bind(&config.socket_path())?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let router = plugin::build_router(PluginState::new(mapper, cancel_rx));

    info!("Plugin {} listening on {}", config.driver_name, socket.path().display());

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let signal = signals.recv().await;
        info!("Received shutdown signal: {}", signal);
        info!("Draining in-flight calls for up to {:?}", SHUTDOWN_GRACE);

        tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            warn!("Grace period over, cancelling in-flight calls");
            let _ = cancel_tx.send(true);
        });
    });

    server.await?;

    drop(socket);
    info!("portmapd stopped");
    Ok(())
}
