// # vpnsyncd - VPN endpoint sync daemon
//
// The vpnsyncd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the DNS resolver and the controller gateway into the core
// 4. Running the reconciliation schedule
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `VPNSYNC_HOST`: controller host name or address (default "unifi")
// - `VPNSYNC_PORT`: controller port (default 8443)
// - `VPNSYNC_USERNAME`: controller username (default "admin")
// - `VPNSYNC_PASSWORD`: controller password (required)
// - `VPNSYNC_SITE`: site identifier on the controller (default "default")
// - `VPNSYNC_NETWORK`: name of the VPN network to update (required)
// - `VPNSYNC_LOCAL_DNS`: DNS record for the local gateway endpoint
// - `VPNSYNC_PEER_DNS`: DNS record for the peer gateway endpoint
// - `VPNSYNC_INTERVAL`: seconds between lookups (default 60)
// - `VPNSYNC_ONCE`: run a single cycle and exit (default false)
// - `VPNSYNC_VERIFY_TLS`: verify the controller certificate (default false)
// - `VPNSYNC_LOG_LEVEL`: trace|debug|info|warn|error (default info)
//
// ## Secrets from files
//
// Any string value starting with `FILE_` names a file whose trimmed
// contents become the actual value, e.g.
// `VPNSYNC_PASSWORD=FILE_/run/secrets/unifi-password`. An unreadable file
// logs a warning and the raw value is kept.
//
// ## Exit behavior
//
// The process runs until signalled, unless `VPNSYNC_ONCE` is set, in which
// case it performs exactly one cycle and exits 0 regardless of whether that
// cycle reported a (non-fatal) failure.

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use vpnsync_controller_unifi::UnifiGateway;
use vpnsync_core::{ControllerConfig, Reconciler, Scheduler, SyncConfig};
use vpnsync_resolver_dns::DnsNameResolver;

/// Marker prefix for the secrets-from-file indirection
const FILE_PREFIX: &str = "FILE_";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Read an environment variable, applying the file indirection
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().map(resolve_file_indirection)
}

/// Replace a `FILE_<path>` value with the trimmed contents of `<path>`
///
/// Failure to read the file is a recoverable startup condition: the raw
/// value is kept and a warning logged.
fn resolve_file_indirection(value: String) -> String {
    let Some(path) = value.strip_prefix(FILE_PREFIX) else {
        return value;
    };

    if path.is_empty() {
        warn!("no filename supplied after {} marker", FILE_PREFIX);
        return value;
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => contents.trim_end().to_string(),
        Err(e) => {
            warn!("file {} could not be read: {}", path, e);
            value
        }
    }
}

/// Parse a boolean-ish environment value
fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Load the sync configuration from the environment
fn load_config() -> Result<SyncConfig> {
    let port = match env_value("VPNSYNC_PORT") {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("VPNSYNC_PORT is not a valid port: {}", e))?,
        None => 8443,
    };

    let interval_secs = match env_value("VPNSYNC_INTERVAL") {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("VPNSYNC_INTERVAL is not a valid number: {}", e))?,
        None => 60,
    };

    let config = SyncConfig {
        controller: ControllerConfig {
            host: env_value("VPNSYNC_HOST").unwrap_or_else(|| "unifi".to_string()),
            port,
            username: env_value("VPNSYNC_USERNAME").unwrap_or_else(|| "admin".to_string()),
            password: env_value("VPNSYNC_PASSWORD").unwrap_or_default(),
            site: env_value("VPNSYNC_SITE").unwrap_or_else(|| "default".to_string()),
            verify_tls: env_value("VPNSYNC_VERIFY_TLS")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
        },
        network: env_value("VPNSYNC_NETWORK").unwrap_or_default(),
        local_dns: env_value("VPNSYNC_LOCAL_DNS").filter(|v| !v.is_empty()),
        peer_dns: env_value("VPNSYNC_PEER_DNS").filter(|v| !v.is_empty()),
        interval_secs,
        run_once: env_value("VPNSYNC_ONCE")
            .map(|v| parse_bool(&v))
            .unwrap_or(false),
    };

    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    // Initialize tracing first so the configuration pass can warn about
    // unreadable secret files. The log level itself is read directly (no
    // file indirection applies to it).
    let log_level = env::var("VPNSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            eprintln!(
                "VPNSYNC_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                other
            );
            return SyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Load and validate configuration
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    info!("starting vpnsyncd");
    info!(
        network = %config.network,
        controller = %config.controller.host,
        interval = config.interval_secs,
        run_once = config.run_once,
        "configuration loaded"
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("daemon error: {}", e);
            SyncExitCode::RuntimeError
        } else {
            SyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: SyncConfig) -> Result<()> {
    let resolver = DnsNameResolver::from_system_conf()?;
    let gateway = UnifiGateway::from_config(&config.controller);

    let (reconciler, _event_rx) =
        Reconciler::new(Box::new(resolver), Box::new(gateway), &config);
    let scheduler = Scheduler::new(reconciler, &config);

    scheduler.run().await?;

    info!("vpnsyncd stopped");
    Ok(())
}
