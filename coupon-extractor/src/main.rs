use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

mod composer;
mod config;
mod error;
mod ingestion;
mod service;
#[cfg(test)]
mod test_support;

use crate::config::{ConfigStore, TerminalSetup, ensure_config};
use crate::error::{ServiceError, error_chain};
use crate::service::{ConsoleNotifier, CouponService};

/// Environment variable naming the stored configuration file
const CONFIG_PATH_VAR: &str = "COUPON_EXTRACTOR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Exit status when no configuration could be established
const EXIT_CONFIG_MISSING: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("Starting coupon extractor v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var_os(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let store = ConfigStore::new(config_path);

    let mut setup = TerminalSetup::new(io::stdin().lock(), io::stdout());
    let config = match ensure_config(&store, &mut setup) {
        Ok(config) => config,
        Err(ServiceError::ConfigMissing) => {
            println!("Configuration not set. Exiting.");
            return ExitCode::from(EXIT_CONFIG_MISSING);
        }
        Err(e) => {
            let message = error_chain(&e);
            error!(error = %message, "Failed to load configuration");
            eprintln!("{}", message);
            return ExitCode::from(EXIT_CONFIG_MISSING);
        }
    };

    info!(
        source_dir = %config.source_dir.display(),
        destination_dir = %config.destination_dir.display(),
        coupons_per_page = config.images_per_page(),
        merge_pdf = config.merge_pdf,
        "Configuration loaded"
    );

    let notifier = ConsoleNotifier::stdout(config.suppress_messages);
    let service = CouponService::new(config);

    match service.run(&notifier).await {
        Ok(_) => {
            println!("Operation completed");
            ExitCode::SUCCESS
        }
        // Already reported through the notifier
        Err(_) => ExitCode::FAILURE,
    }
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format().with_target(true).compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coupon_extractor=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format).with_writer(io::stderr))
        .with(filter)
        .init();
}
