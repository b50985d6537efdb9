//! UI side of the kioskit bridge.
//!
//! Reads host messages and surface input as JSON lines on stdin and writes
//! host-bound operations to stdout. Logs go to stderr and `ui.log`.

use std::time::Duration;

use kioskit::{AppConfig, Environment, logging};
use kioskit_bridge::UiBridge;
use kioskit_platform::AppPaths;
use kioskit_ui::{UiSession, serve};
use log::{error, info};
use tokio::io::BufReader;
use tokio::sync::mpsc;

const PROCESS_NAME: &str = "kioskit-ui";

fn main() {
    let paths = match AppPaths::new() {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("{PROCESS_NAME}: {error}");
            std::process::exit(1);
        }
    };

    let environment = Environment::from_env();
    let mut config = AppConfig::load(&paths);
    config.apply_env_overrides();

    logging::init_logging(
        &paths,
        &paths.ui_log_file(),
        config.verbose_logging(&environment),
        config.max_log_size_bytes,
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!("Failed to start runtime: {error}");
            std::process::exit(1);
        }
    };

    let served = runtime.block_on(run(&paths, &config));
    // A blocking stdin read may still be parked.
    runtime.shutdown_timeout(Duration::from_millis(500));

    if !served {
        std::process::exit(1);
    }
}

async fn run(paths: &AppPaths, config: &AppConfig) -> bool {
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let session = match UiSession::mount(UiBridge::new(host_tx), config.ui_settings(paths)) {
        Ok(session) => session,
        Err(error) => {
            error!("Failed to mount UI: {error}");
            return false;
        }
    };
    info!(
        "UI mounted, idle after {}s of inactivity",
        config.idle_timeout().as_secs()
    );

    match serve(
        &session,
        host_rx,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
    {
        Ok(()) => {
            info!("Host closed the bridge");
            true
        }
        Err(error) => {
            error!("UI bridge failed: {error}");
            false
        }
    }
}
