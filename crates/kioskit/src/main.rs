use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use kioskit::{
    AppConfig, ChannelNotifier, Environment, HostApp, HostSettings, LoadTarget, StdioWindow,
    WindowOptions, logging, read_host_messages,
};
use kioskit_core::{
    CoordinatorSettings, GithubReleaseBackend, ReleaseFeed, UpdateCoordinator, UpdateEvents,
};
use kioskit_platform::AppPaths;
use log::{error, info};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const APP_NAME: &str = "kioskit";
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let paths = match AppPaths::new() {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("{APP_NAME}: {error}");
            std::process::exit(1);
        }
    };

    let environment = Environment::from_env();
    let mut config = AppConfig::load(&paths);
    config.apply_env_overrides();

    logging::init_logging(
        &paths,
        &paths.log_file(),
        config.verbose_logging(&environment),
        config.max_log_size_bytes,
    );
    info!(
        "Starting {APP_NAME} {APP_VERSION} ({})",
        if environment.dev_mode {
            "development"
        } else {
            "production"
        }
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

    runtime.block_on(run(paths, config, environment));
    // A blocking stdin read may still be parked.
    runtime.shutdown_timeout(Duration::from_millis(500));
}

async fn run(paths: AppPaths, config: AppConfig, environment: Environment) {
    let shutdown = CancellationToken::new();

    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(format!("{APP_NAME}/{APP_VERSION}"))
        .build()
        .unwrap_or_default();

    let feed = config
        .update_repository
        .clone()
        .map(|repository| ReleaseFeed {
            repository,
            app_name: APP_NAME.to_string(),
            current_version: APP_VERSION.to_string(),
        });

    let (events, event_stream) = UpdateEvents::channel();
    let backend = Arc::new(GithubReleaseBackend::new(
        http_client,
        feed,
        paths.cache_dir.clone(),
        events.clone(),
    ));
    let (notifier, statuses) = ChannelNotifier::channel();
    let coordinator = UpdateCoordinator::new(
        backend,
        Arc::new(notifier),
        CoordinatorSettings {
            dev_mode: environment.dev_mode,
        },
        shutdown.clone(),
    );
    let pump = coordinator.spawn_event_pump(&events, event_stream);

    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_host_messages(
        BufReader::new(tokio::io::stdin()),
        host_tx,
        shutdown.clone(),
    ));

    let mut app = HostApp::new(
        StdioWindow::stdout(WindowOptions::from(&config)),
        coordinator,
        HostSettings {
            app_name: APP_NAME.to_string(),
            app_version: APP_VERSION.to_string(),
            poll_interval: config.check_interval(),
            debug_enabled: config.verbose_logging(&environment),
        },
        shutdown,
    );

    app.start(&LoadTarget::for_environment(&environment, &resources_dir()));
    app.run(host_rx, statuses).await;

    reader.abort();
    pump.abort();
    info!("{APP_NAME} stopped");
}

fn resources_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resources")
}
