use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use reqbind::config::{self, AppState, Config};
use reqbind::server::{create_reusable_listener, start_server_loop, start_signal_handler, SignalHandler};
use reqbind::{logger, StartupError};

fn main() {
    if let Err(e) = run() {
        eprintln!("[FATAL] {e}");
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run() -> Result<(), StartupError> {
    // First CLI argument overrides the config file path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;

    logger::init(&cfg).map_err(StartupError::Log)?;

    // Worker thread count follows the config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(StartupError::Runtime)?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), StartupError> {
    let addr = cfg.get_socket_addr()?;
    let listener =
        create_reusable_listener(addr).map_err(|source| StartupError::Bind { addr, source })?;

    let state = Arc::new(AppState::new(&cfg)?);
    let active_connections = Arc::new(AtomicUsize::new(0));
    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals));

    logger::log_server_start(&addr, &cfg);

    let drain_timeout = Duration::from_secs(cfg.performance.write_timeout);

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    let remaining = local
        .run_until(start_server_loop(
            listener,
            state,
            active_connections,
            Arc::clone(&signals.shutdown),
            drain_timeout,
        ))
        .await;

    logger::log_shutdown_complete(remaining);
    Ok(())
}
