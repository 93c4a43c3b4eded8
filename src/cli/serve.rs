//! taskboard serve command implementation
//!
//! Start-up order: lock the data directory, load both documents, fetch the
//! first counter snapshot (fatal on failure), schedule refreshes, then bind
//! and serve until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::board::TaskBoard;
use crate::config::Config;
use crate::counters::CounterCache;
use crate::error::{Error, Result};
use crate::lock::{DataDirLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::refresh::Refresher;
use crate::server::{self, AppState};
use crate::storage::Storage;
use crate::tracker::TrackerClient;

/// Options for `taskboard serve`
pub struct ServeOptions {
    pub config: Config,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_tracker: bool,
}

pub fn run(options: ServeOptions) -> Result<()> {
    let mut config = options.config;
    if let Some(host) = options.host {
        config.server.host = host;
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }
    if options.no_tracker {
        config.tracker.enabled = false;
    }

    let _lock = DataDirLock::acquire(&config.storage.data_dir, DEFAULT_LOCK_TIMEOUT_MS)?;
    let board = Arc::new(TaskBoard::open(Storage::from_config(&config.storage))?);

    super::runtime()?.block_on(serve(config, board))
}

async fn serve(config: Config, board: Arc<TaskBoard>) -> Result<()> {
    let counters = CounterCache::new();

    let refresh_task = if config.tracker.enabled {
        let client = TrackerClient::new(&config.tracker)?;
        let refresher = Arc::new(Refresher::new(
            client,
            counters.clone(),
            config.tracker.retries,
        ));
        refresher.prime().await?;
        let period = Duration::from_secs(config.tracker.refresh_interval_secs);
        Some(Arc::clone(&refresher).spawn(period))
    } else {
        warn!("tracker disabled; bug counters will be unavailable");
        None
    };

    let bind_addr = config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| Error::OperationFailed(format!("bind {bind_addr} failed: {e}")))?;

    let state = AppState::new(board, counters);
    let result = server::serve(listener, state, shutdown_signal()).await;

    if let Some(handle) = refresh_task {
        handle.abort();
    }
    info!("taskboard stopped");
    result
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
