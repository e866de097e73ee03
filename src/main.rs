use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use feedmerge::sources::prepare_sources;
use feedmerge::{ArticleStore, Config, Database, Pipeline, Poller, PollerHandle, SqlArticleStore};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = feedmerge::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedmerge::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("feedmerge {}", env!("CARGO_PKG_VERSION"));

    let sources = prepare_sources(&config.feeds.sources_file, &config.feeds.sources);
    info!("Polling {} source(s)", sources.len());

    let durable = open_durable_store(&config).await;

    let mut pipeline = match Pipeline::from_config(&config, sources, durable) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to set up pipeline: {}", e);
            std::process::exit(1);
        }
    };
    let restored = pipeline.restore().await;
    info!("Restored {} article(s) from snapshot", restored);

    let (poller, handle) = Poller::new(pipeline, &config.poller);
    let task = poller.spawn();

    tokio::select! {
        _ = read_commands(handle.clone()) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    if let Err(e) = handle.shutdown().await {
        warn!("{}", e);
    }
    if let Err(e) = task.await {
        error!("Poller task failed: {}", e);
    }
}

/// Connect to the durable store, or `None` if it is disabled.
///
/// An unreachable database is not fatal; upserts fail until it is back.
async fn open_durable_store(config: &Config) -> Option<Arc<dyn ArticleStore>> {
    if !config.database.enabled {
        info!("Durable store disabled");
        return None;
    }

    let db = match Database::connect_lazy(&config.database) {
        Ok(db) => db,
        Err(e) => {
            error!("Invalid database configuration: {}", e);
            return None;
        }
    };

    let store = SqlArticleStore::new(db, config.database.batch_size);
    if let Err(e) = store.ensure_schema().await {
        warn!("Durable store not ready, will retry on upsert: {}", e);
    }
    Some(Arc::new(store))
}

/// Read operator commands from stdin until `quit`.
///
/// Without a terminal (stdin closed) this waits forever, leaving the timer
/// and Ctrl-C in charge.
async fn read_commands(handle: PollerHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Commands: <enter>/poll, upsert-all, status, quit");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => return std::future::pending().await,
        };
        let result = match line.trim() {
            "" | "poll" => handle.poll_now().await,
            "upsert-all" => handle.upsert_all().await,
            "status" => {
                let status = handle.status();
                info!("[{}] {}", status.state, status.message());
                if let Some(upsert) = status.last_upsert {
                    info!("{}", upsert);
                }
                Ok(())
            }
            "quit" | "exit" => return,
            other => {
                warn!("Unknown command: {}", other);
                Ok(())
            }
        };
        if let Err(e) = result {
            error!("{}", e);
            return;
        }
    }
}
