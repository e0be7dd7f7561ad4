use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use snipe_core::{cache::DeletionCache, config::Config, status::ActivityMonitor};
use snipe_discord::runtime::DiscordRuntime;

mod health;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    snipe_core::logging::init("snipe")?;

    let cfg = Arc::new(Config::load()?);
    let deletions = Arc::new(DeletionCache::new(cfg.history_capacity));
    let monitor = Arc::new(ActivityMonitor::new(cfg.inactivity_threshold));

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    let runtime = DiscordRuntime::new(cfg.clone(), deletions.clone(), monitor.clone());

    let health = if cfg.health_enabled {
        let state = health::HealthState {
            deletions,
            monitor,
            platform: runtime.stats(),
        };
        let addr = cfg.health_addr;
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = health::serve(addr, state, cancel).await {
                error!("health server failed: {e}");
            }
        }))
    } else {
        None
    };

    info!(
        "starting snipe bot (role {}, prefix {})",
        cfg.snipe_role, cfg.command_prefix
    );
    let result = runtime.run(cancel.clone()).await;

    // Gateway gone (shutdown or fatal); take the rest down with it.
    cancel.cancel();
    if let Some(handle) = health {
        let _ = handle.await;
    }

    result
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
    cancel.cancel();
}
