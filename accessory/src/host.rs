use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use heater_cooler_accessory::{
    notify::ChangeNotifier,
    persistence::FileKeyValueStore,
    server::{router, HttpState},
    HeaterCoolerApp,
};
use heater_cooler_common::{RuntimeConfig, ServerState};
use tokio::{net::TcpListener, sync::broadcast::error::RecvError};
use tracing::{info, warn};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_dir = std::env::var("HEATER_COOLER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.heater-cooler"));

    let runtime = load_runtime_config(&data_dir.join("config.json"))
        .await
        .unwrap_or_else(|err| {
            warn!("failed to load runtime config: {err:#}");
            RuntimeConfig::default()
        });

    let kv = Arc::new(FileKeyValueStore::new(data_dir.join("kv.json")));
    let mut app =
        HeaterCoolerApp::create(runtime.accessory.clone(), runtime.info.clone(), kv).await;
    app.start();
    spawn_change_log_loop(app.notifier());

    let state = HttpState {
        gateway: app.gateway(),
        status: app.status(),
    };

    let port = std::env::var("HEATER_COOLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.http_port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind accessory server at {addr}"))?;

    app.handle_server_state(ServerState::Running);
    info!("{} listening on http://{addr}", runtime.info.name);

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    app.handle_server_state(ServerState::Stopping);
    let snapshot = app.release().await;
    info!(
        "accessory released at {:.1} C ({})",
        snapshot.current_temp_c,
        snapshot.current_state.as_str()
    );

    served.context("accessory server failed")?;
    Ok(())
}

async fn load_runtime_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err.into()),
    }
}

fn spawn_change_log_loop(notifier: &ChangeNotifier) {
    let mut rx = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => info!("{} changed: {:?}", event.field, event.value),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("change log lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
