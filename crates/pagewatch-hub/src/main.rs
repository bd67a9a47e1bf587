use pagewatch_hub::{
    config::load_config, logging::init_logging, spawn_hub, ws::router, SseTransport,
};
use std::net::SocketAddr;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = load_config();
    let log_file = init_logging(&config);
    let addr: SocketAddr = match config.addr.parse() {
        Ok(value) => value,
        Err(err) => {
            error!(event = "invalid_addr", error = %err, addr = %config.addr);
            return;
        }
    };
    if !addr.ip().is_loopback() {
        error!(event = "invalid_addr", addr = %config.addr, reason = "not loopback");
        return;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (hub, hub_task) = spawn_hub(
        config.hub_settings(),
        Box::new(SseTransport::new()),
        shutdown_rx,
    );
    let app = router(hub, config.write_timeout);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(value) => value,
        Err(err) => {
            error!(event = "hub_error", error = %err);
            return;
        }
    };

    info!(
        event = "listening",
        addr = %config.addr,
        upstream = %config.upstream_url,
        debug = config.debug,
        log_file = ?log_file
    );

    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        info!(event = "shutdown_requested");
        let _ = shutdown_tx.send(true);
    };

    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    {
        error!(event = "hub_error", error = %err);
    }
    let _ = hub_task.await;
}
