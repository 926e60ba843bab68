use news_grouper::{api, config, grouping::GroupingService, logging};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Ports tried in order when `SERVER_PORT` is unset.
const FALLBACK_PORTS: std::ops::RangeInclusive<u16> = 4100..=4199;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();
    let service = GroupingService::from_config(config::get_config())
        .expect("Failed to initialize grouping service");
    let groupers: Vec<String> = service
        .list_groupers()
        .into_iter()
        .map(|grouper| grouper.name)
        .collect();
    let app = api::create_router(Arc::new(service));

    let (listener, port) = bind_listener().await.expect("Failed to bind listener");
    tracing::info!(port, groupers = ?groupers, "News grouper listening on http://0.0.0.0:{port}");
    if let Err(error) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(%error, "Server terminated");
    }
    tracing::info!("News grouper stopped");
}

/// Resolve when the process receives SIGTERM or SIGINT.
///
/// In-flight grouping requests finish before the server exits; their provider calls are not
/// cut short.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(error) => {
                tracing::warn!(%error, "Cannot listen for SIGTERM; waiting for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Shutdown requested; draining open requests");
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    if let Some(port) = config::get_config().server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    for port in FALLBACK_PORTS {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port taken; trying the next one");
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        format!(
            "no free port between {} and {}; set SERVER_PORT",
            FALLBACK_PORTS.start(),
            FALLBACK_PORTS.end()
        ),
    ))
}
