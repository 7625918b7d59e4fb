// src/main.rs
use cast_receiver::{
    api::{self, AppState},
    config::Config,
    host,
    receiver::Receiver,
    transport::{ws::WsHub, TransportEvent},
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let listener = TcpListener::bind(config.addr).await?;

    let (hub, events) = WsHub::new();
    let mut receiver = Receiver::new(hub.transport(), config.receiver_options());
    let views = receiver.subscribe();
    receiver.start()?;
    let session = tokio::spawn(host::run_session(receiver, events));

    let app = api::router(AppState { hub: hub.clone(), views }, config.request_timeout);

    info!("receiver listening on {}", config.addr);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if hub.notify(TransportEvent::Shutdown).is_err() {
        error!("session loop already gone");
    }
    if let Err(e) = session.await {
        error!("session task failed: {e}");
    }
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
