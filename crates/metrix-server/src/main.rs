//! metrix server
//!
//! - Strict YAML config (path from argv[1], default `metrix.yaml`)
//! - Restore snapshot, start periodic flush
//! - Serve until ctrl-c, then drain the store to disk

use tracing_subscriber::{fmt, EnvFilter};

use metrix_server::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "metrix.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen = cfg.server.listen_addr().expect("server.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg).await.expect("metrics store init failed");
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "metrix-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    if let Err(e) = state.repo().close().await {
        tracing::error!(error = %e, "final flush failed");
    }
    tracing::info!("metrix-server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
    }
}
