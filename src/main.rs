mod console;
mod routes;
mod services;

use launcher::{download::ReqwestFetcher, java, runner::ServerRunner};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let server_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let runtime = std::env::var("LAUNCHER_JAVA").unwrap_or_else(|_| java::DEFAULT_RUNTIME.to_string());

    let state = services::AppState::load(
        &server_dir,
        ServerRunner::with_runtime(runtime),
        Arc::new(ReqwestFetcher::new()),
    )
    .await
    .expect("failed to load server profile");

    if let Ok(addr) = std::env::var("LAUNCHER_HTTP_ADDR") {
        let addr: SocketAddr = addr.parse().expect("invalid LAUNCHER_HTTP_ADDR");
        let app = routes::build_router(state.clone());
        info!("control api listening on http://{addr}");
        tokio::spawn(async move {
            if let Err(err) = axum::Server::bind(&addr).serve(app.into_make_service()).await {
                error!(error = %err, "control api stopped");
            }
        });
    }

    console::run(state).await;
}
