use clap::Parser;
use log::LevelFilter;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::auth::Credential;
use crate::cli::{listen_address, CliArgs};
use crate::registry::{fatal, SharedRegistry, TaskRegistry};

mod auth;
mod cli;
mod executor;
mod registry;
mod routes;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .filter(Some("tower_http"), LevelFilter::Debug)
        .filter(Some("barker_server"), LevelFilter::Debug)
        .parse_default_env()
        .init();

    let CliArgs { auth, port, tasks } = CliArgs::parse();

    log::info!(
        version = env!("CARGO_PKG_VERSION"),
        api_version = barker_api::api::VERSION;
        "Initializing server"
    );

    let registry = match TaskRegistry::load(&tasks).await {
        Ok(registry) => registry,
        Err(e) => fatal(&e),
    };
    log::info!(
        file:debug = registry.file(),
        tasks:debug = registry.names();
        "loaded tasks"
    );
    if registry.is_empty() {
        log::warn!("task file defines no tasks");
    }

    let credential = Credential::new(&auth);
    if credential.is_none() {
        log::warn!("no credential configured, anyone reaching the server can run tasks");
    }

    let router =
        routes::routes(SharedRegistry::new(registry), credential).layer(TraceLayer::new_for_http());

    let addr = listen_address(&port);
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    log::info!(addr:display = addr; "listening to TCP");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::warn!("failed to install SIGINT (ctrl+c) handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("received SIGINT (ctrl+c), shutting down"),
        () = terminate => log::info!("received SIGTERM, shutting down"),
    }
}
