use ebbinghaus_backend::config::Config;
use ebbinghaus_backend::logging::init_tracing;
use ebbinghaus_backend::state::AppState;
use ebbinghaus_backend::{build_router, open_store};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    for warning in &config.warnings {
        tracing::warn!(%warning, "configuration value ignored");
    }

    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, path = %config.sqlite.path.display(), "failed to open plan store");
            std::process::exit(1);
        }
    };

    let addr = config.bind_addr();
    tracing::info!(
        store = store.kind(),
        policy = config.inference_policy.as_str(),
        offsets = ?config.review_offsets.as_slice(),
        "ebbinghaus backend starting"
    );

    let app = build_router(AppState::new(store, config));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "bind listener failed");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "ebbinghaus backend listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
