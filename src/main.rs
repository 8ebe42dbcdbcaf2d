use genproxy::FixedWindowLimiter;
use genproxy::api::{AppState, router};
use genproxy::config::Settings;
use genproxy::upstream::PollinationsClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("genproxy=info,tower_http=info")),
        )
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    info!(
        bind = %settings.bind_addr,
        image_api = %settings.upstream.image_base_url,
        text_api = %settings.upstream.text_base_url,
        logo_limit = settings.limits.logo.max_request,
        logo_window_ms = settings.limits.logo.window.as_millis() as u64,
        explain_gated = settings.limits.explain.is_some(),
        trust_proxy_headers = settings.client_ids.trust_proxy_headers,
        "Starting generation proxy"
    );

    let limiter =
        FixedWindowLimiter::in_memory().with_sweep_probability(settings.sweep_probability);
    let backend = PollinationsClient::new(settings.upstream)?;
    let state = AppState::new(Arc::new(limiter), Arc::new(backend), settings.limits)
        .with_client_id_policy(settings.client_ids);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
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
