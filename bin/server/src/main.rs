use std::sync::Arc;
use ticker_agent_server::{AgentHandle, AppConfig, AppState, app};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().expect("failed to load configuration");
    tracing::info!(
        bind_addr = %config.server.bind_addr,
        model = %config.model.model_id,
        "Loaded configuration"
    );

    let addr = config.server.bind_addr.clone();
    let eager_init = config.agent.eager_init;
    let stream = config.stream.clone();
    let state = Arc::new(AppState::new(AgentHandle::from_config(config), stream));

    // A failed build is retried by the first request that needs the agent.
    if eager_init && let Err(report) = state.agent.get().await {
        tracing::warn!(
            error = %report.current_context(),
            "Agent initialization failed; will retry on first request"
        );
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
