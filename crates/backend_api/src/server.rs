use std::future::Future;
use std::net::SocketAddr;

use crate::{router::create_router, state::AppState};

pub const DEFAULT_LOG_FILTER: &str =
    "backend_api=debug,refresh=info,data_source=info,dashboard_engine=info,tower_http=debug";

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .try_init();
}

/// Run the API server until `shutdown` resolves
pub async fn run_server<S>(state: AppState, host: &str, port: u16, shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("{}:{}", host, port).parse::<SocketAddr>()?;
    tracing::info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
