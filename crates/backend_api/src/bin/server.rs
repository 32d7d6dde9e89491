use anyhow::Context;
use backend_api::{init_tracing, run_server, start_refresh_jobs, AppState};
use dashboard_engine::DashboardEngine;
use data_source::HttpDashboardSource;
use refresh::{RefreshBus, RefreshScheduler};
use std::sync::Arc;
use std::{env, path::PathBuf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();
    init_tracing();

    let settings_path = env::args()
        .position(|a| a == "--settings")
        .and_then(|i| env::args().nth(i + 1))
        .or_else(|| env::var("SETTINGS_PATH").ok())
        .map(PathBuf::from);

    let settings = settings_loader::load_effective_settings(settings_path.as_ref())
        .context("load settings")?;
    let engine = DashboardEngine::from_settings(&settings).context("build dashboard engine")?;
    let source = HttpDashboardSource::from_settings(&settings).context("build HTTP client")?;

    println!("Bottled Water Dashboard Server");
    println!("==============================");
    println!(
        "Settings: {}",
        settings_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or("(defaults)".to_string())
    );
    println!("Sales API: {}", settings.api_base_url);
    println!("Heat-map API: {}", settings.heatmap_url());
    println!(
        "Polling: dashboard every {}s, heat map every {}s",
        settings.dashboard_poll_secs, settings.heatmap_poll_secs
    );
    println!("Listening on: {}:{}", settings.host, settings.port);
    println!();

    let state = AppState::new(RefreshBus::default(), settings.default_zoom);
    let mut scheduler = RefreshScheduler::new();
    start_refresh_jobs(
        &mut scheduler,
        &state,
        Arc::new(source),
        Arc::new(engine),
        &settings,
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let served = run_server(state, &settings.host, settings.port, shutdown).await;

    scheduler.shutdown();
    served
}
