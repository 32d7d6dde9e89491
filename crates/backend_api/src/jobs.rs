//! The two refresh jobs: dashboard KPIs and heat-map points.

use std::sync::Arc;
use std::time::Duration;

use dashboard_engine::{geo::HeatmapWindow, now_local, DashboardEngine};
use data_source::{fetch_dashboard_inputs, DashboardSource};
use models::DashboardSettings;
use refresh::RefreshScheduler;

use crate::state::AppState;

pub const DASHBOARD_JOB: &str = "dashboard";
pub const HEATMAP_JOB: &str = "heatmap";

/// One dashboard pass: fetch, derive, publish. A failure keeps the previous document.
pub async fn dashboard_pass(
    source: &dyn DashboardSource,
    engine: &DashboardEngine,
    state: &AppState,
) {
    let sequence = state.dashboard.begin();
    match fetch_dashboard_inputs(source).await {
        Ok(inputs) => {
            let output = engine.build_dashboard(&inputs, now_local());
            if state.dashboard.publish(sequence, output).await {
                tracing::info!(sequence, orders = inputs.pedidos.len(), "Dashboard refreshed");
            }
        }
        Err(e) => {
            state.dashboard.fail(sequence, e.to_string()).await;
        }
    }
}

pub async fn heatmap_pass(
    source: &dyn DashboardSource,
    engine: &DashboardEngine,
    state: &AppState,
    filter_months: u32,
) {
    let sequence = state.heatmap.begin();
    let now = now_local();
    let window = HeatmapWindow::from_filter_months(filter_months, now.date());
    match source.fetch_heatmap(window).await {
        Ok(raw) => {
            let output = engine.build_heatmap(&raw, state.default_zoom, now);
            let points = output.points.len();
            if state.heatmap.publish(sequence, output).await {
                tracing::info!(sequence, points, "Heat map refreshed");
            }
        }
        Err(e) => {
            state.heatmap.fail(sequence, e.to_string()).await;
        }
    }
}

/// Registers both jobs on `scheduler` with the poll intervals from `settings`.
pub fn start_refresh_jobs(
    scheduler: &mut RefreshScheduler,
    state: &AppState,
    source: Arc<dyn DashboardSource>,
    engine: Arc<DashboardEngine>,
    settings: &DashboardSettings,
) {
    let bus = state.bus.clone();
    {
        let (source, engine, state) = (source.clone(), engine.clone(), state.clone());
        scheduler.spawn_job(
            DASHBOARD_JOB,
            Duration::from_secs(settings.dashboard_poll_secs),
            &bus,
            move |_| {
                let (source, engine, state) = (source.clone(), engine.clone(), state.clone());
                async move { dashboard_pass(source.as_ref(), &engine, &state).await }
            },
        );
    }

    let filter_months = settings.heatmap_filter_months;
    let state = state.clone();
    scheduler.spawn_job(
        HEATMAP_JOB,
        Duration::from_secs(settings.heatmap_poll_secs),
        &bus,
        move |_| {
            let (source, engine, state) = (source.clone(), engine.clone(), state.clone());
            async move { heatmap_pass(source.as_ref(), &engine, &state, filter_months).await }
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use data_source::SourceError;
    use models::{
        HeatmapPointRaw, KpisPayload, PedidoRaw, VentaHistorica, VentasTotalesHistoricas,
    };
    use refresh::RefreshBus;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Canned backend; `failing` makes every call return a 503.
    #[derive(Default)]
    struct FakeSource {
        failing: AtomicBool,
    }

    impl FakeSource {
        fn check(&self, endpoint: &str) -> data_source::Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SourceError::Status {
                    endpoint: endpoint.to_string(),
                    status: 503,
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DashboardSource for FakeSource {
        async fn fetch_kpis(&self) -> data_source::Result<KpisPayload> {
            self.check("/kpis")?;
            Ok(KpisPayload {
                ventas_mes: 1_000_000.0,
                ventas_mes_pasado: 800_000.0,
                total_pedidos_mes: 80.0,
                ..Default::default()
            })
        }

        async fn fetch_pedidos(&self) -> data_source::Result<Vec<PedidoRaw>> {
            self.check("/pedidos")?;
            Ok(Vec::new())
        }

        async fn fetch_ventas_historicas(&self) -> data_source::Result<Vec<VentaHistorica>> {
            self.check("/ventas-historicas")?;
            Ok(Vec::new())
        }

        async fn fetch_ventas_totales(&self) -> data_source::Result<VentasTotalesHistoricas> {
            self.check("/ventas-totales-historicas")?;
            Ok(VentasTotalesHistoricas::default())
        }

        async fn fetch_heatmap(
            &self,
            _window: Option<HeatmapWindow>,
        ) -> data_source::Result<Vec<HeatmapPointRaw>> {
            self.check("/heatmap")?;
            Ok(vec![HeatmapPointRaw {
                lat: Some(-41.87),
                lon: Some(-73.82),
                address: "Pudeto 123".into(),
                user: "cliente".into(),
                phone: String::new(),
                total_spent: json!(16000),
                ticket_promedio: json!(8000),
                fecha_ultimo_pedido: None,
            }])
        }
    }

    #[tokio::test]
    async fn test_dashboard_pass_publishes() {
        let state = AppState::new(RefreshBus::default(), 13);
        dashboard_pass(&FakeSource::default(), &DashboardEngine::default(), &state).await;
        let latest = state.dashboard.latest().await.unwrap();
        assert_eq!(latest.sequence, 1);
        assert_eq!(latest.value.kpis.ticket_promedio.value, 12_500.0);
    }

    #[tokio::test]
    async fn test_failed_pass_keeps_previous_document() {
        let state = AppState::new(RefreshBus::default(), 13);
        let source = FakeSource::default();
        let engine = DashboardEngine::default();
        dashboard_pass(&source, &engine, &state).await;

        source.failing.store(true, Ordering::SeqCst);
        dashboard_pass(&source, &engine, &state).await;

        let status = state.dashboard.status().await;
        assert_eq!(status.sequence, 1);
        assert!(status.last_error.unwrap().contains("503"));
        assert!(state.dashboard.latest().await.is_some());
    }

    #[tokio::test]
    async fn test_heatmap_pass_uses_default_zoom() {
        let state = AppState::new(RefreshBus::default(), 12);
        heatmap_pass(&FakeSource::default(), &DashboardEngine::default(), &state, 6).await;
        let latest = state.heatmap.latest().await.unwrap();
        assert_eq!(latest.value.zoom_level, 12);
        assert_eq!(latest.value.points[0].radius_meters, 150.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_runs_both_jobs_on_start() {
        let state = AppState::new(RefreshBus::default(), 13);
        let mut scheduler = RefreshScheduler::new();
        start_refresh_jobs(
            &mut scheduler,
            &state,
            Arc::new(FakeSource::default()),
            Arc::new(DashboardEngine::default()),
            &DashboardSettings::default(),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(state.dashboard.latest().await.is_some());
        assert!(state.heatmap.latest().await.is_some());

        state.bus.request_refresh();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(state.dashboard.status().await.sequence, 2);
        assert_eq!(state.heatmap.status().await.sequence, 2);
        scheduler.shutdown();
    }
}
