use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, state::AppState};

/// Create the main application router with all API endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/heatmap", get(handlers::get_heatmap))
        .route("/api/refresh", post(handlers::request_refresh))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use dashboard_engine::DashboardEngine;
    use models::HeatmapPointRaw;
    use refresh::RefreshBus;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn now() -> chrono::NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 10, 19)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send_get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn seeded_state() -> AppState {
        let state = AppState::new(RefreshBus::default(), 12);
        let engine = DashboardEngine::default();

        let seq = state.dashboard.begin();
        let inputs = dashboard_engine::DashboardInputs {
            kpis: models::KpisPayload {
                ventas_mes: 1_000_000.0,
                ventas_mes_pasado: 800_000.0,
                total_pedidos_mes: 80.0,
                ..Default::default()
            },
            ..Default::default()
        };
        state.dashboard.publish(seq, engine.build_dashboard(&inputs, now())).await;

        let raw: Vec<HeatmapPointRaw> = serde_json::from_value(json!([
            {"lat": -41.87, "lon": -73.82, "total_spent": 16000},
            {"lat": -41.86, "lon": -73.83, "total_spent": "2000"}
        ]))
        .unwrap();
        let seq = state.heatmap.begin();
        state.heatmap.publish(seq, engine.build_heatmap(&raw, 12, now())).await;
        state
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(AppState::new(RefreshBus::default(), 13));
        let response = send_get(app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_dashboard_not_ready_is_404() {
        let app = create_router(AppState::new(RefreshBus::default(), 13));
        let response = send_get(app, "/api/dashboard").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .starts_with("Dashboard not available yet"));
    }

    #[tokio::test]
    async fn test_dashboard_served_with_sequence() {
        let app = create_router(seeded_state().await);
        let response = send_get(app, "/api/dashboard").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[axum::http::header::ETAG], "\"1\"");
        let body = body_json(response).await;
        assert_eq!(body["sequence"], 1);
        assert_eq!(body["last_error"], Value::Null);
        assert_eq!(body["dashboard"]["kpis"]["meta"], 880_000.0);
        assert_eq!(body["dashboard"]["kpis"]["ventas"]["percent_change"], 25.0);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_last_document_with_error() {
        let state = seeded_state().await;
        let seq = state.dashboard.begin();
        state
            .dashboard
            .fail(seq, "GET kpis returned status 502")
            .await;

        let response = send_get(create_router(state), "/api/dashboard").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["sequence"], 1);
        assert_eq!(body["last_error"], "GET kpis returned status 502");
        assert_eq!(body["dashboard"]["kpis"]["meta"], 880_000.0);
    }

    #[tokio::test]
    async fn test_heatmap_rezooms_points() {
        let state = seeded_state().await;

        let response = send_get(create_router(state.clone()), "/api/heatmap").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["heatmap"]["zoom_level"], 12);
        assert_eq!(body["heatmap"]["points"][0]["radius_meters"], 150.0);
        assert_eq!(body["heatmap"]["total_spent"], 18_000.0);

        let response = send_get(create_router(state.clone()), "/api/heatmap?zoom=0").await;
        let body = body_json(response).await;
        assert_eq!(body["heatmap"]["zoom_level"], 0);
        assert_eq!(body["heatmap"]["points"][0]["radius_meters"], 300.0);
        assert_eq!(body["heatmap"]["points"][0]["concentration_tier"], "high");
        assert_eq!(body["heatmap"]["points"][1]["concentration_tier"], "low");

        // the cached document keeps its own zoom
        assert_eq!(state.heatmap.latest().await.unwrap().value.zoom_level, 12);
    }

    #[tokio::test]
    async fn test_heatmap_bad_zoom_is_400() {
        let app = create_router(seeded_state().await);
        let response = send_get(app, "/api/heatmap?zoom=lejos").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid zoom level: lejos");
    }

    #[tokio::test]
    async fn test_refresh_publishes_manual_signal() {
        let state = AppState::new(RefreshBus::default(), 13);
        let mut rx = state.bus.subscribe();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["jobs"], 1);
        assert_eq!(rx.recv().await.unwrap().reason, refresh::RefreshReason::Manual);
    }
}
