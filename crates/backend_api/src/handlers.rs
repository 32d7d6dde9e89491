use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use dashboard_engine::geo;
use models::{DashboardOutput, HeatmapOutput};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, state::AppState, Result};

/// Highest zoom level the map tiles are served at.
pub const MAX_MAP_ZOOM: i32 = 22;

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "bottled-water-dashboard-api"
    }))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub sequence: u64,
    /// Set when the most recent refresh failed; the document is then the last good one.
    pub last_error: Option<String>,
    pub dashboard: DashboardOutput,
}

/// GET /api/dashboard
pub async fn get_dashboard(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let snapshot = state.dashboard.snapshot().await;
    let status = snapshot.status;
    let latest = snapshot
        .latest
        .ok_or_else(|| ApiError::DashboardNotReady(status.last_error.clone()))?;

    let mut headers = HeaderMap::new();
    let etag = format!("\"{}\"", latest.sequence);
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let body = DashboardResponse {
        sequence: latest.sequence,
        last_error: status.last_error,
        dashboard: (*latest.value).clone(),
    };
    Ok((StatusCode::OK, headers, Json(body)))
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    /// Kept as text so a malformed value maps to our own 400 body.
    pub zoom: Option<String>,
}

pub fn parse_zoom(raw: Option<&str>, default_zoom: i32) -> Result<i32> {
    let Some(raw) = raw else {
        return Ok(default_zoom);
    };
    let zoom: i32 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidZoom(raw.to_string()))?;
    if !(0..=MAX_MAP_ZOOM).contains(&zoom) {
        return Err(ApiError::InvalidZoom(raw.to_string()));
    }
    Ok(zoom)
}

#[derive(Debug, Serialize)]
pub struct HeatmapResponse {
    pub sequence: u64,
    pub last_error: Option<String>,
    pub heatmap: HeatmapOutput,
}

/// GET /api/heatmap?zoom=N
/// Radii are recomputed for the requested zoom; the cached points are untouched.
pub async fn get_heatmap(
    State(state): State<AppState>,
    Query(query): Query<HeatmapQuery>,
) -> Result<impl IntoResponse> {
    let zoom = parse_zoom(query.zoom.as_deref(), state.default_zoom)?;
    let snapshot = state.heatmap.snapshot().await;
    let status = snapshot.status;
    let latest = snapshot
        .latest
        .ok_or_else(|| ApiError::HeatmapNotReady(status.last_error.clone()))?;

    let mut heatmap = (*latest.value).clone();
    if heatmap.zoom_level != zoom {
        geo::apply_zoom(&mut heatmap.points, zoom);
        heatmap.zoom_level = zoom;
    }

    Ok(Json(HeatmapResponse {
        sequence: latest.sequence,
        last_error: status.last_error,
        heatmap,
    }))
}

/// POST /api/refresh
/// Asks every refresh job for an immediate pass.
pub async fn request_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let jobs = state.bus.request_refresh();
    tracing::info!(jobs, "Manual refresh requested");
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "refresh requested",
            "jobs": jobs
        })),
    )
}
