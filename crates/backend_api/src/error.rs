use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Dashboard not available yet{}", last_error_suffix(.0))]
    DashboardNotReady(Option<String>),

    #[error("Heat map not available yet{}", last_error_suffix(.0))]
    HeatmapNotReady(Option<String>),

    #[error("Invalid zoom level: {0}")]
    InvalidZoom(String),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last refresh failed: {e})"),
        None => String::new(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::DashboardNotReady(_) => StatusCode::NOT_FOUND,
            ApiError::HeatmapNotReady(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidZoom(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::DashboardNotReady(None).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::HeatmapNotReady(None).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::InvalidZoom("abc".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_ready_message_carries_last_error() {
        let err = ApiError::HeatmapNotReady(Some("GET /heatmap returned status 502".into()));
        assert_eq!(
            err.to_string(),
            "Heat map not available yet (last refresh failed: GET /heatmap returned status 502)"
        );
        assert_eq!(
            ApiError::DashboardNotReady(None).to_string(),
            "Dashboard not available yet"
        );
    }
}
