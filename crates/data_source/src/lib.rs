//! HTTP access to the sales backend and the heat-map service.
//!
//! [`DashboardSource`] is the seam the refresh jobs depend on; the server
//! wires in [`HttpDashboardSource`], tests can substitute canned payloads.

use std::time::Duration;

use async_trait::async_trait;
use dashboard_engine::{geo::HeatmapWindow, DashboardInputs};
use models::{
    DashboardSettings, HeatmapPointRaw, KpisPayload, PedidoRaw, VentaHistorica,
    VentasTotalesHistoricas,
};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const KPIS_PATH: &str = "kpis";
pub const PEDIDOS_PATH: &str = "pedidos";
pub const HISTORY_PATH: &str = "ventas-historicas";
pub const TOTALS_PATH: &str = "ventas-totales-historicas";
pub const HEATMAP_PATH: &str = "heatmap";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("GET {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("GET {endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("GET {endpoint} returned malformed JSON: {source}")]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },
}

impl SourceError {
    /// Endpoint path the failure belongs to, when there is one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            SourceError::Request { endpoint, .. }
            | SourceError::Status { endpoint, .. }
            | SourceError::Decode { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;

#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn fetch_kpis(&self) -> Result<KpisPayload>;
    async fn fetch_pedidos(&self) -> Result<Vec<PedidoRaw>>;
    async fn fetch_ventas_historicas(&self) -> Result<Vec<VentaHistorica>>;
    async fn fetch_ventas_totales(&self) -> Result<VentasTotalesHistoricas>;
    /// `None` asks for every record; otherwise only the given month/year.
    async fn fetch_heatmap(&self, window: Option<HeatmapWindow>) -> Result<Vec<HeatmapPointRaw>>;
}

/// Fetches the four dashboard payloads concurrently. Any failure fails the pass.
pub async fn fetch_dashboard_inputs(source: &dyn DashboardSource) -> Result<DashboardInputs> {
    let (kpis, pedidos, ventas_historicas, ventas_totales) = tokio::try_join!(
        source.fetch_kpis(),
        source.fetch_pedidos(),
        source.fetch_ventas_historicas(),
        source.fetch_ventas_totales(),
    )?;
    Ok(DashboardInputs {
        kpis,
        pedidos,
        ventas_historicas,
        ventas_totales,
    })
}

fn parse_base_url(raw: &str) -> Result<Url> {
    // Url::join drops the last path segment unless the base ends with '/'
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| SourceError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SourceError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct HttpDashboardSource {
    http: Client,
    api_base: Url,
    heatmap_base: Url,
}

impl HttpDashboardSource {
    pub fn new(api_base_url: &str, heatmap_base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SourceError::Client)?;
        Ok(Self {
            http,
            api_base: parse_base_url(api_base_url)?,
            heatmap_base: parse_base_url(heatmap_base_url)?,
        })
    }

    pub fn from_settings(settings: &DashboardSettings) -> Result<Self> {
        Self::new(
            &settings.api_base_url,
            settings.heatmap_url(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        base: &Url,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = base.join(path).map_err(|e| SourceError::InvalidUrl {
            url: format!("{base}{path}"),
            reason: e.to_string(),
        })?;
        let endpoint = format!("/{path}");
        tracing::debug!(%url, "Fetching");

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| SourceError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| SourceError::Decode { endpoint, source })
    }
}

#[async_trait]
impl DashboardSource for HttpDashboardSource {
    async fn fetch_kpis(&self) -> Result<KpisPayload> {
        self.get_json(&self.api_base, KPIS_PATH, &[]).await
    }

    async fn fetch_pedidos(&self) -> Result<Vec<PedidoRaw>> {
        self.get_json(&self.api_base, PEDIDOS_PATH, &[]).await
    }

    async fn fetch_ventas_historicas(&self) -> Result<Vec<VentaHistorica>> {
        self.get_json(&self.api_base, HISTORY_PATH, &[]).await
    }

    async fn fetch_ventas_totales(&self) -> Result<VentasTotalesHistoricas> {
        self.get_json(&self.api_base, TOTALS_PATH, &[]).await
    }

    async fn fetch_heatmap(&self, window: Option<HeatmapWindow>) -> Result<Vec<HeatmapPointRaw>> {
        let query = match window {
            Some(w) => vec![("mes", w.mes.to_string()), ("anio", w.anio.to_string())],
            None => Vec::new(),
        };
        self.get_json(&self.heatmap_base, HEATMAP_PATH, &query).await
    }
}
