use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// Raw collaborator payloads

/// Body of the `/kpis` endpoint. Missing figures default to zero.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct KpisPayload {
	pub ventas_mes: f64,
	pub ventas_mes_pasado: f64,
	pub total_pedidos_mes: f64,
	pub total_pedidos_mes_pasado: f64,
	pub clientes_activos: f64,
	pub clientes_activos_mes_pasado: f64,
	pub litros_vendidos: f64,
	pub litros_vendidos_mes_pasado: f64,
	pub costos_reales: f64,
	pub utilidad: f64,
	pub utilidad_mes_pasado: f64,
	pub iva: f64,
	pub iva_mes_pasado: f64,
	pub ticket_promedio_mes_pasado: f64,
	pub capacidad_utilizada: f64,
}

/// One order as returned by `/pedidos`. `fecha` is `DD-MM-YYYY`; `precio`
/// arrives either as a string or as a number.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PedidoRaw {
	#[serde(default)]
	pub fecha: String,
	#[serde(default)]
	pub precio: Value,
	#[serde(default)]
	pub nombrelocal: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VentaHistorica {
	/// Three-letter English month abbreviation (`Jan`, `Feb`, ...).
	pub name: String,
	#[serde(default)]
	pub ventas: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct VentasTotalesHistoricas {
	pub ventas_totales: f64,
	pub total_pedidos: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HeatmapPointRaw {
	#[serde(default)]
	pub lat: Option<f64>,
	#[serde(default)]
	pub lon: Option<f64>,
	#[serde(default)]
	pub address: String,
	#[serde(default)]
	pub user: String,
	#[serde(default)]
	pub phone: String,
	#[serde(default)]
	pub total_spent: Value,
	#[serde(default)]
	pub ticket_promedio: Value,
	#[serde(default)]
	pub fecha_ultimo_pedido: Option<String>,
}

// Core entities

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TransactionRecord {
	pub date: NaiveDate,
	/// Integer currency units (CLP).
	pub amount: i64,
	pub local_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
	pub current_total: f64,
	pub previous_total: f64,
	pub elapsed_days_current: u32,
	pub days_in_previous_month: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct DerivedKpi {
	pub value: f64,
	pub comparison_value: f64,
	pub percent_change: f64,
	pub is_positive: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendPoint {
	pub label: String,
	pub value: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ConcentrationTier {
	Low,
	LowMedium,
	Medium,
	MediumHigh,
	High,
}

impl ConcentrationTier {
	pub const ALL: [ConcentrationTier; 5] = [
		ConcentrationTier::Low,
		ConcentrationTier::LowMedium,
		ConcentrationTier::Medium,
		ConcentrationTier::MediumHigh,
		ConcentrationTier::High,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ConcentrationTier::Low => "low",
			ConcentrationTier::LowMedium => "low-medium",
			ConcentrationTier::Medium => "medium",
			ConcentrationTier::MediumHigh => "medium-high",
			ConcentrationTier::High => "high",
		}
	}

	/// Map popup label.
	pub fn label(&self) -> &'static str {
		match self {
			ConcentrationTier::Low => "Baja",
			ConcentrationTier::LowMedium => "Baja-Media",
			ConcentrationTier::Medium => "Media",
			ConcentrationTier::MediumHigh => "Media-Alta",
			ConcentrationTier::High => "Alta",
		}
	}

	pub fn color(&self) -> &'static str {
		match self {
			ConcentrationTier::Low => "#00cc00",
			ConcentrationTier::LowMedium => "#99cc00",
			ConcentrationTier::Medium => "#ffcc00",
			ConcentrationTier::MediumHigh => "#ff6600",
			ConcentrationTier::High => "#ff0000",
		}
	}

	pub fn base_radius_unit(&self) -> f64 {
		match self {
			ConcentrationTier::Low => 1.0,
			ConcentrationTier::LowMedium => 1.5,
			ConcentrationTier::Medium => 2.0,
			ConcentrationTier::MediumHigh => 2.5,
			ConcentrationTier::High => 3.0,
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeoPoint {
	pub lat: f64,
	pub lng: f64,
	pub total_spent: f64,
	pub concentration_tier: ConcentrationTier,
	pub color: String,
	pub radius_meters: f64,
	#[serde(default)]
	pub address: String,
	#[serde(default)]
	pub user: String,
	#[serde(default)]
	pub phone: String,
}

// Output models

/// Counters describing how a batch of orders was bucketed. Skipped records
/// are surfaced here instead of disappearing silently.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationReport {
	pub total_records: usize,
	pub current_count: usize,
	pub previous_count: usize,
	pub outside_window: usize,
	pub skipped_bad_date: usize,
	pub skipped_bad_amount: usize,
}

impl AggregationReport {
	pub fn skipped(&self) -> usize {
		self.skipped_bad_date + self.skipped_bad_amount
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DashboardMetadata {
	pub generated_at: String,
	pub reference_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DashboardKpis {
	pub ventas: DerivedKpi,
	/// Month-over-month change with the previous month scaled to the days elapsed so far.
	pub ventas_proyectadas: DerivedKpi,
	pub ventas_semanales: DerivedKpi,
	pub ventas_diarias: DerivedKpi,
	pub ventas_totales_historicas: f64,
	pub pedidos: DerivedKpi,
	pub ticket_promedio: DerivedKpi,
	pub clientes_activos: DerivedKpi,
	pub clientes_inactivos: f64,
	pub litros_vendidos: DerivedKpi,
	pub bidones: DerivedKpi,
	pub iva: DerivedKpi,
	pub costos: DerivedKpi,
	pub utilidad: DerivedKpi,
	pub meta: f64,
	pub progreso_meta: f64,
	pub capacidad_total: f64,
	pub capacidad_utilizada: f64,
}

/// Per point-of-sale totals computed from the order list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocalSummary {
	pub local_name: String,
	pub ventas: DerivedKpi,
	pub bidones: DerivedKpi,
	pub costo_tapas: DerivedKpi,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DashboardOutput {
	pub metadata: DashboardMetadata,
	pub kpis: DashboardKpis,
	pub locales: Vec<LocalSummary>,
	pub trends: BTreeMap<String, Vec<TrendPoint>>,
	pub aggregation: AggregationReport,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HeatmapMetadata {
	pub generated_at: String,
	pub dropped_points: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HeatmapOutput {
	pub metadata: HeatmapMetadata,
	pub zoom_level: i32,
	pub points: Vec<GeoPoint>,
	pub tier_counts: BTreeMap<ConcentrationTier, usize>,
	/// Sum of `total_spent` over the plotted points.
	pub total_spent: f64,
}

// Settings models

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendProfileSettings {
	pub labels: Vec<String>,
	pub weights: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardSettings {
	pub settings_version: u32,
	pub api_base_url: String,
	/// Heat-map service; falls back to `api_base_url` when unset.
	pub heatmap_base_url: Option<String>,
	pub dashboard_poll_secs: u64,
	pub heatmap_poll_secs: u64,
	pub request_timeout_secs: u64,
	pub monthly_capacity_liters: f64,
	pub heatmap_filter_months: u32,
	pub default_zoom: i32,
	pub host: String,
	pub port: u16,
	/// Weights for the per-KPI sparklines.
	pub kpi_trend: Option<TrendProfileSettings>,
	/// Weights for the twelve-month historical total sparkline.
	pub annual_trend: Option<TrendProfileSettings>,
}

impl Default for DashboardSettings {
	fn default() -> Self {
		Self {
			settings_version: 1,
			api_base_url: "http://localhost:8000".to_string(),
			heatmap_base_url: None,
			dashboard_poll_secs: 60,
			heatmap_poll_secs: 600,
			request_timeout_secs: 30,
			monthly_capacity_liters: 30_000.0,
			heatmap_filter_months: 6,
			default_zoom: 13,
			host: "127.0.0.1".to_string(),
			port: 3000,
			kpi_trend: None,
			annual_trend: None,
		}
	}
}

impl DashboardSettings {
	pub fn heatmap_url(&self) -> &str {
		self.heatmap_base_url.as_deref().unwrap_or(&self.api_base_url)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_kpis_payload_defaults_missing_fields() {
		let payload: KpisPayload =
			serde_json::from_str(r#"{"ventas_mes": 1000000, "ventas_mes_pasado": 800000}"#).unwrap();
		assert_eq!(payload.ventas_mes, 1_000_000.0);
		assert_eq!(payload.total_pedidos_mes, 0.0);
		assert_eq!(payload.iva, 0.0);
	}

	#[test]
	fn test_concentration_tier_serializes_kebab_case() {
		let json = serde_json::to_string(&ConcentrationTier::MediumHigh).unwrap();
		assert_eq!(json, "\"medium-high\"");
		let back: ConcentrationTier = serde_json::from_str("\"low-medium\"").unwrap();
		assert_eq!(back, ConcentrationTier::LowMedium);
	}

	#[test]
	fn test_tier_radius_units_increase_with_tier() {
		let units: Vec<f64> = ConcentrationTier::ALL
			.iter()
			.map(|t| t.base_radius_unit())
			.collect();
		assert_eq!(units, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
	}

	#[test]
	fn test_settings_partial_file_keeps_defaults() {
		let settings: DashboardSettings =
			serde_json::from_str(r#"{"api_base_url": "https://api.example.cl", "port": 8080}"#).unwrap();
		assert_eq!(settings.api_base_url, "https://api.example.cl");
		assert_eq!(settings.port, 8080);
		assert_eq!(settings.dashboard_poll_secs, 60);
		assert_eq!(settings.heatmap_poll_secs, 600);
		assert_eq!(settings.heatmap_url(), "https://api.example.cl");
	}

	#[test]
	fn test_pedido_accepts_numeric_or_string_price() {
		let orders: Vec<PedidoRaw> = serde_json::from_str(
			r#"[{"fecha":"05-09-2025","precio":"5000","nombrelocal":"Local"},
			    {"fecha":"06-09-2025","precio":7000,"nombrelocal":"Local"}]"#,
		)
		.unwrap();
		assert_eq!(orders[0].precio, Value::String("5000".to_string()));
		assert_eq!(orders[1].precio, serde_json::json!(7000));
	}
}
