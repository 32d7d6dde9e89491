use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use models::{
    DashboardKpis, DashboardMetadata, DashboardOutput, DashboardSettings, HeatmapMetadata,
    HeatmapOutput, HeatmapPointRaw, KpisPayload, LocalSummary, PedidoRaw, PeriodTotals, TrendPoint,
    VentaHistorica, VentasTotalesHistoricas,
};

use crate::geo;
use crate::metrics::{self, compare, compare_lower_is_better};
use crate::period::{self, PeriodWindow};
use crate::trend::{self, TrendError, TrendProfile};

/// Months shown in the real sales history sparkline.
const HISTORY_TREND_MONTHS: usize = 6;
const UNNAMED_LOCAL: &str = "Sin local";

/// Everything one refresh cycle fetched from the collaborators.
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub kpis: KpisPayload,
    pub pedidos: Vec<PedidoRaw>,
    pub ventas_historicas: Vec<VentaHistorica>,
    pub ventas_totales: VentasTotalesHistoricas,
}

#[derive(Debug, Clone)]
pub struct DashboardEngine {
    kpi_trend: TrendProfile,
    annual_trend: TrendProfile,
    capacity_liters: f64,
}

impl Default for DashboardEngine {
    fn default() -> Self {
        Self {
            kpi_trend: TrendProfile::half_year(),
            annual_trend: TrendProfile::annual(),
            capacity_liters: DashboardSettings::default().monthly_capacity_liters,
        }
    }
}

impl DashboardEngine {
    pub fn new(kpi_trend: TrendProfile, annual_trend: TrendProfile, capacity_liters: f64) -> Self {
        Self {
            kpi_trend,
            annual_trend,
            capacity_liters,
        }
    }

    pub fn from_settings(settings: &DashboardSettings) -> Result<Self, TrendError> {
        let kpi_trend = match &settings.kpi_trend {
            Some(profile) => TrendProfile::from_settings(profile)?,
            None => TrendProfile::half_year(),
        };
        let annual_trend = match &settings.annual_trend {
            Some(profile) => TrendProfile::from_settings(profile)?,
            None => TrendProfile::annual(),
        };
        Ok(Self::new(kpi_trend, annual_trend, settings.monthly_capacity_liters))
    }

    /// Turns one cycle's raw inputs into the dashboard document. Pure given `now`.
    pub fn build_dashboard(&self, inputs: &DashboardInputs, now: NaiveDateTime) -> DashboardOutput {
        let today = now.date();
        let window = PeriodWindow::containing(today);
        let k = &inputs.kpis;

        let (records, parse_report) = period::records_from_orders(&inputs.pedidos);
        let (order_totals, aggregation) = period::aggregate_parsed(&records, parse_report, today);
        let sales = resolve_sales_totals(k, &order_totals, &inputs.ventas_historicas, &window);
        let ventas_mes = sales.current_total;
        let ventas_mes_pasado = sales.previous_total;

        let ticket_pasado = match metrics::average_ticket(ventas_mes_pasado, k.total_pedidos_mes_pasado) {
            t if t > 0.0 => t,
            _ => k.ticket_promedio_mes_pasado,
        };
        let meta = metrics::goal_target(ventas_mes_pasado);

        let kpis = DashboardKpis {
            ventas: compare(ventas_mes, ventas_mes_pasado),
            ventas_proyectadas: metrics::projected(&sales),
            ventas_semanales: compare(
                metrics::weekly_approximation(ventas_mes),
                ventas_mes_pasado / 4.0,
            ),
            ventas_diarias: compare(
                metrics::daily_approximation(ventas_mes),
                ventas_mes_pasado / 30.0,
            ),
            ventas_totales_historicas: inputs.ventas_totales.ventas_totales,
            pedidos: compare(k.total_pedidos_mes, k.total_pedidos_mes_pasado),
            ticket_promedio: compare(
                metrics::average_ticket(ventas_mes, k.total_pedidos_mes),
                ticket_pasado,
            ),
            clientes_activos: compare(k.clientes_activos, k.clientes_activos_mes_pasado),
            clientes_inactivos: metrics::inactive_clients_estimate(k.clientes_activos),
            litros_vendidos: compare(k.litros_vendidos, k.litros_vendidos_mes_pasado),
            bidones: compare(
                metrics::bottles_from_liters(k.litros_vendidos),
                metrics::bottles_from_liters(k.litros_vendidos_mes_pasado),
            ),
            iva: compare(k.iva, ventas_mes_pasado * metrics::VAT_RATE),
            costos: compare_lower_is_better(
                k.costos_reales,
                ventas_mes_pasado * metrics::EXPECTED_COST_RATIO,
            ),
            utilidad: compare(k.utilidad, ventas_mes_pasado * metrics::EXPECTED_MARGIN_RATIO),
            meta,
            progreso_meta: metrics::goal_progress(ventas_mes, meta),
            capacidad_total: self.capacity_liters,
            capacidad_utilizada: metrics::capacity_utilization(k.litros_vendidos, self.capacity_liters),
        };

        let locales = period::aggregate_by_local(&records, today)
            .into_iter()
            .map(|(name, recs)| {
                let (ventas, ventas_prev) = window.sum_by(&recs, |r| r.amount as f64);
                let (bidones, bidones_prev) =
                    window.sum_by(&recs, |r| metrics::bottles_from_sale_price(r.amount) as f64);
                LocalSummary {
                    local_name: if name.is_empty() {
                        UNNAMED_LOCAL.to_string()
                    } else {
                        name
                    },
                    ventas: compare(ventas, ventas_prev),
                    bidones: compare(bidones, bidones_prev),
                    costo_tapas: compare(metrics::cap_cost(bidones), metrics::cap_cost(bidones_prev)),
                }
            })
            .collect();

        let trends = self.trends(&kpis, &inputs.ventas_historicas, now);

        DashboardOutput {
            metadata: DashboardMetadata {
                generated_at: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
                reference_date: today,
            },
            kpis,
            locales,
            trends,
            aggregation,
        }
    }

    fn trends(
        &self,
        kpis: &DashboardKpis,
        history: &[VentaHistorica],
        now: NaiveDateTime,
    ) -> BTreeMap<String, Vec<TrendPoint>> {
        let mut trends: BTreeMap<String, Vec<TrendPoint>> = [
            ("ventas", kpis.ventas.value),
            ("pedidos", kpis.pedidos.value),
            ("ticket_promedio", kpis.ticket_promedio.value),
            ("clientes_activos", kpis.clientes_activos.value),
            ("litros_vendidos", kpis.litros_vendidos.value),
            ("bidones", kpis.bidones.value),
            ("iva", kpis.iva.value),
            ("costos", kpis.costos.value),
            ("utilidad", kpis.utilidad.value),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), trend::synthetic_trend(value, &self.kpi_trend)))
        .collect();

        trends.insert(
            "ventas_totales_historicas".to_string(),
            trend::synthetic_trend(kpis.ventas_totales_historicas, &self.annual_trend),
        );
        if !history.is_empty() {
            trends.insert(
                "ventas_mensuales".to_string(),
                trend::monthly_trend_from_history(history, now.date(), HISTORY_TREND_MONTHS),
            );
        }
        trends
    }

    pub fn build_heatmap(
        &self,
        raw: &[HeatmapPointRaw],
        zoom_level: i32,
        now: NaiveDateTime,
    ) -> HeatmapOutput {
        let (points, dropped_points) = geo::classify_points(raw, zoom_level);
        let tier_counts = geo::tier_counts(&points);
        let total_spent = geo::total_spent(&points);
        HeatmapOutput {
            metadata: HeatmapMetadata {
                generated_at: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
                dropped_points,
            },
            zoom_level,
            points,
            tier_counts,
            total_spent,
        }
    }
}

/// Sales totals for the month-over-month figures. The KPI endpoint wins; when
/// it reports nothing the order list is used, then the monthly history.
fn resolve_sales_totals(
    kpis: &KpisPayload,
    order_totals: &PeriodTotals,
    history: &[VentaHistorica],
    window: &PeriodWindow,
) -> PeriodTotals {
    if kpis.ventas_mes > 0.0 || kpis.ventas_mes_pasado > 0.0 {
        return window.totals(kpis.ventas_mes, kpis.ventas_mes_pasado);
    }
    if order_totals.current_total != 0.0 || order_totals.previous_total != 0.0 {
        return *order_totals;
    }
    if !history.is_empty() {
        tracing::debug!("KPI endpoint and orders empty, using monthly history for sales");
    }
    window.totals(
        period::history_value(history, window.current_month),
        period::history_value(history, window.previous_month),
    )
}
