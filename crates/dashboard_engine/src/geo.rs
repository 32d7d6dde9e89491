//! Concentration tiers and zoom-aware circle radii for the heat map.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use models::{ConcentrationTier, GeoPoint, HeatmapPointRaw};
use serde_json::Value;

/// Zoom level at which circles reach their smallest size.
pub const MAX_ZOOM: i32 = 18;
pub const MIN_ZOOM_FACTOR: f64 = 0.3;
pub const MAX_ZOOM_FACTOR: f64 = 2.0;
pub const METERS_PER_RADIUS_UNIT: f64 = 50.0;

/// Longest filter (in months) that still restricts the query to one month/year.
pub const MAX_FILTERED_MONTHS: u32 = 6;

/// Thresholds are exclusive: exactly 15000 is still medium-high.
pub fn classify_tier(total_spent: f64) -> ConcentrationTier {
    if total_spent > 15_000.0 {
        ConcentrationTier::High
    } else if total_spent > 10_000.0 {
        ConcentrationTier::MediumHigh
    } else if total_spent > 6_000.0 {
        ConcentrationTier::Medium
    } else if total_spent > 3_000.0 {
        ConcentrationTier::LowMedium
    } else {
        ConcentrationTier::Low
    }
}

/// Shrinks circles as the viewer zooms in and grows them when zooming out.
pub fn zoom_factor(zoom_level: i32) -> f64 {
    ((MAX_ZOOM as f64 - zoom_level as f64) / 6.0).clamp(MIN_ZOOM_FACTOR, MAX_ZOOM_FACTOR)
}

pub fn radius_meters(tier: ConcentrationTier, zoom_level: i32) -> f64 {
    tier.base_radius_unit() * zoom_factor(zoom_level) * METERS_PER_RADIUS_UNIT
}

/// Spend as sent by the heat-map endpoint. Unreadable or negative values count as zero.
pub fn parse_total_spent(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}

pub fn classify_point(raw: &HeatmapPointRaw, zoom_level: i32) -> Option<GeoPoint> {
    let lat = raw.lat.filter(|v| v.is_finite())?;
    let lng = raw.lon.filter(|v| v.is_finite())?;
    let total_spent = parse_total_spent(&raw.total_spent);
    let tier = classify_tier(total_spent);
    Some(GeoPoint {
        lat,
        lng,
        total_spent,
        concentration_tier: tier,
        color: tier.color().to_string(),
        radius_meters: radius_meters(tier, zoom_level),
        address: raw.address.clone(),
        user: raw.user.clone(),
        phone: raw.phone.clone(),
    })
}

/// Classifies every record; returns the points and how many records lacked usable coordinates.
pub fn classify_points(raw: &[HeatmapPointRaw], zoom_level: i32) -> (Vec<GeoPoint>, usize) {
    let points: Vec<GeoPoint> = raw
        .iter()
        .filter_map(|r| classify_point(r, zoom_level))
        .collect();
    let dropped = raw.len() - points.len();
    if dropped > 0 {
        tracing::warn!(dropped, total = raw.len(), "Heat-map records without coordinates dropped");
    }
    (points, dropped)
}

/// Recomputes radii after a zoom change. Tiers depend only on spend and stay put.
pub fn apply_zoom(points: &mut [GeoPoint], zoom_level: i32) {
    for p in points.iter_mut() {
        p.radius_meters = radius_meters(p.concentration_tier, zoom_level);
    }
}

pub fn tier_counts(points: &[GeoPoint]) -> BTreeMap<ConcentrationTier, usize> {
    let mut counts: BTreeMap<ConcentrationTier, usize> =
        ConcentrationTier::ALL.iter().map(|t| (*t, 0)).collect();
    for p in points {
        *counts.entry(p.concentration_tier).or_insert(0) += 1;
    }
    counts
}

/// Total billed across the plotted points, shown next to the point count.
pub fn total_spent(points: &[GeoPoint]) -> f64 {
    points.iter().map(|p| p.total_spent).sum()
}

/// Month/year filter sent with the heat-map query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapWindow {
    pub mes: u32,
    pub anio: i32,
}

impl HeatmapWindow {
    /// Short periods (up to six months) filter on the month `months` ago;
    /// longer ones query everything.
    pub fn from_filter_months(months: u32, now: NaiveDate) -> Option<Self> {
        if months > MAX_FILTERED_MONTHS {
            return None;
        }
        let target = now.checked_sub_months(Months::new(months))?;
        Some(Self {
            mes: target.month(),
            anio: target.year(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(lat: Option<f64>, lon: Option<f64>, total_spent: Value) -> HeatmapPointRaw {
        HeatmapPointRaw {
            lat,
            lon,
            address: "Pudeto 123".to_string(),
            user: "cliente@example.cl".to_string(),
            phone: "+56 9 0000 0000".to_string(),
            total_spent,
            ticket_promedio: Value::Null,
            fecha_ultimo_pedido: None,
        }
    }

    #[test]
    fn test_classify_tier_thresholds() {
        assert_eq!(classify_tier(16_000.0), ConcentrationTier::High);
        assert_eq!(classify_tier(15_000.0), ConcentrationTier::MediumHigh);
        assert_eq!(classify_tier(10_000.5), ConcentrationTier::MediumHigh);
        assert_eq!(classify_tier(10_000.0), ConcentrationTier::Medium);
        assert_eq!(classify_tier(6_000.0), ConcentrationTier::LowMedium);
        assert_eq!(classify_tier(3_000.0), ConcentrationTier::Low);
        assert_eq!(classify_tier(0.0), ConcentrationTier::Low);
    }

    #[test]
    fn test_zoom_factor_clamps() {
        assert_eq!(zoom_factor(18), MIN_ZOOM_FACTOR);
        assert_eq!(zoom_factor(20), MIN_ZOOM_FACTOR);
        assert_eq!(zoom_factor(0), MAX_ZOOM_FACTOR);
        assert_eq!(zoom_factor(-5), MAX_ZOOM_FACTOR);
        assert_eq!(zoom_factor(12), 1.0);
        assert_eq!(zoom_factor(i32::MIN), MAX_ZOOM_FACTOR);
    }

    #[test]
    fn test_radius_meters() {
        assert_eq!(radius_meters(ConcentrationTier::High, 12), 150.0);
        assert_eq!(radius_meters(ConcentrationTier::Low, 0), 100.0);
        assert!((radius_meters(ConcentrationTier::Medium, 18) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_radius_shrinks_when_zooming_in() {
        let far = radius_meters(ConcentrationTier::Medium, 8);
        let near = radius_meters(ConcentrationTier::Medium, 15);
        assert!(far > near);
    }

    #[test]
    fn test_parse_total_spent() {
        assert_eq!(parse_total_spent(&json!(16000)), 16_000.0);
        assert_eq!(parse_total_spent(&json!("7500")), 7_500.0);
        assert_eq!(parse_total_spent(&json!("n/a")), 0.0);
        assert_eq!(parse_total_spent(&json!(-20)), 0.0);
        assert_eq!(parse_total_spent(&Value::Null), 0.0);
    }

    #[test]
    fn test_classify_points_drops_missing_coordinates() {
        let records = vec![
            raw(Some(-41.87), Some(-73.82), json!("16000")),
            raw(None, Some(-73.82), json!(500)),
            raw(Some(-41.86), Some(-73.83), json!(4000)),
        ];
        let (points, dropped) = classify_points(&records, 12);
        assert_eq!(dropped, 1);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].concentration_tier, ConcentrationTier::High);
        assert_eq!(points[0].color, "#ff0000");
        assert_eq!(points[0].radius_meters, 150.0);
        assert_eq!(points[1].concentration_tier, ConcentrationTier::LowMedium);
    }

    #[test]
    fn test_apply_zoom_recomputes_radius_only() {
        let records = vec![raw(Some(-41.87), Some(-73.82), json!(16000))];
        let (mut points, _) = classify_points(&records, 12);
        apply_zoom(&mut points, 0);
        assert_eq!(points[0].radius_meters, 300.0);
        assert_eq!(points[0].concentration_tier, ConcentrationTier::High);
    }

    #[test]
    fn test_tier_counts_lists_every_tier() {
        let records = vec![
            raw(Some(1.0), Some(1.0), json!(16000)),
            raw(Some(1.0), Some(1.0), json!(20000)),
            raw(Some(1.0), Some(1.0), json!(100)),
        ];
        let (points, _) = classify_points(&records, 10);
        let counts = tier_counts(&points);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[&ConcentrationTier::High], 2);
        assert_eq!(counts[&ConcentrationTier::Low], 1);
        assert_eq!(counts[&ConcentrationTier::Medium], 0);
    }

    #[test]
    fn test_total_spent_sums_plotted_points() {
        let records = vec![
            raw(Some(1.0), Some(1.0), json!(16000)),
            raw(Some(1.0), Some(1.0), json!("2500.5")),
            raw(None, Some(1.0), json!(9000)),
            raw(Some(1.0), Some(1.0), json!("n/a")),
        ];
        let (points, dropped) = classify_points(&records, 10);
        assert_eq!(dropped, 1);
        assert_eq!(total_spent(&points), 18_500.5);
        assert_eq!(total_spent(&[]), 0.0);
    }

    #[test]
    fn test_heatmap_window() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(
            HeatmapWindow::from_filter_months(6, now),
            Some(HeatmapWindow { mes: 9, anio: 2025 })
        );
        assert_eq!(
            HeatmapWindow::from_filter_months(3, now),
            Some(HeatmapWindow { mes: 12, anio: 2025 })
        );
        assert_eq!(HeatmapWindow::from_filter_months(12, now), None);
    }
}
