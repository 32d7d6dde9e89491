//! Current-month / previous-month bucketing of dated order records.
//!
//! Parsing is fail-soft: a record whose date or amount cannot be read is
//! left out of both buckets and counted in the [`AggregationReport`].

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use models::{AggregationReport, PedidoRaw, PeriodTotals, TransactionRecord, VentaHistorica};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Current,
    Previous,
}

/// The two calendar months compared on the dashboard, relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub current_year: i32,
    pub current_month: u32,
    pub previous_year: i32,
    pub previous_month: u32,
    pub elapsed_days_current: u32,
    pub days_in_previous_month: u32,
}

impl PeriodWindow {
    pub fn containing(now: NaiveDate) -> Self {
        let (previous_year, previous_month) = previous_month_of(now.year(), now.month());
        Self {
            current_year: now.year(),
            current_month: now.month(),
            previous_year,
            previous_month,
            elapsed_days_current: now.day(),
            days_in_previous_month: days_in_month(previous_year, previous_month),
        }
    }

    pub fn bucket(&self, date: NaiveDate) -> Option<Bucket> {
        let ym = (date.year(), date.month());
        if ym == (self.current_year, self.current_month) {
            Some(Bucket::Current)
        } else if ym == (self.previous_year, self.previous_month) {
            Some(Bucket::Previous)
        } else {
            None
        }
    }

    pub fn totals(&self, current_total: f64, previous_total: f64) -> PeriodTotals {
        PeriodTotals {
            current_total,
            previous_total,
            elapsed_days_current: self.elapsed_days_current,
            days_in_previous_month: self.days_in_previous_month,
        }
    }

    /// Sums `value(record)` into the current and previous buckets.
    pub fn sum_by<F>(&self, records: &[TransactionRecord], value: F) -> (f64, f64)
    where
        F: Fn(&TransactionRecord) -> f64,
    {
        records
            .iter()
            .fold((0.0, 0.0), |(current, previous), r| match self.bucket(r.date) {
                Some(Bucket::Current) => (current + value(r), previous),
                Some(Bucket::Previous) => (current, previous + value(r)),
                None => (current, previous),
            })
    }
}

/// January rolls back to December of the year before.
pub fn previous_month_of(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}

/// Parses order dates: `DD-MM-YYYY`, ISO `YYYY-MM-DD`, or an ISO date-time.
pub fn parse_record_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('T') || s.ends_with('Z') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.date_naive());
        }
        return NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|dt| dt.date())
            .ok();
    }
    NaiveDate::parse_from_str(s, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Reads a currency amount given either as a JSON number or a numeric string.
/// Fractions are truncated toward zero; values outside the `i64` range are rejected.
pub fn parse_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_amount)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_amount))
        }
        _ => None,
    }
}

// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn truncate_amount(f: f64) -> Option<i64> {
    let f = f.trunc();
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// Converts raw orders into typed records, counting the ones that had to be dropped.
pub fn records_from_orders(orders: &[PedidoRaw]) -> (Vec<TransactionRecord>, AggregationReport) {
    let mut report = AggregationReport {
        total_records: orders.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(orders.len());
    for order in orders {
        let Some(date) = parse_record_date(&order.fecha) else {
            report.skipped_bad_date += 1;
            continue;
        };
        let Some(amount) = parse_amount(&order.precio) else {
            report.skipped_bad_amount += 1;
            continue;
        };
        records.push(TransactionRecord {
            date,
            amount,
            local_name: order.nombrelocal.trim().to_string(),
        });
    }
    (records, report)
}

/// Buckets typed records into the month of `now` and the month before it.
pub fn aggregate(records: &[TransactionRecord], now: NaiveDate) -> (PeriodTotals, AggregationReport) {
    let window = PeriodWindow::containing(now);
    let mut report = AggregationReport {
        total_records: records.len(),
        ..Default::default()
    };
    // Summed as f64 like `PeriodWindow::sum_by`, so huge amounts cannot overflow.
    let mut current = 0.0;
    let mut previous = 0.0;
    for r in records {
        match window.bucket(r.date) {
            Some(Bucket::Current) => {
                current += r.amount as f64;
                report.current_count += 1;
            }
            Some(Bucket::Previous) => {
                previous += r.amount as f64;
                report.previous_count += 1;
            }
            None => report.outside_window += 1,
        }
    }
    (window.totals(current, previous), report)
}

/// Parses and buckets raw orders in one pass.
pub fn aggregate_orders(orders: &[PedidoRaw], now: NaiveDate) -> (PeriodTotals, AggregationReport) {
    let (records, parse_report) = records_from_orders(orders);
    aggregate_parsed(&records, parse_report, now)
}

/// Buckets records already parsed by [`records_from_orders`], folding the
/// parse counts into the returned report.
pub fn aggregate_parsed(
    records: &[TransactionRecord],
    parse_report: AggregationReport,
    now: NaiveDate,
) -> (PeriodTotals, AggregationReport) {
    let (totals, bucket_report) = aggregate(records, now);
    let report = AggregationReport {
        total_records: parse_report.total_records,
        skipped_bad_date: parse_report.skipped_bad_date,
        skipped_bad_amount: parse_report.skipped_bad_amount,
        ..bucket_report
    };
    if report.skipped() > 0 {
        tracing::warn!(
            skipped_bad_date = report.skipped_bad_date,
            skipped_bad_amount = report.skipped_bad_amount,
            total = report.total_records,
            "Skipped malformed order records during aggregation"
        );
    }
    (totals, report)
}

/// Per point-of-sale totals. Records without a local name are grouped under an empty key.
pub fn aggregate_by_local(
    records: &[TransactionRecord],
    now: NaiveDate,
) -> BTreeMap<String, Vec<TransactionRecord>> {
    let window = PeriodWindow::containing(now);
    let mut by_local: BTreeMap<String, Vec<TransactionRecord>> = BTreeMap::new();
    for r in records.iter().filter(|r| window.bucket(r.date).is_some()) {
        by_local.entry(r.local_name.clone()).or_default().push(r.clone());
    }
    by_local
}

const ENGLISH_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Month number (1-12) for a three-letter English abbreviation.
pub fn month_from_abbreviation(name: &str) -> Option<u32> {
    let name = name.trim();
    ENGLISH_MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|i| i as u32 + 1)
}

/// Sales recorded for `month` in the historical series; zero entries count as missing.
pub fn history_value(history: &[VentaHistorica], month: u32) -> f64 {
    history
        .iter()
        .find(|h| month_from_abbreviation(&h.name) == Some(month) && h.ventas > 0.0)
        .map(|h| h.ventas)
        .unwrap_or(0.0)
}

/// Current/previous month totals taken from the monthly history endpoint.
pub fn totals_from_history(history: &[VentaHistorica], now: NaiveDate) -> PeriodTotals {
    let window = PeriodWindow::containing(now);
    window.totals(
        history_value(history, window.current_month),
        history_value(history, window.previous_month),
    )
}
