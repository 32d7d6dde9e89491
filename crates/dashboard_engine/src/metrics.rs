//! Ratio and percentage arithmetic behind the dashboard cards.
//!
//! Every function is pure. Any division whose denominator is zero (or whose
//! inputs are not finite) yields 0 instead of NaN or infinity.

use models::{DerivedKpi, PeriodTotals};

/// Sales goal uplift over the previous month.
pub const GOAL_UPLIFT: f64 = 1.1;
pub const LITERS_PER_BOTTLE: f64 = 20.0;
/// Store promotion: 3 bottles for every 5000 CLP.
pub const PROMO_PRICE: i64 = 5000;
pub const PROMO_BOTTLES: i64 = 3;
/// Cap cost per bottle, VAT included.
pub const CAP_COST_PER_BOTTLE: f64 = 60.69;
pub const INACTIVE_CLIENT_RATIO: f64 = 0.2;
pub const VAT_RATE: f64 = 0.19;
pub const EXPECTED_COST_RATIO: f64 = 0.7;
pub const EXPECTED_MARGIN_RATIO: f64 = 0.3;

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

pub fn percent_change(current: f64, previous: f64) -> f64 {
    if !current.is_finite() || !previous.is_finite() {
        return 0.0;
    }
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    (current - previous) / previous * 100.0
}

/// Scales the previous month down to the days elapsed in the current one
/// before comparing, so day 10 is not measured against a whole month.
pub fn projected_previous(previous: f64, elapsed_days_current: u32, days_in_previous_month: u32) -> f64 {
    if days_in_previous_month == 0 {
        return 0.0;
    }
    if elapsed_days_current == days_in_previous_month {
        return previous;
    }
    finite_or_zero(previous / days_in_previous_month as f64 * elapsed_days_current as f64)
}

pub fn projected_percent_change(
    current: f64,
    previous: f64,
    elapsed_days_current: u32,
    days_in_previous_month: u32,
) -> f64 {
    if days_in_previous_month == 0 {
        return 0.0;
    }
    let previous_projected = projected_previous(previous, elapsed_days_current, days_in_previous_month);
    percent_change(current, previous_projected)
}

pub fn average_ticket(total_sales: f64, order_count: f64) -> f64 {
    if order_count == 0.0 {
        return 0.0;
    }
    finite_or_zero((total_sales / order_count).round())
}

pub fn capacity_utilization(used: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    finite_or_zero((used / total * 100.0).round().min(100.0))
}

pub fn goal_target(previous_total: f64) -> f64 {
    finite_or_zero((previous_total * GOAL_UPLIFT).round())
}

pub fn goal_progress(current: f64, goal: f64) -> f64 {
    if goal == 0.0 {
        return 0.0;
    }
    finite_or_zero((current / goal * 100.0).round().min(100.0))
}

pub fn weekly_approximation(monthly: f64) -> f64 {
    finite_or_zero((monthly / 4.0).round())
}

pub fn daily_approximation(monthly: f64) -> f64 {
    finite_or_zero((monthly / 30.0).round())
}

pub fn bottles_from_liters(liters: f64) -> f64 {
    finite_or_zero((liters / LITERS_PER_BOTTLE).round())
}

/// Bottles delivered for one sale under the 3-per-5000 promotion.
pub fn bottles_from_sale_price(price: i64) -> i64 {
    if price <= 0 {
        return 0;
    }
    (price / PROMO_PRICE) * PROMO_BOTTLES
}

pub fn cap_cost(bottles: f64) -> f64 {
    finite_or_zero(bottles * CAP_COST_PER_BOTTLE)
}

pub fn inactive_clients_estimate(active_clients: f64) -> f64 {
    finite_or_zero((active_clients * INACTIVE_CLIENT_RATIO).round().max(0.0))
}

/// KPI where a higher value than the reference is good news.
pub fn compare(value: f64, comparison_value: f64) -> DerivedKpi {
    let value = finite_or_zero(value);
    let comparison_value = finite_or_zero(comparison_value);
    DerivedKpi {
        value,
        comparison_value,
        percent_change: percent_change(value, comparison_value),
        is_positive: value >= comparison_value,
    }
}

/// KPI where staying at or under the reference is good news (costs).
pub fn compare_lower_is_better(value: f64, comparison_value: f64) -> DerivedKpi {
    let value = finite_or_zero(value);
    let comparison_value = finite_or_zero(comparison_value);
    DerivedKpi {
        value,
        comparison_value,
        percent_change: percent_change(value, comparison_value),
        is_positive: value <= comparison_value,
    }
}

/// Month-over-month KPI with the previous month projected onto the elapsed days.
pub fn projected(totals: &PeriodTotals) -> DerivedKpi {
    let comparison_value = projected_previous(
        totals.previous_total,
        totals.elapsed_days_current,
        totals.days_in_previous_month,
    );
    let percent_change = projected_percent_change(
        totals.current_total,
        totals.previous_total,
        totals.elapsed_days_current,
        totals.days_in_previous_month,
    );
    DerivedKpi {
        value: finite_or_zero(totals.current_total),
        comparison_value,
        percent_change,
        is_positive: percent_change >= 0.0,
    }
}
