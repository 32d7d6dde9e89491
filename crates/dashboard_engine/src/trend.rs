//! Sparkline series for the KPI cards.
//!
//! The API only hands out one aggregate per KPI, so [`TrendProfile::synthesize`]
//! fabricates a plausible series from it: every point is a fixed fraction of
//! the final total and the last point is the total itself. This is a
//! placeholder until a real per-period time series is served; it is not
//! observed history. [`monthly_trend_from_history`] is the real-data variant
//! for sales, where the history endpoint exists.

use chrono::{Datelike, NaiveDate};
use models::{TrendPoint, TrendProfileSettings, VentaHistorica};
use thiserror::Error;

use crate::period::history_value;

pub const MIN_POINTS: usize = 6;
pub const MAX_POINTS: usize = 12;

const SPANISH_MONTHS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

#[derive(Debug, Error, PartialEq)]
pub enum TrendError {
    #[error("trend has {labels} labels but {weights} weights")]
    LengthMismatch { labels: usize, weights: usize },

    #[error("trend must have between 6 and 12 points, got {0}")]
    BadLength(usize),

    #[error("weight {weight} at position {index} is outside (0, 1]")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("weights must not decrease (position {0})")]
    NotMonotonic(usize),

    #[error("last weight must be 1.0 so the series ends at the real total, got {0}")]
    LastWeightNotOne(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendProfile {
    labels: Vec<String>,
    weights: Vec<f64>,
}

impl TrendProfile {
    pub fn new(labels: Vec<String>, weights: Vec<f64>) -> Result<Self, TrendError> {
        if labels.len() != weights.len() {
            return Err(TrendError::LengthMismatch {
                labels: labels.len(),
                weights: weights.len(),
            });
        }
        if !(MIN_POINTS..=MAX_POINTS).contains(&weights.len()) {
            return Err(TrendError::BadLength(weights.len()));
        }
        for (index, &weight) in weights.iter().enumerate() {
            if !weight.is_finite() || weight <= 0.0 || weight > 1.0 {
                return Err(TrendError::InvalidWeight { index, weight });
            }
            if index > 0 && weight < weights[index - 1] {
                return Err(TrendError::NotMonotonic(index));
            }
        }
        let last = weights[weights.len() - 1];
        if last != 1.0 {
            return Err(TrendError::LastWeightNotOne(last));
        }
        Ok(Self { labels, weights })
    }

    /// Twelve months ramping from 70% up to the total.
    pub fn annual() -> Self {
        Self {
            labels: SPANISH_MONTHS.iter().map(|m| m.to_string()).collect(),
            weights: vec![0.7, 0.75, 0.8, 0.82, 0.85, 0.88, 0.9, 0.92, 0.94, 0.96, 0.98, 1.0],
        }
    }

    /// Seven points ramping from 80% up to the total.
    pub fn half_year() -> Self {
        Self {
            labels: SPANISH_MONTHS[..7].iter().map(|m| m.to_string()).collect(),
            weights: vec![0.8, 0.85, 0.9, 0.92, 0.95, 0.98, 1.0],
        }
    }

    pub fn from_settings(settings: &TrendProfileSettings) -> Result<Self, TrendError> {
        Self::new(settings.labels.clone(), settings.weights.clone())
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn synthesize(&self, final_value: f64) -> Vec<TrendPoint> {
        let final_value = if final_value.is_finite() { final_value } else { 0.0 };
        let last = self.weights.len().saturating_sub(1);
        self.labels
            .iter()
            .zip(&self.weights)
            .enumerate()
            .map(|(i, (label, weight))| TrendPoint {
                label: label.clone(),
                value: if i == last { final_value } else { weight * final_value },
            })
            .collect()
    }
}

/// Named entry point for the synthetic series.
pub fn synthetic_trend(final_value: f64, profile: &TrendProfile) -> Vec<TrendPoint> {
    profile.synthesize(final_value)
}

/// The last `months` months of real sales ending at the month of `now`.
/// Months missing from the history show as zero.
pub fn monthly_trend_from_history(
    history: &[VentaHistorica],
    now: NaiveDate,
    months: usize,
) -> Vec<TrendPoint> {
    let current = now.month0() as usize;
    (0..months.min(12))
        .rev()
        .map(|back| {
            let month0 = (current + 12 - back) % 12;
            TrendPoint {
                label: SPANISH_MONTHS[month0].to_string(),
                value: history_value(history, month0 as u32 + 1),
            }
        })
        .collect()
}
