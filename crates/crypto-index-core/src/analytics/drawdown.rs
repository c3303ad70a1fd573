//! Maximum drawdown over a value series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Rate, SeriesPoint};

/// The worst peak-to-trough decline observed, as a non-positive ratio,
/// with the points at which it happened. All descriptors are `None`
/// (and the ratio 0) when the series has fewer than 2 points or never
/// declined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxDrawdown {
    /// `(trough - peak) / peak`, so a 20% decline reads -0.2.
    pub drawdown: Rate,
    pub peak_timestamp: Option<DateTime<Utc>>,
    pub peak_value: Option<Decimal>,
    pub trough_timestamp: Option<DateTime<Utc>>,
    pub trough_value: Option<Decimal>,
    /// Whole days between peak and trough.
    pub duration_days: i64,
}

impl MaxDrawdown {
    pub fn flat() -> Self {
        Self {
            drawdown: Decimal::ZERO,
            peak_timestamp: None,
            peak_value: None,
            trough_timestamp: None,
            trough_value: None,
            duration_days: 0,
        }
    }
}

/// Single forward scan: track the running peak, compare every later
/// point against it, keep the most negative ratio. The initial peak is
/// the series' first point.
pub fn max_drawdown(points: &[SeriesPoint]) -> MaxDrawdown {
    if points.len() < 2 {
        return MaxDrawdown::flat();
    }

    let mut peak = &points[0];
    let mut worst = MaxDrawdown::flat();

    for point in &points[1..] {
        if point.value > peak.value {
            peak = point;
            continue;
        }
        if peak.value.is_zero() {
            continue;
        }
        let ratio = (point.value - peak.value) / peak.value;
        if ratio < worst.drawdown {
            worst = MaxDrawdown {
                drawdown: ratio,
                peak_timestamp: Some(peak.timestamp),
                peak_value: Some(peak.value),
                trough_timestamp: Some(point.timestamp),
                trough_value: Some(point.value),
                duration_days: (point.timestamp - peak.timestamp).num_days(),
            };
        }
    }

    worst
}
