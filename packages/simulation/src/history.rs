//! Weekly summaries of daily series, and the series used when none is
//! supplied.

use eco_blocks_block_models::TrafficLabel;
use eco_blocks_simulation_models::{TrendTag, WeeklySummary};

/// Days per summarized week.
pub const WEEK_LEN: usize = 7;

/// Maximum number of summaries; the last one absorbs any remainder.
pub const MAX_WEEKS: usize = 4;

/// Length of generated series.
pub const SERIES_DAYS: usize = 30;

/// Speed multiplier applied to weekend days of a synthetic traffic series.
const WEEKEND_FACTOR: f64 = 1.15;

/// Summarizes a daily series into at most [`MAX_WEEKS`] weekly means.
///
/// Weeks are consecutive 7-day chunks, except the fourth which takes
/// everything from day 21 on. A chunk is emitted only if it has data, so
/// an empty series yields no summaries and 28+ values always yield four.
/// The last emitted summary is tagged [`TrendTag::Current`].
#[must_use]
pub fn summarize_weekly(series: &[f64]) -> Vec<WeeklySummary> {
    let mut chunks: Vec<&[f64]> = Vec::with_capacity(MAX_WEEKS);
    let mut rest = series;

    while !rest.is_empty() && chunks.len() < MAX_WEEKS {
        let take = if chunks.len() == MAX_WEEKS - 1 {
            rest.len()
        } else {
            rest.len().min(WEEK_LEN)
        };
        let (chunk, tail) = rest.split_at(take);
        chunks.push(chunk);
        rest = tail;
    }

    let last = chunks.len().saturating_sub(1);
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| WeeklySummary {
            week_index: u8::try_from(i + 1).unwrap_or(u8::MAX),
            average_value: mean(chunk).round(),
            trend_tag: if i == last {
                TrendTag::Current
            } else {
                TrendTag::Past
            },
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// A [`SERIES_DAYS`]-long series of `value`.
#[must_use]
pub fn constant_series(value: f64) -> Vec<f64> {
    vec![value; SERIES_DAYS]
}

/// Builds a plausible daily traffic-speed series for a block with no
/// recorded history.
///
/// Uses the live speed when present, otherwise the label's typical speed
/// (moderate flow when unknown). Days at index 5 and 6 of each week are
/// weekend days and run faster.
#[must_use]
pub fn synthetic_traffic_series(label: Option<TrafficLabel>, speed: Option<f64>) -> Vec<f64> {
    let base = speed
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or_else(|| {
            label
                .unwrap_or(TrafficLabel::ModerateFlow)
                .typical_speed_kmh()
        });

    (0..SERIES_DAYS)
        .map(|day| {
            let factor = if day % WEEK_LEN >= 5 {
                WEEKEND_FACTOR
            } else {
                1.0
            };
            (base * factor * 10.0).round() / 10.0
        })
        .collect()
}
