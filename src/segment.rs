//! Windowed segment statistics over signal channels
//!
//! Extracts early/late/whole-window means of one channel inside a time
//! window, with adaptive warm-up and tail sub-windows. Absent data is
//! reported as `None`, never as zero, so downstream consumers skip rather
//! than misread missing samples.

use serde::{Deserialize, Serialize};

use crate::models::SignalTable;

/// Warm-up sub-window ceiling, seconds.
const WARMUP_CAP_S: f64 = 180.0;
/// Tail sub-window ceiling, seconds.
const TAIL_CAP_S: f64 = 60.0;
/// Warm-up never exceeds this fraction of the window.
const WARMUP_FRACTION: f64 = 0.5;
/// Tail never exceeds this fraction of the window.
const TAIL_FRACTION: f64 = 0.2;
/// Minimum samples for a valid early/late sub-mean.
const MIN_SUB_SAMPLES: usize = 4;
/// Minimum samples for any statistics over the window.
const MIN_WINDOW_SAMPLES: usize = 10;

/// Early/late/whole-window means of one channel inside a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub early_mean: Option<f64>,
    pub late_mean: Option<f64>,
    pub window_mean: Option<f64>,
}

impl SegmentStats {
    /// Relative early-to-late change in percent, when both sub-means exist
    /// and the early mean is nonzero.
    pub fn drift_pct(&self) -> Option<f64> {
        match (self.early_mean, self.late_mean) {
            (Some(early), Some(late)) if early.abs() > f64::EPSILON => {
                Some((late - early) / early * 100.0)
            }
            _ => None,
        }
    }

    /// Late/early ratio, when both sub-means exist and early is nonzero.
    pub fn stability_ratio(&self) -> Option<f64> {
        match (self.early_mean, self.late_mean) {
            (Some(early), Some(late)) if early.abs() > f64::EPSILON => Some(late / early),
            _ => None,
        }
    }
}

/// Compute segment statistics for `channel` over `[t_start, t_end]`.
///
/// The warm-up sub-window covers the first `min(180 s, 50% of window)`; the
/// tail covers the last `min(60 s, 20% of window)`, so short stages still
/// yield a valid early/late split. Fewer than 10 samples in the whole
/// window yields an all-`None` result; fewer than 4 samples in a sub-window
/// yields `None` for that sub-mean only.
pub fn segment_stats(
    table: &SignalTable,
    channel: &str,
    t_start: f64,
    t_end: f64,
) -> SegmentStats {
    let duration = (t_end - t_start).max(0.0);
    let window = table.window_values(channel, t_start, t_end);
    if window.len() < MIN_WINDOW_SAMPLES {
        return SegmentStats::default();
    }

    let warmup = WARMUP_CAP_S.min(duration * WARMUP_FRACTION);
    let tail = TAIL_CAP_S.min(duration * TAIL_FRACTION);

    let early = table.window_values(channel, t_start, t_start + warmup);
    let late = table.window_values(channel, t_end - tail, t_end);

    SegmentStats {
        early_mean: sub_mean(&early),
        late_mean: sub_mean(&late),
        window_mean: Some(mean(&window)),
    }
}

fn sub_mean(values: &[f64]) -> Option<f64> {
    if values.len() < MIN_SUB_SAMPLES {
        None
    } else {
        Some(mean(values))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Least-squares slope of `ys` on `xs`.
///
/// Returns `None` for fewer than 3 points or a degenerate x spread.
pub fn linear_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 3 {
        return None;
    }
    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();
    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-9 {
        return None;
    }
    Some((n * sum_xy - sum_x * sum_y) / denom)
}
