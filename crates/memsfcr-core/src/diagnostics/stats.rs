//! Sample statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Metric;
use crate::decode::MemsSnapshot;

/// Regression slopes smaller than this are treated as flat
const FLAT_SLOPE: f64 = 1e-3;

/// Direction of a metric across the sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    #[default]
    Flat,
    Falling,
}

impl Trend {
    fn from_slope(slope: f64) -> Self {
        if slope > FLAT_SLOPE {
            Trend::Rising
        } else if slope < -FLAT_SLOPE {
            Trend::Falling
        } else {
            Trend::Flat
        }
    }
}

/// Statistics for one metric over a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub metric: Metric,
    /// Most recent value
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation, 0 for fewer than two values
    pub std_dev: f64,
    /// Most frequent value, the smallest on a tie
    pub mode: f64,
    pub mode_count: usize,
    /// Least-squares slope per sample
    pub slope: f64,
    pub trend: Trend,
}

fn round_2dp(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl Stats {
    /// Compute statistics over `data`, oldest first. `None` when empty.
    pub fn from_values(metric: Metric, data: &[f64]) -> Option<Self> {
        let value = *data.last()?;
        let n = data.len() as f64;

        let (min, max) = data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        let mean = data.iter().sum::<f64>() / n;
        let std_dev = if data.len() < 2 {
            0.0
        } else {
            let var = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        };

        let (mode, mode_count) = mode(data);
        let slope = linear_regression_slope(data);

        Some(Self {
            metric,
            value,
            min,
            max,
            mean: round_2dp(mean),
            std_dev: round_2dp(std_dev),
            mode: round_2dp(mode),
            mode_count,
            slope,
            trend: Trend::from_slope(slope),
        })
    }

    /// Compute statistics for `metric` across a snapshot sample
    pub fn for_metric(metric: Metric, sample: &[MemsSnapshot]) -> Option<Self> {
        let values: Vec<f64> = sample.iter().map(|s| metric.extract(s)).collect();
        Self::from_values(metric, &values)
    }
}

fn mode(data: &[f64]) -> (f64, usize) {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut best = (sorted[0], 0);
    let mut i = 0;
    while i < sorted.len() {
        let run = sorted[i..].iter().take_while(|v| **v == sorted[i]).count();
        if run > best.1 {
            best = (sorted[i], run);
        }
        i += run;
    }
    best
}

fn linear_regression_slope(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let n = data.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = data.iter().sum::<f64>() / n;

    let (num, den) = data
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, &y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    num / den
}

/// Statistics for every [`Metric`] over the current sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    stats: BTreeMap<Metric, Stats>,
}

impl SampleStats {
    /// Compute every metric over `sample`. Empty when the sample is empty.
    pub fn compute(sample: &[MemsSnapshot]) -> Self {
        let stats = Metric::ALL
            .iter()
            .filter_map(|&m| Stats::for_metric(m, sample).map(|s| (m, s)))
            .collect();
        Self { stats }
    }

    /// Statistics for one metric
    pub fn get(&self, metric: Metric) -> Option<&Stats> {
        self.stats.get(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stats> {
        self.stats.values()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
