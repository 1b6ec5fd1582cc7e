//! Engine Diagnostics
//!
//! Accumulates decoded snapshots, computes rolling statistics over the most
//! recent sample and infers engine health from them.

mod analysis;
mod metric;
mod stats;

pub use analysis::{analyse, AnalysisCode, AnalysisReport, DiagnosticThresholds};
pub use metric::Metric;
pub use stats::{SampleStats, Stats, Trend};

use serde::{Deserialize, Serialize};

use crate::decode::MemsSnapshot;

/// Number of snapshots analysed by default
pub const DEFAULT_SAMPLE_SIZE: usize = 30;

/// Analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Number of most recent snapshots each analysis looks at
    pub sample_size: usize,
    pub thresholds: DiagnosticThresholds,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            thresholds: DiagnosticThresholds::default(),
        }
    }
}

/// Snapshot history plus the results of the last analysis
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    dataset: Vec<MemsSnapshot>,
    config: DiagnosticsConfig,
    iac_baseline: u8,
    stats: SampleStats,
    report: AnalysisReport,
}

impl Diagnostics {
    /// Create an analyzer with default settings
    pub fn new() -> Self {
        Self::with_config(DiagnosticsConfig::default())
    }

    pub fn with_config(config: DiagnosticsConfig) -> Self {
        tracing::debug!(sample_size = config.sample_size, "starting diagnostics");
        Self {
            config,
            report: AnalysisReport {
                is_engine_warming: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Append a snapshot to the history
    pub fn add(&mut self, snapshot: MemsSnapshot) {
        self.dataset.push(snapshot);
    }

    /// Recompute the sample statistics and report from the current history
    pub fn analyse(&mut self) -> &AnalysisReport {
        let sample = self.sample(self.config.sample_size);
        let stats = SampleStats::compute(sample);
        let report = analyse(sample, &stats, &self.config.thresholds, self.iac_baseline);

        tracing::debug!(
            samples = sample.len(),
            code = ?report.analysis_code,
            running = report.is_engine_running,
            idle = report.is_engine_idle,
            "diagnostics analysed"
        );

        self.stats = stats;
        self.report = report;
        &self.report
    }

    /// The last `points` snapshots, or the whole history if it is shorter
    pub fn sample(&self, points: usize) -> &[MemsSnapshot] {
        let start = self.dataset.len().saturating_sub(points);
        &self.dataset[start..]
    }

    /// Record the IAC position read during initialisation
    pub fn set_iac_baseline(&mut self, steps: u8) {
        self.iac_baseline = steps;
        if self.dataset.is_empty() {
            self.report.iac_position = steps;
        }
    }

    /// Report from the last [`Diagnostics::analyse`] call
    pub fn report(&self) -> &AnalysisReport {
        &self.report
    }

    /// Statistics from the last [`Diagnostics::analyse`] call
    pub fn stats(&self) -> &SampleStats {
        &self.stats
    }

    pub fn latest(&self) -> Option<&MemsSnapshot> {
        self.dataset.last()
    }

    pub fn dataset(&self) -> &[MemsSnapshot] {
        &self.dataset
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, FRAME_7D_LEN, FRAME_80_LEN};
    use chrono::Utc;

    fn snapshot(rpm: u16) -> MemsSnapshot {
        let mut f80 = vec![0u8; FRAME_80_LEN];
        f80[0] = 0x80;
        f80[2..4].copy_from_slice(&rpm.to_be_bytes());
        f80[0x13] = 40;
        let mut f7d = vec![0u8; FRAME_7D_LEN];
        f7d[0] = 0x7d;
        decode(&f80, &f7d, Utc::now()).unwrap()
    }

    #[test]
    fn test_new_reports_warming() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert!(diagnostics.report().is_engine_warming);
        assert!(diagnostics.stats().is_empty());
    }

    #[test]
    fn test_sample_window() {
        let mut diagnostics = Diagnostics::new();
        for rpm in 1..=40 {
            diagnostics.add(snapshot(rpm));
        }

        let sample = diagnostics.sample(30);
        assert_eq!(sample.len(), 30);
        assert_eq!(sample[0].engine_rpm, 11);
        assert_eq!(sample[29].engine_rpm, 40);
        assert_eq!(diagnostics.sample(100).len(), 40);
        assert!(diagnostics.sample(0).is_empty());
    }

    #[test]
    fn test_analyse_uses_configured_sample_size() {
        let mut diagnostics = Diagnostics::with_config(DiagnosticsConfig {
            sample_size: 5,
            ..Default::default()
        });
        for _ in 0..10 {
            diagnostics.add(snapshot(3000));
        }
        for _ in 0..5 {
            diagnostics.add(snapshot(0));
        }

        let report = diagnostics.analyse().clone();
        assert!(!report.is_engine_running);

        let rpm = diagnostics.stats().get(Metric::EngineRpm).unwrap();
        assert_eq!(rpm.max, 0.0);
        assert_eq!(diagnostics.len(), 15);
    }

    #[test]
    fn test_iac_baseline_before_first_reading() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.set_iac_baseline(55);
        assert_eq!(diagnostics.report().iac_position, 55);

        diagnostics.add(snapshot(850));
        diagnostics.analyse();
        assert_eq!(diagnostics.report().iac_position, 40);
        assert_eq!(diagnostics.latest().map(|s| s.engine_rpm), Some(850));
    }
}
