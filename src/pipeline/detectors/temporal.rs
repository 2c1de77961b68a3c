//! Temporal Detector
//!
//! Periodicity analysis over inter-request intervals. Three methods, best
//! score wins: discrete Fourier magnitude peaks, autocorrelation, and
//! windowed request-rate change analysis.

use std::f64::consts::PI;

use ndarray::Array1;

use crate::config::TemporalConfig;
use crate::constants::TAG_BOT_ACTIVITY;
use crate::models::{ActorProfile, EvidenceSource};
use crate::pipeline::context::{AnalysisContext, FftSummary};
use crate::pipeline::detectors::Detector;

pub struct TemporalDetector {
    config: TemporalConfig,
}

impl TemporalDetector {
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    /// Discrete Fourier magnitude spectrum of the interval sequence.
    /// Interval counts are small in batch analysis, so the direct O(n^2)
    /// transform is sufficient.
    fn magnitude_spectrum(intervals: &Array1<f64>) -> Vec<f64> {
        let n = intervals.len();
        let mut magnitudes = Vec::with_capacity(n / 2);

        for k in 1..n / 2 {
            let mut real = 0.0;
            let mut imaginary = 0.0;
            for (j, value) in intervals.iter().enumerate() {
                let angle = -2.0 * PI * (k * j) as f64 / n as f64;
                real += value * angle.cos();
                imaginary += value * angle.sin();
            }
            magnitudes.push((real * real + imaginary * imaginary).sqrt());
        }

        magnitudes
    }

    /// Spectral peak scan: counts local maxima above the configured share
    /// of the strongest magnitude.
    fn spectral_score(&self, intervals: &Array1<f64>) -> Option<(f64, String)> {
        let magnitudes = Self::magnitude_spectrum(intervals);
        if magnitudes.len() < 3 {
            return None;
        }

        let max_magnitude = magnitudes.iter().cloned().fold(0.0, f64::max);
        if max_magnitude <= 0.0 {
            return None;
        }

        let mut peaks = 0;
        for i in 1..magnitudes.len() - 1 {
            if magnitudes[i] > magnitudes[i - 1]
                && magnitudes[i] > magnitudes[i + 1]
                && magnitudes[i] > self.config.peak_threshold * max_magnitude
            {
                peaks += 1;
            }
        }

        if peaks >= self.config.min_peaks {
            Some((
                0.8,
                format!("Detected {} periodic peaks in request interval spectrum", peaks),
            ))
        } else {
            None
        }
    }

    /// Autocorrelation at lags 1..20 against the configured threshold.
    fn autocorrelation_score(&self, intervals: &Array1<f64>) -> Option<(f64, String)> {
        let n = intervals.len();
        let mean = intervals.mean().unwrap_or(0.0);
        let centered: Vec<f64> = intervals.iter().map(|v| v - mean).collect();

        let denominator: f64 = centered.iter().map(|v| v * v).sum();
        if denominator <= 0.0 {
            // Perfectly constant intervals: maximal self-similarity
            return Some((
                0.7,
                "Constant request intervals indicate automated timing".to_string(),
            ));
        }

        let mut significant_lags = Vec::new();
        for lag in 1..=20.min(n - 1) {
            let numerator: f64 = (0..n - lag).map(|i| centered[i] * centered[i + lag]).sum();
            if numerator / denominator > self.config.autocorr_threshold {
                significant_lags.push(lag);
            }
        }

        if significant_lags.is_empty() {
            None
        } else {
            let shown: Vec<String> = significant_lags
                .iter()
                .take(3)
                .map(|l| l.to_string())
                .collect();
            Some((
                0.7,
                format!("Detected autocorrelation at lags {}", shown.join(", ")),
            ))
        }
    }

    /// Request-rate change across fixed time windows.
    fn windowed_score(&self, timestamps: &[f64]) -> Option<(f64, String)> {
        let start = timestamps.first()?;
        let end = timestamps.last()?;
        let window = self.config.window_secs;
        let window_count = ((end - start) / window) as usize;
        if window_count < 2 {
            return None;
        }

        let mut frequencies = Vec::with_capacity(window_count);
        for i in 0..window_count {
            let window_start = start + i as f64 * window;
            let window_end = window_start + window;
            let count = timestamps
                .iter()
                .filter(|t| **t >= window_start && **t < window_end)
                .count();
            frequencies.push(count as f64 / window);
        }

        let max_change = frequencies
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).abs())
            .fold(0.0, f64::max);

        if max_change > self.config.change_threshold {
            Some((
                0.9,
                format!(
                    "Detected dramatic request-rate change of {:.2} req/s between windows",
                    max_change
                ),
            ))
        } else {
            None
        }
    }
}

impl Detector for TemporalDetector {
    fn name(&self) -> &'static str {
        "TemporalDetector"
    }

    fn detect(&self, actors: &mut [ActorProfile], context: &mut AnalysisContext) {
        let mut rhythmic = 0;

        for actor in actors.iter_mut() {
            if actor.events.len() < self.config.min_events {
                continue;
            }

            let mut timestamps: Vec<f64> = actor
                .events
                .iter()
                .map(|e| e.timestamp.timestamp() as f64)
                .collect();
            timestamps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let intervals: Vec<f64> = timestamps.windows(2).map(|p| p[1] - p[0]).collect();
            if intervals.len() < 5 {
                continue;
            }
            let intervals = Array1::from_vec(intervals);

            let mut findings = Vec::new();
            if let Some(finding) = self.spectral_score(&intervals) {
                findings.push(finding);
            }
            if let Some(finding) = self.autocorrelation_score(&intervals) {
                findings.push(finding);
            }
            if let Some(finding) = self.windowed_score(&timestamps) {
                findings.push(finding);
            }

            let best = findings
                .iter()
                .map(|(score, _)| *score)
                .fold(0.0, f64::max);

            if best > 0.5 {
                rhythmic += 1;
                actor.add_tag(TAG_BOT_ACTIVITY, EvidenceSource::TemporalDetector);
                for (score, details) in findings {
                    actor.add_evidence(
                        EvidenceSource::TemporalDetector,
                        "periodicity_detected",
                        details,
                        score,
                    );
                }
                log::debug!("{}: actor {} flagged as rhythmic", self.name(), actor.address);
            } else {
                // Explicit negative result - the meta-detector uses this to
                // spot bot tags that lack timing support.
                actor.add_evidence(
                    EvidenceSource::TemporalDetector,
                    "no_rhythm",
                    "No rhythmic pattern detected in request intervals",
                    0.3,
                );
            }
        }

        let total = actors.len();
        context.fft_summary = Some(FftSummary {
            total_actors: total,
            rhythmic_actors: rhythmic,
            prevalence: if total > 0 {
                rhythmic as f64 / total as f64
            } else {
                0.0
            },
        });
    }
}

// ============================================================================
// TESTS
// ============================================================================
