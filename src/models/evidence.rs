//! Evidence Types
//!
//! Core types cho evidence trail.
//! KHÔNG chứa logic - chỉ data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// EVIDENCE SOURCE
// ============================================================================

/// Component that emitted an evidence record.
///
/// Closed enumeration so cross-validation can test provenance without
/// substring matching on free-form names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceSource {
    /// Per-event heuristic enrichment promoted to actor level
    HeuristicEnricher,
    /// External IoC feed match
    IocIntel,
    /// Temporal / spectral periodicity analysis
    TemporalDetector,
    /// Behavioral similarity graph analysis
    GraphDetector,
    /// Statistical anomaly detection
    AnomalyDetector,
    /// Behavioral vector clustering
    BehavioralClustering,
    /// Cross-validation engine
    MetaDetector,
    /// Scoring rules engine
    RulesEngine,
    /// Scoring orchestration / campaign building
    ScoringEngine,
}

impl EvidenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceSource::HeuristicEnricher => "HeuristicEnricher",
            EvidenceSource::IocIntel => "IocIntel",
            EvidenceSource::TemporalDetector => "TemporalDetector",
            EvidenceSource::GraphDetector => "GraphDetector",
            EvidenceSource::AnomalyDetector => "AnomalyDetector",
            EvidenceSource::BehavioralClustering => "BehavioralClustering",
            EvidenceSource::MetaDetector => "MetaDetector",
            EvidenceSource::RulesEngine => "RulesEngine",
            EvidenceSource::ScoringEngine => "ScoringEngine",
        }
    }
}

impl std::fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// EVIDENCE RECORD
// ============================================================================

/// One entry in an append-only evidence trail.
///
/// Confidence is always kept in [0.0, 1.0]. After creation the only
/// permitted mutation is a confidence adjustment by the meta-detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub timestamp: DateTime<Utc>,
    pub source: EvidenceSource,
    /// Category of the finding, e.g. "tag_added", "modifier_applied"
    pub kind: String,
    /// Human-readable details
    pub details: String,
    /// Trust in this entry, clamped to [0.0, 1.0]
    pub confidence: f64,
}

impl EvidenceRecord {
    pub fn new(
        source: EvidenceSource,
        kind: &str,
        details: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            kind: kind.to_string(),
            details: details.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Apply a confidence delta, clamping the result to [0.0, 1.0].
    ///
    /// Returns `true` when the stored value actually changed, so the
    /// meta-detector can count effective adjustments.
    pub fn adjust_confidence(&mut self, delta: f64) -> bool {
        let adjusted = (self.confidence + delta).clamp(0.0, 1.0);
        if (adjusted - self.confidence).abs() > f64::EPSILON {
            self.confidence = adjusted;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
