//! Analysis Context
//!
//! Typed shared context passed stage-to-stage. Each detector fills in its
//! own summary section; scoring reads them read-only. Replaces an untyped
//! mapping so consumers get checked access instead of defensive lookups.

use serde::Serialize;

// ============================================================================
// PIPELINE STAGES
// ============================================================================

/// Fixed stage order of the batch pipeline.
///
/// Stage order is a correctness dependency: later stages read context
/// sections written by earlier ones, and meta-detection must run at most
/// once. `AnalysisContext::enter_stage` asserts the order at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Ingestion,
    Enrichment,
    Profiling,
    Detection,
    MetaDetection,
    Scoring,
    Clustering,
    Reporting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingestion => "ingestion",
            Stage::Enrichment => "enrichment",
            Stage::Profiling => "profiling",
            Stage::Detection => "detection",
            Stage::MetaDetection => "meta_detection",
            Stage::Scoring => "scoring",
            Stage::Clustering => "clustering",
            Stage::Reporting => "reporting",
        }
    }
}

// ============================================================================
// DETECTOR SUMMARIES
// ============================================================================

/// Temporal analysis roll-up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FftSummary {
    pub total_actors: usize,
    pub rhythmic_actors: usize,
    /// Share of actors exhibiting rhythmic request timing.
    pub prevalence: f64,
}

/// Similarity-graph analysis roll-up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphSummary {
    pub total_actors: usize,
    pub coordinators: usize,
    pub cluster_members: usize,
    pub communities: usize,
    pub avg_centrality: f64,
}

/// Statistical anomaly roll-up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnomalySummary {
    pub total_actors: usize,
    pub anomalies: usize,
    pub anomaly_rate: f64,
}

/// Behavioral clustering roll-up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusteringSummary {
    pub total_actors: usize,
    pub clusters: usize,
    pub isolated_actors: usize,
    pub largest_cluster: usize,
}

/// Cross-validation roll-up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetaSummary {
    /// Actors with at least one confirmation.
    pub confirmed_threats: usize,
    /// Actors with at least one resolved contradiction.
    pub contradictions_resolved: usize,
    /// Evidence records whose confidence actually changed.
    pub confidence_adjustments: usize,
    /// Verdict tags newly added across all actors.
    pub new_tags_added: usize,
}

// ============================================================================
// ANALYSIS CONTEXT
// ============================================================================

/// Shared, read-mostly summary statistics produced by detectors and
/// consumed by scoring.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisContext {
    stage: Stage,
    pub fft_summary: Option<FftSummary>,
    pub graph_summary: Option<GraphSummary>,
    pub anomaly_summary: Option<AnomalySummary>,
    pub clustering_summary: Option<ClusteringSummary>,
    pub meta_summary: Option<MetaSummary>,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self {
            stage: Stage::Ingestion,
            fft_summary: None,
            graph_summary: None,
            anomaly_summary: None,
            clustering_summary: None,
            meta_summary: None,
        }
    }
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Advance the stage cursor. Moving backwards violates the pipeline
    /// order precondition; re-entering `MetaDetection` would double-apply
    /// confidence adjustments.
    pub fn enter_stage(&mut self, stage: Stage) {
        assert!(
            stage >= self.stage,
            "pipeline stage order violated: {} after {}",
            stage.as_str(),
            self.stage.as_str()
        );
        if stage == Stage::MetaDetection {
            assert!(
                self.stage < Stage::MetaDetection,
                "meta-detection must run at most once per pipeline execution"
            );
        }
        self.stage = stage;
    }

    /// Largest actor count any detector reported. Used by the global
    /// scoring modifier to gauge overall attack scale.
    pub fn max_total_actors(&self) -> usize {
        let mut total = 0;
        if let Some(s) = &self.fft_summary {
            total = total.max(s.total_actors);
        }
        if let Some(s) = &self.graph_summary {
            total = total.max(s.total_actors);
        }
        if let Some(s) = &self.anomaly_summary {
            total = total.max(s.total_actors);
        }
        if let Some(s) = &self.clustering_summary {
            total = total.max(s.total_actors);
        }
        total
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_forward_ok() {
        let mut ctx = AnalysisContext::new();
        ctx.enter_stage(Stage::Enrichment);
        ctx.enter_stage(Stage::Detection);
        ctx.enter_stage(Stage::Scoring);
        assert_eq!(ctx.stage(), Stage::Scoring);
    }

    #[test]
    #[should_panic(expected = "stage order violated")]
    fn test_stage_order_backwards_panics() {
        let mut ctx = AnalysisContext::new();
        ctx.enter_stage(Stage::Scoring);
        ctx.enter_stage(Stage::Detection);
    }

    #[test]
    #[should_panic(expected = "at most once")]
    fn test_meta_detection_reentry_panics() {
        let mut ctx = AnalysisContext::new();
        ctx.enter_stage(Stage::MetaDetection);
        ctx.enter_stage(Stage::MetaDetection);
    }

    #[test]
    fn test_max_total_actors_over_summaries() {
        let mut ctx = AnalysisContext::new();
        assert_eq!(ctx.max_total_actors(), 0);

        ctx.fft_summary = Some(FftSummary {
            total_actors: 40,
            ..Default::default()
        });
        ctx.anomaly_summary = Some(AnomalySummary {
            total_actors: 120,
            ..Default::default()
        });
        assert_eq!(ctx.max_total_actors(), 120);
    }
}
