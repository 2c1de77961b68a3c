//! Meta-Detector - Cross-Validation Engine
//!
//! Hệ thống tự nghi ngờ chính nó: đối chiếu evidence từ các detector độc
//! lập, xác nhận hoặc mâu thuẫn, rồi điều chỉnh confidence.
//!
//! Decision functions are pure over an evidence-trail snapshot, so a fixed
//! trail always yields the same verdicts. Applying the verdicts mutates
//! confidence as deltas and therefore must run at most once per pipeline
//! execution - the pipeline stage cursor enforces that, not this component.

use crate::config::MetaConfig;
use crate::constants::{
    TAG_BOT_ACTIVITY, TAG_CONFIRMED_BOTNET, TAG_CONFIRMED_COORDINATED,
    TAG_CONFIRMED_SOPHISTICATED, TAG_FALSE_POSITIVE, TAG_INCONSISTENT_TIMING,
    TAG_ISOLATED_INDICATOR,
};
use crate::models::{ActorProfile, EvidenceRecord, EvidenceSource};
use crate::pipeline::context::MetaSummary;

// ============================================================================
// FINDINGS
// ============================================================================

/// One cross-validation verdict for a single actor.
#[derive(Debug, Clone)]
struct Finding {
    tag: &'static str,
    /// Sources whose evidence confidence is adjusted.
    sources: Vec<EvidenceSource>,
    /// Penalty magnitude for contradictions; confirmations use the boost.
    penalty: Option<f64>,
}

// ============================================================================
// META-DETECTOR
// ============================================================================

pub struct MetaDetector {
    confidence_boost: f64,
    confidence_penalty: f64,
}

impl MetaDetector {
    pub fn new(config: &MetaConfig) -> Self {
        Self {
            confidence_boost: config.confidence_boost,
            confidence_penalty: config.confidence_penalty,
        }
    }

    /// Cross-validate every actor with a non-empty evidence trail.
    pub fn detect(&self, actors: &mut [ActorProfile]) -> MetaSummary {
        log::info!("Running meta-detection on {} actors", actors.len());

        let mut summary = MetaSummary::default();

        for actor in actors.iter_mut() {
            if actor.evidence_trail.is_empty() {
                continue;
            }

            let confirmations = Self::find_confirmations(actor);
            let contradictions = self.find_contradictions(actor);

            let adjustments =
                self.apply_findings(actor, &confirmations, &contradictions, &mut summary);
            summary.confidence_adjustments += adjustments;

            if !confirmations.is_empty() {
                summary.confirmed_threats += 1;
                actor.evidence_trail.push(EvidenceRecord::new(
                    EvidenceSource::MetaDetector,
                    "cross_validation",
                    format!(
                        "Cross-validation confirmed {} threat patterns",
                        confirmations.len()
                    ),
                    0.9,
                ));
            }
            if !contradictions.is_empty() {
                summary.contradictions_resolved += 1;
                actor.evidence_trail.push(EvidenceRecord::new(
                    EvidenceSource::MetaDetector,
                    "cross_validation",
                    format!("Resolved {} contradictory indicators", contradictions.len()),
                    0.8,
                ));
            }
        }

        log::info!(
            "Meta-detection complete: {} confirmed, {} contradicted, {} adjustments",
            summary.confirmed_threats,
            summary.contradictions_resolved,
            summary.confidence_adjustments
        );
        summary
    }

    // ------------------------------------------------------------------
    // Confirmation rules (pure, independently testable)
    // ------------------------------------------------------------------

    /// Botnet: at least 2 of {temporal, clustering, anomaly} contributed
    /// evidence.
    pub fn confirm_botnet(actor: &ActorProfile) -> bool {
        Self::botnet_sources(actor).len() >= 2
    }

    fn botnet_sources(actor: &ActorProfile) -> Vec<EvidenceSource> {
        [
            EvidenceSource::TemporalDetector,
            EvidenceSource::BehavioralClustering,
            EvidenceSource::AnomalyDetector,
        ]
        .into_iter()
        .filter(|source| actor.has_evidence_from(*source))
        .collect()
    }

    /// Coordinated attack: graph analysis and anomaly detection agree.
    pub fn confirm_coordinated(actor: &ActorProfile) -> bool {
        actor.has_evidence_from(EvidenceSource::GraphDetector)
            && actor.has_evidence_from(EvidenceSource::AnomalyDetector)
    }

    /// Sophisticated attack: multiple attack vectors plus corroboration
    /// from heuristic enrichment or temporal analysis.
    pub fn confirm_sophisticated(actor: &ActorProfile) -> bool {
        actor.attack_tag_count() >= 2
            && (actor.has_evidence_from(EvidenceSource::HeuristicEnricher)
                || actor.has_evidence_from(EvidenceSource::TemporalDetector))
    }

    fn find_confirmations(actor: &ActorProfile) -> Vec<Finding> {
        let mut confirmations = Vec::new();

        if Self::confirm_botnet(actor) {
            confirmations.push(Finding {
                tag: TAG_CONFIRMED_BOTNET,
                sources: Self::botnet_sources(actor),
                penalty: None,
            });
        }
        if Self::confirm_coordinated(actor) {
            confirmations.push(Finding {
                tag: TAG_CONFIRMED_COORDINATED,
                sources: vec![
                    EvidenceSource::GraphDetector,
                    EvidenceSource::AnomalyDetector,
                ],
                penalty: None,
            });
        }
        if Self::confirm_sophisticated(actor) {
            confirmations.push(Finding {
                tag: TAG_CONFIRMED_SOPHISTICATED,
                sources: vec![
                    EvidenceSource::HeuristicEnricher,
                    EvidenceSource::TemporalDetector,
                    EvidenceSource::AnomalyDetector,
                ],
                penalty: None,
            });
        }

        confirmations
    }

    // ------------------------------------------------------------------
    // Contradiction rules (pure, independently testable)
    // ------------------------------------------------------------------

    /// Isolated indicator: an attack tag whose entire backing is a single
    /// uncorroborated heuristic entry.
    pub fn detect_isolated_indicator(actor: &ActorProfile) -> bool {
        actor.attack_tag_count() > 0
            && actor.evidence_trail.len() == 1
            && actor.evidence_trail[0].source == EvidenceSource::HeuristicEnricher
    }

    /// False positive: an anomaly entry describing normal behavior, or a
    /// graph entry describing low centrality.
    pub fn detect_false_positive(actor: &ActorProfile) -> bool {
        actor.evidence_trail.iter().any(|e| {
            let details = e.details.to_lowercase();
            (e.source == EvidenceSource::AnomalyDetector && details.contains("normal"))
                || (e.source == EvidenceSource::GraphDetector
                    && details.contains("low centrality"))
        })
    }

    /// Inconsistent timing: temporal analysis explicitly found no rhythm,
    /// yet the actor is independently tagged as bot activity.
    pub fn detect_inconsistent_timing(actor: &ActorProfile) -> bool {
        let no_rhythm = actor.evidence_trail.iter().any(|e| {
            e.source == EvidenceSource::TemporalDetector
                && e.details.to_lowercase().contains("no rhythmic")
        });
        no_rhythm && actor.has_tag(TAG_BOT_ACTIVITY)
    }

    fn find_contradictions(&self, actor: &ActorProfile) -> Vec<Finding> {
        let mut contradictions = Vec::new();

        if Self::detect_isolated_indicator(actor) {
            contradictions.push(Finding {
                tag: TAG_ISOLATED_INDICATOR,
                sources: vec![EvidenceSource::HeuristicEnricher],
                penalty: Some(self.confidence_penalty),
            });
        }
        if Self::detect_false_positive(actor) {
            contradictions.push(Finding {
                tag: TAG_FALSE_POSITIVE,
                sources: vec![
                    EvidenceSource::AnomalyDetector,
                    EvidenceSource::GraphDetector,
                ],
                penalty: Some(0.4),
            });
        }
        if Self::detect_inconsistent_timing(actor) {
            contradictions.push(Finding {
                tag: TAG_INCONSISTENT_TIMING,
                sources: vec![EvidenceSource::TemporalDetector],
                penalty: Some(0.2),
            });
        }

        contradictions
    }

    // ------------------------------------------------------------------
    // Application (mutates; at-most-once per pipeline execution)
    // ------------------------------------------------------------------

    /// Apply verdict tags and confidence deltas. Returns the number of
    /// evidence records whose confidence actually changed.
    fn apply_findings(
        &self,
        actor: &mut ActorProfile,
        confirmations: &[Finding],
        contradictions: &[Finding],
        summary: &mut MetaSummary,
    ) -> usize {
        let mut adjustments = 0;

        for finding in confirmations {
            if actor.tags.insert(finding.tag.to_string()) {
                summary.new_tags_added += 1;
            }
            for record in &mut actor.evidence_trail {
                if finding.sources.contains(&record.source)
                    && record.adjust_confidence(self.confidence_boost)
                {
                    adjustments += 1;
                }
            }
        }

        for finding in contradictions {
            if actor.tags.insert(finding.tag.to_string()) {
                summary.new_tags_added += 1;
            }
            let penalty = finding.penalty.unwrap_or(self.confidence_penalty);
            for record in &mut actor.evidence_trail {
                if finding.sources.contains(&record.source)
                    && record.adjust_confidence(-penalty)
                {
                    adjustments += 1;
                }
            }
        }

        adjustments
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> MetaDetector {
        MetaDetector::new(&MetaConfig::default())
    }

    fn actor() -> ActorProfile {
        ActorProfile::from_events("192.0.2.99".to_string(), vec![])
    }

    #[test]
    fn test_botnet_confirmation_boosts_contributing_sources() {
        let mut a = actor();
        a.add_evidence(EvidenceSource::TemporalDetector, "periodicity_detected", "rhythmic", 0.8);
        a.add_evidence(EvidenceSource::BehavioralClustering, "coordinated_attack_detected", "cluster", 0.8);
        a.add_evidence(EvidenceSource::AnomalyDetector, "anomaly_detected", "high score", 0.7);
        a.add_evidence(EvidenceSource::GraphDetector, "coordinator_detected", "central", 0.7);

        let mut actors = vec![a];
        let summary = detector().detect(&mut actors);
        let a = &actors[0];

        assert!(a.has_tag(TAG_CONFIRMED_BOTNET));
        assert_eq!(summary.confirmed_threats, 1);

        // All three botnet sources contributed, so all three are boosted.
        // Graph/anomaly also confirm coordination, so those two get a
        // second boost; confidence stays clamped at 1.0.
        let temporal = a
            .evidence_trail
            .iter()
            .find(|e| e.source == EvidenceSource::TemporalDetector)
            .unwrap();
        assert!((temporal.confidence - 1.0).abs() < 1e-9);

        for record in &a.evidence_trail {
            assert!(record.confidence >= 0.0 && record.confidence <= 1.0);
        }
    }

    #[test]
    fn test_coordinated_confirmation_requires_both_sources() {
        let mut a = actor();
        a.add_evidence(EvidenceSource::GraphDetector, "coordinator_detected", "central", 0.7);
        assert!(!MetaDetector::confirm_coordinated(&a));

        a.add_evidence(EvidenceSource::AnomalyDetector, "anomaly_detected", "high", 0.8);
        assert!(MetaDetector::confirm_coordinated(&a));
    }

    #[test]
    fn test_sophisticated_confirmation() {
        let mut a = actor();
        a.tags.insert("LFI_ATTACK".to_string());
        a.tags.insert("SQLI_ATTACK".to_string());
        assert!(!MetaDetector::confirm_sophisticated(&a));

        a.add_evidence(EvidenceSource::HeuristicEnricher, "heuristic_match", "lfi", 0.7);
        assert!(MetaDetector::confirm_sophisticated(&a));
    }

    #[test]
    fn test_isolated_indicator_penalizes_lone_heuristic_entry() {
        let mut a = actor();
        a.tags.insert("SQLI_ATTACK".to_string());
        a.add_evidence(EvidenceSource::HeuristicEnricher, "heuristic_match", "sqli", 0.7);

        let mut actors = vec![a];
        let summary = detector().detect(&mut actors);
        let a = &actors[0];

        assert!(a.has_tag(TAG_ISOLATED_INDICATOR));
        assert_eq!(summary.contradictions_resolved, 1);
        // 0.7 - 0.3 penalty; the trail also gains a meta summary entry
        assert!((a.evidence_trail[0].confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_isolated_indicator_needs_exactly_one_entry() {
        let mut a = actor();
        a.tags.insert("SQLI_ATTACK".to_string());
        a.add_evidence(EvidenceSource::HeuristicEnricher, "heuristic_match", "sqli", 0.7);
        a.add_evidence(EvidenceSource::TemporalDetector, "periodicity_detected", "rhythmic", 0.8);
        assert!(!MetaDetector::detect_isolated_indicator(&a));
    }

    #[test]
    fn test_false_positive_on_normal_anomaly_wording() {
        let mut a = actor();
        a.add_evidence(
            EvidenceSource::AnomalyDetector,
            "normal_baseline",
            "Request profile consistent with normal baseline",
            0.4,
        );
        assert!(MetaDetector::detect_false_positive(&a));

        let mut b = actor();
        b.add_evidence(EvidenceSource::GraphDetector, "low_centrality", "Low centrality (0.01) relative to batch average", 0.4);
        assert!(MetaDetector::detect_false_positive(&b));
    }

    #[test]
    fn test_inconsistent_timing_needs_bot_tag() {
        let mut a = actor();
        a.add_evidence(
            EvidenceSource::TemporalDetector,
            "no_rhythm",
            "No rhythmic pattern detected in request intervals",
            0.3,
        );
        assert!(!MetaDetector::detect_inconsistent_timing(&a));

        a.tags.insert(TAG_BOT_ACTIVITY.to_string());
        assert!(MetaDetector::detect_inconsistent_timing(&a));
    }

    #[test]
    fn test_decision_functions_idempotent_over_fixed_trail() {
        let mut a = actor();
        a.tags.insert("LFI_ATTACK".to_string());
        a.tags.insert("XSS_ATTACK".to_string());
        a.add_evidence(EvidenceSource::HeuristicEnricher, "heuristic_match", "lfi", 0.7);
        a.add_evidence(EvidenceSource::TemporalDetector, "periodicity_detected", "rhythmic", 0.8);

        let first = (
            MetaDetector::confirm_botnet(&a),
            MetaDetector::confirm_coordinated(&a),
            MetaDetector::confirm_sophisticated(&a),
            MetaDetector::detect_isolated_indicator(&a),
            MetaDetector::detect_false_positive(&a),
            MetaDetector::detect_inconsistent_timing(&a),
        );
        let second = (
            MetaDetector::confirm_botnet(&a),
            MetaDetector::confirm_coordinated(&a),
            MetaDetector::confirm_sophisticated(&a),
            MetaDetector::detect_isolated_indicator(&a),
            MetaDetector::detect_false_positive(&a),
            MetaDetector::detect_inconsistent_timing(&a),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_boost_clamped_at_one_penalty_floored_at_zero() {
        let mut a = actor();
        a.add_evidence(EvidenceSource::TemporalDetector, "periodicity_detected", "rhythmic", 0.95);
        a.add_evidence(EvidenceSource::AnomalyDetector, "anomaly_detected", "high", 0.9);
        // FALSE_POSITIVE wording on a graph record with low confidence
        a.add_evidence(EvidenceSource::GraphDetector, "low_centrality", "low centrality", 0.1);

        let mut actors = vec![a];
        detector().detect(&mut actors);

        for record in &actors[0].evidence_trail {
            assert!(record.confidence >= 0.0);
            assert!(record.confidence <= 1.0);
        }
    }

    #[test]
    fn test_actor_without_evidence_untouched() {
        let mut actors = vec![actor()];
        let summary = detector().detect(&mut actors);

        assert_eq!(summary.confirmed_threats, 0);
        assert_eq!(summary.contradictions_resolved, 0);
        assert!(actors[0].evidence_trail.is_empty());
        assert!(actors[0].tags.is_empty());
    }

    #[test]
    fn test_summary_counts_adjustments() {
        let mut a = actor();
        a.add_evidence(EvidenceSource::TemporalDetector, "periodicity_detected", "rhythmic", 0.5);
        a.add_evidence(EvidenceSource::BehavioralClustering, "coordinated_attack_detected", "cluster", 0.5);

        let mut actors = vec![a];
        let summary = detector().detect(&mut actors);

        assert_eq!(summary.confirmed_threats, 1);
        assert_eq!(summary.confidence_adjustments, 2);
        assert_eq!(summary.new_tags_added, 1);
    }
}
