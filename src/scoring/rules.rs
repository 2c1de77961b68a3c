//! Scoring Rules Engine
//!
//! CORE LOGIC - deterministic, auditable translation of
//! {actor tags, actor metrics, global context} -> (threat score, evidence).
//!
//! Score composition:
//!   final = base(tags, tag modifiers)
//!         x combination (configured x built-in dynamic table)
//!         x contextual (detector summaries)
//!         x global (attack scale indicators)
//!
//! No floor/ceiling clamp is applied - relative severity ordering is
//! preserved and reporting may clip for display only. Total over arbitrary
//! tag sets: no branch can fail.

use crate::config::ScoringConfig;
use crate::constants::{COORDINATION_TAGS, SCAN_TAGS, TAG_ANOMALOUS, TAG_AUTOMATED_SCAN};
use crate::models::{ActorProfile, EvidenceRecord, EvidenceSource};
use crate::pipeline::context::AnalysisContext;

// ============================================================================
// RULES ENGINE
// ============================================================================

pub struct ScoringRulesEngine {
    config: ScoringConfig,
}

impl ScoringRulesEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Calculate the threat score for one actor.
    ///
    /// Returns the final score and the ordered evidence of every modifier
    /// applied. An actor with no tags scores exactly 0.0 with no evidence.
    pub fn calculate_score(
        &self,
        actor: &ActorProfile,
        context: &AnalysisContext,
    ) -> (f64, Vec<EvidenceRecord>) {
        if actor.tags.is_empty() {
            return (0.0, Vec::new());
        }

        let mut evidence = Vec::new();

        let base_score = self.calculate_base_score(actor, &mut evidence);
        let combination_modifier = self.calculate_combination_modifier(actor, &mut evidence);
        let contextual_modifier = self.calculate_contextual_modifier(actor, context, &mut evidence);
        let global_modifier = self.calculate_global_modifier(context, &mut evidence);

        let final_score = base_score * combination_modifier * contextual_modifier * global_modifier;
        (final_score, evidence)
    }

    /// Base score: sum of configured per-tag scores, with each profile's
    /// satisfied modifiers compounding multiplicatively against the running
    /// total. Tags without a profile contribute 0 and are silently ignored.
    ///
    /// Iteration is sorted-tag order, then declaration order within a
    /// profile, so the cumulative compounding is deterministic.
    fn calculate_base_score(
        &self,
        actor: &ActorProfile,
        evidence: &mut Vec<EvidenceRecord>,
    ) -> f64 {
        let mut base_score = 0.0;

        for tag in &actor.tags {
            let Some(profile) = self.config.scoring_profiles.get(tag) else {
                continue;
            };
            base_score += profile.base_score;

            for rule in &profile.modifiers {
                if rule.condition.evaluate(actor, rule.threshold) {
                    base_score *= rule.value;
                    let details = rule.evidence.clone().unwrap_or_else(|| {
                        format!("Applied {} modifier: {}", tag, rule.value)
                    });
                    evidence.push(EvidenceRecord::new(
                        EvidenceSource::RulesEngine,
                        "modifier_applied",
                        details,
                        0.7,
                    ));
                }
            }
        }

        base_score
    }

    /// Configured tag combinations (superset test) compounded with the
    /// built-in dynamic combination table.
    fn calculate_combination_modifier(
        &self,
        actor: &ActorProfile,
        evidence: &mut Vec<EvidenceRecord>,
    ) -> f64 {
        let mut modifier = 1.0;

        for (combination, config) in &self.config.tag_combinations {
            let required: Vec<&str> = combination.split('+').collect();
            if required.iter().all(|tag| actor.tags.contains(*tag)) {
                modifier *= config.multiplier;
                let details = config
                    .evidence
                    .clone()
                    .unwrap_or_else(|| format!("Detected tag combination: {}", combination));
                evidence.push(EvidenceRecord::new(
                    EvidenceSource::RulesEngine,
                    "combination_detected",
                    details,
                    0.8,
                ));
            }
        }

        modifier * Self::dynamic_combination_modifier(actor)
    }

    /// Built-in, non-configurable amplification based on tag interactions.
    /// The multipliers compound with each other and with the configured
    /// combination multiplier.
    fn dynamic_combination_modifier(actor: &ActorProfile) -> f64 {
        let mut modifier = 1.0;

        let attack_count = actor.attack_tag_count();
        if attack_count >= 3 {
            modifier *= 2.0;
        } else if attack_count == 2 {
            modifier *= 1.5;
        }

        if attack_count > 0 {
            if actor.has_any_tag(&COORDINATION_TAGS) {
                modifier *= 1.8;
            }
            if actor.has_any_tag(&SCAN_TAGS) {
                modifier *= 1.3;
            }
            if actor.has_tag(TAG_ANOMALOUS) {
                modifier *= 1.4;
            }
        }

        modifier
    }

    /// Contextual modifier from the detector summaries. Boost paths record
    /// evidence; dampening paths only scale.
    fn calculate_contextual_modifier(
        &self,
        actor: &ActorProfile,
        context: &AnalysisContext,
        evidence: &mut Vec<EvidenceRecord>,
    ) -> f64 {
        let mut modifier = 1.0;

        if let Some(fft) = &context.fft_summary {
            if fft.prevalence > 0.5 {
                if actor.has_tag(TAG_AUTOMATED_SCAN) {
                    modifier *= 1.2;
                    evidence.push(EvidenceRecord::new(
                        EvidenceSource::RulesEngine,
                        "contextual_modifier",
                        format!(
                            "Part of widespread automated attack (prevalence: {:.2})",
                            fft.prevalence
                        ),
                        0.6,
                    ));
                } else {
                    modifier *= 0.8;
                }
            }
        }

        if let Some(graph) = &context.graph_summary {
            if actor.centrality > graph.avg_centrality * 2.0 {
                modifier *= 1.3;
                evidence.push(EvidenceRecord::new(
                    EvidenceSource::RulesEngine,
                    "contextual_modifier",
                    format!(
                        "High centrality ({:.2}) in coordinated environment",
                        actor.centrality
                    ),
                    0.7,
                ));
            } else if actor.centrality < graph.avg_centrality * 0.5 {
                modifier *= 0.9;
            }
        }

        if let Some(anomaly) = &context.anomaly_summary {
            if anomaly.anomaly_rate > 0.3 {
                if actor.anomaly_ratio > 0.7 {
                    modifier *= 1.4;
                    evidence.push(EvidenceRecord::new(
                        EvidenceSource::RulesEngine,
                        "contextual_modifier",
                        format!(
                            "Highly anomalous in anomalous environment (rate: {:.2})",
                            anomaly.anomaly_rate
                        ),
                        0.8,
                    ));
                } else {
                    modifier *= 0.7;
                }
            }
        }

        if let Some(clustering) = &context.clustering_summary {
            if clustering.largest_cluster >= 5 && actor.has_any_tag(&COORDINATION_TAGS) {
                modifier *= 1.5;
                evidence.push(EvidenceRecord::new(
                    EvidenceSource::RulesEngine,
                    "contextual_modifier",
                    format!(
                        "Part of large coordinated attack (cluster size: {})",
                        clustering.largest_cluster
                    ),
                    0.8,
                ));
            }
        }

        modifier
    }

    /// Global modifier from overall attack scale and coordination.
    fn calculate_global_modifier(
        &self,
        context: &AnalysisContext,
        evidence: &mut Vec<EvidenceRecord>,
    ) -> f64 {
        let mut modifier = 1.0;

        let total_actors = context.max_total_actors();
        if total_actors > 100 {
            modifier *= 1.2;
            evidence.push(EvidenceRecord::new(
                EvidenceSource::RulesEngine,
                "global_modifier",
                format!("Large-scale attack detected ({} actors)", total_actors),
                0.7,
            ));
        } else if total_actors > 50 {
            modifier *= 1.1;
            evidence.push(EvidenceRecord::new(
                EvidenceSource::RulesEngine,
                "global_modifier",
                format!("Medium-scale attack detected ({} actors)", total_actors),
                0.6,
            ));
        }

        if let Some(graph) = &context.graph_summary {
            if graph.coordinators > 5 {
                modifier *= 1.3;
                evidence.push(EvidenceRecord::new(
                    EvidenceSource::RulesEngine,
                    "global_modifier",
                    format!("Highly coordinated attack ({} coordinators)", graph.coordinators),
                    0.8,
                ));
            }
        }

        if let Some(anomaly) = &context.anomaly_summary {
            if anomaly.anomalies > 10 {
                modifier *= 1.2;
                evidence.push(EvidenceRecord::new(
                    EvidenceSource::RulesEngine,
                    "global_modifier",
                    format!("High anomaly rate ({} anomalous actors)", anomaly.anomalies),
                    0.7,
                ));
            }
        }

        modifier
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::{
        AnomalySummary, ClusteringSummary, FftSummary, GraphSummary,
    };

    fn engine(yaml: &str) -> ScoringRulesEngine {
        ScoringRulesEngine::new(serde_yaml::from_str(yaml).unwrap())
    }

    fn standard_engine() -> ScoringRulesEngine {
        engine(
            r#"
scoring_profiles:
  LFI_RFI:
    base_score: 8.0
    modifiers:
      - if: high_entropy
        value: 1.3
        evidence: "LFI/RFI with high entropy"
      - if: coordinated_attack
        value: 1.5
        evidence: "LFI/RFI as part of coordinated attack"
  AUTOMATED_SCAN:
    base_score: 4.0
  COORDINATOR:
    base_score: 5.0
    modifiers:
      - if: high_centrality
        value: 1.4
        evidence: "High centrality coordinator"
tag_combinations:
  "LFI_RFI+COORDINATED_ATTACK":
    multiplier: 1.8
    evidence: "LFI/RFI in coordinated attack - highly dangerous"
"#,
        )
    }

    fn actor_with_tags(tags: &[&str]) -> ActorProfile {
        let mut actor = ActorProfile::from_events("192.0.2.10".to_string(), vec![]);
        for tag in tags {
            actor.tags.insert(tag.to_string());
        }
        actor.avg_entropy = 3.0;
        actor.url_diversity_ratio = 0.5;
        actor.centrality = 0.3;
        actor.anomaly_ratio = 0.4;
        actor
    }

    #[test]
    fn test_empty_tags_score_zero_no_evidence() {
        let engine = standard_engine();
        let actor = actor_with_tags(&[]);

        // A hot context must not leak evidence into an untagged actor
        let mut ctx = AnalysisContext::new();
        ctx.anomaly_summary = Some(AnomalySummary {
            total_actors: 200,
            anomalies: 50,
            anomaly_rate: 0.9,
        });

        let (score, evidence) = engine.calculate_score(&actor, &ctx);
        assert_eq!(score, 0.0);
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_single_tag_base_score_exact() {
        let engine = standard_engine();
        let actor = actor_with_tags(&["LFI_RFI"]);

        let (score, evidence) = engine.calculate_score(&actor, &AnalysisContext::new());
        assert_eq!(score, 8.0);
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_unprofiled_tags_contribute_zero() {
        let engine = standard_engine();
        let actor = actor_with_tags(&["SOMETHING_NOBODY_CONFIGURED"]);

        let (score, evidence) = engine.calculate_score(&actor, &AnalysisContext::new());
        assert_eq!(score, 0.0);
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_single_modifier_multiplies_base() {
        let engine = standard_engine();
        let mut actor = actor_with_tags(&["LFI_RFI"]);
        actor.avg_entropy = 5.0;

        let (score, evidence) = engine.calculate_score(&actor, &AnalysisContext::new());
        assert!((score - 8.0 * 1.3).abs() < 1e-6);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].kind, "modifier_applied");
        assert!((evidence[0].confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_two_modifiers_commute() {
        let engine = standard_engine();
        let mut actor = actor_with_tags(&["LFI_RFI", "COORDINATED_ATTACK"]);
        actor.avg_entropy = 5.0;

        let (score, evidence) = engine.calculate_score(&actor, &AnalysisContext::new());
        // base 8.0 x 1.3 x 1.5, then configured combination 1.8
        assert!((score - 8.0 * 1.3 * 1.5 * 1.8).abs() < 1e-6);
        assert_eq!(
            evidence.iter().filter(|e| e.kind == "modifier_applied").count(),
            2
        );
    }

    #[test]
    fn test_configured_combination() {
        let engine = engine(
            r#"
scoring_profiles:
  LFI_RFI:
    base_score: 8.0
tag_combinations:
  "LFI_RFI+COORDINATED_ATTACK":
    multiplier: 1.8
"#,
        );
        let actor = actor_with_tags(&["LFI_RFI", "COORDINATED_ATTACK"]);

        let (score, evidence) = engine.calculate_score(&actor, &AnalysisContext::new());
        // LFI_RFI is not in the canonical attack-tag set, so no dynamic
        // coordination amplification applies here.
        assert!((score - 14.4).abs() < 1e-6);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].kind, "combination_detected");
        assert!((evidence[0].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_combination_is_monotonic_over_supersets() {
        let engine = standard_engine();
        let base = actor_with_tags(&["LFI_RFI", "COORDINATED_ATTACK"]);
        let superset = actor_with_tags(&["LFI_RFI", "COORDINATED_ATTACK", "EXTRA_TAG"]);

        let (base_score, _) = engine.calculate_score(&base, &AnalysisContext::new());
        let (superset_score, _) = engine.calculate_score(&superset, &AnalysisContext::new());
        assert!((base_score - superset_score).abs() < 1e-9);
    }

    #[test]
    fn test_dynamic_attack_count_multipliers() {
        let engine = engine(
            r#"
scoring_profiles:
  LFI_ATTACK:
    base_score: 8.0
"#,
        );

        let two = actor_with_tags(&["LFI_ATTACK", "SQLI_ATTACK"]);
        let (score, _) = engine.calculate_score(&two, &AnalysisContext::new());
        assert!((score - 8.0 * 1.5).abs() < 1e-6);

        let three = actor_with_tags(&["LFI_ATTACK", "SQLI_ATTACK", "XSS_ATTACK"]);
        let (score, _) = engine.calculate_score(&three, &AnalysisContext::new());
        assert!((score - 8.0 * 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_dynamic_coordination_scan_anomaly_compound() {
        let engine = engine(
            r#"
scoring_profiles:
  LFI_ATTACK:
    base_score: 10.0
"#,
        );

        let actor = actor_with_tags(&["LFI_ATTACK", "COORDINATOR", "AUTOMATED_SCAN", "ANOMALOUS"]);
        let (score, _) = engine.calculate_score(&actor, &AnalysisContext::new());
        assert!((score - 10.0 * 1.8 * 1.3 * 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_contextual_prevalence_boost() {
        let engine = standard_engine();
        let actor = actor_with_tags(&["AUTOMATED_SCAN"]);

        let mut ctx = AnalysisContext::new();
        ctx.fft_summary = Some(FftSummary {
            total_actors: 10,
            rhythmic_actors: 6,
            prevalence: 0.6,
        });

        let (score, evidence) = engine.calculate_score(&actor, &ctx);
        assert!((score - 4.0 * 1.2).abs() < 1e-6);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].kind, "contextual_modifier");
        assert!((evidence[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_contextual_prevalence_dampens_non_scanners() {
        let engine = standard_engine();
        let actor = actor_with_tags(&["LFI_RFI"]);

        let mut ctx = AnalysisContext::new();
        ctx.fft_summary = Some(FftSummary {
            total_actors: 10,
            rhythmic_actors: 6,
            prevalence: 0.6,
        });

        let (score, evidence) = engine.calculate_score(&actor, &ctx);
        assert!((score - 8.0 * 0.8).abs() < 1e-6);
        // Dampening paths do not record evidence
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_contextual_centrality_rules() {
        let engine = standard_engine();
        let mut ctx = AnalysisContext::new();
        ctx.graph_summary = Some(GraphSummary {
            total_actors: 10,
            coordinators: 0,
            cluster_members: 0,
            communities: 1,
            avg_centrality: 0.2,
        });

        let mut high = actor_with_tags(&["LFI_RFI"]);
        high.centrality = 0.5;
        let (score, _) = engine.calculate_score(&high, &ctx);
        assert!((score - 8.0 * 1.3).abs() < 1e-6);

        let mut low = actor_with_tags(&["LFI_RFI"]);
        low.centrality = 0.05;
        let (score, _) = engine.calculate_score(&low, &ctx);
        assert!((score - 8.0 * 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_contextual_anomaly_environment() {
        let engine = standard_engine();
        let mut ctx = AnalysisContext::new();
        ctx.anomaly_summary = Some(AnomalySummary {
            total_actors: 10,
            anomalies: 4,
            anomaly_rate: 0.4,
        });

        let mut anomalous = actor_with_tags(&["LFI_RFI"]);
        anomalous.anomaly_ratio = 0.8;
        let (score, _) = engine.calculate_score(&anomalous, &ctx);
        assert!((score - 8.0 * 1.4).abs() < 1e-6);

        let normal = actor_with_tags(&["LFI_RFI"]);
        let (score, _) = engine.calculate_score(&normal, &ctx);
        assert!((score - 8.0 * 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_contextual_large_cluster_coordination() {
        let engine = standard_engine();
        let mut ctx = AnalysisContext::new();
        ctx.clustering_summary = Some(ClusteringSummary {
            total_actors: 10,
            clusters: 1,
            isolated_actors: 2,
            largest_cluster: 6,
        });

        let actor = actor_with_tags(&["LFI_RFI", "COORDINATED_ATTACK"]);
        let (score, _) = engine.calculate_score(&actor, &ctx);
        // profile modifier 1.5 (coordination tag), configured combination
        // 1.8, then the cluster boost 1.5
        assert!((score - 8.0 * 1.5 * 1.8 * 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_global_modifiers_compound() {
        let engine = standard_engine();
        let actor = actor_with_tags(&["LFI_RFI"]);

        let mut ctx = AnalysisContext::new();
        ctx.fft_summary = Some(FftSummary {
            total_actors: 150,
            rhythmic_actors: 0,
            prevalence: 0.0,
        });
        ctx.graph_summary = Some(GraphSummary {
            total_actors: 150,
            coordinators: 8,
            cluster_members: 0,
            communities: 1,
            avg_centrality: 0.0,
        });

        let (score, evidence) = engine.calculate_score(&actor, &ctx);
        assert!((score - 8.0 * 1.2 * 1.3).abs() < 1e-6);
        assert_eq!(
            evidence.iter().filter(|e| e.kind == "global_modifier").count(),
            2
        );
    }

    #[test]
    fn test_global_medium_scale_band() {
        let engine = standard_engine();
        let actor = actor_with_tags(&["LFI_RFI"]);

        let mut ctx = AnalysisContext::new();
        ctx.fft_summary = Some(FftSummary {
            total_actors: 60,
            rhythmic_actors: 0,
            prevalence: 0.0,
        });

        let (score, _) = engine.calculate_score(&actor, &ctx);
        assert!((score - 8.0 * 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_missing_config_sections_score_zero() {
        let engine = ScoringRulesEngine::new(ScoringConfig::default());
        let actor = actor_with_tags(&["LFI_RFI", "COORDINATED_ATTACK"]);

        let (score, evidence) = engine.calculate_score(&actor, &AnalysisContext::new());
        assert_eq!(score, 0.0);
        assert!(evidence.is_empty());
    }
}
