//! Scoring Module
//!
//! Đây là CORE STEP - nơi tags + metrics + context trở thành threat score.
//!
//! ## Structure
//! - `conditions`: closed modifier-condition vocabulary
//! - `rules`: the rules engine (base score, combinations, context, global)
//! - `cluster`: standardization + DBSCAN over behavioral vectors
//!
//! The `ScoringEngine` here orchestrates: it scores every actor through the
//! rules engine and materializes threat campaigns from behavioral clusters.

pub mod cluster;
pub mod conditions;
pub mod rules;

use crate::config::ScoringConfig;
use crate::constants::{
    CLUSTER_EPS, CLUSTER_MIN_SAMPLES, TAG_COORDINATED_ATTACK, TAG_ISOLATED_ATTACKER,
    TAG_PAIRED_ATTACK,
};
use crate::models::{ActorProfile, EvidenceSource, ThreatCampaign};
use crate::pipeline::context::AnalysisContext;
use rules::ScoringRulesEngine;

// ============================================================================
// SCORING ENGINE
// ============================================================================

/// Orchestrates the scoring process over a batch of actors.
pub struct ScoringEngine {
    rules: ScoringRulesEngine,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            rules: ScoringRulesEngine::new(config),
        }
    }

    /// Score every actor with the rules engine and record the evidence.
    pub fn score_actors(&self, actors: &mut [ActorProfile], context: &AnalysisContext) {
        log::info!("Scoring {} actors with rules engine", actors.len());

        for actor in actors.iter_mut() {
            let (final_score, evidence) = self.rules.calculate_score(actor, context);
            actor.threat_score = final_score;

            let had_evidence = !evidence.is_empty();
            actor.evidence_trail.extend(evidence);

            if had_evidence || !actor.tags.is_empty() {
                actor.add_evidence(
                    EvidenceSource::ScoringEngine,
                    "threat_score_calculated",
                    format!("Final threat score: {:.2}", final_score),
                    0.9,
                );
            }
        }
    }

    /// Cluster actors into campaigns by behavioral vector.
    ///
    /// Members of clusters are tagged by cluster size; unclustered actors
    /// with meaningful vectors are tagged isolated. One campaign is
    /// materialized per non-noise cluster. Fewer than two actors with
    /// meaningful vectors yields no campaigns.
    pub fn cluster_campaigns(&self, actors: &mut [ActorProfile]) -> Vec<ThreatCampaign> {
        log::info!("Clustering {} actors into campaigns", actors.len());

        let Some(assignment) =
            cluster::assign_behavior_clusters(actors, CLUSTER_EPS, CLUSTER_MIN_SAMPLES)
        else {
            return Vec::new();
        };

        let clusters = assignment.clusters();

        for (cluster_id, members) in &clusters {
            if members.len() >= 3 {
                for &index in members {
                    actors[index].tag_with_evidence(
                        TAG_COORDINATED_ATTACK,
                        EvidenceSource::ScoringEngine,
                        "coordinated_attack_detected",
                        format!(
                            "Part of coordinated cluster {} with {} actors",
                            cluster_id,
                            members.len()
                        ),
                        0.8,
                    );
                }
            } else if members.len() == 2 {
                for &index in members {
                    actors[index].tag_with_evidence(
                        TAG_PAIRED_ATTACK,
                        EvidenceSource::ScoringEngine,
                        "paired_attack_detected",
                        format!("Part of attack pair in cluster {}", cluster_id),
                        0.6,
                    );
                }
            }
        }

        for index in assignment.isolated() {
            actors[index].tag_with_evidence(
                TAG_ISOLATED_ATTACKER,
                EvidenceSource::ScoringEngine,
                "isolated_attacker_detected",
                "Actor shows unique behavioral pattern",
                0.5,
            );
        }

        let mut campaigns = Vec::new();
        for (cluster_id, members) in &clusters {
            let member_refs: Vec<&ActorProfile> =
                members.iter().map(|&index| &actors[index]).collect();
            let mut campaign =
                ThreatCampaign::from_members(format!("campaign_{}", cluster_id), &member_refs);
            campaign.add_evidence(
                EvidenceSource::ScoringEngine,
                "campaign_created",
                format!(
                    "Created campaign with {} actors using behavioral clustering",
                    members.len()
                ),
                1.0,
            );
            campaigns.push(campaign);
        }

        log::info!("Created {} campaigns from {} actors", campaigns.len(), actors.len());
        campaigns
    }
}

// ============================================================================
// TESTS
// ============================================================================
