//! Threat Campaign Model
//!
//! A cluster of actors believed to act in concert. Created once during
//! campaign clustering; never re-clustered.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::actor::ActorProfile;
use crate::models::evidence::{EvidenceRecord, EvidenceSource};

// ============================================================================
// THREAT CAMPAIGN
// ============================================================================

/// Campaign-level aggregate over a cluster of actors.
///
/// A campaign does not own its actors - it records their addresses and the
/// aggregates derived from them at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatCampaign {
    pub campaign_id: String,
    pub actor_addresses: Vec<String>,
    /// Mean of member threat scores.
    pub threat_score: f64,
    /// Union of member tags.
    pub primary_tags: BTreeSet<String>,
    /// Most frequent tag across members. Ties broken by lexicographically
    /// smallest tag so the result is deterministic.
    pub campaign_type: String,
    pub evidence_trail: Vec<EvidenceRecord>,
}

impl ThreatCampaign {
    pub fn from_members(campaign_id: String, members: &[&ActorProfile]) -> Self {
        let mut campaign = Self {
            campaign_id,
            actor_addresses: members.iter().map(|a| a.address.clone()).collect(),
            threat_score: 0.0,
            primary_tags: BTreeSet::new(),
            campaign_type: "unknown".to_string(),
            evidence_trail: Vec::new(),
        };

        if members.is_empty() {
            return campaign;
        }

        let total: f64 = members.iter().map(|a| a.threat_score).sum();
        campaign.threat_score = total / members.len() as f64;

        for actor in members {
            campaign.primary_tags.extend(actor.tags.iter().cloned());
        }

        // Tag frequency across members; BTreeMap iteration yields the
        // lexicographically smallest tag first among equal counts.
        let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for actor in members {
            for tag in &actor.tags {
                *tag_counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }
        if let Some((tag, _)) = tag_counts.iter().max_by(|a, b| {
            a.1.cmp(b.1).then_with(|| b.0.cmp(a.0))
        }) {
            campaign.campaign_type = (*tag).to_string();
        }

        campaign
    }

    pub fn member_count(&self) -> usize {
        self.actor_addresses.len()
    }

    pub fn add_evidence(
        &mut self,
        source: EvidenceSource,
        kind: &str,
        details: impl Into<String>,
        confidence: f64,
    ) {
        self.evidence_trail
            .push(EvidenceRecord::new(source, kind, details, confidence));
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn actor_with(address: &str, score: f64, tags: &[&str]) -> ActorProfile {
        let mut actor = ActorProfile::from_events(address.to_string(), vec![]);
        actor.threat_score = score;
        for tag in tags {
            actor.tags.insert(tag.to_string());
        }
        actor
    }

    #[test]
    fn test_campaign_aggregates() {
        let a = actor_with("10.0.0.1", 8.0, &["LFI_ATTACK", "COORDINATED_ATTACK"]);
        let b = actor_with("10.0.0.2", 4.0, &["COORDINATED_ATTACK"]);

        let campaign = ThreatCampaign::from_members("campaign_0".to_string(), &[&a, &b]);

        assert_eq!(campaign.member_count(), 2);
        assert!((campaign.threat_score - 6.0).abs() < 1e-9);
        assert!(campaign.primary_tags.contains("LFI_ATTACK"));
        assert_eq!(campaign.campaign_type, "COORDINATED_ATTACK");
    }

    #[test]
    fn test_campaign_type_tie_breaks_lexically() {
        let a = actor_with("10.0.0.1", 1.0, &["XSS_ATTACK", "LFI_ATTACK"]);
        let b = actor_with("10.0.0.2", 1.0, &["XSS_ATTACK", "LFI_ATTACK"]);

        let campaign = ThreatCampaign::from_members("campaign_1".to_string(), &[&a, &b]);

        // Both tags occur twice - the lexicographically smallest wins
        assert_eq!(campaign.campaign_type, "LFI_ATTACK");
    }
}
