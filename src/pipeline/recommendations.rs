//! Narrative Engine
//!
//! Maps final tag sets to prioritized, actionable recommendations. Pure
//! rule table over scored actors and campaigns - no mutation.

use serde::Serialize;

use crate::constants::{
    TAG_BOT_ACTIVITY, TAG_CONFIRMED_BOTNET, TAG_CONFIRMED_COORDINATED,
    TAG_CONFIRMED_SOPHISTICATED, TAG_COORDINATED_ATTACK, TAG_ISOLATED_INDICATOR,
    TAG_LFI_ATTACK, TAG_SQLI_ATTACK,
};
use crate::models::{ActorProfile, ThreatCampaign};

// ============================================================================
// RECOMMENDATION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    ImmediateAction,
    Investigation,
    Monitoring,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ImmediateAction => "IMMEDIATE_ACTION",
            Category::Investigation => "INVESTIGATION",
            Category::Monitoring => "MONITORING",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
    pub mitre_techniques: Vec<&'static str>,
    pub confidence: f64,
}

// ============================================================================
// NARRATIVE ENGINE
// ============================================================================

pub struct NarrativeEngine;

impl NarrativeEngine {
    /// Generate recommendations for the batch, sorted by priority.
    pub fn generate(
        &self,
        actors: &[ActorProfile],
        campaigns: &[ThreatCampaign],
    ) -> Vec<Recommendation> {
        log::info!("Generating actionable recommendations");

        let mut recommendations = Vec::new();
        for actor in actors {
            recommendations.extend(Self::analyze_actor(actor));
        }
        for campaign in campaigns {
            recommendations.extend(Self::analyze_campaign(campaign));
        }
        recommendations.extend(Self::global_recommendations(actors));

        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
        log::info!("Generated {} recommendations", recommendations.len());
        recommendations
    }

    fn analyze_actor(actor: &ActorProfile) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if actor.has_tag(TAG_CONFIRMED_BOTNET) && actor.has_tag(TAG_SQLI_ATTACK) {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: Category::ImmediateAction,
                title: format!("Botnet SQL Injection Attack - {}", actor.address),
                description: format!(
                    "Actor {} is with high confidence part of a botnet running automated SQL \
                     injection. Activity window: {} - {}",
                    actor.address,
                    actor.first_seen.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    actor.last_seen.map(|t| t.to_rfc3339()).unwrap_or_default()
                ),
                action_items: vec![
                    format!("Block {} at the firewall immediately", actor.address),
                    "Review database logs for successful queries in the activity window"
                        .to_string(),
                    "Audit all SQL queries from the last 24 hours".to_string(),
                    "Verify database account permissions".to_string(),
                ],
                mitre_techniques: vec!["T1190", "T1071.001"],
                confidence: 0.95,
            });
        } else if actor.has_tag(TAG_LFI_ATTACK) && actor.has_tag(TAG_CONFIRMED_SOPHISTICATED) {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: Category::ImmediateAction,
                title: format!("Sophisticated LFI Attack - {}", actor.address),
                description: format!(
                    "Sophisticated local file inclusion attempts from {}. The actor combines \
                     multiple attack vectors with corroborated evidence.",
                    actor.address
                ),
                action_items: vec![
                    format!("Block {} at the web server", actor.address),
                    "Audit web server filesystem permissions".to_string(),
                    "Review all scripts using include/require on user input".to_string(),
                    "Update WAF rules to block path traversal".to_string(),
                ],
                mitre_techniques: vec!["T1083", "T1190"],
                confidence: 0.9,
            });
        } else if actor.has_tag(TAG_CONFIRMED_COORDINATED) && actor.has_tag(TAG_BOT_ACTIVITY) {
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                category: Category::Investigation,
                title: format!("Coordinated Bot Activity - {}", actor.address),
                description: format!(
                    "Actor {} participates in a coordinated attack with interaction patterns \
                     linking it to other actors.",
                    actor.address
                ),
                action_items: vec![
                    format!("Monitor further activity from {}", actor.address),
                    "Correlate with other flagged addresses".to_string(),
                    "Check whether this is part of a volumetric attack".to_string(),
                    "Update IDS/IPS rules for the observed pattern".to_string(),
                ],
                mitre_techniques: vec!["T1071.001", "T1595"],
                confidence: 0.8,
            });
        } else if actor.has_tag(TAG_ISOLATED_INDICATOR) {
            recommendations.push(Recommendation {
                priority: Priority::Low,
                category: Category::Monitoring,
                title: format!("Isolated Threat Indicator - {}", actor.address),
                description: format!(
                    "Single uncorroborated threat indicator from {}. Additional monitoring \
                     is warranted before action.",
                    actor.address
                ),
                action_items: vec![
                    format!("Add {} to the watch list", actor.address),
                    "Alert on repeated activity".to_string(),
                    "Run a basic reputation check on the address".to_string(),
                ],
                mitre_techniques: vec!["T1595"],
                confidence: 0.6,
            });
        }

        recommendations
    }

    fn analyze_campaign(campaign: &ThreatCampaign) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        if campaign.primary_tags.contains(TAG_COORDINATED_ATTACK)
            && campaign.primary_tags.contains(TAG_LFI_ATTACK)
        {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: Category::ImmediateAction,
                title: format!("Coordinated LFI Campaign - {}", campaign.campaign_id),
                description: format!(
                    "Coordinated file-inclusion campaign involving {} actors - a targeted \
                     attempt to reach the filesystem.",
                    campaign.member_count()
                ),
                action_items: vec![
                    "Audit web server filesystem permissions".to_string(),
                    "Review all scripts using include/require on user input".to_string(),
                    "Update WAF rules to block path traversal".to_string(),
                    "Check logs for successful file accesses".to_string(),
                ],
                mitre_techniques: vec!["T1083", "T1190", "T1071.001"],
                confidence: 0.9,
            });
        } else if campaign.primary_tags.contains(TAG_COORDINATED_ATTACK)
            && campaign.primary_tags.contains(TAG_SQLI_ATTACK)
        {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: Category::ImmediateAction,
                title: format!("Coordinated SQL Injection Campaign - {}", campaign.campaign_id),
                description: format!(
                    "Coordinated SQL injection campaign with {} participating actors.",
                    campaign.member_count()
                ),
                action_items: vec![
                    "Block all campaign addresses at the network level".to_string(),
                    "Review database logs for data exfiltration".to_string(),
                    "Update IDS/IPS rules".to_string(),
                ],
                mitre_techniques: vec!["T1190", "T1071.001"],
                confidence: 0.9,
            });
        }

        recommendations
    }

    fn global_recommendations(actors: &[ActorProfile]) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        let high_threat = actors.iter().filter(|a| a.threat_score > 8.0).count();
        let confirmed_botnets = actors
            .iter()
            .filter(|a| a.has_tag(TAG_CONFIRMED_BOTNET))
            .count();

        if high_threat > 5 {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: Category::ImmediateAction,
                title: "High Volume of Threat Actors Detected".to_string(),
                description: format!(
                    "{} high-threat actors detected - this points to a targeted attack.",
                    high_threat
                ),
                action_items: vec![
                    "Run a full infrastructure security audit".to_string(),
                    "Verify all entry points and patch levels".to_string(),
                    "Consider engaging the incident response team".to_string(),
                ],
                mitre_techniques: vec!["T1190", "T1595"],
                confidence: 0.8,
            });
        }

        if confirmed_botnets > 3 {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: Category::ImmediateAction,
                title: "Multiple Botnet Activities Detected".to_string(),
                description: format!(
                    "{} confirmed botnet actors - the infrastructure may be under automated \
                     attack.",
                    confirmed_botnets
                ),
                action_items: vec![
                    "Analyze network traffic for command-and-control patterns".to_string(),
                    "Update IDS/IPS signatures".to_string(),
                    "Review DNS logs for suspicious activity".to_string(),
                ],
                mitre_techniques: vec!["T1071.001", "T1595"],
                confidence: 0.9,
            });
        }

        recommendations
    }
}

// ============================================================================
// TESTS
// ============================================================================
