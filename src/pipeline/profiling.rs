//! Actor Profiling & Heuristic Promotion
//!
//! Gom events theo source address thành ActorProfile, sau đó nâng các
//! heuristic flags ở mức event lên thành actor tags kèm evidence.

use std::collections::BTreeMap;

use crate::constants::{
    FLAG_COMMAND_INJECTION, FLAG_LFI_RFI, FLAG_PATH_TRAVERSAL, FLAG_SQL_INJECTION,
    FLAG_SUSPICIOUS_USER_AGENT, FLAG_XSS, TAG_AUTOMATED_SCAN, TAG_BOT_ACTIVITY,
    TAG_CMD_INJECTION, TAG_IOC_URL_MATCH, TAG_KNOWN_BAD_ADDRESS, TAG_LFI_ATTACK,
    TAG_MALICIOUS_UA, TAG_PATH_TRAVERSAL, TAG_SQLI_ATTACK, TAG_XSS_ATTACK,
};
use crate::intelligence::IocManager;
use crate::models::{ActorProfile, EvidenceSource, LogEvent};

// ============================================================================
// PROFILING STAGE
// ============================================================================

pub struct ActorProfilingStage;

impl ActorProfilingStage {
    /// Group enriched events by source address into actor profiles.
    ///
    /// Addresses are processed in sorted order, which fixes the actor
    /// ordering every later stage (including clustering) sees.
    pub fn process(&self, events: Vec<LogEvent>) -> Vec<ActorProfile> {
        if events.is_empty() {
            log::warn!("No events to profile");
            return Vec::new();
        }

        let mut grouped: BTreeMap<String, Vec<LogEvent>> = BTreeMap::new();
        for event in events {
            grouped
                .entry(event.source_addr.clone())
                .or_default()
                .push(event);
        }

        let actors: Vec<ActorProfile> = grouped
            .into_iter()
            .map(|(address, events)| ActorProfile::from_events(address, events))
            .collect();

        log::info!("Created {} actor profiles", actors.len());
        actors
    }
}

// ============================================================================
// HEURISTIC PROMOTION
// ============================================================================

/// Event-flag family -> actor tag.
const FLAG_PROMOTIONS: [(&str, &str, &str); 6] = [
    (FLAG_PATH_TRAVERSAL, TAG_PATH_TRAVERSAL, "path traversal"),
    (FLAG_LFI_RFI, TAG_LFI_ATTACK, "file inclusion"),
    (FLAG_SQL_INJECTION, TAG_SQLI_ATTACK, "SQL injection"),
    (FLAG_XSS, TAG_XSS_ATTACK, "cross-site scripting"),
    (FLAG_COMMAND_INJECTION, TAG_CMD_INJECTION, "command injection"),
    (FLAG_SUSPICIOUS_USER_AGENT, TAG_BOT_ACTIVITY, "bot-like user agent"),
];

pub struct HeuristicPromotionStage;

impl HeuristicPromotionStage {
    pub fn new() -> Self {
        Self
    }

    /// Promote event heuristic flags to actor tags. One evidence record per
    /// promoted tag, attributed to heuristic enrichment, with confidence
    /// scaled by the share of events carrying the flag.
    pub fn process(&self, actors: &mut [ActorProfile], ioc: Option<&IocManager>) {
        for actor in actors.iter_mut() {
            self.promote_flags(actor);
            self.detect_scanning(actor);
            if let Some(manager) = ioc {
                Self::apply_ioc(actor, manager);
            }
        }
    }

    fn promote_flags(&self, actor: &mut ActorProfile) {
        let total = actor.events.len();
        if total == 0 {
            return;
        }

        for (flag, tag, family) in FLAG_PROMOTIONS {
            let matched = actor.events.iter().filter(|e| e.has_flag(flag)).count();
            if matched == 0 {
                continue;
            }
            let share = matched as f64 / total as f64;
            actor.tag_with_evidence(
                tag,
                EvidenceSource::HeuristicEnricher,
                "heuristic_match",
                format!("{}/{} requests matched {} patterns", matched, total, family),
                0.5 + 0.4 * share,
            );
        }
    }

    /// Systematic scanning: mostly client errors across a wide URL surface.
    fn detect_scanning(&self, actor: &mut ActorProfile) {
        if actor.total_requests >= 20
            && actor.error_ratio > 0.5
            && actor.url_diversity_ratio > 0.7
        {
            actor.tag_with_evidence(
                TAG_AUTOMATED_SCAN,
                EvidenceSource::HeuristicEnricher,
                "scan_pattern",
                format!(
                    "{} requests, {:.0}% errors, {:.0}% unique URLs",
                    actor.total_requests,
                    actor.error_ratio * 100.0,
                    actor.url_diversity_ratio * 100.0
                ),
                0.7,
            );
        }
    }

    fn apply_ioc(actor: &mut ActorProfile, manager: &IocManager) {
        if let Some(hit) = manager.check_address(&actor.address) {
            actor.tag_with_evidence(
                TAG_KNOWN_BAD_ADDRESS,
                EvidenceSource::IocIntel,
                "ioc_match",
                hit.description,
                hit.confidence,
            );
        }

        if let Some(hit) = actor
            .events
            .iter()
            .filter_map(|e| e.user_agent.as_deref())
            .find_map(|ua| manager.check_user_agent(ua))
        {
            actor.tag_with_evidence(
                TAG_MALICIOUS_UA,
                EvidenceSource::IocIntel,
                "ioc_match",
                hit.description,
                hit.confidence,
            );
        }

        if let Some(hit) = actor
            .events
            .iter()
            .find_map(|e| manager.check_url(&e.url))
        {
            actor.tag_with_evidence(
                TAG_IOC_URL_MATCH,
                EvidenceSource::IocIntel,
                "ioc_match",
                hit.description,
                hit.confidence,
            );
        }
    }
}

impl Default for HeuristicPromotionStage {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
