//! Actor Profile Model
//!
//! Per-source-address aggregate of events, tags, evidence và metrics.
//! Mutated by every detector and by the scoring/meta stages; read-only
//! once reporting begins.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ATTACK_TAGS, BEHAVIOR_VECTOR_LEN};
use crate::models::evidence::{EvidenceRecord, EvidenceSource};
use crate::models::event::LogEvent;

// ============================================================================
// ACTOR PROFILE
// ============================================================================

/// One profile per distinct source address.
///
/// The actor exclusively owns its events and evidence trail. Tags and the
/// threat score are written by multiple stages in the fixed pipeline order;
/// there are never concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorProfile {
    pub address: String,
    pub events: Vec<LogEvent>,

    // Behavioral metrics
    pub total_requests: usize,
    pub unique_urls: usize,
    pub avg_entropy: f64,
    pub max_entropy: f64,
    pub url_diversity_ratio: f64,
    pub anomaly_ratio: f64,
    pub centrality: f64,
    pub error_ratio: f64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,

    /// Unique behavioral/attack labels. BTreeSet keeps every downstream
    /// iteration deterministic.
    pub tags: BTreeSet<String>,

    /// Append-only audit log backing the tags and the score.
    pub evidence_trail: Vec<EvidenceRecord>,

    /// Final threat score. Only the scoring engine writes this.
    pub threat_score: f64,
}

impl ActorProfile {
    /// Build a profile from one or more enriched events sharing an address.
    pub fn from_events(address: String, events: Vec<LogEvent>) -> Self {
        let mut profile = Self {
            address,
            events,
            total_requests: 0,
            unique_urls: 0,
            avg_entropy: 0.0,
            max_entropy: 0.0,
            url_diversity_ratio: 0.0,
            anomaly_ratio: 0.0,
            centrality: 0.0,
            error_ratio: 0.0,
            first_seen: None,
            last_seen: None,
            tags: BTreeSet::new(),
            evidence_trail: Vec::new(),
            threat_score: 0.0,
        };
        profile.update_metrics();
        profile
    }

    /// Recompute aggregate metrics from the owned events.
    pub fn update_metrics(&mut self) {
        if self.events.is_empty() {
            return;
        }

        self.total_requests = self.events.len();

        let unique: BTreeSet<&str> = self.events.iter().map(|e| e.url.as_str()).collect();
        self.unique_urls = unique.len();
        self.url_diversity_ratio = self.unique_urls as f64 / self.total_requests as f64;

        let entropies: Vec<f64> = self.events.iter().map(|e| e.entropy).collect();
        self.avg_entropy = entropies.iter().sum::<f64>() / entropies.len() as f64;
        self.max_entropy = entropies.iter().cloned().fold(0.0, f64::max);

        let suspicious = self.events.iter().filter(|e| e.is_suspicious).count();
        self.anomaly_ratio = suspicious as f64 / self.total_requests as f64;

        let errors = self.events.iter().filter(|e| e.is_error()).count();
        self.error_ratio = errors as f64 / self.total_requests as f64;

        self.first_seen = self.events.iter().map(|e| e.timestamp).min();
        self.last_seen = self.events.iter().map(|e| e.timestamp).max();
    }

    /// Append evidence to the trail.
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

    /// Add a tag with a standard "tag_added" evidence record.
    ///
    /// Adding an existing tag is a no-op for membership but still appends
    /// the evidence record.
    pub fn add_tag(&mut self, tag: &str, source: EvidenceSource) {
        self.tags.insert(tag.to_string());
        self.add_evidence(source, "tag_added", format!("Added tag: {}", tag), 1.0);
    }

    /// Add a tag backed by a single custom evidence record.
    pub fn tag_with_evidence(
        &mut self,
        tag: &str,
        source: EvidenceSource,
        kind: &str,
        details: impl Into<String>,
        confidence: f64,
    ) {
        self.tags.insert(tag.to_string());
        self.add_evidence(source, kind, details, confidence);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|t| self.tags.contains(*t))
    }

    /// Number of tags from the canonical attack-tag set this actor holds.
    pub fn attack_tag_count(&self) -> usize {
        ATTACK_TAGS.iter().filter(|t| self.tags.contains(**t)).count()
    }

    /// True if any evidence entry was emitted by `source`.
    pub fn has_evidence_from(&self, source: EvidenceSource) -> bool {
        self.evidence_trail.iter().any(|e| e.source == source)
    }

    /// Fixed-length normalized frequency distribution over the actor's
    /// most-visited URLs. Always `BEHAVIOR_VECTOR_LEN` components; sums to
    /// 1.0 when the actor has at least one event, else all zeros.
    ///
    /// Frequency ties are broken by URL lexical order so the vector is
    /// stable across runs.
    pub fn behavioral_vector(&self) -> Vec<f64> {
        let mut vector = vec![0.0; BEHAVIOR_VECTOR_LEN];
        if self.events.is_empty() {
            return vector;
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.url.as_str()).or_insert(0) += 1;
        }

        let total = self.events.len() as f64;
        let mut frequencies: Vec<(&str, f64)> = counts
            .into_iter()
            .map(|(url, count)| (url, count as f64 / total))
            .collect();
        frequencies.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        for (i, (_, freq)) in frequencies.iter().take(BEHAVIOR_VECTOR_LEN).enumerate() {
            vector[i] = *freq;
        }

        let mass: f64 = vector.iter().sum();
        if mass > 0.0 {
            for value in &mut vector {
                *value /= mass;
            }
        }
        vector
    }
}

// ============================================================================
// TESTS
// ============================================================================
