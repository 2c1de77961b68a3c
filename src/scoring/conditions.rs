//! Modifier Conditions
//!
//! Closed enumeration of the condition vocabulary used by scoring-profile
//! modifiers. Config files refer to these by snake_case name; an
//! unrecognized name deserializes to `Unknown`, is warned about at config
//! load, and always evaluates false (fail-safe, never an error).

use serde::{Deserialize, Serialize};

use crate::constants::{
    ANOMALOUS_BEHAVIOR_THRESHOLD, COORDINATION_TAGS, HIGH_CENTRALITY_THRESHOLD,
    HIGH_ENTROPY_THRESHOLD, TAG_BOT_ACTIVITY, URL_DIVERSITY_THRESHOLD,
};
use crate::models::ActorProfile;

// ============================================================================
// CONDITION VOCABULARY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierCondition {
    /// Average URL entropy above threshold (default 4.5)
    HighEntropy,
    /// URL diversity ratio above threshold (default 0.8)
    UrlDiversityRatio,
    /// Graph centrality above threshold (default 0.5)
    HighCentrality,
    /// Anomaly ratio above threshold (default 0.7)
    AnomalousBehavior,
    /// Actor carries a coordination tag
    CoordinatedAttack,
    /// Actor carries at least two canonical attack tags
    MultipleAttackTypes,
    /// Temporal analysis tagged the actor as rhythmic
    FftIsRhythmic,
    /// Anything the config names that this build does not know
    #[serde(other)]
    Unknown,
}

impl ModifierCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifierCondition::HighEntropy => "high_entropy",
            ModifierCondition::UrlDiversityRatio => "url_diversity_ratio",
            ModifierCondition::HighCentrality => "high_centrality",
            ModifierCondition::AnomalousBehavior => "anomalous_behavior",
            ModifierCondition::CoordinatedAttack => "coordinated_attack",
            ModifierCondition::MultipleAttackTypes => "multiple_attack_types",
            ModifierCondition::FftIsRhythmic => "fft_is_rhythmic",
            ModifierCondition::Unknown => "unknown",
        }
    }

    /// Evaluate against the actor's current state. Total over arbitrary
    /// actors - no condition can fail.
    pub fn evaluate(&self, actor: &ActorProfile, threshold: Option<f64>) -> bool {
        match self {
            ModifierCondition::HighEntropy => {
                actor.avg_entropy > threshold.unwrap_or(HIGH_ENTROPY_THRESHOLD)
            }
            ModifierCondition::UrlDiversityRatio => {
                actor.url_diversity_ratio > threshold.unwrap_or(URL_DIVERSITY_THRESHOLD)
            }
            ModifierCondition::HighCentrality => {
                actor.centrality > threshold.unwrap_or(HIGH_CENTRALITY_THRESHOLD)
            }
            ModifierCondition::AnomalousBehavior => {
                actor.anomaly_ratio > threshold.unwrap_or(ANOMALOUS_BEHAVIOR_THRESHOLD)
            }
            ModifierCondition::CoordinatedAttack => actor.has_any_tag(&COORDINATION_TAGS),
            ModifierCondition::MultipleAttackTypes => actor.attack_tag_count() >= 2,
            ModifierCondition::FftIsRhythmic => actor.has_tag(TAG_BOT_ACTIVITY),
            ModifierCondition::Unknown => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> ActorProfile {
        ActorProfile::from_events("192.0.2.1".to_string(), vec![])
    }

    #[test]
    fn test_high_entropy_uses_default_and_custom_threshold() {
        let mut a = actor();
        a.avg_entropy = 5.0;
        assert!(ModifierCondition::HighEntropy.evaluate(&a, None));
        assert!(!ModifierCondition::HighEntropy.evaluate(&a, Some(5.5)));

        a.avg_entropy = 4.0;
        assert!(!ModifierCondition::HighEntropy.evaluate(&a, None));
    }

    #[test]
    fn test_coordinated_attack_checks_both_tags() {
        let mut a = actor();
        assert!(!ModifierCondition::CoordinatedAttack.evaluate(&a, None));
        a.tags.insert("COORDINATOR".to_string());
        assert!(ModifierCondition::CoordinatedAttack.evaluate(&a, None));
    }

    #[test]
    fn test_multiple_attack_types_needs_two() {
        let mut a = actor();
        a.tags.insert("LFI_ATTACK".to_string());
        assert!(!ModifierCondition::MultipleAttackTypes.evaluate(&a, None));
        a.tags.insert("XSS_ATTACK".to_string());
        assert!(ModifierCondition::MultipleAttackTypes.evaluate(&a, None));
    }

    #[test]
    fn test_unknown_condition_is_false() {
        let a = actor();
        assert!(!ModifierCondition::Unknown.evaluate(&a, None));
    }

    #[test]
    fn test_unknown_name_deserializes_to_unknown() {
        let condition: ModifierCondition = serde_yaml::from_str("made_up_condition").unwrap();
        assert_eq!(condition, ModifierCondition::Unknown);

        let condition: ModifierCondition = serde_yaml::from_str("high_entropy").unwrap();
        assert_eq!(condition, ModifierCondition::HighEntropy);
    }
}
