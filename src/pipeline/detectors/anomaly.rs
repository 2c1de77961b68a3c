//! Anomaly Detector
//!
//! Z-score deviation of each actor from the batch baseline across entropy,
//! URL diversity, request volume and centrality. The resulting score
//! becomes the actor's anomaly ratio.

use crate::config::AnomalyConfig;
use crate::constants::{TAG_ANOMALOUS, TAG_SUSPICIOUS};
use crate::models::{ActorProfile, EvidenceSource};
use crate::pipeline::context::{AnalysisContext, AnomalySummary};
use crate::pipeline::detectors::Detector;

pub struct AnomalyDetector {
    config: AnomalyConfig,
}

#[derive(Clone, Copy)]
struct Baseline {
    mean: f64,
    std: f64,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    fn baseline(values: &[f64]) -> Baseline {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Baseline {
            mean,
            std: variance.sqrt(),
        }
    }

    /// Mean of capped z-scores over the metrics with nonzero spread.
    fn anomaly_score(baselines: &[(f64, Baseline)]) -> f64 {
        let mut scores = Vec::new();
        for (value, baseline) in baselines {
            if baseline.std > 1e-12 {
                let z = (value - baseline.mean).abs() / baseline.std;
                scores.push((z / 3.0).min(1.0));
            }
        }
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

impl Detector for AnomalyDetector {
    fn name(&self) -> &'static str {
        "AnomalyDetector"
    }

    fn detect(&self, actors: &mut [ActorProfile], context: &mut AnalysisContext) {
        // Need multiple actors for a meaningful baseline
        if actors.len() < 3 {
            return;
        }

        let entropies: Vec<f64> = actors.iter().map(|a| a.avg_entropy).collect();
        let diversities: Vec<f64> = actors.iter().map(|a| a.url_diversity_ratio).collect();
        let volumes: Vec<f64> = actors.iter().map(|a| a.total_requests as f64).collect();
        let centralities: Vec<f64> = actors.iter().map(|a| a.centrality).collect();

        let entropy_baseline = Self::baseline(&entropies);
        let diversity_baseline = Self::baseline(&diversities);
        let volume_baseline = Self::baseline(&volumes);
        let centrality_baseline = Self::baseline(&centralities);

        let mut anomalies = 0;

        for actor in actors.iter_mut() {
            let score = Self::anomaly_score(&[
                (actor.avg_entropy, entropy_baseline),
                (actor.url_diversity_ratio, diversity_baseline),
                (actor.total_requests as f64, volume_baseline),
                (actor.centrality, centrality_baseline),
            ]);
            actor.anomaly_ratio = score;

            if score > self.config.anomalous_threshold {
                anomalies += 1;
                actor.add_tag(TAG_ANOMALOUS, EvidenceSource::AnomalyDetector);
                actor.add_evidence(
                    EvidenceSource::AnomalyDetector,
                    "anomaly_detected",
                    format!("High anomaly score: {:.3}", score),
                    0.8,
                );
            } else if score > self.config.suspicious_threshold {
                actor.add_tag(TAG_SUSPICIOUS, EvidenceSource::AnomalyDetector);
                actor.add_evidence(
                    EvidenceSource::AnomalyDetector,
                    "suspicious_behavior",
                    format!("Medium anomaly score: {:.3}", score),
                    0.6,
                );
            } else if actor.attack_tag_count() > 0 && score < 0.1 {
                // Exculpatory: attack indicators on a statistically
                // unremarkable actor. Weighed by the meta-detector.
                actor.add_evidence(
                    EvidenceSource::AnomalyDetector,
                    "normal_baseline",
                    format!(
                        "Request profile consistent with normal baseline (score: {:.3})",
                        score
                    ),
                    0.4,
                );
            }
        }

        context.anomaly_summary = Some(AnomalySummary {
            total_actors: actors.len(),
            anomalies,
            anomaly_rate: anomalies as f64 / actors.len() as f64,
        });

        log::info!("{}: {} anomalous actors", self.name(), anomalies);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(address: &str, requests: usize, entropy: f64) -> ActorProfile {
        let mut a = ActorProfile::from_events(address.to_string(), vec![]);
        a.total_requests = requests;
        a.avg_entropy = entropy;
        a.url_diversity_ratio = 0.5;
        a
    }

    #[test]
    fn test_outlier_gets_anomalous_tag() {
        let mut actors = vec![
            actor("10.0.0.1", 10, 3.0),
            actor("10.0.0.2", 11, 3.1),
            actor("10.0.0.3", 9, 2.9),
            actor("10.0.0.4", 10, 3.0),
            actor("10.0.0.5", 500, 6.5),
        ];
        let mut ctx = AnalysisContext::new();

        AnomalyDetector::new(AnomalyConfig::default()).detect(&mut actors, &mut ctx);

        assert!(actors[4].has_tag(TAG_ANOMALOUS));
        assert!(actors[4].anomaly_ratio > actors[0].anomaly_ratio);
        assert_eq!(ctx.anomaly_summary.unwrap().anomalies, 1);
    }

    #[test]
    fn test_uniform_batch_has_no_anomalies() {
        let mut actors = vec![
            actor("10.0.0.1", 10, 3.0),
            actor("10.0.0.2", 10, 3.0),
            actor("10.0.0.3", 10, 3.0),
        ];
        let mut ctx = AnalysisContext::new();

        AnomalyDetector::new(AnomalyConfig::default()).detect(&mut actors, &mut ctx);

        assert!(actors.iter().all(|a| !a.has_tag(TAG_ANOMALOUS)));
        assert_eq!(ctx.anomaly_summary.unwrap().anomalies, 0);
    }

    #[test]
    fn test_normal_actor_with_attack_tags_gets_exculpatory_evidence() {
        let mut flagged = actor("10.0.0.1", 10, 3.0);
        flagged.tags.insert("SQLI_ATTACK".to_string());
        let mut actors = vec![
            flagged,
            actor("10.0.0.2", 10, 3.0),
            actor("10.0.0.3", 10, 3.0),
            actor("10.0.0.4", 10, 3.0),
        ];
        let mut ctx = AnalysisContext::new();

        AnomalyDetector::new(AnomalyConfig::default()).detect(&mut actors, &mut ctx);

        assert!(actors[0]
            .evidence_trail
            .iter()
            .any(|e| e.kind == "normal_baseline" && e.details.contains("normal")));
    }

    #[test]
    fn test_too_few_actors_skipped() {
        let mut actors = vec![actor("10.0.0.1", 10, 3.0), actor("10.0.0.2", 900, 6.0)];
        let mut ctx = AnalysisContext::new();

        AnomalyDetector::new(AnomalyConfig::default()).detect(&mut actors, &mut ctx);

        assert!(ctx.anomaly_summary.is_none());
        assert!(actors.iter().all(|a| a.evidence_trail.is_empty()));
    }
}
