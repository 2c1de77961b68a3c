//! Behavioral Clustering Detector
//!
//! Clusters actors by their URL-frequency behavioral vectors and tags
//! cluster members. Shares the standardization/DBSCAN routine with the
//! campaign builder.

use crate::constants::{
    CLUSTER_EPS, CLUSTER_MIN_SAMPLES, TAG_COORDINATED_ATTACK, TAG_ISOLATED_ATTACKER,
    TAG_PAIRED_ATTACK,
};
use crate::models::{ActorProfile, EvidenceSource};
use crate::pipeline::context::{AnalysisContext, ClusteringSummary};
use crate::pipeline::detectors::Detector;
use crate::scoring::cluster::assign_behavior_clusters;

#[derive(Default)]
pub struct BehavioralClusteringDetector;

impl Detector for BehavioralClusteringDetector {
    fn name(&self) -> &'static str {
        "BehavioralClustering"
    }

    fn detect(&self, actors: &mut [ActorProfile], context: &mut AnalysisContext) {
        let Some(assignment) = assign_behavior_clusters(actors, CLUSTER_EPS, CLUSTER_MIN_SAMPLES)
        else {
            return;
        };

        let clusters = assignment.clusters();
        let isolated = assignment.isolated();
        let largest = clusters.values().map(Vec::len).max().unwrap_or(0);

        for (cluster_id, members) in &clusters {
            if members.len() >= 3 {
                for &index in members {
                    actors[index].add_tag(TAG_COORDINATED_ATTACK, EvidenceSource::BehavioralClustering);
                    actors[index].add_evidence(
                        EvidenceSource::BehavioralClustering,
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
                    actors[index].add_tag(TAG_PAIRED_ATTACK, EvidenceSource::BehavioralClustering);
                    actors[index].add_evidence(
                        EvidenceSource::BehavioralClustering,
                        "paired_attack_detected",
                        format!("Part of attack pair in cluster {}", cluster_id),
                        0.6,
                    );
                }
            }
        }

        for &index in &isolated {
            actors[index].add_tag(TAG_ISOLATED_ATTACKER, EvidenceSource::BehavioralClustering);
            actors[index].add_evidence(
                EvidenceSource::BehavioralClustering,
                "isolated_attacker_detected",
                "Actor shows unique behavioral pattern",
                0.5,
            );
        }

        context.clustering_summary = Some(ClusteringSummary {
            total_actors: actors.len(),
            clusters: clusters.len(),
            isolated_actors: isolated.len(),
            largest_cluster: largest,
        });

        log::info!(
            "{}: {} clusters, {} isolated",
            self.name(),
            clusters.len(),
            isolated.len()
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogEvent;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeSet;

    fn actor(address: &str, urls: &[&str]) -> ActorProfile {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let events = urls
            .iter()
            .enumerate()
            .map(|(i, url)| LogEvent {
                timestamp: start + Duration::seconds(i as i64),
                source_addr: address.to_string(),
                destination_addr: None,
                url: url.to_string(),
                method: "GET".to_string(),
                status_code: 200,
                user_agent: None,
                request_size: None,
                response_size: None,
                referer: None,
                normalized_url: String::new(),
                entropy: 0.0,
                url_length: 0,
                path_depth: 0,
                query_param_count: 0,
                heuristic_flags: BTreeSet::new(),
                is_suspicious: false,
            })
            .collect();
        ActorProfile::from_events(address.to_string(), events)
    }

    #[test]
    fn test_coordinated_cluster_tagging() {
        let urls = ["/wp-login.php", "/xmlrpc.php"];
        let mut actors = vec![
            actor("10.0.0.1", &urls),
            actor("10.0.0.2", &urls),
            actor("10.0.0.3", &urls),
        ];
        let mut ctx = AnalysisContext::new();

        BehavioralClusteringDetector.detect(&mut actors, &mut ctx);

        assert!(actors.iter().all(|a| a.has_tag(TAG_COORDINATED_ATTACK)));
        let summary = ctx.clustering_summary.unwrap();
        assert_eq!(summary.clusters, 1);
        assert_eq!(summary.largest_cluster, 3);
    }

    #[test]
    fn test_isolated_actor_tagging() {
        let mut actors = vec![
            actor("10.0.0.1", &["/a", "/a", "/a", "/a"]),
            actor("10.0.0.2", &["/a", "/a", "/a", "/a"]),
            actor("10.0.0.3", &["/x", "/y", "/z", "/w"]),
        ];
        let mut ctx = AnalysisContext::new();

        BehavioralClusteringDetector.detect(&mut actors, &mut ctx);

        assert!(actors[0].has_tag(TAG_PAIRED_ATTACK));
        assert!(actors[1].has_tag(TAG_PAIRED_ATTACK));
        assert!(actors[2].has_tag(TAG_ISOLATED_ATTACKER));
    }

    #[test]
    fn test_single_meaningful_actor_no_summary() {
        let mut actors = vec![
            actor("10.0.0.1", &["/a"]),
            ActorProfile::from_events("10.0.0.2".to_string(), vec![]),
        ];
        let mut ctx = AnalysisContext::new();

        BehavioralClusteringDetector.detect(&mut actors, &mut ctx);
        assert!(ctx.clustering_summary.is_none());
    }
}
