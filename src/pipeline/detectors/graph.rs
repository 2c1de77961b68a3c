//! Graph Detector
//!
//! Builds a behavioral similarity graph over actors and derives betweenness
//! centrality and local clustering coefficients. High-centrality/low-
//! clustering nodes are coordination hubs; dense neighborhoods are cluster
//! members.

use std::collections::BTreeSet;
use std::collections::VecDeque;

use crate::config::GraphConfig;
use crate::constants::{TAG_CLUSTER_MEMBER, TAG_COORDINATOR};
use crate::models::{ActorProfile, EvidenceSource};
use crate::pipeline::context::{AnalysisContext, GraphSummary};
use crate::pipeline::detectors::Detector;

pub struct GraphDetector {
    config: GraphConfig,
}

impl GraphDetector {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Behavioral similarity: weighted blend of URL overlap, request-timing
    /// similarity and user-agent overlap.
    fn similarity(a: &ActorProfile, b: &ActorProfile) -> f64 {
        let urls_a: BTreeSet<&str> = a.events.iter().map(|e| e.url.as_str()).collect();
        let urls_b: BTreeSet<&str> = b.events.iter().map(|e| e.url.as_str()).collect();
        if urls_a.is_empty() || urls_b.is_empty() {
            return 0.0;
        }

        let intersection = urls_a.intersection(&urls_b).count() as f64;
        let union = urls_a.union(&urls_b).count() as f64;
        let url_overlap = if union > 0.0 { intersection / union } else { 0.0 };

        let timing = Self::timing_similarity(a, b);
        let user_agent = Self::user_agent_similarity(a, b);

        0.5 * url_overlap + 0.3 * timing + 0.2 * user_agent
    }

    fn mean_interval(actor: &ActorProfile) -> Option<f64> {
        let mut timestamps: Vec<i64> = actor.events.iter().map(|e| e.timestamp.timestamp()).collect();
        timestamps.sort_unstable();
        let intervals: Vec<f64> = timestamps
            .windows(2)
            .map(|p| (p[1] - p[0]) as f64)
            .filter(|i| *i > 0.0)
            .collect();
        if intervals.is_empty() {
            return None;
        }
        Some(intervals.iter().sum::<f64>() / intervals.len() as f64)
    }

    fn timing_similarity(a: &ActorProfile, b: &ActorProfile) -> f64 {
        match (Self::mean_interval(a), Self::mean_interval(b)) {
            (Some(mean_a), Some(mean_b)) if mean_a > 0.0 && mean_b > 0.0 => {
                let diff = (mean_a - mean_b).abs() / mean_a.max(mean_b);
                1.0 - diff.min(1.0)
            }
            _ => 0.0,
        }
    }

    fn user_agent_similarity(a: &ActorProfile, b: &ActorProfile) -> f64 {
        let agents_a: BTreeSet<&str> = a
            .events
            .iter()
            .filter_map(|e| e.user_agent.as_deref())
            .collect();
        let agents_b: BTreeSet<&str> = b
            .events
            .iter()
            .filter_map(|e| e.user_agent.as_deref())
            .collect();
        if agents_a.is_empty() || agents_b.is_empty() {
            return 0.0;
        }

        let intersection = agents_a.intersection(&agents_b).count() as f64;
        let union = agents_a.union(&agents_b).count() as f64;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Brandes betweenness centrality on the unweighted graph, normalized
    /// by (n-1)(n-2) so values are comparable across batch sizes.
    fn betweenness(adjacency: &[Vec<usize>]) -> Vec<f64> {
        let n = adjacency.len();
        let mut centrality = vec![0.0; n];

        for source in 0..n {
            let mut stack = Vec::new();
            let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0; n];
            let mut distance = vec![-1i64; n];
            sigma[source] = 1.0;
            distance[source] = 0;

            let mut queue = VecDeque::new();
            queue.push_back(source);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                for &w in &adjacency[v] {
                    if distance[w] < 0 {
                        distance[w] = distance[v] + 1;
                        queue.push_back(w);
                    }
                    if distance[w] == distance[v] + 1 {
                        sigma[w] += sigma[v];
                        predecessors[w].push(v);
                    }
                }
            }

            let mut delta = vec![0.0; n];
            while let Some(w) = stack.pop() {
                for &v in &predecessors[w] {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
                if w != source {
                    centrality[w] += delta[w];
                }
            }
        }

        if n > 2 {
            let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
            for value in &mut centrality {
                *value *= scale;
            }
        }
        centrality
    }

    /// Local clustering coefficient per node.
    fn clustering_coefficients(adjacency: &[Vec<usize>]) -> Vec<f64> {
        let n = adjacency.len();
        let neighbor_sets: Vec<BTreeSet<usize>> = adjacency
            .iter()
            .map(|neighbors| neighbors.iter().copied().collect())
            .collect();

        (0..n)
            .map(|node| {
                let neighbors = &adjacency[node];
                let k = neighbors.len();
                if k < 2 {
                    return 0.0;
                }
                let mut links = 0;
                for (i, &a) in neighbors.iter().enumerate() {
                    for &b in &neighbors[i + 1..] {
                        if neighbor_sets[a].contains(&b) {
                            links += 1;
                        }
                    }
                }
                2.0 * links as f64 / (k as f64 * (k as f64 - 1.0))
            })
            .collect()
    }

    fn component_count(adjacency: &[Vec<usize>]) -> usize {
        let n = adjacency.len();
        let mut seen = vec![false; n];
        let mut components = 0;

        for start in 0..n {
            if seen[start] {
                continue;
            }
            components += 1;
            let mut queue = VecDeque::from([start]);
            seen[start] = true;
            while let Some(v) = queue.pop_front() {
                for &w in &adjacency[v] {
                    if !seen[w] {
                        seen[w] = true;
                        queue.push_back(w);
                    }
                }
            }
        }
        components
    }
}

impl Detector for GraphDetector {
    fn name(&self) -> &'static str {
        "GraphDetector"
    }

    fn detect(&self, actors: &mut [ActorProfile], context: &mut AnalysisContext) {
        let n = actors.len();
        if n < 2 {
            return;
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in i + 1..n {
                if Self::similarity(&actors[i], &actors[j]) > self.config.edge_threshold {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                }
            }
        }

        let centrality = Self::betweenness(&adjacency);
        let clustering = Self::clustering_coefficients(&adjacency);
        let avg_centrality = centrality.iter().sum::<f64>() / n as f64;

        let mut coordinators = 0;
        let mut cluster_members = 0;

        for (index, actor) in actors.iter_mut().enumerate() {
            actor.centrality = centrality[index];

            if centrality[index] > self.config.coordinator_centrality
                && clustering[index] < self.config.coordinator_clustering
            {
                coordinators += 1;
                actor.add_tag(TAG_COORDINATOR, EvidenceSource::GraphDetector);
                actor.add_evidence(
                    EvidenceSource::GraphDetector,
                    "coordinator_detected",
                    format!(
                        "High centrality ({:.3}), low clustering ({:.3})",
                        centrality[index], clustering[index]
                    ),
                    0.7,
                );
            } else if clustering[index] > self.config.member_clustering {
                cluster_members += 1;
                actor.add_tag(TAG_CLUSTER_MEMBER, EvidenceSource::GraphDetector);
                actor.add_evidence(
                    EvidenceSource::GraphDetector,
                    "cluster_member_detected",
                    format!("High clustering coefficient ({:.3})", clustering[index]),
                    0.6,
                );
            } else if actor.attack_tag_count() > 0
                && avg_centrality > 0.0
                && centrality[index] < avg_centrality * 0.5
            {
                // Exculpatory: attack indicators without a structural role.
                // The meta-detector weighs this against the attack evidence.
                actor.add_evidence(
                    EvidenceSource::GraphDetector,
                    "low_centrality",
                    format!(
                        "Low centrality ({:.3}) relative to batch average",
                        centrality[index]
                    ),
                    0.4,
                );
            }
        }

        context.graph_summary = Some(GraphSummary {
            total_actors: n,
            coordinators,
            cluster_members,
            communities: Self::component_count(&adjacency),
            avg_centrality,
        });

        log::info!(
            "{}: {} coordinators, {} cluster members",
            self.name(),
            coordinators,
            cluster_members
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
    use std::collections::BTreeSet as Set;

    fn actor(address: &str, urls: &[&str], agent: &str) -> ActorProfile {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let events = urls
            .iter()
            .enumerate()
            .map(|(i, url)| LogEvent {
                timestamp: start + Duration::seconds(30 * i as i64),
                source_addr: address.to_string(),
                destination_addr: None,
                url: url.to_string(),
                method: "GET".to_string(),
                status_code: 200,
                user_agent: Some(agent.to_string()),
                request_size: None,
                response_size: None,
                referer: None,
                normalized_url: String::new(),
                entropy: 0.0,
                url_length: 0,
                path_depth: 0,
                query_param_count: 0,
                heuristic_flags: Set::new(),
                is_suspicious: false,
            })
            .collect();
        ActorProfile::from_events(address.to_string(), events)
    }

    #[test]
    fn test_identical_behavior_is_similar() {
        let a = actor("10.0.0.1", &["/a", "/b"], "agent-x");
        let b = actor("10.0.0.2", &["/a", "/b"], "agent-x");
        assert!(GraphDetector::similarity(&a, &b) > 0.9);
    }

    #[test]
    fn test_disjoint_behavior_is_dissimilar() {
        let a = actor("10.0.0.1", &["/a", "/b"], "agent-x");
        let b = actor("10.0.0.2", &["/c", "/d"], "agent-y");
        // Same timing cadence contributes, but URL/UA overlap is zero
        assert!(GraphDetector::similarity(&a, &b) <= 0.3 + 1e-9);
    }

    #[test]
    fn test_betweenness_star_center() {
        // Star graph: center 0 lies on every shortest path
        let adjacency = vec![vec![1, 2, 3], vec![0], vec![0], vec![0]];
        let centrality = GraphDetector::betweenness(&adjacency);

        assert!(centrality[0] > centrality[1]);
        assert!(centrality[1].abs() < 1e-9);
        // Normalized: star center of K1,3 has centrality 1.0
        assert!((centrality[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clustering_coefficient_triangle() {
        let adjacency = vec![vec![1, 2], vec![0, 2], vec![0, 1]];
        let coefficients = GraphDetector::clustering_coefficients(&adjacency);
        assert!(coefficients.iter().all(|c| (c - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_component_count() {
        let adjacency = vec![vec![1], vec![0], vec![3], vec![2], vec![]];
        assert_eq!(GraphDetector::component_count(&adjacency), 3);
    }

    #[test]
    fn test_detect_sets_centrality_and_summary() {
        let mut actors = vec![
            actor("10.0.0.1", &["/a", "/b"], "agent-x"),
            actor("10.0.0.2", &["/a", "/b"], "agent-x"),
            actor("10.0.0.3", &["/a", "/b"], "agent-x"),
        ];
        let mut ctx = AnalysisContext::new();

        GraphDetector::new(GraphConfig::default()).detect(&mut actors, &mut ctx);

        let summary = ctx.graph_summary.unwrap();
        assert_eq!(summary.total_actors, 3);
        assert!(summary.communities >= 1);
        // Fully connected triangle: clustering coefficient 1.0 everywhere
        assert!(actors.iter().all(|a| a.has_tag(TAG_CLUSTER_MEMBER)));
    }
}
