//! Behavioral Vector Clustering
//!
//! Per-dimension standardization và density-based clustering (DBSCAN) over
//! actor behavioral vectors. No randomness anywhere - labels are fully
//! determined by the input row order.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, Axis};

use crate::models::ActorProfile;

/// Label assigned to noise points.
pub const NOISE: i32 = -1;

// ============================================================================
// STANDARDIZATION
// ============================================================================

/// Standardize each column to zero mean and unit variance.
///
/// Zero-variance columns pass through unscaled (centered only) so that
/// batches of identical vectors stay identical instead of dividing by zero.
pub fn standardize(data: &Array2<f64>) -> Array2<f64> {
    let mut standardized = data.clone();
    let rows = data.nrows() as f64;
    if rows == 0.0 {
        return standardized;
    }

    for mut column in standardized.axis_iter_mut(Axis(1)) {
        let mean = column.sum() / rows;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / rows;
        let std = variance.sqrt();
        let scale = if std > 1e-12 { std } else { 1.0 };

        for value in column.iter_mut() {
            *value = (*value - mean) / scale;
        }
    }

    standardized
}

// ============================================================================
// DBSCAN
// ============================================================================

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn region_query(data: &Array2<f64>, point: usize, eps: f64) -> Vec<usize> {
    let row = data.row(point);
    (0..data.nrows())
        .filter(|&other| euclidean(row, data.row(other)) <= eps)
        .collect()
}

/// Density-based clustering. Returns one label per row; `NOISE` marks
/// unclustered points. `min_samples` counts the point itself, matching the
/// common library convention.
pub fn dbscan(data: &Array2<f64>, eps: f64, min_samples: usize) -> Vec<i32> {
    let n = data.nrows();
    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut cluster_id = 0;

    for point in 0..n {
        if visited[point] {
            continue;
        }
        visited[point] = true;

        let neighbors = region_query(data, point, eps);
        if neighbors.len() < min_samples {
            continue; // noise unless later reached from a core point
        }

        labels[point] = cluster_id;
        let mut queue: Vec<usize> = neighbors;
        let mut head = 0;

        while head < queue.len() {
            let current = queue[head];
            head += 1;

            if labels[current] == NOISE {
                labels[current] = cluster_id;
            }
            if visited[current] {
                continue;
            }
            visited[current] = true;

            let current_neighbors = region_query(data, current, eps);
            if current_neighbors.len() >= min_samples {
                // Core point - its neighborhood joins the expansion front
                queue.extend(current_neighbors);
            }
        }

        cluster_id += 1;
    }

    labels
}

// ============================================================================
// ACTOR CLUSTER ASSIGNMENT
// ============================================================================

/// Result of clustering a batch of actors by behavioral vector.
///
/// `valid` holds the indices (into the original actor slice) of actors
/// whose vectors had nonzero mass; `labels` is parallel to `valid`.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    pub valid: Vec<usize>,
    pub labels: Vec<i32>,
}

impl ClusterAssignment {
    /// Non-noise clusters as label -> actor indices, in label order.
    pub fn clusters(&self) -> BTreeMap<i32, Vec<usize>> {
        let mut clusters = BTreeMap::new();
        for (slot, &label) in self.labels.iter().enumerate() {
            if label != NOISE {
                clusters
                    .entry(label)
                    .or_insert_with(Vec::new)
                    .push(self.valid[slot]);
            }
        }
        clusters
    }

    /// Actor indices with a meaningful vector that ended up as noise.
    pub fn isolated(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == NOISE)
            .map(|(slot, _)| self.valid[slot])
            .collect()
    }
}

/// Standardize and cluster the behavioral vectors of `actors`.
///
/// Actors with zero-mass vectors are excluded. Returns `None` when fewer
/// than two actors carry meaningful vectors - not an error, just nothing
/// to cluster.
pub fn assign_behavior_clusters(
    actors: &[ActorProfile],
    eps: f64,
    min_samples: usize,
) -> Option<ClusterAssignment> {
    let mut valid = Vec::new();
    let mut vectors = Vec::new();

    for (index, actor) in actors.iter().enumerate() {
        let vector = actor.behavioral_vector();
        if vector.iter().sum::<f64>() > 0.0 {
            valid.push(index);
            vectors.push(vector);
        }
    }

    if valid.len() < 2 {
        return None;
    }

    let columns = vectors[0].len();
    let flat: Vec<f64> = vectors.into_iter().flatten().collect();
    let matrix = Array2::from_shape_vec((valid.len(), columns), flat)
        .expect("vector rows share a fixed length");

    let labels = dbscan(&standardize(&matrix), eps, min_samples);
    Some(ClusterAssignment { valid, labels })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let data = arr2(&[[1.0, 10.0], [3.0, 30.0], [5.0, 50.0]]);
        let standardized = standardize(&data);

        for column in standardized.axis_iter(Axis(1)) {
            let mean: f64 = column.sum() / column.len() as f64;
            let variance: f64 =
                column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
            assert!(mean.abs() < 1e-9);
            assert!((variance - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_standardize_constant_column_passes_through() {
        let data = arr2(&[[2.0, 1.0], [2.0, 2.0], [2.0, 3.0]]);
        let standardized = standardize(&data);

        // Centered but not scaled: all zeros, no NaN
        for value in standardized.column(0).iter() {
            assert_eq!(*value, 0.0);
        }
    }

    #[test]
    fn test_identical_points_form_single_cluster() {
        let data = arr2(&[[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]);
        let labels = dbscan(&standardize(&data), 0.5, 2);

        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_two_groups_and_noise() {
        let data = arr2(&[
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [20.0, -20.0],
        ]);
        let labels = dbscan(&data, 0.5, 2);

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(labels[5], NOISE);
    }

    #[test]
    fn test_dbscan_deterministic_for_fixed_input() {
        let data = arr2(&[
            [0.0, 0.0],
            [0.2, 0.1],
            [4.0, 4.0],
            [4.1, 4.2],
            [9.0, 0.0],
        ]);
        let first = dbscan(&data, 0.5, 2);
        let second = dbscan(&data, 0.5, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_point_is_noise() {
        let data = arr2(&[[1.0, 2.0]]);
        let labels = dbscan(&data, 0.5, 2);
        assert_eq!(labels, vec![NOISE]);
    }
}
