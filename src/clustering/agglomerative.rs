use kodama::{Method, linkage};

use super::{ClusterLabel, ClusteringStrategy, DistanceMatrix, canonical_labels};

/// Complete-linkage hierarchical clustering cut at a distance threshold.
///
/// The dendrogram is built by `kodama` over the condensed distance matrix; merges whose
/// complete-link distance is strictly below the threshold are kept. Two posts further apart
/// than the threshold therefore never share a cluster, which keeps groups close to
/// near-duplicates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgglomerativeClustering {
    distance_threshold: f32,
}

impl AgglomerativeClustering {
    /// Build a strategy that refuses merges at or above `distance_threshold`.
    pub fn new(distance_threshold: f32) -> Self {
        Self { distance_threshold }
    }

    /// Merge cutoff.
    pub fn distance_threshold(&self) -> f32 {
        self.distance_threshold
    }
}

impl ClusteringStrategy for AgglomerativeClustering {
    fn cluster(&self, distances: &DistanceMatrix) -> Vec<ClusterLabel> {
        let size = distances.len();
        if size < 2 {
            return canonical_labels(&vec![0; size]);
        }

        let mut condensed = distances.condensed();
        let dendrogram = linkage(&mut condensed, size, Method::Complete);

        // Step `k` creates cluster `size + k`; remember one leaf for every cluster id.
        // Complete linkage is monotone, so every step under the cut only joins clusters
        // that were themselves formed under the cut.
        let mut leaf_of: Vec<usize> = (0..size).collect();
        let mut parent: Vec<usize> = (0..size).collect();
        for step in dendrogram.steps() {
            let (left, right) = (leaf_of[step.cluster1], leaf_of[step.cluster2]);
            leaf_of.push(left);
            if step.dissimilarity < self.distance_threshold {
                tracing::trace!(left, right, distance = step.dissimilarity, "Merging clusters");
                let left_root = find_root(&mut parent, left);
                let right_root = find_root(&mut parent, right);
                parent[right_root] = left_root;
            }
        }

        let raw: Vec<usize> = (0..size).map(|row| find_root(&mut parent, row)).collect();
        canonical_labels(&raw)
    }
}

fn find_root(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}
