//! Average-linkage agglomerative clustering under cosine distance.
//!
//! The full dendrogram is built with the nearest-neighbour chain algorithm
//! and Lance–Williams updates over a condensed distance matrix. Flat clusters
//! are read off by applying every merge below a distance threshold, so no
//! cluster count is fixed up front.

use std::collections::HashMap;

/// Cosine distance `1 - cos(a, b)`, clamped to `[0, 2]`.
///
/// A zero-norm vector is at distance 1 from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 2.0)
}

/// One agglomeration step: the clusters containing items `left` and `right`
/// joined at `distance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Merge {
    /// Item standing for one merged cluster.
    pub left: usize,
    /// Item standing for the other; always greater than `left`.
    pub right: usize,
    /// Average-linkage distance at which the pair merged.
    pub distance: f64,
}

/// Complete merge history over `len` items.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dendrogram {
    len: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Build the average-linkage dendrogram of `vectors`.
    pub fn average_linkage<V: AsRef<[f32]>>(vectors: &[V]) -> Self {
        let n = vectors.len();
        if n < 2 {
            return Self {
                len: n,
                merges: Vec::new(),
            };
        }
        let mut distances = CondensedMatrix::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                distances.set(i, j, cosine_distance(vectors[i].as_ref(), vectors[j].as_ref()));
            }
        }

        let mut size = vec![1usize; n];
        let mut active = vec![true; n];
        let mut chain: Vec<usize> = Vec::with_capacity(n);
        let mut merges = Vec::with_capacity(n - 1);

        for _ in 0..n - 1 {
            if chain.is_empty() {
                if let Some(first) = active.iter().position(|alive| *alive) {
                    chain.push(first);
                }
            }
            let (a, b) = loop {
                let Some(&tip) = chain.last() else {
                    break (0, 0);
                };
                let previous = chain.len().checked_sub(2).map(|idx| chain[idx]);
                let mut nearest = previous;
                let mut nearest_distance = previous
                    .map(|prev| distances.get(tip, prev))
                    .unwrap_or(f64::INFINITY);
                for candidate in (0..n).filter(|&k| active[k] && k != tip) {
                    let distance = distances.get(tip, candidate);
                    if distance < nearest_distance {
                        nearest = Some(candidate);
                        nearest_distance = distance;
                    }
                }
                match nearest {
                    Some(next) if Some(next) == previous => {
                        chain.truncate(chain.len() - 2);
                        break (tip, next);
                    }
                    Some(next) => chain.push(next),
                    None => break (tip, tip),
                }
            };
            if a == b {
                break;
            }

            let distance = distances.get(a, b);
            merges.push(Merge {
                left: a.min(b),
                right: a.max(b),
                distance,
            });
            let (keep, gone) = (a.min(b), a.max(b));
            let (size_keep, size_gone) = (size[keep] as f64, size[gone] as f64);
            for k in (0..n).filter(|&k| active[k] && k != keep && k != gone) {
                let updated = (size_keep * distances.get(keep, k)
                    + size_gone * distances.get(gone, k))
                    / (size_keep + size_gone);
                distances.set(keep, k, updated);
            }
            active[gone] = false;
            size[keep] += size[gone];
        }

        Self { len: n, merges }
    }

    /// Number of clustered items.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when no items were clustered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Merges in the order they were performed.
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flat cluster label per item, applying every merge with distance
    /// strictly below `threshold`.
    ///
    /// Labels are numbered by first appearance in item order.
    pub fn cut(&self, threshold: f64) -> Vec<usize> {
        let mut sets = DisjointSet::new(self.len);
        for merge in self.merges.iter().filter(|merge| merge.distance < threshold) {
            sets.union(merge.left, merge.right);
        }
        let mut labels_by_root: HashMap<usize, usize> = HashMap::new();
        (0..self.len)
            .map(|item| {
                let root = sets.find(item);
                let next = labels_by_root.len();
                *labels_by_root.entry(root).or_insert(next)
            })
            .collect()
    }

    /// Number of flat clusters at `threshold`.
    pub fn cluster_count(&self, threshold: f64) -> usize {
        self.cut(threshold).into_iter().max().map_or(0, |max| max + 1)
    }
}

/// Upper triangle of a symmetric distance matrix without the diagonal.
struct CondensedMatrix {
    n: usize,
    values: Vec<f64>,
}

impl CondensedMatrix {
    fn new(n: usize) -> Self {
        Self {
            n,
            values: vec![0.0; n * (n - 1) / 2],
        }
    }

    fn offset(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        i * self.n - i * (i + 1) / 2 + (j - i - 1)
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.values[self.offset(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        let offset = self.offset(i, j);
        self.values[offset] = value;
    }
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, item: usize) -> usize {
        let mut root = item;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = item;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            let (low, high) = (root_a.min(root_b), root_a.max(root_b));
            self.parent[high] = low;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn cosine_distance_basics() {
        assert!(approx(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]), 0.0));
        assert!(approx(cosine_distance(&[1.0, 0.0], &[0.0, 3.0]), 1.0));
        assert!(approx(cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]), 2.0));
        assert!(approx(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0));
    }

    #[test]
    fn average_linkage_uses_mean_pairwise_distance() {
        let vectors = vec![vec![1.0f32, 0.0], vec![1.0, 0.1], vec![0.0, 1.0]];
        let dendrogram = Dendrogram::average_linkage(&vectors);
        let merges = dendrogram.merges();
        assert_eq!(merges.len(), 2);
        let d_ab = cosine_distance(&vectors[0], &vectors[1]);
        let d_ac = cosine_distance(&vectors[0], &vectors[2]);
        let d_bc = cosine_distance(&vectors[1], &vectors[2]);
        assert_eq!((merges[0].left, merges[0].right), (0, 1));
        assert!(approx(merges[0].distance, d_ab));
        assert!(approx(merges[1].distance, (d_ac + d_bc) / 2.0));
    }

    #[test]
    fn cut_labels_follow_first_appearance() {
        let vectors = vec![
            vec![0.0f32, 1.0],
            vec![1.0, 0.0],
            vec![0.05, 1.0],
            vec![1.0, 0.02],
        ];
        let dendrogram = Dendrogram::average_linkage(&vectors);
        assert_eq!(dendrogram.cut(0.3), vec![0, 1, 0, 1]);
        assert_eq!(dendrogram.cut(1e-9), vec![0, 1, 2, 3]);
        assert_eq!(dendrogram.cut(1.5), vec![0, 0, 0, 0]);
    }

    #[test]
    fn cluster_count_is_monotone_in_threshold() {
        let vectors: Vec<Vec<f32>> = (0..24)
            .map(|i| {
                let angle = (i as f32) * 0.37 + ((i * i) % 7) as f32 * 0.11;
                vec![angle.cos(), angle.sin(), ((i % 5) as f32) * 0.2]
            })
            .collect();
        let dendrogram = Dendrogram::average_linkage(&vectors);
        assert_eq!(dendrogram.merges().len(), vectors.len() - 1);
        let mut previous = usize::MAX;
        for step in 1..=40 {
            let count = dendrogram.cluster_count(step as f64 * 0.05);
            assert!(count <= previous, "count rose at step {step}");
            previous = count;
        }
        assert_eq!(dendrogram.cluster_count(2.5), 1);
    }

    #[test]
    fn degenerate_inputs() {
        let empty: Vec<Vec<f32>> = Vec::new();
        assert!(Dendrogram::average_linkage(&empty).cut(0.3).is_empty());
        let single = vec![vec![1.0f32]];
        assert_eq!(Dendrogram::average_linkage(&single).cut(0.3), vec![0]);
    }
}
