use crate::{Error, Result, Vector};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Default number of neighbors returned by [`NeighborIndex::nearest`]
pub const DEFAULT_NEIGHBORS: usize = 5;

/// A search hit: reference row and its Euclidean distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f64,
}

/// Candidate in the bounded result heap.
/// Ordered by (distance, row) so the heap top is the current worst hit
/// and equal distances keep the earlier row.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Candidate {
    dist_sq: OrderedFloat<f64>,
    row: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .cmp(&other.dist_sq)
            .then_with(|| self.row.cmp(&other.row))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct KdNode {
    row: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Exact k-nearest-neighbor index over normalized feature vectors
///
/// A k-d tree with one point per node, split on the axis of widest spread
/// at each level. Queries prune subtrees whose splitting plane lies farther
/// than the current k-th best hit, giving sub-linear cost in the number of
/// rows for low-dimensional feature vectors.
#[derive(Debug, Clone)]
pub struct NeighborIndex {
    /// Contiguous storage for all vectors (row-major)
    vectors: Vec<f64>,
    dim: usize,
    len: usize,
    nodes: Vec<KdNode>,
    root: Option<usize>,
    default_k: usize,
}

impl NeighborIndex {
    /// Build the index. Row indices in search results refer to the position
    /// of each vector in `vectors`.
    pub fn build(vectors: &[Vector], default_k: usize) -> Result<Self> {
        if default_k == 0 {
            return Err(Error::InvalidConfig("neighbor count must be at least 1".to_string()));
        }
        let dim = match vectors.first() {
            Some(v) => v.dim(),
            None => {
                return Err(Error::DataIntegrity(
                    "cannot build a neighbor index over an empty table".to_string(),
                ))
            }
        };
        if dim == 0 {
            return Err(Error::InvalidDimension { expected: 1, actual: 0 });
        }

        let mut flat = Vec::with_capacity(vectors.len() * dim);
        for v in vectors {
            if v.dim() != dim {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    actual: v.dim(),
                });
            }
            flat.extend_from_slice(v.as_slice());
        }

        let mut index = Self {
            vectors: flat,
            dim,
            len: vectors.len(),
            nodes: Vec::with_capacity(vectors.len()),
            root: None,
            default_k,
        };
        let mut rows: Vec<usize> = (0..vectors.len()).collect();
        index.root = index.build_subtree(&mut rows);
        Ok(index)
    }

    #[inline(always)]
    fn get_vector(&self, row: usize) -> &[f64] {
        let start = row * self.dim;
        &self.vectors[start..start + self.dim]
    }

    #[inline]
    fn coord(&self, row: usize, axis: usize) -> f64 {
        self.vectors[row * self.dim + axis]
    }

    fn widest_axis(&self, rows: &[usize]) -> usize {
        (0..self.dim)
            .map(|axis| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let x = self.coord(r, axis);
                    (lo.min(x), hi.max(x))
                });
                (axis, hi - lo)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(axis, _)| axis)
            .unwrap_or(0)
    }

    fn build_subtree(&mut self, rows: &mut [usize]) -> Option<usize> {
        if rows.is_empty() {
            return None;
        }
        let axis = self.widest_axis(rows);
        let mid = rows.len() / 2;
        rows.select_nth_unstable_by(mid, |&a, &b| {
            self.coord(a, axis)
                .total_cmp(&self.coord(b, axis))
                .then_with(|| a.cmp(&b))
        });
        let row = rows[mid];
        let (left_rows, rest) = rows.split_at_mut(mid);
        let right_rows = &mut rest[1..];

        let left = self.build_subtree(left_rows);
        let right = self.build_subtree(right_rows);
        self.nodes.push(KdNode { row, axis, left, right });
        Some(self.nodes.len() - 1)
    }

    /// Number of neighbors used by [`nearest`](Self::nearest)
    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Search with the build-time neighbor count
    pub fn nearest(&self, query: &Vector) -> Result<Vec<Neighbor>> {
        self.search(query, self.default_k)
    }

    /// The `min(k, len)` nearest rows, ascending by distance, ties by row
    pub fn search(&self, query: &Vector, k: usize) -> Result<Vec<Neighbor>> {
        if query.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: query.dim(),
            });
        }
        let k = k.min(self.len);
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = self.root {
            self.search_node(root, query.as_slice(), k, &mut heap);
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                row: c.row,
                distance: c.dist_sq.into_inner().sqrt(),
            })
            .collect())
    }

    fn search_node(&self, node_idx: usize, query: &[f64], k: usize, heap: &mut BinaryHeap<Candidate>) {
        let node = &self.nodes[node_idx];
        let candidate = Candidate {
            dist_sq: OrderedFloat(crate::vector::squared_l2(query, self.get_vector(node.row))),
            row: node.row,
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }

        let diff = query[node.axis] - self.coord(node.row, node.axis);
        let (near, far) = if diff <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search_node(near, query, k, heap);
        }
        if let Some(far) = far {
            // Equal-distance planes are still visited so ties resolve by row
            let worst = heap.peek().map(|c| c.dist_sq.into_inner());
            if heap.len() < k || worst.is_some_and(|w| diff * diff <= w) {
                self.search_node(far, query, k, heap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(vectors: &[Vector], query: &Vector, k: usize) -> Vec<Neighbor> {
        let mut all: Vec<Neighbor> = vectors
            .iter()
            .enumerate()
            .map(|(row, v)| Neighbor {
                row,
                distance: v.l2_distance(query),
            })
            .collect();
        all.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.row.cmp(&b.row)));
        all.truncate(k);
        all
    }

    #[test]
    fn test_search_orders_by_distance() {
        let vectors: Vec<Vector> = (0..10).map(|i| Vector::new(vec![i as f64, 0.0])).collect();
        let index = NeighborIndex::build(&vectors, 3).unwrap();

        let hits = index.nearest(&Vector::new(vec![4.2, 0.0])).unwrap();
        let rows: Vec<usize> = hits.iter().map(|h| h.row).collect();
        assert_eq!(rows, vec![4, 5, 3]);
        assert!((hits[0].distance - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_length_is_min_k_rows() {
        let vectors = vec![Vector::new(vec![0.0]), Vector::new(vec![1.0])];
        let index = NeighborIndex::build(&vectors, 5).unwrap();
        assert_eq!(index.nearest(&Vector::new(vec![0.0])).unwrap().len(), 2);
        assert!(index.search(&Vector::new(vec![0.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_first_row() {
        // Rows 1, 3 and 4 are all at distance 1 from the query
        let vectors = vec![
            Vector::new(vec![5.0, 5.0]),
            Vector::new(vec![1.0, 0.0]),
            Vector::new(vec![9.0, 9.0]),
            Vector::new(vec![-1.0, 0.0]),
            Vector::new(vec![0.0, 1.0]),
        ];
        let index = NeighborIndex::build(&vectors, 2).unwrap();
        let hits = index.nearest(&Vector::new(vec![0.0, 0.0])).unwrap();
        let rows: Vec<usize> = hits.iter().map(|h| h.row).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_duplicate_vectors_resolve_by_row() {
        let vectors = vec![Vector::new(vec![1.0, 1.0]); 6];
        let index = NeighborIndex::build(&vectors, 3).unwrap();
        let rows: Vec<usize> = index
            .nearest(&Vector::new(vec![1.0, 1.0]))
            .unwrap()
            .iter()
            .map(|h| h.row)
            .collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let vectors: Vec<Vector> = (0..2000)
            .map(|_| Vector::new((0..5).map(|_| rng.random_range(-3.0..3.0)).collect()))
            .collect();
        let index = NeighborIndex::build(&vectors, 5).unwrap();

        for _ in 0..50 {
            let query = Vector::new((0..5).map(|_| rng.random_range(-3.0..3.0)).collect());
            let got = index.nearest(&query).unwrap();
            let expected = brute_force(&vectors, &query, 5);
            let got_rows: Vec<usize> = got.iter().map(|h| h.row).collect();
            let expected_rows: Vec<usize> = expected.iter().map(|h| h.row).collect();
            assert_eq!(got_rows, expected_rows);
        }
    }

    #[test]
    fn test_build_rejects_bad_input() {
        assert!(matches!(NeighborIndex::build(&[], 5), Err(Error::DataIntegrity(_))));
        assert!(matches!(
            NeighborIndex::build(&[Vector::new(vec![1.0])], 0),
            Err(Error::InvalidConfig(_))
        ));
        let ragged = vec![Vector::new(vec![1.0, 2.0]), Vector::new(vec![1.0])];
        assert!(matches!(
            NeighborIndex::build(&ragged, 5),
            Err(Error::InvalidDimension { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = NeighborIndex::build(&[Vector::new(vec![1.0, 2.0])], 1).unwrap();
        assert!(index.nearest(&Vector::new(vec![1.0])).is_err());
    }
}
