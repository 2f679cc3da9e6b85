//! The built, immutable kd-tree index and its single-query searcher.

use crate::heap::BestK;
use crate::options::SearchOptions;
use kdcloud::{Metric, PointCloud, Scalar};
use kdtree_core::{DimPacking, Node};

/// One frame of the explicit descent stack.
///
/// `Visit` carries the node to process and the squared distance from the
/// query to that node's cell (`rd`); `pending_offset`, when set, is applied
/// to the offset array before the node is processed — this is how a "far"
/// child's axis offset gets mutated exactly when control reaches it, never
/// before (a near child must still see its parent's offset).
///
/// `Restore` undoes that mutation once the far child's entire subtree —
/// everything pushed on top of it — has finished.
enum Frame<T> {
    Visit {
        node: usize,
        rd: T,
        pending_offset: Option<(usize, T)>,
    },
    Restore {
        dim: usize,
        old: T,
    },
}

/// An unbalanced, mid-point-split kd-tree over a borrowed [`PointCloud`].
///
/// Built once by [`crate::builder::KdTreeBuilder`], then immutable: every
/// query method takes `&self` and touches no shared mutable state, so a
/// `KdTree` is safely shared across threads with no synchronisation.
pub struct KdTree<'c, T, M> {
    cloud: &'c PointCloud<T>,
    metric: M,
    packing: DimPacking,
    leaf_sentinel: u32,
    nodes: Vec<Node<T>>,
    buckets: Vec<usize>,
    bucket_size: usize,
}

impl<'c, T: Scalar + std::fmt::Debug, M: std::fmt::Debug> std::fmt::Debug for KdTree<'c, T, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdTree")
            .field("cloud", &self.cloud)
            .field("metric", &self.metric)
            .field("packing", &self.packing)
            .field("leaf_sentinel", &self.leaf_sentinel)
            .field("nodes", &self.nodes)
            .field("buckets", &self.buckets)
            .field("bucket_size", &self.bucket_size)
            .finish()
    }
}

impl<'c, T: Scalar, M: Metric<T>> KdTree<'c, T, M> {
    pub(crate) fn from_parts(
        cloud: &'c PointCloud<T>,
        metric: M,
        packing: DimPacking,
        leaf_sentinel: u32,
        nodes: Vec<Node<T>>,
        buckets: Vec<usize>,
        bucket_size: usize,
    ) -> Self {
        KdTree {
            cloud,
            metric,
            packing,
            leaf_sentinel,
            nodes,
            buckets,
            bucket_size,
        }
    }

    /// The dimension of the underlying cloud.
    pub fn dim(&self) -> usize {
        self.cloud.dim()
    }

    /// The number of points in the underlying cloud.
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    /// Whether the underlying cloud has no points.
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    /// The leaf capacity this tree was built with.
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Number of node records in the index (test/debug use).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of bucket entries across all leaves (test/debug use).
    pub fn bucket_entry_count(&self) -> usize {
        self.buckets.len()
    }

    /// Whether node `n` is a leaf (test/debug use).
    pub fn is_leaf(&self, n: usize) -> bool {
        self.nodes[n].is_leaf(&self.packing, self.leaf_sentinel)
    }

    /// The right-child index of split node `n` (test/debug use).
    pub fn right_child(&self, n: usize) -> usize {
        self.nodes[n].right_child(&self.packing)
    }

    #[cfg(test)]
    pub(crate) fn debug_nodes(&self) -> Vec<Node<T>> {
        self.nodes.clone()
    }

    #[cfg(test)]
    pub(crate) fn debug_buckets(&self) -> Vec<usize> {
        self.buckets.clone()
    }

    /// Runs a single query against the index.
    ///
    /// `H` selects the best-k heap implementation (`LinearHeap` for
    /// `KDTREE_LINEAR_HEAP`, `TreeHeap` for `KDTREE_TREE_HEAP`).
    /// `max_error` is `1 + epsilon`; `max_radius_sq` is `+inf` to disable
    /// radius bounding. Returns the k `(distance, index)` pairs (possibly
    /// containing sentinels) and the number of leaf points inspected (0 when
    /// `COLLECT_STATISTICS` isn't set).
    pub fn search<H: BestK<T>>(
        &self,
        query: &[T],
        k: usize,
        options: SearchOptions,
        max_error: T,
        max_radius_sq: T,
    ) -> (Vec<(T, usize)>, u64) {
        let dim = self.dim();
        debug_assert_eq!(query.len(), dim);

        let mut heap = H::new(k);

        if query.iter().any(|v| v.is_nan()) {
            let results = if options.sort_results() {
                heap.into_sorted()
            } else {
                heap.into_unsorted()
            };
            return (results, 0);
        }

        if self.nodes.is_empty() {
            let results = if options.sort_results() {
                heap.into_sorted()
            } else {
                heap.into_unsorted()
            };
            return (results, 0);
        }

        let bbox = self.cloud.bounding_box();
        let mut offsets = vec![T::zero(); dim];
        let mut rd = T::zero();
        for d in 0..dim {
            let lo = bbox.min_bound()[d];
            let hi = bbox.max_bound()[d];
            let q = query[d];
            let clamped = if q < lo {
                lo
            } else if q > hi {
                hi
            } else {
                q
            };
            let diff = clamped - q;
            offsets[d] = diff;
            rd = rd + self.metric.axis_term(diff);
        }

        let scaled_error = self.metric.scale_max_error(max_error);
        let mut stats = 0u64;
        let mut stack = vec![Frame::Visit {
            node: 0,
            rd,
            pending_offset: None,
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Restore { dim, old } => {
                    offsets[dim] = old;
                }
                Frame::Visit {
                    node,
                    rd,
                    pending_offset,
                } => {
                    if let Some((d, new_val)) = pending_offset {
                        offsets[d] = new_val;
                    }

                    if self.nodes[node].is_leaf(&self.packing, self.leaf_sentinel) {
                        self.visit_leaf(
                            node,
                            query,
                            options,
                            max_radius_sq,
                            &mut heap,
                            &mut stats,
                        );
                        continue;
                    }

                    let split_dim = self.nodes[node].split_dim(&self.packing);
                    let cut = self.nodes[node].cut_val();
                    let right = self.nodes[node].right_child(&self.packing);
                    let left = node + 1;

                    let diff = query[split_dim] - cut;
                    let (near, far) = if diff <= T::zero() {
                        (left, right)
                    } else {
                        (right, left)
                    };

                    let old = offsets[split_dim];
                    let far_rd =
                        rd - self.metric.axis_term(old) + self.metric.axis_term(diff);

                    let pruned = far_rd * scaled_error > heap.max_dist()
                        && far_rd > max_radius_sq;

                    if !pruned {
                        stack.push(Frame::Restore {
                            dim: split_dim,
                            old,
                        });
                        stack.push(Frame::Visit {
                            node: far,
                            rd: far_rd,
                            pending_offset: Some((split_dim, diff)),
                        });
                    }
                    stack.push(Frame::Visit {
                        node: near,
                        rd,
                        pending_offset: None,
                    });
                }
            }
        }

        let results = if options.sort_results() {
            heap.into_sorted()
        } else {
            heap.into_unsorted()
        };
        (results, stats)
    }

    fn visit_leaf<H: BestK<T>>(
        &self,
        node: usize,
        query: &[T],
        options: SearchOptions,
        max_radius_sq: T,
        heap: &mut H,
        stats: &mut u64,
    ) {
        let bucket_index = self.nodes[node].bucket_index();
        let bucket_size = self.nodes[node].bucket_size(&self.packing);
        for &point_index in &self.buckets[bucket_index..bucket_index + bucket_size] {
            let pt = self
                .cloud
                .point(point_index)
                .expect("bucket entries always name valid points");
            let pt_slice = pt
                .as_slice()
                .expect("cloud rows are contiguous by construction");

            if !options.allow_self_match()
                && pt_slice.iter().zip(query.iter()).all(|(&a, &b)| a == b)
            {
                continue;
            }

            if options.collect_statistics() {
                *stats += 1;
            }

            let dist = self.metric.distance(query, pt_slice);
            if dist > max_radius_sq {
                continue;
            }
            if dist < heap.max_dist() {
                heap.push_if_better(dist, point_index);
            }
        }
    }

    /// A brute-force scan over every point, used as the `BRUTE_FORCE`
    /// search type and as the reference implementation invariant #2 checks
    /// the kd-tree against.
    pub fn brute_force<H: BestK<T>>(
        cloud: &PointCloud<T>,
        metric: &M,
        query: &[T],
        k: usize,
        options: SearchOptions,
        max_radius_sq: T,
    ) -> Vec<(T, usize)> {
        let mut heap = H::new(k);
        if query.iter().any(|v| v.is_nan()) {
            return if options.sort_results() {
                heap.into_sorted()
            } else {
                heap.into_unsorted()
            };
        }
        for index in 0..cloud.len() {
            let pt = cloud.point(index).expect("index in range");
            let pt_slice = pt.as_slice().expect("cloud rows are contiguous");
            if !options.allow_self_match()
                && pt_slice.iter().zip(query.iter()).all(|(&a, &b)| a == b)
            {
                continue;
            }
            let dist = metric.distance(query, pt_slice);
            if dist > max_radius_sq {
                continue;
            }
            if dist < heap.max_dist() {
                heap.push_if_better(dist, index);
            }
        }
        if options.sort_results() {
            heap.into_sorted()
        } else {
            heap.into_unsorted()
        }
    }
}
