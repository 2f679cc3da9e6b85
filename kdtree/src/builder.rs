//! The single-threaded mid-point-split-with-slide builder.

use crate::errors::{KdResult, KdTreeError};
use crate::tree::KdTree;
use kdcloud::{Metric, PointCloud, Scalar};
use kdtree_core::{DimPacking, Node};

/// Construction-time tuning knobs.
///
/// `bucketSize` is the only parameter this crate recognises today; unknown
/// keys passed through the string-keyed factory (see the crate root) are
/// ignored rather than rejected, per the factory's contract.
#[derive(Debug, Clone, Copy)]
pub struct Parameters {
    bucket_size: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters { bucket_size: 8 }
    }
}

impl Parameters {
    /// Parameters with the default bucket size (8).
    pub fn new() -> Self {
        Parameters::default()
    }

    /// Leaf capacity: points per bucket before a cell stops splitting.
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Fluent setter for `bucketSize`.
    pub fn set_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }
}

/// Builds a [`KdTree`] from a borrowed cloud and a metric.
///
/// Building is single-threaded: `KdTreeBuilder` is consumed by
/// [`KdTreeBuilder::build`], which is the only way to obtain a `KdTree`, so
/// there is no way to observe a tree in a partially-built state.
pub struct KdTreeBuilder<'c, T, M> {
    cloud: &'c PointCloud<T>,
    metric: M,
    parameters: Parameters,
}

impl<'c, T: Scalar, M: Metric<T>> KdTreeBuilder<'c, T, M> {
    /// Starts a builder for `cloud` under `metric`, with default parameters.
    pub fn new(cloud: &'c PointCloud<T>, metric: M) -> Self {
        KdTreeBuilder {
            cloud,
            metric,
            parameters: Parameters::default(),
        }
    }

    /// Fluent setter for the leaf bucket size.
    pub fn set_bucket_size(mut self, bucket_size: usize) -> Self {
        self.parameters = self.parameters.set_bucket_size(bucket_size);
        self
    }

    /// Replaces the whole parameter set.
    pub fn set_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Recursively partitions the cloud and emits the packed node and
    /// bucket arrays.
    pub fn build(self) -> KdResult<KdTree<'c, T, M>> {
        let dim = self.cloud.dim();
        let n = self.cloud.len();
        let bucket_size = self.parameters.bucket_size();
        if bucket_size == 0 {
            return Err(KdTreeError::InvalidArgument(
                "bucket_size must be non-zero".into(),
            ));
        }
        let packing = DimPacking::new(dim);
        let leaf_sentinel = dim as u32;

        log::debug!(
            "building kd-tree: n={} dim={} bucket_size={}",
            n,
            dim,
            bucket_size
        );

        let mut indices: Vec<usize> = (0..n).collect();
        let mut min_vals: Vec<T> = self.cloud.bounding_box().min_bound().to_vec();
        let mut max_vals: Vec<T> = self.cloud.bounding_box().max_bound().to_vec();
        let mut nodes = Vec::with_capacity(2 * n / bucket_size + 1);
        let mut buckets = Vec::with_capacity(n);

        build_range(
            &mut indices,
            &mut min_vals,
            &mut max_vals,
            self.cloud,
            bucket_size,
            &packing,
            leaf_sentinel,
            &mut nodes,
            &mut buckets,
        );

        log::debug!(
            "kd-tree built: {} nodes, {} bucket entries",
            nodes.len(),
            buckets.len()
        );

        Ok(KdTree::from_parts(
            self.cloud,
            self.metric,
            packing,
            leaf_sentinel,
            nodes,
            buckets,
            bucket_size,
        ))
    }
}

#[allow(clippy::too_many_arguments)]
fn build_range<T: Scalar>(
    indices: &mut [usize],
    min_vals: &mut [T],
    max_vals: &mut [T],
    cloud: &PointCloud<T>,
    bucket_size: usize,
    packing: &DimPacking,
    leaf_sentinel: u32,
    nodes: &mut Vec<Node<T>>,
    buckets: &mut Vec<usize>,
) {
    let count = indices.len();
    if count <= bucket_size {
        let bucket_index = buckets.len() as u32;
        buckets.extend_from_slice(indices);
        nodes.push(Node::new_leaf(
            packing,
            leaf_sentinel,
            count as u32,
            bucket_index,
        ));
        return;
    }

    let dim = min_vals.len();
    let mut split_dim = 0;
    let mut best_spread = max_vals[0] - min_vals[0];
    for d in 1..dim {
        let spread = max_vals[d] - min_vals[d];
        if spread > best_spread {
            best_spread = spread;
            split_dim = d;
        }
    }

    let two = T::one() + T::one();
    let midpoint = (min_vals[split_dim] + max_vals[split_dim]) / two;

    let mut proj_min = T::infinity();
    let mut proj_max = T::neg_infinity();
    let mut min_point = indices[0];
    let mut max_point = indices[0];
    for &idx in indices.iter() {
        let v = cloud
            .point(idx)
            .expect("builder only ever touches indices within the cloud")[split_dim];
        if v < proj_min {
            proj_min = v;
            min_point = idx;
        }
        if v > proj_max {
            proj_max = v;
            max_point = idx;
        }
    }

    let mut cut = midpoint;
    if cut < proj_min {
        cut = proj_min;
    }
    if cut > proj_max {
        cut = proj_max;
    }

    let mut lo = 0usize;
    let mut hi = indices.len();
    while lo < hi {
        let v = cloud.point(indices[lo]).expect("valid index")[split_dim];
        if v < cut {
            lo += 1;
        } else {
            hi -= 1;
            indices.swap(lo, hi);
        }
    }
    // A cut slid down to proj_min (up to proj_max) leaves one side empty;
    // forcing a point across only keeps the child's narrowed box valid if
    // the point moved is the one that actually sits on the cut, not
    // whichever index the partition happened to leave at the boundary.
    let mut mid = lo;
    if mid == 0 {
        let pos = indices
            .iter()
            .position(|&idx| idx == min_point)
            .expect("min_point is still present in indices");
        indices.swap(0, pos);
        mid = 1;
    } else if mid == indices.len() {
        let pos = indices
            .iter()
            .position(|&idx| idx == max_point)
            .expect("max_point is still present in indices");
        indices.swap(indices.len() - 1, pos);
        mid = indices.len() - 1;
    }

    let node_slot = nodes.len();
    nodes.push(Node::new_split(packing, split_dim, 0, cut));

    log::trace!(
        "split at node {}: dim={} cut={:?} left={} right={}",
        node_slot,
        split_dim,
        cut,
        mid,
        indices.len() - mid
    );

    let (left, right) = indices.split_at_mut(mid);

    let saved_max = max_vals[split_dim];
    max_vals[split_dim] = cut;
    build_range(
        left,
        min_vals,
        max_vals,
        cloud,
        bucket_size,
        packing,
        leaf_sentinel,
        nodes,
        buckets,
    );
    max_vals[split_dim] = saved_max;

    let right_child = nodes.len() as u32;

    let saved_min = min_vals[split_dim];
    min_vals[split_dim] = cut;
    build_range(
        right,
        min_vals,
        max_vals,
        cloud,
        bucket_size,
        packing,
        leaf_sentinel,
        nodes,
        buckets,
    );
    min_vals[split_dim] = saved_min;

    nodes[node_slot] = Node::new_split(packing, split_dim, right_child, cut);
}
