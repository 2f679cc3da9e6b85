//! The index factory: picks a search strategy and wraps it behind one
//! dispatching type, the way `goko`'s tree builder picks a covertree
//! variant behind a single handle.

use crate::builder::{KdTreeBuilder, Parameters};
use crate::errors::{KdResult, KdTreeError};
use crate::heap::{BestK, LinearHeap, TreeHeap};
use crate::options::{CreationFlags, SearchOptions};
use crate::tree::KdTree;
use kdcloud::{Metric, PointCloud, Scalar};

/// Which search strategy an [`Index`] was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// Linear scan over every point in the cloud; the reference the kd-tree
    /// checks itself against.
    BruteForce,
    /// Kd-tree descent, backed by a flat-array top-k (good for small k).
    KdTreeLinearHeap,
    /// Kd-tree descent, backed by a binary-heap top-k (good for large k).
    KdTreeTreeHeap,
}

/// The fields every search strategy shares, regardless of which one backs
/// a given [`Index`] — the composition this crate uses in place of the
/// base-class fields a C++ sibling would share via private inheritance.
struct IndexHeader {
    creation_flags: CreationFlags,
}

/// An opaque handle returned by [`create`], dispatching to whichever
/// strategy it was built with.
pub enum Index<'c, T, M> {
    BruteForce {
        cloud: &'c PointCloud<T>,
        metric: M,
        header: IndexHeader,
    },
    KdTreeLinear(KdTree<'c, T, M>, IndexHeader),
    KdTreeTree(KdTree<'c, T, M>, IndexHeader),
}

impl<'c, T: Scalar, M: Metric<T>> Index<'c, T, M> {
    /// Which [`SearchType`] this index was built with.
    pub fn search_type(&self) -> SearchType {
        match self {
            Index::BruteForce { .. } => SearchType::BruteForce,
            Index::KdTreeLinear(..) => SearchType::KdTreeLinearHeap,
            Index::KdTreeTree(..) => SearchType::KdTreeTreeHeap,
        }
    }

    /// The dimension of the underlying cloud.
    pub fn dim(&self) -> usize {
        match self {
            Index::BruteForce { cloud, .. } => cloud.dim(),
            Index::KdTreeLinear(tree, _) | Index::KdTreeTree(tree, _) => tree.dim(),
        }
    }

    /// The number of points in the underlying cloud.
    pub fn len(&self) -> usize {
        match self {
            Index::BruteForce { cloud, .. } => cloud.len(),
            Index::KdTreeLinear(tree, _) | Index::KdTreeTree(tree, _) => tree.len(),
        }
    }

    /// Whether the underlying cloud has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this index was created with `TOUCH_STATISTICS`.
    pub fn touch_statistics(&self) -> bool {
        let header = match self {
            Index::BruteForce { header, .. } => header,
            Index::KdTreeLinear(_, header) | Index::KdTreeTree(_, header) => header,
        };
        header.creation_flags.touch_statistics()
    }

    /// Accesses the underlying [`KdTree`], for introspection (node counts,
    /// bucket layout) that only makes sense for a tree-backed index.
    pub fn as_kdtree(&self) -> KdResult<&KdTree<'c, T, M>> {
        match self {
            Index::KdTreeLinear(tree, _) | Index::KdTreeTree(tree, _) => Ok(tree),
            Index::BruteForce { .. } => Err(KdTreeError::Unsupported(
                "index was built with BruteForce, which has no tree to introspect".into(),
            )),
        }
    }

    /// Runs a single query against this index, dispatching to whichever
    /// heap variant (or the brute-force scan) the index was built with.
    pub fn knn(
        &self,
        query: &[T],
        k: usize,
        options: SearchOptions,
        max_error: T,
        max_radius_sq: T,
    ) -> (Vec<(T, usize)>, u64) {
        match self {
            Index::BruteForce { cloud, metric, .. } => {
                let results = KdTree::brute_force::<LinearHeap<T>>(
                    cloud,
                    metric,
                    query,
                    k,
                    options,
                    max_radius_sq,
                );
                let stats = if options.collect_statistics() {
                    cloud.len() as u64
                } else {
                    0
                };
                (results, stats)
            }
            Index::KdTreeLinear(tree, _) => {
                tree.search::<LinearHeap<T>>(query, k, options, max_error, max_radius_sq)
            }
            Index::KdTreeTree(tree, _) => {
                tree.search::<TreeHeap<T>>(query, k, options, max_error, max_radius_sq)
            }
        }
    }
}

/// Builds an [`Index`] over `cloud` under `metric`, using `search_type` as
/// the search strategy.
///
/// Unlike the string-keyed, dimension-taking factory this is grounded on,
/// `dim` is not a separate parameter: [`PointCloud::dim`] already carries
/// it, so threading it through here again would just be a second, possibly
/// contradictory, source of truth.
pub fn create<'c, T, M>(
    cloud: &'c PointCloud<T>,
    metric: M,
    search_type: SearchType,
    creation_flags: CreationFlags,
    parameters: Parameters,
) -> KdResult<Index<'c, T, M>>
where
    T: Scalar,
    M: Metric<T>,
{
    let header = IndexHeader { creation_flags };
    match search_type {
        SearchType::BruteForce => Ok(Index::BruteForce {
            cloud,
            metric,
            header,
        }),
        SearchType::KdTreeLinearHeap => {
            let tree = KdTreeBuilder::new(cloud, metric)
                .set_parameters(parameters)
                .build()?;
            Ok(Index::KdTreeLinear(tree, header))
        }
        SearchType::KdTreeTreeHeap => {
            let tree = KdTreeBuilder::new(cloud, metric)
                .set_parameters(parameters)
                .build()?;
            Ok(Index::KdTreeTree(tree, header))
        }
    }
}
