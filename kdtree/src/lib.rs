//! An unbalanced, mid-point-split kd-tree for batched k-nearest-neighbour
//! search over low- to medium-dimensional point clouds.
//!
//! # Parameter guide
//!
//! - **T** — the scalar field, `f32` or `f64` ([`kdcloud::Scalar`]).
//! - **M** — the distance [`Metric`]: [`L2Squared`][kdcloud::L2Squared] for
//!   the default, fully-pruned Euclidean search, or [`L1`][kdcloud::L1].
//! - **k** — how many neighbours to return per query.
//! - **ε (epsilon)** — approximation slack; a returned neighbour may be up
//!   to `(1+ε)×` farther than the true nearest. Zero is exact.
//! - **bucket_size** — leaf capacity ([`Parameters`]); larger buckets trade
//!   node overhead for more per-leaf linear distance work.
//!
//! # Quick start
//!
//! ```
//! use kdcloud::{L2Squared, PointCloud};
//! use kdtree::{create, CreationFlags, Parameters, SearchOptions, SearchType};
//!
//! let cloud = PointCloud::new(vec![0.0, 1.0, 2.0, 3.0, 4.0], 1).unwrap();
//! let index = create(
//!     &cloud,
//!     L2Squared,
//!     SearchType::KdTreeLinearHeap,
//!     CreationFlags::empty(),
//!     Parameters::new(),
//! )
//! .unwrap();
//!
//! let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
//! let (results, _stats) = index.knn(&[1.5], 2, opts, 1.0, f64::INFINITY);
//! assert_eq!(results.len(), 2);
//! ```

#![warn(missing_docs)]
#![allow(clippy::needless_lifetimes)]

mod batch;
mod builder;
mod errors;
mod factory;
mod heap;
mod options;
mod tree;

pub use batch::{knn_batch, knn_batch_varying_radius};
pub use builder::{KdTreeBuilder, Parameters};
pub use errors::{KdResult, KdTreeError};
pub use factory::{create, Index, SearchType};
pub use heap::{BestK, LinearHeap, TreeHeap, INVALID_INDEX};
pub use options::{CreationFlags, SearchOptions};
pub use tree::KdTree;

#[cfg(test)]
mod end_to_end {
    use super::*;
    use kdcloud::{L1, L2Squared, PointCloud};
    use ndarray::{arr2, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Uniform};

    fn assert_close(a: f64, b: f64) {
        assert_approx_eq::assert_approx_eq!(a, b, 1e-9);
    }

    // S1 — trivial 1D.
    #[test]
    fn s1_trivial_1d() {
        let cloud = PointCloud::new(vec![0.0, 1.0, 2.0, 3.0, 4.0], 1).unwrap();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let (results, _) = index.knn(&[1.5], 2, opts, 1.0, f64::INFINITY);
        let indices: std::collections::HashSet<usize> =
            results.iter().map(|&(_, i)| i).collect();
        assert_eq!(indices, [1usize, 2].iter().copied().collect());
        for &(d, _) in &results {
            assert_close(d, 0.25);
        }
    }

    fn s2_cloud() -> PointCloud<f64> {
        let mut data = Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                data.push(x as f64);
                data.push(y as f64);
            }
        }
        PointCloud::new(data, 2).unwrap()
    }

    // S2 — 2D grid.
    #[test]
    fn s2_2d_grid() {
        let cloud = s2_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let (results, _) = index.knn(&[1.1, 1.1], 1, opts, 1.0, f64::INFINITY);
        assert_eq!(results[0].1, 4);
        assert_close(results[0].0, 0.02);
    }

    // S3 — self-match toggle.
    #[test]
    fn s3_self_match_toggle() {
        let cloud = s2_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let query = [1.0, 1.0];

        let with_self =
            SearchOptions::from_bits(SearchOptions::SORT_RESULTS | SearchOptions::ALLOW_SELF_MATCH)
                .unwrap();
        let (results, _) = index.knn(&query, 1, with_self, 1.0, f64::INFINITY);
        assert_eq!(results[0], (0.0, 4));

        let without_self = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let (results, _) = index.knn(&query, 1, without_self, 1.0, f64::INFINITY);
        assert!([1usize, 3, 5, 7].contains(&results[0].1));
        assert_close(results[0].0, 1.0);
    }

    // S4 — radius cutoff.
    #[test]
    fn s4_radius_cutoff() {
        let cloud = s2_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let (results, _) = index.knn(&[10.0, 10.0], 3, opts, 1.0, 1.0);
        for &(d, i) in &results {
            assert!(d.is_infinite());
            assert_eq!(i, INVALID_INDEX);
        }
    }

    // S5 — approximation.
    #[test]
    fn s5_approximation_bound() {
        let mut rng = StdRng::seed_from_u64(42);
        let unit = Uniform::new(0.0, 1.0);
        let mut data = Vec::with_capacity(3000);
        for _ in 0..1000 {
            for _ in 0..3 {
                data.push(unit.sample(&mut rng));
            }
        }
        let cloud = PointCloud::new(data, 3).unwrap();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new().set_bucket_size(8),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let query = [0.5, 0.5, 0.5];

        let (exact, _) = index.knn(&query, 10, opts, 1.0, f64::INFINITY);
        let (approx, _) = index.knn(&query, 10, opts, 1.2, f64::INFINITY);

        for (&(d_exact, _), &(d_approx, _)) in exact.iter().zip(approx.iter()) {
            assert!(d_approx <= 1.2 * d_exact + 1e-9);
        }
    }

    // S6 — duplicates.
    #[test]
    fn s6_duplicates() {
        let mut data = vec![0.0f64; 300];
        data.extend_from_slice(&[1.0, 0.0, 0.0]);
        let cloud = PointCloud::new(data, 3).unwrap();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new().set_bucket_size(8),
        )
        .unwrap();
        let opts =
            SearchOptions::from_bits(SearchOptions::SORT_RESULTS | SearchOptions::ALLOW_SELF_MATCH)
                .unwrap();
        let (results, _) = index.knn(&[0.0, 0.0, 0.0], 5, opts, 1.0, f64::INFINITY);
        assert_eq!(results.len(), 5);
        let distinct: std::collections::HashSet<usize> =
            results.iter().map(|&(_, i)| i).collect();
        assert_eq!(distinct.len(), 5);
        for &(d, i) in &results {
            assert_close(d, 0.0);
            assert!(i < 100);
        }
    }

    // Invariant 1: result-size correctness (k <= N).
    #[test]
    fn invariant_result_size_is_min_k_n() {
        let cloud = PointCloud::new(vec![0.0, 1.0, 2.0], 1).unwrap();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let (results, _) = index.knn(&[1.0], 10, opts, 1.0, f64::INFINITY);
        let non_sentinel = results.iter().filter(|&&(_, i)| i != INVALID_INDEX).count();
        assert_eq!(non_sentinel, 3);
    }

    // Invariant 2: ε = 0 matches brute force.
    #[test]
    fn invariant_exact_matches_brute_force() {
        let cloud = s2_cloud();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let kd = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new().set_bucket_size(2),
        )
        .unwrap();
        let brute = create(
            &cloud,
            L2Squared,
            SearchType::BruteForce,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        for query in [[0.3, 0.3], [2.0, 0.0], [1.0, 1.0]] {
            let (kd_res, _) = kd.knn(&query, 4, opts, 1.0, f64::INFINITY);
            let (brute_res, _) = brute.knn(&query, 4, opts, 1.0, f64::INFINITY);
            assert_eq!(kd_res, brute_res);
        }
    }

    // Invariant 6: SORT_RESULTS gives non-decreasing distances.
    #[test]
    fn invariant_sorted_results_are_non_decreasing() {
        let cloud = s2_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new().set_bucket_size(2),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let (results, _) = index.knn(&[0.9, 1.4], 6, opts, 1.0, f64::INFINITY);
        for w in results.windows(2) {
            assert!(w[0].0 <= w[1].0);
        }
    }

    // Invariant 7: idempotence.
    #[test]
    fn invariant_batch_calls_are_idempotent() {
        let cloud = s2_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new().set_bucket_size(2),
        )
        .unwrap();
        let query = arr2(&[[0.9], [1.4]]);
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();

        let mut idx_a = Array2::<usize>::zeros((3, 1));
        let mut dist_a = Array2::<f64>::zeros((3, 1));
        knn_batch(
            &index,
            query.view(),
            idx_a.view_mut(),
            dist_a.view_mut(),
            3,
            0.0,
            opts,
            f64::INFINITY,
        )
        .unwrap();

        let mut idx_b = Array2::<usize>::zeros((3, 1));
        let mut dist_b = Array2::<f64>::zeros((3, 1));
        knn_batch(
            &index,
            query.view(),
            idx_b.view_mut(),
            dist_b.view_mut(),
            3,
            0.0,
            opts,
            f64::INFINITY,
        )
        .unwrap();

        assert_eq!(idx_a, idx_b);
        assert_eq!(dist_a, dist_b);
    }

    // Boundary: NaN query returns all sentinels, never panics.
    #[test]
    fn nan_query_returns_sentinels() {
        let cloud = s2_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let (results, _) = index.knn(&[f64::NAN, 0.0], 2, opts, 1.0, f64::INFINITY);
        for &(d, i) in &results {
            assert!(d.is_infinite());
            assert_eq!(i, INVALID_INDEX);
        }
    }

    // Boundary: query exactly on a splitting plane.
    #[test]
    fn query_on_splitting_plane() {
        let cloud = s2_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new().set_bucket_size(1),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(
            SearchOptions::SORT_RESULTS | SearchOptions::ALLOW_SELF_MATCH,
        )
        .unwrap();
        let (results, _) = index.knn(&[1.0, 1.0], 1, opts, 1.0, f64::INFINITY);
        assert_eq!(results[0], (0.0, 4));
    }

    // L1 exercises its own (unsquared) pruning derivation end-to-end,
    // checking it against brute force under both epsilon=0 and epsilon>0.
    #[test]
    fn l1_search_matches_brute_force() {
        let cloud = s2_cloud();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let kd = create(
            &cloud,
            L1,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new().set_bucket_size(2),
        )
        .unwrap();
        let brute = create(
            &cloud,
            L1,
            SearchType::BruteForce,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        for query in [[0.3, 0.3], [2.0, 0.0], [1.0, 1.0]] {
            let (kd_res, _) = kd.knn(&query, 4, opts, 1.0, f64::INFINITY);
            let (brute_res, _) = brute.knn(&query, 4, opts, 1.0, f64::INFINITY);
            assert_eq!(kd_res, brute_res);

            let (kd_approx, _) = kd.knn(&query, 4, opts, 1.3, f64::INFINITY);
            for (&(d_exact, _), &(d_approx, _)) in kd_res.iter().zip(kd_approx.iter()) {
                assert!(d_approx <= 1.3 * d_exact + 1e-9);
            }
        }
    }

    #[test]
    fn dim1_single_point() {
        let cloud = PointCloud::new(vec![5.0], 1).unwrap();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let opts = SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap();
        let (results, _) = index.knn(&[0.0], 1, opts, 1.0, f64::INFINITY);
        assert_eq!(results[0], (25.0, 0));
    }
}
