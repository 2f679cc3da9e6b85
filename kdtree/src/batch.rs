//! The batch driver: applies a single-query search to every column of a
//! query matrix and writes results into pre-sized output matrices.
//!
//! Columns are independent — each owns its own heap, offset array, and
//! descent stack — so they're fanned out across `rayon`'s thread pool via
//! `ndarray`'s `Zip::par_for_each`, mirroring how `goko`'s `BulkInterface`
//! fans per-query work out over chunks of a reader.

use crate::errors::{KdResult, KdTreeError};
use crate::factory::Index;
use crate::options::SearchOptions;
use kdcloud::{Metric, Scalar};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2, Axis, Zip};
use std::sync::atomic::{AtomicU64, Ordering};

fn validate_shapes<T>(
    dim: usize,
    query: &ArrayView2<T>,
    out_indices: &ArrayViewMut2<usize>,
    out_dists: &ArrayViewMut2<T>,
    k: usize,
    epsilon: T,
) -> KdResult<usize>
where
    T: Scalar,
{
    if k == 0 {
        return Err(KdTreeError::InvalidArgument("k must be non-zero".into()));
    }
    if epsilon < T::zero() {
        return Err(KdTreeError::InvalidArgument(
            "epsilon must be non-negative".into(),
        ));
    }
    if query.nrows() != dim {
        return Err(KdTreeError::InvalidArgument(format!(
            "query has {} rows, expected dimension {}",
            query.nrows(),
            dim
        )));
    }
    let q = query.ncols();
    if out_indices.shape() != [k, q] || out_dists.shape() != [k, q] {
        return Err(KdTreeError::InvalidArgument(format!(
            "result matrices must be shaped [{}, {}]",
            k, q
        )));
    }
    Ok(q)
}

fn write_column<T: Scalar>(
    mut idx_col: ndarray::ArrayViewMut1<usize>,
    mut dist_col: ndarray::ArrayViewMut1<T>,
    results: &[(T, usize)],
) {
    for ((slot_idx, slot_dist), &(d, i)) in idx_col
        .iter_mut()
        .zip(dist_col.iter_mut())
        .zip(results.iter())
    {
        *slot_idx = i;
        *slot_dist = d;
    }
}

/// Runs `knn` over every query column against `index`, all queries sharing
/// the same `max_radius`.
///
/// `max_radius` is squared internally and compared against `L2Squared`'s
/// (already squared) distances; pass `T::infinity()` to disable radius
/// bounding.
pub fn knn_batch<T, M>(
    index: &Index<T, M>,
    query: ArrayView2<T>,
    mut out_indices: ArrayViewMut2<usize>,
    mut out_dists: ArrayViewMut2<T>,
    k: usize,
    epsilon: T,
    options: SearchOptions,
    max_radius: T,
) -> KdResult<u64>
where
    T: Scalar,
    M: Metric<T>,
{
    let q = validate_shapes(index.dim(), &query, &out_indices, &out_dists, k, epsilon)?;
    log::debug!("batch knn: {} queries, k={}", q, k);

    let max_error = T::one() + epsilon;
    let max_radius_sq = if max_radius.is_infinite() {
        T::infinity()
    } else {
        max_radius * max_radius
    };

    let stats_total = AtomicU64::new(0);
    Zip::from(query.axis_iter(Axis(1)))
        .and(out_indices.axis_iter_mut(Axis(1)))
        .and(out_dists.axis_iter_mut(Axis(1)))
        .par_for_each(|q_col, idx_col, dist_col| {
            let q_vec: Vec<T> = q_col.to_vec();
            let (results, stats) = index.knn(&q_vec, k, options, max_error, max_radius_sq);
            stats_total.fetch_add(stats, Ordering::Relaxed);
            write_column(idx_col, dist_col, &results);
        });

    Ok(stats_total.load(Ordering::Relaxed))
}

/// Runs `knn` over every query column against `index`, each query using its
/// own entry from `max_radii` (length `q`, non-negative).
pub fn knn_batch_varying_radius<T, M>(
    index: &Index<T, M>,
    query: ArrayView2<T>,
    mut out_indices: ArrayViewMut2<usize>,
    mut out_dists: ArrayViewMut2<T>,
    max_radii: ArrayView1<T>,
    k: usize,
    epsilon: T,
    options: SearchOptions,
) -> KdResult<u64>
where
    T: Scalar,
    M: Metric<T>,
{
    let q = validate_shapes(index.dim(), &query, &out_indices, &out_dists, k, epsilon)?;
    if max_radii.len() != q {
        return Err(KdTreeError::InvalidArgument(format!(
            "max_radii has length {}, expected {}",
            max_radii.len(),
            q
        )));
    }
    if max_radii.iter().any(|&r| r < T::zero()) {
        return Err(KdTreeError::InvalidArgument(
            "max_radii entries must be non-negative".into(),
        ));
    }
    log::debug!("batch knn (varying radius): {} queries, k={}", q, k);

    let max_error = T::one() + epsilon;
    let max_radii_sq: Array2<T> = max_radii
        .mapv(|r| if r.is_infinite() { T::infinity() } else { r * r })
        .insert_axis(Axis(0));

    let stats_total = AtomicU64::new(0);
    Zip::from(query.axis_iter(Axis(1)))
        .and(out_indices.axis_iter_mut(Axis(1)))
        .and(out_dists.axis_iter_mut(Axis(1)))
        .and(max_radii_sq.axis_iter(Axis(1)))
        .par_for_each(|q_col, idx_col, dist_col, radius_col| {
            let q_vec: Vec<T> = q_col.to_vec();
            let (results, stats) =
                index.knn(&q_vec, k, options, max_error, radius_col[0]);
            stats_total.fetch_add(stats, Ordering::Relaxed);
            write_column(idx_col, dist_col, &results);
        });

    Ok(stats_total.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{create, SearchType};
    use crate::options::CreationFlags;
    use crate::Parameters;
    use kdcloud::{L2Squared, PointCloud};
    use ndarray::array;

    fn grid_cloud() -> PointCloud<f64> {
        let mut data = Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                data.push(x as f64);
                data.push(y as f64);
            }
        }
        PointCloud::new(data, 2).unwrap()
    }

    #[test]
    fn batch_matches_single_query_grid() {
        let cloud = grid_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();

        let query = array![[1.1], [1.1]];
        let mut idx = Array2::<usize>::zeros((1, 1));
        let mut dists = Array2::<f64>::zeros((1, 1));
        let stats = knn_batch(
            &index,
            query.view(),
            idx.view_mut(),
            dists.view_mut(),
            1,
            0.0,
            SearchOptions::from_bits(SearchOptions::SORT_RESULTS).unwrap(),
            f64::INFINITY,
        )
        .unwrap();
        assert_eq!(stats, 0);
        assert_eq!(idx[[0, 0]], 4);
        assert!((dists[[0, 0]] - 0.02).abs() < 1e-9);
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let cloud = grid_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let query = array![[1.1], [1.1]];
        let mut idx = Array2::<usize>::zeros((2, 1));
        let mut dists = Array2::<f64>::zeros((1, 1));
        let err = knn_batch(
            &index,
            query.view(),
            idx.view_mut(),
            dists.view_mut(),
            1,
            0.0,
            SearchOptions::empty(),
            f64::INFINITY,
        )
        .unwrap_err();
        assert!(matches!(err, KdTreeError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_zero_k() {
        let cloud = grid_cloud();
        let index = create(
            &cloud,
            L2Squared,
            SearchType::KdTreeLinearHeap,
            CreationFlags::empty(),
            Parameters::new(),
        )
        .unwrap();
        let query = array![[1.1], [1.1]];
        let mut idx = Array2::<usize>::zeros((0, 1));
        let mut dists = Array2::<f64>::zeros((0, 1));
        let err = knn_batch(
            &index,
            query.view(),
            idx.view_mut(),
            dists.view_mut(),
            0,
            0.0,
            SearchOptions::empty(),
            f64::INFINITY,
        )
        .unwrap_err();
        assert!(matches!(err, KdTreeError::InvalidArgument(_)));
    }
}
