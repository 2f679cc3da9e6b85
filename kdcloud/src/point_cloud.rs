/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

//! A dense, in-memory point cloud.

use crate::errors::{CloudError, CloudResult};
use crate::{Metric, Scalar};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;

/// Below this many (i, j) pairs a sequential scan beats spinning up rayon's
/// thread pool; matches the chunking threshold used by the pairwise
/// distance helper this is grounded on.
const PARALLEL_THRESHOLD: usize = 100;

/// The axis-aligned bounding box of a point cloud, computed once at
/// construction and used to seed tree traversal.
#[derive(Debug, Clone)]
pub struct BoundingBox<T> {
    min_bound: Array1<T>,
    max_bound: Array1<T>,
}

impl<T: Scalar> BoundingBox<T> {
    fn from_points(points: &Array2<T>) -> Self {
        let dim = points.ncols();
        let mut min_bound = Array1::from_elem(dim, T::infinity());
        let mut max_bound = Array1::from_elem(dim, T::neg_infinity());
        for row in points.axis_iter(Axis(0)) {
            for d in 0..dim {
                let v = row[d];
                if v < min_bound[d] {
                    min_bound[d] = v;
                }
                if v > max_bound[d] {
                    max_bound[d] = v;
                }
            }
        }
        BoundingBox {
            min_bound,
            max_bound,
        }
    }

    /// The lower corner of the box, one coordinate per axis.
    pub fn min_bound(&self) -> ArrayView1<T> {
        self.min_bound.view()
    }

    /// The upper corner of the box, one coordinate per axis.
    pub fn max_bound(&self) -> ArrayView1<T> {
        self.max_bound.view()
    }

    /// The spread (`max - min`) on a single axis.
    pub fn spread(&self, axis: usize) -> T {
        self.max_bound[axis] - self.min_bound[axis]
    }
}

/// A static, dense cloud of reference points.
///
/// The public contract (see [`PointCloud::as_array`]) presents the cloud as
/// a D×N column-major matrix, matching the query and result matrices
/// elsewhere in this crate family. Internally each point is stored as a
/// contiguous row instead, since the kd-tree's hot path needs a point's
/// coordinates as one contiguous slice far more often than it needs the
/// whole cloud transposed.
#[derive(Debug, Clone)]
pub struct PointCloud<T> {
    points: Array2<T>,
    bounding_box: BoundingBox<T>,
}

impl<T: Scalar> PointCloud<T> {
    /// Builds a cloud from a flat buffer of `len / dim` points, each `dim`
    /// scalars wide and contiguous (point-major order) — the natural layout
    /// for literal test fixtures and data read off the wire.
    pub fn new(data: Vec<T>, dim: usize) -> CloudResult<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(CloudError::DimensionMismatch {
                dim,
                data_len: data.len(),
            });
        }
        let n = data.len() / dim;
        if n == 0 {
            return Err(CloudError::EmptyCloud);
        }
        let points = Array2::from_shape_vec((n, dim), data)
            .expect("shape matches the length checked above");
        let bounding_box = BoundingBox::from_points(&points);
        Ok(PointCloud {
            points,
            bounding_box,
        })
    }

    /// Number of axes each point has.
    pub fn dim(&self) -> usize {
        self.points.ncols()
    }

    /// Number of points in the cloud.
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Whether the cloud has no points. A `PointCloud` can never actually be
    /// empty (the constructors reject it), but the method is provided for
    /// parity with the standard collection idiom.
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// A read-only, contiguous view of point `index`'s coordinates.
    pub fn point(&self, index: usize) -> CloudResult<ArrayView1<T>> {
        if index >= self.len() {
            return Err(CloudError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        Ok(self.points.row(index))
    }

    /// The cloud's precomputed axis-aligned bounding box.
    pub fn bounding_box(&self) -> &BoundingBox<T> {
        &self.bounding_box
    }

    /// A read-only view of the cloud as a D×N column-major matrix.
    pub fn as_array(&self) -> ndarray::ArrayView2<T> {
        self.points.view().reversed_axes()
    }

    /// Pairwise distances between every point named in `is` and every point
    /// named in `js`, flattened row-major (`is.len()` rows of `js.len()`
    /// entries). Parallelises over rows once the pair count passes
    /// [`PARALLEL_THRESHOLD`].
    pub fn distances_to_point_indices<M: Metric<T>>(
        &self,
        metric: &M,
        is: &[usize],
        js: &[usize],
    ) -> CloudResult<Vec<T>> {
        for &i in is {
            self.point(i)?;
        }
        for &j in js {
            self.point(j)?;
        }

        let mut dists = vec![T::zero(); is.len() * js.len()];
        let row = |i: usize, out_row: &mut [T]| {
            let pi = self.points.row(i);
            let pi_slice = pi
                .as_slice()
                .expect("cloud rows are contiguous by construction");
            for (d, &j) in out_row.iter_mut().zip(js.iter()) {
                let pj = self.points.row(j);
                let pj_slice = pj
                    .as_slice()
                    .expect("cloud rows are contiguous by construction");
                *d = metric.distance(pi_slice, pj_slice);
            }
        };

        if is.len() * js.len() > PARALLEL_THRESHOLD {
            dists
                .par_chunks_mut(js.len().max(1))
                .zip(is.par_iter())
                .for_each(|(out_row, &i)| row(i, out_row));
        } else {
            for (out_row, &i) in dists.chunks_mut(js.len().max(1)).zip(is.iter()) {
                row(i, out_row);
            }
        }

        Ok(dists)
    }
}
