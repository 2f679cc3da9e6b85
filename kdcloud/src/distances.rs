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

//! Distance metrics between points, plus the per-axis term each metric
//! contributes to the kd-tree's pruning bookkeeping.
//!
//! `L2Squared` and `L1` each need a different pruning derivation: L2's
//! per-axis term is the squared coordinate difference, so the sum of
//! per-axis terms over all axes is already the squared Euclidean distance
//! that the (1+ε) bound is stated in terms of. L1's per-axis term is the
//! absolute difference, and the sum of those is already the L1 distance, so
//! there's no squaring anywhere in the L1 path.

use crate::Scalar;

/// A distance metric between two D-vectors, plus the single-axis term it
/// contributes to incremental pruning during tree descent.
pub trait Metric<T: Scalar>: Clone + Send + Sync + 'static {
    /// Full distance between two points, given as coordinate slices of
    /// equal length.
    fn distance(&self, a: &[T], b: &[T]) -> T;

    /// The contribution a single axis makes to the running pruning bound,
    /// given the signed difference between the query and the cell face on
    /// that axis.
    fn axis_term(&self, diff: T) -> T;

    /// Scales `max_error` (`1 + ε`) to the power this metric's distances
    /// are already raised to, so the pruning test's `rd * scaled_error`
    /// compares like powers: `L2Squared` distances are squared, so this is
    /// `max_error²`; `L1` distances are not, so this is `max_error` itself.
    fn scale_max_error(&self, max_error: T) -> T;
}

/// Squared Euclidean distance. The default metric, and the only one the
/// (1+ε) approximation guarantee is proven for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct L2Squared;

impl<T: Scalar> Metric<T> for L2Squared {
    fn distance(&self, a: &[T], b: &[T]) -> T {
        a.iter()
            .zip(b.iter())
            .fold(T::zero(), |acc, (&x, &y)| acc + (x - y) * (x - y))
    }

    fn axis_term(&self, diff: T) -> T {
        diff * diff
    }

    fn scale_max_error(&self, max_error: T) -> T {
        max_error * max_error
    }
}

/// Manhattan (L1) distance. Has its own pruning derivation rather than
/// reusing `L2Squared`'s squared-distance bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct L1;

impl<T: Scalar> Metric<T> for L1 {
    fn distance(&self, a: &[T], b: &[T]) -> T {
        a.iter()
            .zip(b.iter())
            .fold(T::zero(), |acc, (&x, &y)| acc + (x - y).abs())
    }

    fn axis_term(&self, diff: T) -> T {
        diff.abs()
    }

    fn scale_max_error(&self, max_error: T) -> T {
        max_error
    }
}
