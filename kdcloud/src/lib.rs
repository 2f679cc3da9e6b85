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
//! # kdcloud
//! A dense, in-memory reference point cloud and the distance metrics that
//! can be computed over it.

#![allow(dead_code)]
#![warn(missing_docs)]

mod point_cloud;
#[doc(inline)]
pub use point_cloud::{BoundingBox, PointCloud};

mod distances;
pub use distances::{L1, L2Squared, Metric};

pub mod errors;

/// The index type used to name a point within a cloud.
pub type PointIndex = usize;

/// The floating-point field a cloud's coordinates live in.
///
/// Blanket-implemented for `f32` and `f64`; generic code in this crate and
/// in `kdtree` is written against this bound rather than against a concrete
/// float type.
pub trait Scalar:
    num_traits::Float + std::iter::Sum + Send + Sync + std::fmt::Debug + 'static
{
}

impl<T> Scalar for T where
    T: num_traits::Float + std::iter::Sum + Send + Sync + std::fmt::Debug + 'static
{
}
