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

//! Errors that can occur while building or querying a point cloud.

use std::error::Error;
use std::fmt;

/// Helper type for a call that could go wrong.
pub type CloudResult<T> = Result<T, CloudError>;

/// Error type for `kdcloud`.
#[derive(Debug)]
pub enum CloudError {
    /// The data buffer's length isn't a multiple of the declared dimension.
    DimensionMismatch {
        /// declared dimension
        dim: usize,
        /// length of the data buffer actually supplied
        data_len: usize,
    },
    /// A cloud was built with zero points.
    EmptyCloud,
    /// A point index was out of bounds for this cloud.
    IndexOutOfBounds {
        /// index that was requested
        index: usize,
        /// number of points actually in the cloud
        len: usize,
    },
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CloudError::DimensionMismatch { dim, data_len } => write!(
                f,
                "data buffer of length {} is not a multiple of dimension {}",
                data_len, dim
            ),
            CloudError::EmptyCloud => write!(f, "point cloud has no points"),
            CloudError::IndexOutOfBounds { index, len } => write!(
                f,
                "point index {} is out of bounds for a cloud of {} points",
                index, len
            ),
        }
    }
}

#[allow(deprecated)]
impl Error for CloudError {
    fn description(&self) -> &str {
        match *self {
            CloudError::DimensionMismatch { .. } => {
                "data buffer length is not a multiple of the declared dimension"
            }
            CloudError::EmptyCloud => "point cloud has no points",
            CloudError::IndexOutOfBounds { .. } => "point index is out of bounds",
        }
    }
}
