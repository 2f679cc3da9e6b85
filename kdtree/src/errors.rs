//! Errors that can occur while building or querying a kd-tree index.

use kdcloud::errors::CloudError;
use std::error::Error;
use std::fmt;

/// Helper type for a call that could go wrong.
pub type KdResult<T> = Result<T, KdTreeError>;

/// Error type for `kdtree`.
#[derive(Debug)]
pub enum KdTreeError {
    /// Propagated from the underlying cloud (bad dimension, empty cloud,
    /// out-of-bounds point index).
    CloudError(CloudError),
    /// A caller-supplied argument was invalid: mismatched matrix shapes,
    /// `k == 0`, `epsilon < 0`, an unrecognised flag bit, or a malformed
    /// parameter value.
    InvalidArgument(String),
    /// The index wasn't built with support for the requested `SearchType`.
    Unsupported(String),
    /// Allocation failed while building the index.
    OutOfMemory,
}

impl fmt::Display for KdTreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            KdTreeError::CloudError(ref e) => write!(f, "{}", e),
            KdTreeError::InvalidArgument(ref msg) => write!(f, "invalid argument: {}", msg),
            KdTreeError::Unsupported(ref msg) => write!(f, "unsupported: {}", msg),
            KdTreeError::OutOfMemory => write!(f, "allocation failed while building the index"),
        }
    }
}

#[allow(deprecated)]
impl Error for KdTreeError {
    fn description(&self) -> &str {
        match *self {
            KdTreeError::CloudError(ref e) => e.description(),
            KdTreeError::InvalidArgument(ref msg) => msg,
            KdTreeError::Unsupported(ref msg) => msg,
            KdTreeError::OutOfMemory => "allocation failed while building the index",
        }
    }

    fn cause(&self) -> Option<&dyn Error> {
        match *self {
            KdTreeError::CloudError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<CloudError> for KdTreeError {
    fn from(err: CloudError) -> Self {
        KdTreeError::CloudError(err)
    }
}
