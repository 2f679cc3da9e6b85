//! Hand-rolled bit-flag sets for creation-time and per-query options.
//!
//! The corpus this crate is grown from doesn't reach for the `bitflags`
//! crate, so these are plain wrapper structs over a `u32`, same as
//! elsewhere in the corpus.

use crate::errors::{KdResult, KdTreeError};

/// Options recognised at index-creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreationFlags(u32);

impl CreationFlags {
    /// Reserve space for per-query statistics up front.
    pub const TOUCH_STATISTICS: u32 = 1 << 0;

    const KNOWN: u32 = Self::TOUCH_STATISTICS;

    /// No flags set.
    pub fn empty() -> Self {
        CreationFlags(0)
    }

    /// Validates `bits` against the known flag set.
    pub fn from_bits(bits: u32) -> KdResult<Self> {
        if bits & !Self::KNOWN != 0 {
            return Err(KdTreeError::InvalidArgument(format!(
                "unknown creation flag bits: {:#x}",
                bits & !Self::KNOWN
            )));
        }
        Ok(CreationFlags(bits))
    }

    /// Whether `TOUCH_STATISTICS` was requested.
    pub fn touch_statistics(&self) -> bool {
        self.0 & Self::TOUCH_STATISTICS != 0
    }

    /// The raw bits.
    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Options recognised on a per-query (or per-batch) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions(u32);

impl SearchOptions {
    /// Include the query's own coordinates as an eligible neighbour.
    pub const ALLOW_SELF_MATCH: u32 = 1 << 0;
    /// Sort the returned k entries by ascending distance.
    pub const SORT_RESULTS: u32 = 1 << 1;
    /// Count leaf points inspected and report the total.
    pub const COLLECT_STATISTICS: u32 = 1 << 2;
    /// Reserved; currently a no-op, included for forward compatibility.
    pub const TOUCH_STATISTICS_RESERVED: u32 = 1 << 3;

    const KNOWN: u32 = Self::ALLOW_SELF_MATCH
        | Self::SORT_RESULTS
        | Self::COLLECT_STATISTICS
        | Self::TOUCH_STATISTICS_RESERVED;

    /// No flags set.
    pub fn empty() -> Self {
        SearchOptions(0)
    }

    /// Validates `bits` against the known flag set.
    pub fn from_bits(bits: u32) -> KdResult<Self> {
        if bits & !Self::KNOWN != 0 {
            return Err(KdTreeError::InvalidArgument(format!(
                "unknown search option bits: {:#x}",
                bits & !Self::KNOWN
            )));
        }
        Ok(SearchOptions(bits))
    }

    /// Whether `ALLOW_SELF_MATCH` was requested.
    pub fn allow_self_match(&self) -> bool {
        self.0 & Self::ALLOW_SELF_MATCH != 0
    }

    /// Whether `SORT_RESULTS` was requested.
    pub fn sort_results(&self) -> bool {
        self.0 & Self::SORT_RESULTS != 0
    }

    /// Whether `COLLECT_STATISTICS` was requested.
    pub fn collect_statistics(&self) -> bool {
        self.0 & Self::COLLECT_STATISTICS != 0
    }

    /// The raw bits.
    pub fn bits(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_search_bits_are_rejected() {
        assert!(SearchOptions::from_bits(1 << 31).is_err());
    }

    #[test]
    fn known_search_bits_round_trip() {
        let opts =
            SearchOptions::from_bits(SearchOptions::ALLOW_SELF_MATCH | SearchOptions::SORT_RESULTS)
                .unwrap();
        assert!(opts.allow_self_match());
        assert!(opts.sort_results());
        assert!(!opts.collect_statistics());
    }

    #[test]
    fn unknown_creation_bits_are_rejected() {
        assert!(CreationFlags::from_bits(1 << 5).is_err());
    }
}
