//! Partition module
//!
//! A fixed number of partitions sits between balls and bins. Balls map to a
//! partition with a plain modulo; partitions map to bins through the
//! bounded-load walk over the ring.

mod distribution;

pub use distribution::{distribute, maximum_load, partition_anchor, Distribution};

use std::fmt;

/// Identifier of a partition in `[0, partition_count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(pub u64);

impl PartitionId {
    /// Raw partition number
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
