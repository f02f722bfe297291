//! Ring statistics

use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time snapshot of the ring, suitable for JSON output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingStats {
    /// Number of tracked bins
    pub bins: usize,

    /// Number of virtual nodes on the ring
    pub virtual_nodes: usize,

    /// Fixed number of partitions
    pub partition_count: u64,

    /// Current per-bin load ceiling
    pub maximum_load: f64,

    /// Number of tracked balls
    pub balls: usize,

    /// Bin name -> number of partitions it owns
    pub loads: BTreeMap<String, usize>,
}

impl RingStats {
    /// Total partitions currently assigned
    pub fn assigned_partitions(&self) -> usize {
        self.loads.values().sum()
    }

    /// Most loaded bin and its load
    pub fn busiest(&self) -> Option<(&str, usize)> {
        self.loads
            .iter()
            .max_by_key(|(_, load)| **load)
            .map(|(name, load)| (name.as_str(), *load))
    }
}
