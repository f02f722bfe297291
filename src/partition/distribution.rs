//! Bounded-load partition distribution
//!
//! Each partition starts at the ring successor of its anchor hash and walks
//! forward until it meets a bin whose load is still under the ceiling
//! `ceil(partition_count / bin_count * load_balancing_parameter)`.
//!
//! The pass is never incremental. Any change to the bin set recomputes the
//! whole table from scratch, which costs O(partitions * ring size) in the
//! worst case but can never silently break the load bound.

use super::PartitionId;
use crate::error::{Error, Result};
use crate::hash::Digest;
use crate::ring::Ring;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Load ceiling for a given bin count
///
/// Returns 0 when there are no bins.
pub fn maximum_load(partition_count: u64, bin_count: usize, load_balancing_parameter: f64) -> f64 {
    if bin_count == 0 {
        return 0.0;
    }
    let average = partition_count as f64 / bin_count as f64;
    (average * load_balancing_parameter).ceil()
}

/// Ring position a partition starts its walk from
///
/// The partition number is hashed as 8 little-endian bytes.
pub fn partition_anchor(partition: PartitionId, hasher: &dyn Digest) -> u64 {
    hasher.sum64(&partition.get().to_le_bytes())
}

/// Partition table and load table produced by one distribution pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    /// Owner of each partition, indexed by partition id
    owners: Vec<String>,

    /// Bin name -> partitions it owns (every tracked bin, even unloaded)
    loads: BTreeMap<String, Vec<PartitionId>>,

    /// Ceiling used for this pass
    max_load: f64,
}

impl Distribution {
    /// Distribution with no bins and no assigned partitions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Owning bin name of a partition
    pub fn owner(&self, partition: PartitionId) -> Option<&str> {
        usize::try_from(partition.get())
            .ok()
            .and_then(|index| self.owners.get(index))
            .map(String::as_str)
    }

    /// Partitions owned by a bin, `None` if the bin is not part of this pass
    pub fn partitions_of(&self, bin: &str) -> Option<&[PartitionId]> {
        self.loads.get(bin).map(Vec::as_slice)
    }

    /// Per-bin partition sets
    pub fn loads(&self) -> &BTreeMap<String, Vec<PartitionId>> {
        &self.loads
    }

    /// Ceiling that was enforced for this pass
    pub fn max_load(&self) -> f64 {
        self.max_load
    }
}

/// Assign every partition to exactly one bin under the load ceiling
///
/// `bins` must list every bin that has positions on `ring`. Fails with
/// `InsufficientBins` when there is nothing to distribute over and with
/// `InsufficientPartitionCapacity` when the walk gives up on a partition.
/// The walk inspects at most `ring.len() - 1` positions, so a ring holding a
/// single position cannot place anything.
pub fn distribute<'a>(
    ring: &Ring,
    bins: impl IntoIterator<Item = &'a str>,
    partition_count: u64,
    load_balancing_parameter: f64,
    hasher: &dyn Digest,
) -> Result<Distribution> {
    let mut loads: BTreeMap<String, Vec<PartitionId>> = bins
        .into_iter()
        .map(|name| (name.to_string(), Vec::new()))
        .collect();

    if loads.is_empty() || ring.is_empty() {
        return Err(Error::InsufficientBins);
    }

    let max_load = maximum_load(partition_count, loads.len(), load_balancing_parameter);
    let budget = ring.len() - 1;
    let mut owners = Vec::new();

    for raw in 0..partition_count {
        let partition = PartitionId(raw);
        let anchor = partition_anchor(partition, hasher);

        let owner = ring
            .walk_from(anchor)
            .take(budget)
            .map(|(_, name)| name)
            .find(|name| {
                loads
                    .get(*name)
                    .map_or(false, |assigned| (assigned.len() + 1) as f64 <= max_load)
            });

        let name = match owner {
            Some(name) => name,
            None => {
                warn!(
                    "No bin under load ceiling {} for partition {} ({} bins, {} positions)",
                    max_load,
                    partition,
                    loads.len(),
                    ring.len()
                );
                return Err(Error::InsufficientPartitionCapacity { partition: raw });
            }
        };

        if let Some(assigned) = loads.get_mut(name) {
            assigned.push(partition);
        }
        owners.push(name.to_string());
    }

    debug!(
        "Distributed {} partitions over {} bins (max load {})",
        partition_count,
        loads.len(),
        max_load
    );

    Ok(Distribution {
        owners,
        loads,
        max_load,
    })
}
