//! Tables guarded by the facade lock
//!
//! Ring, bin registry, distribution and ball registry always change together.
//! Mutations are computed on scratch copies and committed only on success.

use crate::error::{Error, Result};
use crate::hash::Digest;
use crate::partition::{distribute, Distribution, PartitionId};
use crate::registry::BallRegistry;
use crate::ring::{Bin, Identifiable, Ring};
use std::collections::BTreeMap;

/// Parameters that never change for the life of a ring
pub(super) struct Params<'a> {
    pub hasher: &'a dyn Digest,
    pub partition_count: u64,
    pub replication_factor: usize,
    pub load_balancing_parameter: f64,
}

impl Params<'_> {
    /// Direct modulo of the key digest over the partition space
    pub fn partition_for(&self, key: &[u8]) -> PartitionId {
        PartitionId(self.hasher.sum64(key) % self.partition_count)
    }
}

/// Everything the facade owns behind its lock
#[derive(Debug, Clone, Default)]
pub(super) struct State {
    pub ring: Ring,
    pub bins: BTreeMap<String, Bin>,
    pub distribution: Distribution,
    pub balls: BallRegistry,
}

impl State {
    /// Build the initial state from a bin list, distributing if it is not empty
    pub fn build(bins: Vec<Bin>, params: &Params<'_>) -> Result<Self> {
        let mut state = State::default();
        for bin in bins {
            if state.bins.contains_key(bin.name()) {
                return Err(Error::BinAlreadyExists(bin.name().to_string()));
            }
            state
                .ring
                .insert(bin.name(), params.replication_factor, params.hasher);
            state.bins.insert(bin.name().to_string(), bin);
        }

        if !state.bins.is_empty() {
            state.distribution = distribute(
                &state.ring,
                state.bins.keys().map(String::as_str),
                params.partition_count,
                params.load_balancing_parameter,
                params.hasher,
            )?;
        }
        Ok(state)
    }

    /// Add a bin and redistribute, leaving `self` untouched on failure
    ///
    /// The scratch ring is rebuilt from the sorted bin registry so its layout
    /// only depends on the current membership.
    pub fn add(&mut self, bin: Bin, params: &Params<'_>) -> Result<()> {
        if self.bins.contains_key(bin.name()) {
            return Err(Error::BinAlreadyExists(bin.name().to_string()));
        }

        let names: Vec<&str> = self
            .bins
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(bin.name()))
            .collect();
        let ring = Ring::from_bins(
            names.iter().copied(),
            params.replication_factor,
            params.hasher,
        );
        let distribution = distribute(
            &ring,
            names,
            params.partition_count,
            params.load_balancing_parameter,
            params.hasher,
        )?;

        self.ring = ring;
        self.bins.insert(bin.name().to_string(), bin);
        self.distribution = distribution;
        Ok(())
    }

    /// Remove a bin and redistribute over the survivors
    ///
    /// Returns false if the bin was not tracked. With no bin left, the
    /// partition and load tables are reset to empty.
    pub fn remove(&mut self, name: &str, params: &Params<'_>) -> Result<bool> {
        if !self.bins.contains_key(name) {
            return Ok(false);
        }

        let survivors: Vec<&str> = self
            .bins
            .keys()
            .map(String::as_str)
            .filter(|bin| *bin != name)
            .collect();
        let mut ring = self.ring.clone();
        ring.remove(name, params.replication_factor, params.hasher);

        let distribution = if survivors.is_empty() {
            Distribution::empty()
        } else {
            distribute(
                &ring,
                survivors,
                params.partition_count,
                params.load_balancing_parameter,
                params.hasher,
            )?
        };

        self.ring = ring;
        self.bins.remove(name);
        self.distribution = distribution;
        Ok(true)
    }

    /// Re-derive the partition of every tracked ball
    pub fn relocate(&mut self, params: &Params<'_>) -> usize {
        self.balls
            .rekey(|ball| params.partition_for(ball.name().as_bytes()))
    }

    /// Resolve the bin currently owning a partition
    pub fn owner(&self, partition: PartitionId) -> Option<Bin> {
        self.distribution
            .owner(partition)
            .and_then(|name| self.bins.get(name))
            .cloned()
    }
}
