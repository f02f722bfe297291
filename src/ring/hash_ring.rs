//! Sorted ring of virtual-node positions
//!
//! Every bin is replicated `replication_factor` times on a u64 ring. Each
//! replica's position is the digest of a label built from the replica index
//! and the bin name. Positions are kept in a `BTreeMap` so ascending order
//! is maintained on every insertion.
//!
//! Labels can collide (`"111"` is replica 11 of bin `1` and replica 1 of bin
//! `11`), as can digests. A contested position always goes to the smallest
//! bin name, so the ring only depends on the set of bins, never on the order
//! they were added or removed in.

use crate::hash::Digest;
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Consistent hash ring mapping positions to bin names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ring {
    /// Ring position -> owning bin name
    positions: BTreeMap<u64, String>,

    /// Bins with replicas on the ring
    members: BTreeSet<String>,
}

impl Ring {
    /// Create an empty ring
    pub fn new() -> Self {
        Ring {
            positions: BTreeMap::new(),
            members: BTreeSet::new(),
        }
    }

    /// Build a ring holding the given bins
    pub fn from_bins<'a>(
        names: impl IntoIterator<Item = &'a str>,
        replication_factor: usize,
        hasher: &dyn Digest,
    ) -> Self {
        let mut ring = Ring::new();
        for name in names {
            ring.insert(name, replication_factor, hasher);
        }
        ring
    }

    /// Label hashed for the `index`-th virtual node of a bin
    pub fn vnode_label(index: usize, name: &str) -> String {
        format!("{}{}", index, name)
    }

    /// Place `replication_factor` virtual nodes for a bin
    ///
    /// A position already held by a bin with a smaller name is left alone.
    pub fn insert(&mut self, name: &str, replication_factor: usize, hasher: &dyn Digest) {
        self.members.insert(name.to_string());
        self.place(name, replication_factor, hasher);
    }

    fn place(&mut self, name: &str, replication_factor: usize, hasher: &dyn Digest) {
        for index in 0..replication_factor {
            let label = Self::vnode_label(index, name);
            let position = hasher.sum64(label.as_bytes());
            match self.positions.entry(position) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(name.to_string());
                }
                btree_map::Entry::Occupied(mut slot) => {
                    if name < slot.get().as_str() {
                        slot.insert(name.to_string());
                    }
                }
            }
        }
    }

    /// Remove the virtual nodes of a bin
    ///
    /// Positions are re-placed from the remaining bins so that any position
    /// the removed bin had won from another one goes back to it. Returns
    /// false if the bin was not on the ring.
    pub fn remove(&mut self, name: &str, replication_factor: usize, hasher: &dyn Digest) -> bool {
        if !self.members.remove(name) {
            return false;
        }

        self.positions.clear();
        let members: Vec<String> = self.members.iter().cloned().collect();
        for member in &members {
            self.place(member, replication_factor, hasher);
        }
        true
    }

    /// First position `>= hash`, wrapping to the lowest position
    ///
    /// Returns `None` when the ring is empty.
    pub fn successor(&self, hash: u64) -> Option<u64> {
        self.positions
            .range(hash..)
            .next()
            .or_else(|| self.positions.iter().next())
            .map(|(position, _)| *position)
    }

    /// Walk one full lap of the ring, starting at the successor of `hash`
    pub fn walk_from(&self, hash: u64) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.positions
            .range(hash..)
            .chain(self.positions.range(..hash))
            .map(|(position, name)| (*position, name.as_str()))
    }

    /// Number of virtual nodes on the ring
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the ring holds no positions
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
