//! Partition -> balls bookkeeping

use crate::partition::PartitionId;
use crate::ring::{Ball, Identifiable};
use siphasher::sip::SipHasher13;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasherDefault;

/// Reverse index: ball name -> partition it is recorded under
type BallIndex = HashMap<String, PartitionId, BuildHasherDefault<SipHasher13>>;

/// Tracked balls grouped by partition
///
/// A ball name appears at most once in the whole registry. Lookups by name
/// go through the reverse index, so insert and remove never scan the groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BallRegistry {
    /// Partition -> balls recorded under it
    balls: BTreeMap<PartitionId, BTreeSet<Ball>>,

    /// Ball name -> partition
    index: BallIndex,
}

impl BallRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ball under a partition
    ///
    /// A ball already tracked under the same name is moved, wherever it was
    /// recorded before.
    pub fn insert(&mut self, partition: PartitionId, ball: Ball) {
        match self.index.get(ball.name()).copied() {
            Some(current) if current == partition => return,
            Some(_) => {
                self.remove(ball.name());
            }
            None => {}
        }

        self.index.insert(ball.name().to_string(), partition);
        self.balls.entry(partition).or_default().insert(ball);
    }

    /// Forget a ball, returns true if it was tracked
    pub fn remove(&mut self, name: &str) -> bool {
        let partition = match self.index.remove(name) {
            Some(partition) => partition,
            None => return false,
        };

        if let Some(group) = self.balls.get_mut(&partition) {
            group.remove(name);
            if group.is_empty() {
                self.balls.remove(&partition);
            }
        }
        true
    }

    /// Balls recorded under a partition
    pub fn balls_in(&self, partition: PartitionId) -> impl Iterator<Item = &Ball> + '_ {
        self.balls.get(&partition).into_iter().flatten()
    }

    /// Partition a ball is recorded under
    pub fn partition_of(&self, name: &str) -> Option<PartitionId> {
        self.index.get(name).copied()
    }

    /// Re-derive every ball's partition and regroup the registry
    ///
    /// Returns the number of balls whose partition changed.
    pub fn rekey<F>(&mut self, mut partition_for: F) -> usize
    where
        F: FnMut(&Ball) -> PartitionId,
    {
        let mut moved = 0;
        let mut regrouped: BTreeMap<PartitionId, BTreeSet<Ball>> = BTreeMap::new();

        for (partition, group) in std::mem::take(&mut self.balls) {
            for ball in group {
                let target = partition_for(&ball);
                if target != partition {
                    moved += 1;
                    self.index.insert(ball.name().to_string(), target);
                }
                regrouped.entry(target).or_default().insert(ball);
            }
        }

        self.balls = regrouped;
        moved
    }

    /// Number of tracked balls
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if no ball is tracked
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
