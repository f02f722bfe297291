//! Consistent hashing with bounded loads
//!
//! [`Consistent`] is the single synchronized entry point. It owns the ring,
//! the partition and load tables, the bin registry and the ball registry as
//! one unit behind a readers-writer lock. Every value handed back to the
//! caller is a copy.
//!
//! Adding or removing a bin recomputes the whole partition table. This is a
//! linear cost per membership change, not an amortized one.

mod state;

use crate::config::{Config, Settings};
use crate::error::{Error, Result};
use crate::hash::Digest;
use crate::partition::{maximum_load, PartitionId};
use crate::ring::{Ball, Bin, Identifiable};
use crate::stats::RingStats;
use parking_lot::RwLock;
use state::{Params, State};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Bounded-load consistent hash ring
pub struct Consistent {
    /// Digest used for vnode labels, partition anchors and balls
    hasher: Arc<dyn Digest>,

    /// Fixed settings
    settings: Settings,

    /// All mutable tables, locked as one
    state: RwLock<State>,
}

impl Consistent {
    /// Create a ring from a configuration and an optional initial bin set
    ///
    /// With bins, the partitions are distributed immediately. Without, the
    /// ring starts empty and waits for [`Consistent::add`].
    pub fn new(config: Config, bins: impl IntoIterator<Item = Bin>) -> Result<Self> {
        config.validate()?;

        let Config { hasher, settings } = config;
        let bins: Vec<Bin> = bins.into_iter().collect();
        let count = bins.len();

        let state = {
            let params = Self::params_of(hasher.as_ref(), &settings);
            State::build(bins, &params)?
        };

        info!(
            "Ring created with {} bins, {} partitions, replication factor {}",
            count, settings.partition_count, settings.replication_factor
        );

        Ok(Consistent {
            hasher,
            settings,
            state: RwLock::new(state),
        })
    }

    fn params_of<'a>(hasher: &'a dyn Digest, settings: &Settings) -> Params<'a> {
        Params {
            hasher,
            partition_count: settings.partition_count,
            replication_factor: settings.replication_factor,
            load_balancing_parameter: settings.load_balancing_parameter,
        }
    }

    fn params(&self) -> Params<'_> {
        Self::params_of(self.hasher.as_ref(), &self.settings)
    }

    /// Add a bin and redistribute all partitions
    ///
    /// Fails with `BinAlreadyExists` if the name is taken, or with
    /// `InsufficientPartitionCapacity` if the new table cannot honor the
    /// load ceiling. On failure the ring is left as it was.
    pub fn add(&self, bin: Bin) -> Result<()> {
        let params = self.params();
        let mut state = self.state.write();

        let name = bin.name().to_string();
        state.add(bin, &params)?;
        let moved = state.relocate(&params);

        info!(
            "Bin {} added ({} bins, max load {})",
            name,
            state.bins.len(),
            state.distribution.max_load()
        );
        debug!("Relocation after adding {} re-keyed {} balls", name, moved);
        Ok(())
    }

    /// Remove a bin and redistribute over the remaining ones
    ///
    /// Removing an untracked bin is a no-op.
    pub fn remove<B: Identifiable + ?Sized>(&self, bin: &B) -> Result<()> {
        let params = self.params();
        let mut state = self.state.write();

        if !state.remove(bin.name(), &params)? {
            debug!("Bin {} is not tracked, nothing to remove", bin.name());
            return Ok(());
        }
        let moved = state.relocate(&params);

        if state.bins.is_empty() {
            info!("Last bin {} removed, partition table reset", bin.name());
        } else {
            info!(
                "Bin {} removed ({} bins, max load {})",
                bin.name(),
                state.bins.len(),
                state.distribution.max_load()
            );
        }
        debug!("Relocation after removing {} re-keyed {} balls", bin.name(), moved);
        Ok(())
    }

    /// Track a ball and return the bin that currently owns it
    ///
    /// Returns `None` while the ring has no bins; the ball is still tracked
    /// and resolves as soon as bins are added.
    pub fn locate<B: Identifiable + ?Sized>(&self, ball: &B) -> Option<Bin> {
        let partition = self.find_partition_id(ball.name().as_bytes());
        let mut state = self.state.write();
        state.balls.insert(partition, Ball::of(ball));
        state.owner(partition)
    }

    /// Stop tracking a ball
    pub fn delete<B: Identifiable + ?Sized>(&self, ball: &B) -> Result<()> {
        let mut state = self.state.write();
        if state.balls.remove(ball.name()) {
            Ok(())
        } else {
            Err(Error::BallNotFound(ball.name().to_string()))
        }
    }

    /// Re-derive the partition of every tracked ball
    ///
    /// The partition count is fixed, so this normally re-keys nothing: owners
    /// are always resolved live through the partition table. Returns the
    /// number of balls whose partition changed.
    pub fn relocate(&self) -> usize {
        let params = self.params();
        self.state.write().relocate(&params)
    }

    /// Partition a key falls into
    ///
    /// Depends only on the hasher and the partition count, both immutable,
    /// so no lock is taken.
    pub fn find_partition_id(&self, key: &[u8]) -> PartitionId {
        self.params().partition_for(key)
    }

    /// Partition a tracked ball was filed under
    pub fn get_ball_partition<B: Identifiable + ?Sized>(&self, ball: &B) -> Result<PartitionId> {
        self.state
            .read()
            .balls
            .partition_of(ball.name())
            .ok_or_else(|| Error::BallNotFound(ball.name().to_string()))
    }

    /// Copy of a tracked bin
    pub fn get_bin(&self, name: &str) -> Result<Bin> {
        self.state
            .read()
            .bins
            .get(name)
            .cloned()
            .ok_or_else(|| Error::BinNotFound(name.to_string()))
    }

    /// Copy of every tracked bin, ordered by name
    pub fn get_bins(&self) -> Vec<Bin> {
        self.state.read().bins.values().cloned().collect()
    }

    /// Balls living on the partitions owned by a bin
    pub fn get_balls<B: Identifiable + ?Sized>(&self, bin: &B) -> Result<Vec<Ball>> {
        let state = self.state.read();
        let partitions = state
            .distribution
            .partitions_of(bin.name())
            .ok_or_else(|| Error::BinNotFound(bin.name().to_string()))?;

        Ok(partitions
            .iter()
            .flat_map(|partition| state.balls.balls_in(*partition).cloned())
            .collect())
    }

    /// Partitions owned by a bin
    pub fn get_partitions<B: Identifiable + ?Sized>(&self, bin: &B) -> Result<Vec<PartitionId>> {
        self.state
            .read()
            .distribution
            .partitions_of(bin.name())
            .map(<[PartitionId]>::to_vec)
            .ok_or_else(|| Error::BinNotFound(bin.name().to_string()))
    }

    /// Bin owning a partition, `None` if there are no bins or the id is out of range
    pub fn get_partition_owner(&self, partition: PartitionId) -> Option<Bin> {
        self.state.read().owner(partition)
    }

    /// Bin name -> number of partitions it owns
    pub fn load_distribution(&self) -> BTreeMap<String, f64> {
        self.state
            .read()
            .distribution
            .loads()
            .iter()
            .map(|(name, partitions)| (name.clone(), partitions.len() as f64))
            .collect()
    }

    /// Current per-bin load ceiling, 0 when there are no bins
    pub fn maximum_load(&self) -> f64 {
        let bins = self.state.read().bins.len();
        maximum_load(
            self.settings.partition_count,
            bins,
            self.settings.load_balancing_parameter,
        )
    }

    /// Number of tracked bins
    pub fn bin_count(&self) -> usize {
        self.state.read().bins.len()
    }

    /// Number of tracked balls
    pub fn ball_count(&self) -> usize {
        self.state.read().balls.len()
    }

    /// Fixed number of partitions
    pub fn partition_count(&self) -> u64 {
        self.settings.partition_count
    }

    /// Settings this ring was built with
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Snapshot of the ring for monitoring
    pub fn stats(&self) -> RingStats {
        let state = self.state.read();
        RingStats {
            bins: state.bins.len(),
            virtual_nodes: state.ring.len(),
            partition_count: self.settings.partition_count,
            maximum_load: maximum_load(
                self.settings.partition_count,
                state.bins.len(),
                self.settings.load_balancing_parameter,
            ),
            balls: state.balls.len(),
            loads: state
                .distribution
                .loads()
                .iter()
                .map(|(name, partitions)| (name.clone(), partitions.len()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Fnv1aDigest, SipDigest, XxDigest};
    use std::collections::BTreeSet;

    fn config() -> Config {
        Config::with_hasher(Arc::new(Fnv1aDigest))
            .partition_count(23)
            .replication_factor(21)
            .load_balancing_parameter(1.1)
    }

    fn bins(count: usize) -> Vec<Bin> {
        (0..count).map(|i| Bin::new(format!("node{}", i))).collect()
    }

    fn balls(count: usize) -> Vec<Ball> {
        (0..count).map(|i| Ball::new(format!("data{}", i))).collect()
    }

    fn ring_with(count: usize) -> Consistent {
        let c = Consistent::new(config(), Vec::new()).unwrap();
        for bin in bins(count) {
            c.add(bin).unwrap();
        }
        c
    }

    fn owners(c: &Consistent) -> Vec<Option<Bin>> {
        (0..c.partition_count())
            .map(|p| c.get_partition_owner(PartitionId(p)))
            .collect()
    }

    fn assert_bounded_and_total(c: &Consistent) {
        let max = c.maximum_load();
        let mut seen = BTreeSet::new();
        for bin in c.get_bins() {
            let partitions = c.get_partitions(&bin).unwrap();
            assert!(
                partitions.len() as f64 <= max,
                "{} owns {} partitions, ceiling {}",
                bin,
                partitions.len(),
                max
            );
            for p in partitions {
                assert!(seen.insert(p), "partition {} owned twice", p);
            }
        }
        assert_eq!(seen.len() as u64, c.partition_count());
    }

    #[test]
    fn test_add() {
        let c = ring_with(4);
        assert_eq!(c.get_bins().len(), 4);
        assert_eq!(c.bin_count(), 4);
    }

    #[test]
    fn test_add_duplicate_is_rejected() {
        let c = ring_with(4);
        let result = c.add(Bin::new("node0"));
        assert_eq!(result, Err(Error::BinAlreadyExists("node0".to_string())));
        assert_eq!(c.get_bins().len(), 4);
    }

    #[test]
    fn test_concrete_scenario() {
        let c = ring_with(4);

        assert_eq!(c.maximum_load(), 7.0);
        let loads = c.load_distribution();
        assert_eq!(loads.len(), 4);
        for load in loads.values() {
            assert!(*load <= 7.0);
        }
        assert_eq!(loads.values().sum::<f64>(), 23.0);
        assert_bounded_and_total(&c);
    }

    #[test]
    fn test_remove_recomputes_bound() {
        let c = ring_with(4);
        c.remove("node1").unwrap();

        assert_eq!(c.bin_count(), 3);
        assert_eq!(c.maximum_load(), 9.0);
        assert!(matches!(c.get_bin("node1"), Err(Error::BinNotFound(_))));
        for owner in owners(&c) {
            let owner = owner.expect("every partition has an owner");
            assert_ne!(owner.name(), "node1");
        }
        assert_bounded_and_total(&c);
    }

    #[test]
    fn test_remove() {
        let c = ring_with(4);
        for bin in bins(2) {
            c.remove(&bin).unwrap();
        }
        assert_eq!(c.get_bins().len(), 2);
        assert_bounded_and_total(&c);
    }

    #[test]
    fn test_remove_unknown_bin_is_noop() {
        let c = ring_with(4);
        let before = owners(&c);
        c.remove("fake").unwrap();
        assert_eq!(c.get_bins().len(), 4);
        assert_eq!(owners(&c), before);
    }

    #[test]
    fn test_remove_last_bin_resets_tables() {
        let c = ring_with(1);
        // A single bin has 21 positions here, enough to place everything
        assert_eq!(c.load_distribution().get("node0"), Some(&23.0));

        c.remove("node0").unwrap();
        assert_eq!(c.bin_count(), 0);
        assert!(c.load_distribution().is_empty());
        assert!(owners(&c).iter().all(Option::is_none));
        assert_eq!(c.maximum_load(), 0.0);
        assert_eq!(c.stats().virtual_nodes, 0);
        assert_eq!(c.locate("data0"), None);
    }

    #[test]
    fn test_capacity_failure() {
        let config = Config::with_hasher(Arc::new(Fnv1aDigest))
            .partition_count(4)
            .replication_factor(1)
            .load_balancing_parameter(1.0);

        let result = Consistent::new(config.clone(), bins(1));
        assert!(matches!(
            result,
            Err(Error::InsufficientPartitionCapacity { .. })
        ));

        let c = Consistent::new(config, Vec::new()).unwrap();
        assert!(matches!(
            c.add(Bin::new("node0")),
            Err(Error::InsufficientPartitionCapacity { .. })
        ));
        // Failed add leaves nothing behind
        assert_eq!(c.bin_count(), 0);
        assert_eq!(c.stats().virtual_nodes, 0);
        assert!(c.load_distribution().is_empty());
    }

    #[test]
    fn test_failed_remove_keeps_previous_tables() {
        // Two single-position bins can place one partition; one alone cannot
        let config = Config::with_hasher(Arc::new(Fnv1aDigest))
            .partition_count(1)
            .replication_factor(1)
            .load_balancing_parameter(1.0);
        let c = Consistent::new(config, bins(2)).unwrap();
        let before = owners(&c);

        assert_eq!(
            c.remove("node0"),
            Err(Error::InsufficientPartitionCapacity { partition: 0 })
        );
        assert_eq!(c.bin_count(), 2);
        assert_eq!(c.stats().virtual_nodes, 2);
        assert_eq!(owners(&c), before);
    }

    #[test]
    fn test_new_with_initial_bins_distributes() {
        let c = Consistent::new(config(), bins(4)).unwrap();
        assert_eq!(c.maximum_load(), 7.0);
        assert_bounded_and_total(&c);
        assert!(owners(&c).iter().all(Option::is_some));
    }

    #[test]
    fn test_new_rejects_duplicate_initial_bins() {
        let mut initial = bins(2);
        initial.push(Bin::new("node0"));
        let result = Consistent::new(config(), initial);
        assert!(matches!(result, Err(Error::BinAlreadyExists(_))));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = Consistent::new(config().partition_count(0), Vec::new());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_new_without_bins_is_empty() {
        let c = Consistent::new(config(), Vec::new()).unwrap();
        assert_eq!(c.bin_count(), 0);
        assert!(owners(&c).iter().all(Option::is_none));
        assert_eq!(c.locate("data0"), None);
        assert_eq!(c.ball_count(), 1);
    }

    #[test]
    fn test_insertion_order_independence() {
        let forward = ring_with(6);

        let backward = Consistent::new(config(), Vec::new()).unwrap();
        for bin in bins(6).into_iter().rev() {
            backward.add(bin).unwrap();
        }

        let mut shuffled = bins(6);
        shuffled.swap(0, 4);
        shuffled.swap(1, 5);
        let at_once = Consistent::new(config(), shuffled).unwrap();

        assert_eq!(owners(&forward), owners(&backward));
        assert_eq!(owners(&forward), owners(&at_once));
    }

    #[test]
    fn test_prefix_names_do_not_depend_on_history() {
        let xx = || {
            Config::with_hasher(Arc::new(XxDigest::new()))
                .partition_count(23)
                .replication_factor(12)
                .load_balancing_parameter(1.25)
        };

        let forward = Consistent::new(xx(), Vec::new()).unwrap();
        for name in ["1", "11", "2"] {
            forward.add(Bin::new(name)).unwrap();
        }
        let backward = Consistent::new(xx(), Vec::new()).unwrap();
        for name in ["2", "11", "1"] {
            backward.add(Bin::new(name)).unwrap();
        }
        assert_eq!(owners(&forward), owners(&backward));
        assert_eq!(forward.stats(), backward.stats());

        // "1" vnode 11 and "11" vnode 1 share the label "111"
        let shrunk = Consistent::new(xx(), Vec::new()).unwrap();
        for name in ["1", "2", "11"] {
            shrunk.add(Bin::new(name)).unwrap();
        }
        shrunk.remove("11").unwrap();
        let fresh = Consistent::new(xx(), vec![Bin::new("1"), Bin::new("2")]).unwrap();

        assert_eq!(owners(&shrunk), owners(&fresh));
        assert_eq!(shrunk.stats().virtual_nodes, 24);
        assert_eq!(shrunk.stats(), fresh.stats());
    }

    #[test]
    fn test_remove_then_add_restores_table() {
        let c = ring_with(4);
        let before = owners(&c);

        c.remove("node2").unwrap();
        c.add(Bin::new("node2")).unwrap();
        assert_eq!(owners(&c), before);
    }

    #[test]
    fn test_locate_is_idempotent() {
        let c = ring_with(4);
        for ball in balls(50) {
            let first = c.locate(&ball);
            let second = c.locate(&ball);
            assert!(first.is_some());
            assert_eq!(first, second);
        }
        assert_eq!(c.ball_count(), 50);
    }

    #[test]
    fn test_locate_matches_partition_owner() {
        let c = ring_with(4);
        for ball in balls(20) {
            let partition = c.find_partition_id(ball.name().as_bytes());
            assert!(partition.get() < 23);
            assert_eq!(c.locate(&ball), c.get_partition_owner(partition));
        }
    }

    #[test]
    fn test_balls_follow_partitions_across_membership_changes() {
        let c = ring_with(4);
        for ball in balls(30) {
            c.locate(&ball);
        }

        c.remove("node3").unwrap();
        for ball in balls(30) {
            let partition = c.find_partition_id(ball.name().as_bytes());
            let owner = c.get_partition_owner(partition).unwrap();
            let held = c.get_balls(&owner).unwrap();
            assert!(held.contains(&ball), "{} not held by {}", ball, owner);
        }
    }

    #[test]
    fn test_delete() {
        let c = ring_with(4);
        for ball in balls(4) {
            c.locate(&ball);
        }

        c.delete("data0").unwrap();
        assert_eq!(c.ball_count(), 3);
        assert_eq!(
            c.delete("not exist"),
            Err(Error::BallNotFound("not exist".to_string()))
        );
        assert_eq!(c.ball_count(), 3);
    }

    #[test]
    fn test_get_balls() {
        let c = ring_with(4);
        for ball in balls(100) {
            c.locate(&ball);
        }

        let total: usize = c
            .get_bins()
            .iter()
            .map(|bin| c.get_balls(bin).unwrap().len())
            .sum();
        assert_eq!(total, 100);

        assert!(matches!(
            c.get_balls("fake"),
            Err(Error::BinNotFound(_))
        ));
    }

    #[test]
    fn test_get_ball_partition() {
        let c = ring_with(3);
        c.locate("data7");

        assert_eq!(
            c.get_ball_partition("data7").unwrap(),
            c.find_partition_id(b"data7")
        );
        assert!(matches!(
            c.get_ball_partition("data8"),
            Err(Error::BallNotFound(_))
        ));

        c.delete("data7").unwrap();
        assert!(c.get_ball_partition("data7").is_err());
    }

    #[test]
    fn test_get_bin_returns_copy() {
        let c = ring_with(2);
        let bin = c.get_bin("node0").unwrap();
        assert_eq!(bin, Bin::new("node0"));
        assert!(matches!(c.get_bin("fake"), Err(Error::BinNotFound(_))));
    }

    #[test]
    fn test_relocate_is_noop_with_fixed_partitions() {
        let c = ring_with(4);
        for ball in balls(100) {
            c.locate(&ball);
        }

        let before = c.state.read().balls.clone();
        assert_eq!(c.relocate(), 0);
        assert_eq!(c.state.read().balls, before);
    }

    #[test]
    fn test_locate_changes_registry() {
        let c = ring_with(4);
        for ball in balls(100) {
            c.locate(&ball);
        }

        let before = c.state.read().balls.clone();
        c.locate("extra");
        assert_ne!(c.state.read().balls, before);
    }

    #[test]
    fn test_maximum_load_table() {
        let cases = [(23, 1.1, 4, 7.0), (23, 1.1, 3, 9.0), (271, 1.25, 4, 85.0)];
        for (partitions, lbp, count, expected) in cases {
            let config = Config::with_hasher(Arc::new(SipDigest))
                .partition_count(partitions)
                .replication_factor(20)
                .load_balancing_parameter(lbp);
            let c = Consistent::new(config, bins(count)).unwrap();
            assert_eq!(c.maximum_load(), expected);
        }
    }

    #[test]
    fn test_stats() {
        let c = ring_with(4);
        c.locate("data0");

        let stats = c.stats();
        assert_eq!(stats.bins, 4);
        assert_eq!(stats.partition_count, 23);
        assert_eq!(stats.maximum_load, 7.0);
        assert_eq!(stats.balls, 1);
        assert_eq!(stats.assigned_partitions(), 23);
        assert!(stats.virtual_nodes <= 84);
    }

    #[test]
    fn test_concurrent_access() {
        let c = ring_with(4);

        std::thread::scope(|s| {
            for t in 0..4 {
                let c = &c;
                s.spawn(move || {
                    for i in 0..50 {
                        let ball = Ball::new(format!("t{}-{}", t, i));
                        assert!(c.locate(&ball).is_some());
                        assert!(c.load_distribution().len() >= 4);
                    }
                });
            }
            s.spawn(|| {
                c.add(Bin::new("node4")).unwrap();
                c.remove("node4").unwrap();
            });
        });

        assert_eq!(c.ball_count(), 200);
        assert_bounded_and_total(&c);
    }
}
