//! FerrumRing - Consistent hashing with bounded loads
//!
//! Assigns a large, changing set of keys ("balls") to a smaller set of
//! servers ("bins") so that every bin gets a near-uniform share, no bin
//! exceeds a configurable ceiling, and membership changes move few keys.
//!
//! Layout follows the same principles as the rest of the project:
//! - `hash`: the digest capability supplied by the embedding application
//! - `ring`: bin/ball identities and the sorted virtual-node ring
//! - `partition`: the fixed partition space and the bounded-load pass
//! - `registry`: bookkeeping of tracked balls per partition
//! - `consistent`: the synchronized facade tying everything together

pub mod config;
pub mod consistent;
pub mod error;
pub mod hash;
pub mod partition;
pub mod registry;
pub mod ring;
pub mod stats;

/// Re-export commonly used types
pub use config::{Config, Settings};
pub use consistent::Consistent;
pub use error::{Error, Result};
pub use hash::{Digest, Fnv1aDigest, SipDigest, XxDigest};
pub use partition::PartitionId;
pub use ring::{Ball, Bin, Identifiable};
pub use stats::RingStats;
