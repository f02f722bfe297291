//! Error types
//!
//! Every failure is returned to the caller of the operation. Nothing is
//! retried internally.

use std::fmt;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the ring, the distribution pass and the facade
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A bin with this name is already tracked
    BinAlreadyExists(String),

    /// The bin is not tracked
    BinNotFound(String),

    /// The ball is not tracked
    BallNotFound(String),

    /// The operation needs at least one bin
    InsufficientBins,

    /// The bounded-load walk found no bin with room for this partition.
    /// Raise the load balancing parameter, lower the partition count
    /// or add bins/replicas.
    InsufficientPartitionCapacity { partition: u64 },

    /// Configuration rejected by validation
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BinAlreadyExists(name) => write!(f, "bin already exists: {}", name),
            Error::BinNotFound(name) => write!(f, "bin not found: {}", name),
            Error::BallNotFound(name) => write!(f, "ball not found: {}", name),
            Error::InsufficientBins => write!(f, "insufficient bins"),
            Error::InsufficientPartitionCapacity { partition } => write!(
                f,
                "not enough room to distribute partitions (stuck at partition {})",
                partition
            ),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
