//! Hashing capability
//!
//! The ring never picks a hash function on its own: the embedding application
//! supplies a [`Digest`]. A few ready-made implementations are provided for
//! convenience.

mod hashers;

pub use hashers::{Fnv1aDigest, SipDigest, XxDigest};

/// Produces an unsigned 64-bit digest of arbitrary bytes
///
/// Implementations must be deterministic and reasonably uniform. Two
/// instances configured the same way must return the same digest for the
/// same input, otherwise placements are not reproducible.
pub trait Digest: Send + Sync {
    /// Hash the given bytes
    fn sum64(&self, data: &[u8]) -> u64;
}
