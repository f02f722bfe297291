//! Hash ring module
//!
//! Identities of the things being placed (bins and balls) and the sorted
//! ring of virtual-node positions used for consistent hashing.

mod identity;
mod hash_ring;

pub use identity::{Ball, Bin, Identifiable};
pub use hash_ring::Ring;
