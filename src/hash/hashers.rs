//! Built-in digest implementations

use super::Digest;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// SipHash-1-3 with a zero key
///
/// Same family the shard router of the server uses for key routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SipDigest;

impl Digest for SipDigest {
    fn sum64(&self, data: &[u8]) -> u64 {
        let mut hasher = SipHasher13::new();
        hasher.write(data);
        hasher.finish()
    }
}

/// xxHash64 with a configurable seed
#[derive(Debug, Clone, Copy, Default)]
pub struct XxDigest {
    seed: u64,
}

impl XxDigest {
    /// Create a digest with seed 0
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create a digest with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        XxDigest { seed }
    }
}

impl Digest for XxDigest {
    fn sum64(&self, data: &[u8]) -> u64 {
        xxhash_rust::xxh64::xxh64(data, self.seed)
    }
}

/// FNV-1a 64-bit
///
/// Weak but tiny; handy in tests where a well-known reference hash is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1aDigest;

impl Digest for Fnv1aDigest {
    fn sum64(&self, data: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for &byte in data {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}
