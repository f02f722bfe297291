//! Ball registry module
//!
//! Remembers which partition each tracked ball was last placed on. Balls are
//! never tied to a bin directly: their owner is always resolved live through
//! the partition table.

mod balls;

pub use balls::BallRegistry;
