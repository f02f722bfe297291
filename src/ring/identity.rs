//! Bin and ball identities
//!
//! Both are identified purely by name. They are small owned values so every
//! read-returning call can hand out copies without exposing internal state.

use std::borrow::Borrow;
use std::fmt;

/// Anything that can be identified by a name
pub trait Identifiable {
    /// The identity used for hashing and equality
    fn name(&self) -> &str;
}

impl Identifiable for str {
    fn name(&self) -> &str {
        self
    }
}

impl Identifiable for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

impl<T: Identifiable + ?Sized> Identifiable for &T {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A destination of assignment (server, shard, worker...)
///
/// Usually the name is an address or a hash of the node metadata.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bin {
    name: String,
}

impl Bin {
    /// Create a bin from its name
    pub fn new(name: impl Into<String>) -> Self {
        Bin { name: name.into() }
    }
}

impl Identifiable for Bin {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Bin {
    fn from(name: &str) -> Self {
        Bin::new(name)
    }
}

/// A subject of assignment (key, request, session...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ball {
    name: String,
}

impl Ball {
    /// Create a ball from its name
    pub fn new(name: impl Into<String>) -> Self {
        Ball { name: name.into() }
    }

    /// Copy the identity of any identifiable value into a ball
    pub fn of<T: Identifiable + ?Sized>(value: &T) -> Self {
        Ball::new(value.name())
    }
}

impl Identifiable for Ball {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Ball {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Borrow<str> for Ball {
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Ball {
    fn from(name: &str) -> Self {
        Ball::new(name)
    }
}
