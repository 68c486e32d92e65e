//! InterfaceId - name of the interface a packet was captured on

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Interface name shared by every envelope of a broadcast.
///
/// A broadcast clones the source name once per subscriber, so the name
/// lives behind an `Arc<str>` and a clone only bumps a reference count.
///
/// ```
/// use contracts::InterfaceId;
///
/// let id: InterfaceId = "eth0".into();
/// assert_eq!(id, "eth0");
/// assert_eq!(id.as_str(), id.clone().as_str());
/// ```
#[derive(Clone)]
pub struct InterfaceId(Arc<str>);

impl InterfaceId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for InterfaceId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

// Lets per-source maps be queried with a plain `&str`
impl Borrow<str> for InterfaceId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InterfaceId {
    fn from(name: &str) -> Self {
        Self(name.into())
    }
}

impl From<String> for InterfaceId {
    fn from(name: String) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceId({:?})", &*self.0)
    }
}

impl PartialEq for InterfaceId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for InterfaceId {}

impl PartialEq<str> for InterfaceId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for InterfaceId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

// Must agree with `str`'s hash for the `Borrow<str>` lookups
impl Hash for InterfaceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for InterfaceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for InterfaceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}
