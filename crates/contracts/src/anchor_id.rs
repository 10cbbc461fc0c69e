//! Anchor identifier.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Anchor identifier, typically the beacon's MAC string.
///
/// Backed by `Arc<str>`: ids are created once at discovery time and then
/// cloned on every fix, so a clone has to stay a refcount bump. The registry
/// and the per-fix RSSI map key by this value; `Borrow<str>` keeps plain
/// `&str` lookups working against those maps.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AnchorId(Arc<str>);

impl AnchorId {
    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnchorId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for AnchorId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

// Consistent with the derived Hash, so HashMap<AnchorId, _> accepts &str keys
impl Borrow<str> for AnchorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AnchorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AnchorId {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for AnchorId {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnchorId({:?})", self.0)
    }
}

impl Serialize for AnchorId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AnchorId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::from)
    }
}
