//! # Identity and capability primitives plus the provider seams.
//!
//! The pipeline never resolves identities or grants itself; it asks the
//! collaborators behind [`IdentityProvider`] and [`AuthorizationProvider`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use async_trait::async_trait;

/// Authenticated caller. Its key partitions rate windows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    key: String,
}

impl Identity {
    /// Creates an identity for the given caller key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Caller key.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Ordered set of capability names.
///
/// # Example
/// ```
/// use signalvisor::CapabilitySet;
///
/// let granted: CapabilitySet = ["read", "write"].into_iter().collect();
/// let required: CapabilitySet = ["write", "admin"].into_iter().collect();
/// assert_eq!(required.missing_from(&granted).to_string(), "admin");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a capability.
    pub fn insert(&mut self, capability: impl Into<String>) -> bool {
        self.0.insert(capability.into())
    }

    /// True if the capability is present.
    pub fn contains(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }

    /// True if `self ⊆ granted`.
    pub fn is_subset(&self, granted: &CapabilitySet) -> bool {
        self.0.is_subset(&granted.0)
    }

    /// Capabilities in `self` that `granted` lacks.
    pub fn missing_from(&self, granted: &CapabilitySet) -> CapabilitySet {
        CapabilitySet(self.0.difference(&granted.0).cloned().collect())
    }

    /// True if no capability is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of capabilities.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Capabilities in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        CapabilitySet(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for cap in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(cap)?;
            first = false;
        }
        Ok(())
    }
}

/// Resolves the caller behind a raw request.
#[async_trait]
pub trait IdentityProvider<R: ?Sized + Sync>: Send + Sync + 'static {
    /// Returns `None` when the request carries no valid identity.
    async fn resolve_identity(&self, request: &R) -> Option<Identity>;
}

/// Looks up the capabilities granted to a caller.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync + 'static {
    /// Capabilities granted to `identity` (empty when unknown).
    async fn capabilities(&self, identity: &Identity) -> CapabilitySet;
}

/// In-memory grants keyed by caller key.
#[derive(Clone, Debug, Default)]
pub struct StaticGrants {
    grants: HashMap<String, CapabilitySet>,
}

impl StaticGrants {
    /// No grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `capabilities` to `key`, replacing earlier grants.
    pub fn grant(mut self, key: impl Into<String>, capabilities: CapabilitySet) -> Self {
        self.grants.insert(key.into(), capabilities);
        self
    }
}

#[async_trait]
impl AuthorizationProvider for StaticGrants {
    async fn capabilities(&self, identity: &Identity) -> CapabilitySet {
        self.grants.get(identity.key()).cloned().unwrap_or_default()
    }
}
