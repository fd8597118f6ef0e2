//! Grantees, capabilities and permission rules
//!
//! Raw rules arrive from the fetcher as `(grantee, [(name, mode)])`. Inside the
//! engine every capability is addressed by a [`CapabilityKey`], which carries
//! the optional content-kind namespace explicitly instead of gluing it into a
//! free-form string.

use crate::{AuditError, ContentKind, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a grantee is a user or a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GranteeKind {
    /// Individual site user
    User,
    /// Site group
    Group,
}

impl GranteeKind {
    /// Identifier used in exported rows
    pub fn as_str(&self) -> &'static str {
        match self {
            GranteeKind::User => "user",
            GranteeKind::Group => "group",
        }
    }
}

impl fmt::Display for GranteeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user or group that can hold capabilities; equal iff kind and id match
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Grantee {
    /// User or group
    pub kind: GranteeKind,
    /// Opaque remote identifier
    pub id: String,
}

impl Grantee {
    /// Create a user grantee
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: GranteeKind::User,
            id: id.into(),
        }
    }

    /// Create a group grantee
    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: GranteeKind::Group,
            id: id.into(),
        }
    }
}

/// Mode of a capability grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityMode {
    /// Explicitly allowed
    Allow,
    /// Explicitly denied
    Deny,
    /// The remote API has no endpoint exposing this capability
    NoApiEndpoint,
}

impl CapabilityMode {
    /// Text written into export cells
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityMode::Allow => "Allow",
            CapabilityMode::Deny => "Deny",
            CapabilityMode::NoApiEndpoint => "No API Endpoint",
        }
    }
}

impl fmt::Display for CapabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityMode {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Allow" => Ok(CapabilityMode::Allow),
            "Deny" => Ok(CapabilityMode::Deny),
            "No API Endpoint" => Ok(CapabilityMode::NoApiEndpoint),
            other => Err(AuditError::serialization(format!(
                "unknown capability mode '{other}'"
            ))),
        }
    }
}

/// Capability name, optionally namespaced by the content kind it came from.
///
/// Renders as `Read` without a namespace and `workbook_Read` with one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityKey {
    /// Content kind the capability was folded in from, if any
    pub namespace: Option<ContentKind>,
    /// Capability name as the remote API spells it
    pub name: String,
}

impl CapabilityKey {
    /// Un-namespaced key
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Key namespaced by a content kind
    pub fn namespaced(kind: ContentKind, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(kind),
            name: name.into(),
        }
    }

    /// Key holding the permanent virtual-connection write gap
    pub fn virtual_connection_write() -> Self {
        Self::namespaced(ContentKind::VirtualConnection, "Write")
    }

    /// Same name under a different namespace
    pub fn with_name(&self, name: &str) -> Self {
        Self {
            namespace: self.namespace,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Some(kind) => write!(f, "{kind}_{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Capabilities keyed by [`CapabilityKey`], in first-insertion order
pub type CapabilitySet = IndexMap<CapabilityKey, CapabilityMode>;

/// A single `(name, mode)` pair as returned by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability name scoped to the fetched content kind
    pub name: String,
    /// Grant mode
    pub mode: CapabilityMode,
}

impl Capability {
    /// Create a capability
    pub fn new(name: impl Into<String>, mode: CapabilityMode) -> Self {
        Self {
            name: name.into(),
            mode,
        }
    }

    /// Allowed capability
    pub fn allow(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityMode::Allow)
    }

    /// Denied capability
    pub fn deny(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityMode::Deny)
    }
}

/// One grantee's capabilities on a single fetched resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Who the rule applies to
    pub grantee: Grantee,
    /// Capabilities in the order the API listed them
    pub capabilities: Vec<Capability>,
}

impl PermissionRule {
    /// Create a rule
    pub fn new(grantee: Grantee, capabilities: Vec<Capability>) -> Self {
        Self {
            grantee,
            capabilities,
        }
    }

    /// Capabilities as an un-namespaced set, as used by single-resource exports
    pub fn to_capability_set(&self) -> CapabilitySet {
        self.capabilities
            .iter()
            .map(|cap| (CapabilityKey::plain(cap.name.clone()), cap.mode))
            .collect()
    }
}
