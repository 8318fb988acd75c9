//! Replicated state types
//!
//! The set is closed. Each type has a stable name used in status records,
//! logs and the HTTP status endpoint. Names never change once published;
//! new types only add names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A kind of state that secondary datacenters copy from the primary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReplicatedType {
    /// ACL tokens
    #[serde(rename = "tokens")]
    Tokens,
    /// ACL policies
    #[serde(rename = "policies")]
    Policies,
    /// ACL roles
    #[serde(rename = "roles")]
    Roles,
    /// Pre-policy ACL tokens carrying inline rules
    #[serde(rename = "legacy", alias = "legacy-tokens")]
    LegacyTokens,
    /// Configuration entries
    #[serde(rename = "config-entries")]
    ConfigEntries,
    /// Service intentions
    #[serde(rename = "intentions")]
    Intentions,
    /// Federation states of peer datacenters
    #[serde(rename = "federation-states")]
    FederationStates,
}

impl ReplicatedType {
    /// Every replicated type, in status display order.
    pub const ALL: [ReplicatedType; 7] = [
        ReplicatedType::Tokens,
        ReplicatedType::Policies,
        ReplicatedType::Roles,
        ReplicatedType::LegacyTokens,
        ReplicatedType::ConfigEntries,
        ReplicatedType::Intentions,
        ReplicatedType::FederationStates,
    ];

    /// Stable wire and display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tokens => "tokens",
            Self::Policies => "policies",
            Self::Roles => "roles",
            Self::LegacyTokens => "legacy",
            Self::ConfigEntries => "config-entries",
            Self::Intentions => "intentions",
            Self::FederationStates => "federation-states",
        }
    }

    /// Whether the type belongs to the ACL system.
    pub fn is_acl(&self) -> bool {
        matches!(
            self,
            Self::Tokens | Self::Policies | Self::Roles | Self::LegacyTokens
        )
    }
}

impl fmt::Display for ReplicatedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name that matches no replicated type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReplicatedType(pub String);

impl fmt::Display for UnknownReplicatedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown replicated type {:?}", self.0)
    }
}

impl std::error::Error for UnknownReplicatedType {}

impl FromStr for ReplicatedType {
    type Err = UnknownReplicatedType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tokens" => Ok(Self::Tokens),
            "policies" => Ok(Self::Policies),
            "roles" => Ok(Self::Roles),
            "legacy" | "legacy-tokens" => Ok(Self::LegacyTokens),
            "config-entries" => Ok(Self::ConfigEntries),
            "intentions" => Ok(Self::Intentions),
            "federation-states" => Ok(Self::FederationStates),
            other => Err(UnknownReplicatedType(other.to_string())),
        }
    }
}
