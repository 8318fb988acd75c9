//! ACL records: tokens, policies, roles and legacy tokens
//!
//! `is_same` on each record compares every field except the raft index.
//! The comparisons destructure the record so that adding a field without
//! deciding how it compares is a compile error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::raft_index::RaftIndex;
use super::tenancy::TenancyScope;

/// Privilege class of a legacy token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Client,
    Management,
}

/// Reference to a policy by id, with the name cached for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyLink {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Reference to a role by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleLink {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// ACL token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AclToken {
    #[serde(rename = "AccessorID")]
    pub accessor_id: String,
    #[serde(rename = "SecretID")]
    pub secret_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub policies: Vec<PolicyLink>,
    #[serde(default)]
    pub roles: Vec<RoleLink>,
    /// Local tokens never leave the datacenter that created them
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub tenancy: TenancyScope,
    #[serde(flatten)]
    pub raft_index: RaftIndex,
}

impl AclToken {
    /// New global token with freshly generated accessor and secret ids.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            accessor_id: Uuid::new_v4().to_string(),
            secret_id: Uuid::new_v4().to_string(),
            description: description.into(),
            policies: Vec::new(),
            roles: Vec::new(),
            local: false,
            expiration_time: None,
            tenancy: TenancyScope::default(),
            raft_index: RaftIndex::default(),
        }
    }

    pub fn is_same(&self, other: &AclToken) -> bool {
        let AclToken {
            accessor_id,
            secret_id,
            description,
            policies,
            roles,
            local,
            expiration_time,
            tenancy,
            raft_index: _,
        } = self;
        *accessor_id == other.accessor_id
            && *secret_id == other.secret_id
            && *description == other.description
            && *policies == other.policies
            && *roles == other.roles
            && *local == other.local
            && *expiration_time == other.expiration_time
            && *tenancy == other.tenancy
    }

    /// Whether the token has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.map(|t| t <= now).unwrap_or(false)
    }
}

/// ACL policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AclPolicy {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rules: String,
    /// Datacenters the policy is valid in; empty means all
    #[serde(default)]
    pub datacenters: Vec<String>,
    #[serde(flatten)]
    pub tenancy: TenancyScope,
    #[serde(flatten)]
    pub raft_index: RaftIndex,
}

impl AclPolicy {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rules: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            rules: rules.into(),
            datacenters: Vec::new(),
            tenancy: TenancyScope::default(),
            raft_index: RaftIndex::default(),
        }
    }

    pub fn is_same(&self, other: &AclPolicy) -> bool {
        let AclPolicy {
            id,
            name,
            description,
            rules,
            datacenters,
            tenancy,
            raft_index: _,
        } = self;
        *id == other.id
            && *name == other.name
            && *description == other.description
            && *rules == other.rules
            && *datacenters == other.datacenters
            && *tenancy == other.tenancy
    }
}

/// ACL role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AclRole {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub policies: Vec<PolicyLink>,
    #[serde(flatten)]
    pub tenancy: TenancyScope,
    #[serde(flatten)]
    pub raft_index: RaftIndex,
}

impl AclRole {
    pub fn is_same(&self, other: &AclRole) -> bool {
        let AclRole {
            id,
            name,
            description,
            policies,
            tenancy,
            raft_index: _,
        } = self;
        *id == other.id
            && *name == other.name
            && *description == other.description
            && *policies == other.policies
            && *tenancy == other.tenancy
    }
}

/// Token from the legacy ACL system: identity is the secret, rules inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyAclToken {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub token_type: TokenType,
    #[serde(default)]
    pub rules: String,
    #[serde(flatten)]
    pub raft_index: RaftIndex,
}

impl LegacyAclToken {
    pub fn is_same(&self, other: &LegacyAclToken) -> bool {
        let LegacyAclToken {
            id,
            name,
            token_type,
            rules,
            raft_index: _,
        } = self;
        *id == other.id
            && *name == other.name
            && *token_type == other.token_type
            && *rules == other.rules
    }
}
