//! Entity - any record that crosses a datacenter boundary through replication

use serde::{Deserialize, Serialize};

use super::acl::{AclPolicy, AclRole, AclToken, LegacyAclToken};
use super::config_entry::ConfigEntry;
use super::federation_state::FederationState;
use super::intention::Intention;
use super::raft_index::RaftIndex;
use super::replicated_type::ReplicatedType;
use super::tenancy::TenancyScope;

/// A replicated record of any [`ReplicatedType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Kind", content = "Value")]
pub enum Entity {
    Token(AclToken),
    Policy(AclPolicy),
    Role(AclRole),
    LegacyToken(LegacyAclToken),
    ConfigEntry(ConfigEntry),
    Intention(Intention),
    FederationState(FederationState),
}

impl Entity {
    /// The replicated type this record belongs to.
    pub fn replicated_type(&self) -> ReplicatedType {
        match self {
            Self::Token(_) => ReplicatedType::Tokens,
            Self::Policy(_) => ReplicatedType::Policies,
            Self::Role(_) => ReplicatedType::Roles,
            Self::LegacyToken(_) => ReplicatedType::LegacyTokens,
            Self::ConfigEntry(_) => ReplicatedType::ConfigEntries,
            Self::Intention(_) => ReplicatedType::Intentions,
            Self::FederationState(_) => ReplicatedType::FederationStates,
        }
    }

    /// Identity used to match source and destination copies.
    pub fn id(&self) -> String {
        match self {
            Self::Token(t) => t.accessor_id.clone(),
            Self::Policy(p) => p.id.clone(),
            Self::Role(r) => r.id.clone(),
            Self::LegacyToken(t) => t.id.clone(),
            Self::ConfigEntry(e) => e.key(),
            Self::Intention(i) => i.id.clone(),
            Self::FederationState(s) => s.datacenter.clone(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Self::Token(t) => &t.description,
            Self::Policy(p) => &p.name,
            Self::Role(r) => &r.name,
            Self::LegacyToken(t) => &t.name,
            Self::ConfigEntry(e) => &e.name,
            Self::Intention(i) => &i.destination_name,
            Self::FederationState(s) => &s.datacenter,
        }
    }

    pub fn raft_index(&self) -> &RaftIndex {
        match self {
            Self::Token(t) => &t.raft_index,
            Self::Policy(p) => &p.raft_index,
            Self::Role(r) => &r.raft_index,
            Self::LegacyToken(t) => &t.raft_index,
            Self::ConfigEntry(e) => &e.raft_index,
            Self::Intention(i) => &i.raft_index,
            Self::FederationState(s) => &s.raft_index,
        }
    }

    pub fn raft_index_mut(&mut self) -> &mut RaftIndex {
        match self {
            Self::Token(t) => &mut t.raft_index,
            Self::Policy(p) => &mut p.raft_index,
            Self::Role(r) => &mut r.raft_index,
            Self::LegacyToken(t) => &mut t.raft_index,
            Self::ConfigEntry(e) => &mut e.raft_index,
            Self::Intention(i) => &mut i.raft_index,
            Self::FederationState(s) => &mut s.raft_index,
        }
    }

    /// Partition and namespace, for records that have one.
    pub fn tenancy(&self) -> Option<&TenancyScope> {
        match self {
            Self::Token(t) => Some(&t.tenancy),
            Self::Policy(p) => Some(&p.tenancy),
            Self::Role(r) => Some(&r.tenancy),
            Self::ConfigEntry(e) => Some(&e.tenancy),
            Self::Intention(i) => Some(&i.tenancy),
            Self::LegacyToken(_) | Self::FederationState(_) => None,
        }
    }

    /// Functional equality: every field except the raft index.
    ///
    /// Records of different types are never the same.
    pub fn is_same(&self, other: &Entity) -> bool {
        match (self, other) {
            (Self::Token(a), Self::Token(b)) => a.is_same(b),
            (Self::Policy(a), Self::Policy(b)) => a.is_same(b),
            (Self::Role(a), Self::Role(b)) => a.is_same(b),
            (Self::LegacyToken(a), Self::LegacyToken(b)) => a.is_same(b),
            (Self::ConfigEntry(a), Self::ConfigEntry(b)) => a.is_same(b),
            (Self::Intention(a), Self::Intention(b)) => a.is_same(b),
            (Self::FederationState(a), Self::FederationState(b)) => a.is_same(b),
            _ => false,
        }
    }

    /// Whether the record may leave its datacenter. Local tokens may not.
    pub fn is_replicable(&self) -> bool {
        !matches!(self, Self::Token(t) if t.local)
    }
}
