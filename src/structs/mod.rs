//! Replicated data model
//!
//! Every record carries a [`RaftIndex`] assigned by the local log and an
//! `is_same` predicate that ignores it, so replication can tell a real
//! change from a copy that only differs in bookkeeping.

mod acl;
mod config_entry;
mod entity;
mod federation_state;
mod intention;
mod op;
mod raft_index;
mod replicated_type;
mod tenancy;

pub use acl::{AclPolicy, AclRole, AclToken, LegacyAclToken, PolicyLink, RoleLink, TokenType};
pub use config_entry::ConfigEntry;
pub use entity::Entity;
pub use federation_state::FederationState;
pub use intention::{Intention, IntentionAction};
pub use op::OpTag;
pub use raft_index::{RaftIndex, RaftIndexViolation};
pub use replicated_type::{ReplicatedType, UnknownReplicatedType};
pub use tenancy::{TenancyScope, DEFAULT_TENANCY_NAME};
