//! Configuration entries
//!
//! The body of an entry is kind-specific and kept as opaque JSON; replication
//! only needs identity and equality.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::raft_index::RaftIndex;
use super::tenancy::TenancyScope;

/// A configuration entry, identified by `(kind, name)` within its tenancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigEntry {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(flatten)]
    pub tenancy: TenancyScope,
    #[serde(flatten)]
    pub raft_index: RaftIndex,
}

impl ConfigEntry {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, body: Value) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            body,
            meta: BTreeMap::new(),
            tenancy: TenancyScope::default(),
            raft_index: RaftIndex::default(),
        }
    }

    /// Replication identity, `kind/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    pub fn is_same(&self, other: &ConfigEntry) -> bool {
        let ConfigEntry {
            kind,
            name,
            body,
            meta,
            tenancy,
            raft_index: _,
        } = self;
        *kind == other.kind
            && *name == other.name
            && *body == other.body
            && *meta == other.meta
            && *tenancy == other.tenancy
    }
}
