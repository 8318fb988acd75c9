//! Federation state: what one datacenter publishes about itself to its peers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::raft_index::RaftIndex;

/// Mesh gateway endpoints and update time for one datacenter.
///
/// Not tenancy scoped; identity is the datacenter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FederationState {
    pub datacenter: String,
    #[serde(default)]
    pub mesh_gateways: Vec<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub raft_index: RaftIndex,
}

impl FederationState {
    pub fn is_same(&self, other: &FederationState) -> bool {
        let FederationState {
            datacenter,
            mesh_gateways,
            updated_at,
            raft_index: _,
        } = self;
        *datacenter == other.datacenter
            && *mesh_gateways == other.mesh_gateways
            && *updated_at == other.updated_at
    }
}
