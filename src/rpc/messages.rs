//! Request and response messages
//!
//! Capabilities come from the `rpc_glue!` block at the bottom of the file;
//! adding a message means adding one line there.

use serde::{Deserialize, Serialize};

use super::options::{QueryMeta, QueryOptions, TargetDatacenter, WriteRequest};
use crate::structs::{
    AclPolicy, AclRole, AclToken, ConfigEntry, Entity, FederationState, Intention, OpTag,
    ReplicatedType,
};

/// Long-poll for all records of one type changed above an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationFetchRequest {
    pub replicated_type: ReplicatedType,
    /// Source datacenter to read from
    #[serde(default)]
    pub datacenter: String,
    #[serde(default)]
    pub query_options: Option<QueryOptions>,
}

/// Records changed above the requested index, plus ids removed at the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationFetchResponse {
    pub replicated_type: ReplicatedType,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub query_meta: QueryMeta,
}

/// Replication status of a datacenter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ReplicationStatusRequest {
    pub datacenter: String,
    pub query_options: Option<QueryOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AclTokenListRequest {
    pub datacenter: String,
    /// Also list tokens that never replicate
    pub include_local: bool,
    pub query_options: Option<QueryOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AclTokenBatchSetRequest {
    pub datacenter: String,
    pub tokens: Vec<AclToken>,
    /// Only write when the stored modify index matches
    pub cas: bool,
    /// Written by replication rather than a user
    pub from_replication: bool,
    pub write_request: Option<WriteRequest>,
}

/// Token deletion; always local to the receiving datacenter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AclTokenBatchDeleteRequest {
    #[serde(rename = "TokenIDs")]
    pub token_ids: Vec<String>,
    pub write_request: Option<WriteRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AclPolicyListRequest {
    pub datacenter: String,
    pub query_options: Option<QueryOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AclPolicyBatchSetRequest {
    pub datacenter: String,
    pub policies: Vec<AclPolicy>,
    pub write_request: Option<WriteRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AclRoleListRequest {
    pub datacenter: String,
    pub query_options: Option<QueryOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AclRoleBatchSetRequest {
    pub datacenter: String,
    pub roles: Vec<AclRole>,
    pub write_request: Option<WriteRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ConfigEntryQuery {
    pub datacenter: String,
    pub kind: String,
    pub name: String,
    pub query_options: Option<QueryOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigEntryRequest {
    #[serde(default)]
    pub datacenter: String,
    pub op: OpTag,
    pub entry: ConfigEntry,
    #[serde(default)]
    pub write_request: Option<WriteRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct IntentionListRequest {
    pub datacenter: String,
    pub query_options: Option<QueryOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IntentionRequest {
    #[serde(default)]
    pub datacenter: String,
    pub op: OpTag,
    pub intention: Intention,
    #[serde(default)]
    pub write_request: Option<WriteRequest>,
}

/// Federation states, routed by a nested target record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FederationStateListRequest {
    pub target_datacenter: Option<TargetDatacenter>,
    pub query_options: Option<QueryOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FederationStateRequest {
    #[serde(default)]
    pub datacenter: String,
    pub op: OpTag,
    pub state: FederationState,
    #[serde(default)]
    pub write_request: Option<WriteRequest>,
}

crate::rpc_glue! {
    ReplicationFetchRequest => read(query_options), datacenter(datacenter);
    ReplicationStatusRequest => read(query_options), datacenter(datacenter);
    AclTokenListRequest => read(query_options), datacenter(datacenter);
    AclTokenBatchSetRequest => write(write_request), datacenter(datacenter);
    AclTokenBatchDeleteRequest => write(write_request);
    AclPolicyListRequest => read(query_options), datacenter(datacenter);
    AclPolicyBatchSetRequest => write(write_request), datacenter(datacenter);
    AclRoleListRequest => read(query_options), datacenter(datacenter);
    AclRoleBatchSetRequest => write(write_request), datacenter(datacenter);
    ConfigEntryQuery => read(query_options), datacenter(datacenter);
    ConfigEntryRequest => write(write_request), datacenter(datacenter);
    IntentionListRequest => read(query_options), datacenter(datacenter);
    IntentionRequest => write(write_request), datacenter(datacenter);
    FederationStateListRequest => read(query_options), datacenter(target_datacenter);
    FederationStateRequest => write(write_request), datacenter(datacenter);
}
