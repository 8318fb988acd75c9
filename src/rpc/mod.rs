//! RPC consistency contract
//!
//! Every request message answers the same questions: is it a read, may it be
//! served stale, has its hold time run out, which token does it carry and
//! which datacenter must answer it. Messages declare how through the glue
//! macros; routing and token re-attachment build on the answers.

mod errors;
mod glue;
mod forward;
mod info;
mod messages;
mod options;

pub use errors::{RpcError, RpcResult};
pub use forward::{route, Forwarder, ForwardingClient, RouteTarget};
pub use info::{
    DatacenterField, QueryOptionsField, RequestConsistency, RequestDatacenter, RpcInfo,
    WriteRequestField,
};
pub use messages::{
    AclPolicyBatchSetRequest, AclPolicyListRequest, AclRoleBatchSetRequest, AclRoleListRequest,
    AclTokenBatchDeleteRequest, AclTokenBatchSetRequest, AclTokenListRequest, ConfigEntryQuery,
    ConfigEntryRequest, FederationStateListRequest, FederationStateRequest, IntentionListRequest,
    IntentionRequest, ReplicationFetchRequest, ReplicationFetchResponse, ReplicationStatusRequest,
};
pub use options::{QueryMeta, QueryOptions, TargetDatacenter, WriteRequest, JITTER_FRACTION};
