//! RPC-backed fetcher
//!
//! Issues a stale-allowed blocking `ReplicationFetchRequest` to the source
//! datacenter through a [`ForwardingClient`], which attaches the replication
//! token and routes the request remotely.

use std::time::Duration;

use super::config::ReplicationConfig;
use super::errors::{ReplicationError, ReplicationResult};
use super::interfaces::{FetchResponse, ReplicationFetcher};
use crate::rpc::{
    Forwarder, ForwardingClient, QueryOptions, ReplicationFetchRequest, ReplicationFetchResponse,
};
use crate::structs::ReplicatedType;

pub struct RpcReplicationFetcher<T> {
    client: ForwardingClient<T>,
    source_datacenter: String,
}

impl<T> RpcReplicationFetcher<T> {
    pub fn new(client: ForwardingClient<T>, source_datacenter: impl Into<String>) -> Self {
        Self {
            client,
            source_datacenter: source_datacenter.into(),
        }
    }

    /// Fetcher for a secondary datacenter, authenticating with the
    /// configured replication token. `None` when `config` has no source.
    pub fn from_config(transport: T, config: &ReplicationConfig) -> Option<Self> {
        let source = config.source_datacenter()?;
        let client = ForwardingClient::new(
            transport,
            config.datacenter.clone(),
            config.replication_token.clone(),
        );
        Some(Self::new(client, source))
    }

    pub fn source_datacenter(&self) -> &str {
        &self.source_datacenter
    }

    pub fn client(&self) -> &ForwardingClient<T> {
        &self.client
    }

    /// Request for everything of `ty` above `after_index`.
    ///
    /// Any server in the source may answer, so the read is stale-allowed.
    pub fn request(
        &self,
        ty: ReplicatedType,
        after_index: u64,
        max_wait: Duration,
    ) -> ReplicationFetchRequest {
        ReplicationFetchRequest {
            replicated_type: ty,
            datacenter: self.source_datacenter.clone(),
            query_options: Some(QueryOptions {
                min_query_index: after_index,
                max_query_time: max_wait,
                allow_stale: true,
                ..QueryOptions::default()
            }),
        }
    }
}

impl<T> ReplicationFetcher for RpcReplicationFetcher<T>
where
    T: Forwarder<ReplicationFetchRequest, ReplicationFetchResponse> + 'static,
{
    async fn fetch(
        &self,
        ty: ReplicatedType,
        after_index: u64,
        max_wait: Duration,
    ) -> ReplicationResult<FetchResponse> {
        let request = self.request(ty, after_index, max_wait);
        let response: ReplicationFetchResponse = self.client.call(request).await?;

        if response.replicated_type != ty {
            return Err(ReplicationError::unknown_type(format!(
                "asked {} for {} but got {}",
                self.source_datacenter, ty, response.replicated_type
            )));
        }
        Ok(FetchResponse {
            entities: response.entities,
            deleted: response.deleted,
            source_index: response.query_meta.index,
        })
    }
}
