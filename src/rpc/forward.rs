//! Request routing and token propagation
//!
//! `route` decides where a request must run. `ForwardingClient` attaches the
//! process token to requests that arrive without one, routes them and hands
//! them to the transport, which owns connection handling.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use super::errors::RpcResult;
use super::info::RpcInfo;
use crate::observability::{Event, Logger};

/// Where a request is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// This server answers
    Local,
    /// The local datacenter's leader answers
    Leader,
    /// Another datacenter answers
    Remote(String),
}

/// Decide where `request` runs.
///
/// An empty request datacenter means the local one.
pub fn route<R: RpcInfo + ?Sized>(request: &R, local_datacenter: &str, is_leader: bool) -> RouteTarget {
    let datacenter = request.request_datacenter();
    if !datacenter.is_empty() && datacenter != local_datacenter {
        return RouteTarget::Remote(datacenter.to_string());
    }
    if is_leader || (request.is_read() && request.allow_stale_read()) {
        RouteTarget::Local
    } else {
        RouteTarget::Leader
    }
}

/// Transport that delivers a routed request and returns its response.
pub trait Forwarder<Req, Resp>: Send + Sync {
    fn forward(&self, target: RouteTarget, request: Req) -> impl Future<Output = RpcResult<Resp>> + Send;
}

/// Routes requests and re-attaches credentials on the way out.
#[derive(Debug)]
pub struct ForwardingClient<T> {
    transport: T,
    local_datacenter: String,
    token: String,
    leader: AtomicBool,
}

impl<T> ForwardingClient<T> {
    /// Create a client for `local_datacenter` that attaches `token` to
    /// requests carrying none.
    pub fn new(transport: T, local_datacenter: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            transport,
            local_datacenter: local_datacenter.into(),
            token: token.into(),
            leader: AtomicBool::new(false),
        }
    }

    pub fn local_datacenter(&self) -> &str {
        &self.local_datacenter
    }

    /// Record whether this server currently leads its datacenter.
    pub fn set_leader(&self, is_leader: bool) {
        self.leader.store(is_leader, Ordering::Release);
    }

    pub fn is_leader(&self) -> bool {
        self.leader.load(Ordering::Acquire)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Attach the client token if the request has none.
    pub fn attach_token<R: RpcInfo + ?Sized>(&self, request: &mut R) {
        if request.token_secret().is_empty() && !self.token.is_empty() {
            request.set_token_secret(&self.token);
        }
    }

    /// Route and send a request.
    pub async fn call<Req, Resp>(&self, mut request: Req) -> RpcResult<Resp>
    where
        Req: RpcInfo + Send,
        T: Forwarder<Req, Resp>,
    {
        self.attach_token(&mut request);
        let target = route(&request, &self.local_datacenter, self.is_leader());
        if let RouteTarget::Remote(datacenter) = &target {
            Logger::trace(
                Event::RpcForwarded.as_str(),
                &[
                    ("from_datacenter", self.local_datacenter.as_str()),
                    ("to_datacenter", datacenter.as_str()),
                ],
            );
        }
        self.transport.forward(target, request).await
    }
}
