//! RPC capability traits
//!
//! Every request message exposes the same small capability set. Message
//! types never implement these by hand; the glue macros derive them from
//! the name of the nested options field (see `glue.rs`).
//!
//! Nested options are usually `Option<_>` because decoded messages may lack
//! them. The field traits below give every accessor a defined answer for the
//! absent case.

use std::time::{Duration, Instant};

use super::errors::RpcResult;
use super::options::{QueryOptions, TargetDatacenter, WriteRequest};

/// Read/write classification, staleness, timeouts and token access.
pub trait RequestConsistency {
    /// Whether the request only reads state.
    fn is_read(&self) -> bool;

    /// Whether a non-leader may answer. Always false for writes.
    fn allow_stale_read(&self) -> bool;

    /// Whether the request has been held longer than allowed.
    ///
    /// Errors only for structurally invalid options, never because of
    /// elapsed time.
    fn has_timed_out(
        &self,
        start: Instant,
        rpc_hold_timeout: Duration,
        min_wait: Duration,
        max_wait: Duration,
    ) -> RpcResult<bool>;

    /// ACL token carried by the request, empty if none.
    fn token(&self) -> &str;

    /// Same as [`token`](Self::token).
    fn token_secret(&self) -> &str {
        self.token()
    }

    /// Attach a token, creating the nested options record if absent.
    fn set_token_secret(&mut self, secret: &str);
}

/// Datacenter routing.
pub trait RequestDatacenter {
    /// Target datacenter, empty for the local one.
    fn request_datacenter(&self) -> &str;
}

/// Full capability set needed to forward a request.
pub trait RpcInfo: RequestConsistency + RequestDatacenter {}

impl<T: RequestConsistency + RequestDatacenter + ?Sized> RpcInfo for T {}

/// Field that holds a message's query options.
pub trait QueryOptionsField {
    fn query_options(&self) -> Option<&QueryOptions>;
    fn query_options_mut(&mut self) -> &mut QueryOptions;
}

impl QueryOptionsField for QueryOptions {
    fn query_options(&self) -> Option<&QueryOptions> {
        Some(self)
    }

    fn query_options_mut(&mut self) -> &mut QueryOptions {
        self
    }
}

impl QueryOptionsField for Option<QueryOptions> {
    fn query_options(&self) -> Option<&QueryOptions> {
        self.as_ref()
    }

    fn query_options_mut(&mut self) -> &mut QueryOptions {
        self.get_or_insert_with(QueryOptions::default)
    }
}

/// Field that holds a message's write options.
pub trait WriteRequestField {
    fn write_request(&self) -> Option<&WriteRequest>;
    fn write_request_mut(&mut self) -> &mut WriteRequest;
}

impl WriteRequestField for WriteRequest {
    fn write_request(&self) -> Option<&WriteRequest> {
        Some(self)
    }

    fn write_request_mut(&mut self) -> &mut WriteRequest {
        self
    }
}

impl WriteRequestField for Option<WriteRequest> {
    fn write_request(&self) -> Option<&WriteRequest> {
        self.as_ref()
    }

    fn write_request_mut(&mut self) -> &mut WriteRequest {
        self.get_or_insert_with(WriteRequest::default)
    }
}

/// Field that names a message's target datacenter.
pub trait DatacenterField {
    fn datacenter_name(&self) -> &str;
}

impl DatacenterField for String {
    fn datacenter_name(&self) -> &str {
        self
    }
}

impl DatacenterField for Option<String> {
    fn datacenter_name(&self) -> &str {
        self.as_deref().unwrap_or("")
    }
}

impl DatacenterField for TargetDatacenter {
    fn datacenter_name(&self) -> &str {
        &self.datacenter
    }
}

impl DatacenterField for Option<TargetDatacenter> {
    fn datacenter_name(&self) -> &str {
        self.as_ref().map(|t| t.datacenter.as_str()).unwrap_or("")
    }
}
