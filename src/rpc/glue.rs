//! Declarative capability glue for request messages
//!
//! Three independent capabilities, each derived from one field name:
//!
//! - `impl_read_request!(Msg, field)`: read semantics from `QueryOptions`
//! - `impl_write_request!(Msg, field)`: write semantics from `WriteRequest`
//! - `impl_request_datacenter!(Msg[, field])`: routing datacenter, local if
//!   no field is named
//!
//! `rpc_glue!` annotates many messages at once:
//!
//! ```ignore
//! rpc_glue! {
//!     AclTokenListRequest => read(query_options), datacenter(datacenter);
//!     AclTokenBatchDeleteRequest => write(write_request);
//! }
//! ```

#[macro_export]
macro_rules! impl_read_request {
    ($msg:ty, $field:ident) => {
        impl $crate::rpc::RequestConsistency for $msg {
            fn is_read(&self) -> bool {
                true
            }

            fn allow_stale_read(&self) -> bool {
                $crate::rpc::QueryOptionsField::query_options(&self.$field)
                    .map($crate::rpc::QueryOptions::allow_stale_read)
                    .unwrap_or(false)
            }

            fn has_timed_out(
                &self,
                start: ::std::time::Instant,
                rpc_hold_timeout: ::std::time::Duration,
                min_wait: ::std::time::Duration,
                max_wait: ::std::time::Duration,
            ) -> $crate::rpc::RpcResult<bool> {
                match $crate::rpc::QueryOptionsField::query_options(&self.$field) {
                    Some(options) => {
                        options.has_timed_out(start, rpc_hold_timeout, min_wait, max_wait)
                    }
                    None => Ok(false),
                }
            }

            fn token(&self) -> &str {
                $crate::rpc::QueryOptionsField::query_options(&self.$field)
                    .map($crate::rpc::QueryOptions::token_secret)
                    .unwrap_or("")
            }

            fn set_token_secret(&mut self, secret: &str) {
                $crate::rpc::QueryOptionsField::query_options_mut(&mut self.$field)
                    .set_token_secret(secret);
            }
        }
    };
}

#[macro_export]
macro_rules! impl_write_request {
    ($msg:ty, $field:ident) => {
        impl $crate::rpc::RequestConsistency for $msg {
            fn is_read(&self) -> bool {
                false
            }

            fn allow_stale_read(&self) -> bool {
                false
            }

            fn has_timed_out(
                &self,
                start: ::std::time::Instant,
                rpc_hold_timeout: ::std::time::Duration,
                min_wait: ::std::time::Duration,
                max_wait: ::std::time::Duration,
            ) -> $crate::rpc::RpcResult<bool> {
                match $crate::rpc::WriteRequestField::write_request(&self.$field) {
                    Some(write) => write.has_timed_out(start, rpc_hold_timeout, min_wait, max_wait),
                    None => Ok(false),
                }
            }

            fn token(&self) -> &str {
                $crate::rpc::WriteRequestField::write_request(&self.$field)
                    .map($crate::rpc::WriteRequest::token_secret)
                    .unwrap_or("")
            }

            fn set_token_secret(&mut self, secret: &str) {
                $crate::rpc::WriteRequestField::write_request_mut(&mut self.$field)
                    .set_token_secret(secret);
            }
        }
    };
}

#[macro_export]
macro_rules! impl_request_datacenter {
    ($msg:ty, $field:ident) => {
        impl $crate::rpc::RequestDatacenter for $msg {
            fn request_datacenter(&self) -> &str {
                $crate::rpc::DatacenterField::datacenter_name(&self.$field)
            }
        }
    };
    ($msg:ty) => {
        impl $crate::rpc::RequestDatacenter for $msg {
            fn request_datacenter(&self) -> &str {
                ""
            }
        }
    };
}

#[macro_export]
macro_rules! rpc_glue {
    (@consistency read, $msg:ty, $field:ident) => {
        $crate::impl_read_request!($msg, $field);
    };
    (@consistency write, $msg:ty, $field:ident) => {
        $crate::impl_write_request!($msg, $field);
    };
    ($($msg:ty => $kind:ident($field:ident) $(, datacenter($dc:ident))? ;)*) => {
        $(
            $crate::rpc_glue!(@consistency $kind, $msg, $field);
            $crate::impl_request_datacenter!($msg $(, $dc)?);
        )*
    };
}
