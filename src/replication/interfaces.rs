//! Collaborators consumed by replication
//!
//! The consensus-backed store, the source datacenter and the tenancy
//! registry live outside this crate; coordinators reach them only through
//! these traits.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::errors::ReplicationResult;
use crate::structs::{Entity, OpTag, ReplicatedType, TenancyScope};

/// One answer from the source datacenter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    /// Records changed above the requested index.
    pub entities: Vec<Entity>,
    /// Ids removed at the source above the requested index.
    pub deleted: Vec<String>,
    /// Source index the response reflects.
    pub source_index: u64,
}

/// Long-poll reads against the source datacenter.
pub trait ReplicationFetcher: Send + Sync + 'static {
    /// Everything of `ty` modified after `after_index`, blocking up to
    /// `max_wait` when nothing changed.
    fn fetch(
        &self,
        ty: ReplicatedType,
        after_index: u64,
        max_wait: Duration,
    ) -> impl Future<Output = ReplicationResult<FetchResponse>> + Send;
}

/// Commits batches to the local consensus log.
///
/// Must be idempotent under redelivery of the same entity and index.
pub trait StateApplier: Send + Sync + 'static {
    /// Apply `entities` with `op` and return the new local index.
    fn apply(
        &self,
        entities: Vec<Entity>,
        op: OpTag,
    ) -> impl Future<Output = ReplicationResult<u64>> + Send;
}

/// Reads the locally held copy of an entity.
pub trait LocalReader: Send + Sync + 'static {
    fn lookup(
        &self,
        ty: ReplicatedType,
        id: &str,
    ) -> impl Future<Output = ReplicationResult<Option<Entity>>> + Send;
}

/// Existence and deletion markers for partitions and namespaces.
pub trait TenancyOracle: Send + Sync + 'static {
    fn partition_exists(&self, partition: &str) -> ReplicationResult<bool>;

    fn namespace_exists(&self, partition: &str, namespace: &str) -> ReplicationResult<bool>;

    fn partition_marked_for_deletion(&self, partition: &str) -> ReplicationResult<bool>;

    fn namespace_marked_for_deletion(
        &self,
        partition: &str,
        namespace: &str,
    ) -> ReplicationResult<bool>;

    /// Whether records scoped to `scope` may still be written.
    fn accepts(&self, scope: &TenancyScope) -> ReplicationResult<bool> {
        if !self.partition_exists(&scope.partition)?
            || self.partition_marked_for_deletion(&scope.partition)?
        {
            return Ok(false);
        }
        if !self.namespace_exists(&scope.partition, &scope.namespace)?
            || self.namespace_marked_for_deletion(&scope.partition, &scope.namespace)?
        {
            return Ok(false);
        }
        Ok(true)
    }
}

/// Single-tenant deployments: every partition and namespace exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTenancy;

impl TenancyOracle for DefaultTenancy {
    fn partition_exists(&self, _partition: &str) -> ReplicationResult<bool> {
        Ok(true)
    }

    fn namespace_exists(&self, _partition: &str, _namespace: &str) -> ReplicationResult<bool> {
        Ok(true)
    }

    fn partition_marked_for_deletion(&self, _partition: &str) -> ReplicationResult<bool> {
        Ok(false)
    }

    fn namespace_marked_for_deletion(
        &self,
        _partition: &str,
        _namespace: &str,
    ) -> ReplicationResult<bool> {
        Ok(false)
    }
}

impl<T: ReplicationFetcher> ReplicationFetcher for Arc<T> {
    fn fetch(
        &self,
        ty: ReplicatedType,
        after_index: u64,
        max_wait: Duration,
    ) -> impl Future<Output = ReplicationResult<FetchResponse>> + Send {
        (**self).fetch(ty, after_index, max_wait)
    }
}

impl<T: StateApplier> StateApplier for Arc<T> {
    fn apply(
        &self,
        entities: Vec<Entity>,
        op: OpTag,
    ) -> impl Future<Output = ReplicationResult<u64>> + Send {
        (**self).apply(entities, op)
    }
}

impl<T: LocalReader> LocalReader for Arc<T> {
    fn lookup(
        &self,
        ty: ReplicatedType,
        id: &str,
    ) -> impl Future<Output = ReplicationResult<Option<Entity>>> + Send {
        (**self).lookup(ty, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct Registry {
        namespaces: BTreeSet<(String, String)>,
        doomed_partitions: BTreeSet<String>,
    }

    impl TenancyOracle for Registry {
        fn partition_exists(&self, partition: &str) -> ReplicationResult<bool> {
            Ok(self.namespaces.iter().any(|(p, _)| p == partition))
        }

        fn namespace_exists(&self, partition: &str, namespace: &str) -> ReplicationResult<bool> {
            Ok(self
                .namespaces
                .contains(&(partition.to_string(), namespace.to_string())))
        }

        fn partition_marked_for_deletion(&self, partition: &str) -> ReplicationResult<bool> {
            Ok(self.doomed_partitions.contains(partition))
        }

        fn namespace_marked_for_deletion(&self, _: &str, _: &str) -> ReplicationResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_default_tenancy_accepts_everything() {
        let scope = TenancyScope::new("team-a", "payments");
        assert!(DefaultTenancy.accepts(&scope).unwrap());
    }

    #[test]
    fn test_accepts_checks_existence_and_markers() {
        let registry = Registry {
            namespaces: [
                ("default".to_string(), "default".to_string()),
                ("old".to_string(), "default".to_string()),
            ]
            .into_iter()
            .collect(),
            doomed_partitions: ["old".to_string()].into_iter().collect(),
        };

        assert!(registry.accepts(&TenancyScope::default()).unwrap());
        assert!(!registry.accepts(&TenancyScope::new("default", "gone")).unwrap());
        assert!(!registry.accepts(&TenancyScope::new("missing", "default")).unwrap());
        assert!(!registry.accepts(&TenancyScope::new("old", "default")).unwrap());
    }
}
